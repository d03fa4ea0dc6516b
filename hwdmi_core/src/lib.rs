//! Decoder for the SMBIOS/DMI firmware tables.
//!
//! [`Decoder::new`] reads the entry point and structure table from sysfs,
//! or from physical memory when sysfs is unavailable, and decodes each
//! structure type lazily on first query. [`Decoder::from_bytes`] does the
//! same for buffers obtained elsewhere.

pub mod config;
pub mod entry_point;
pub mod error;
pub mod field;
pub mod platform;
pub mod registry;
pub mod source;
pub mod table;
pub mod types;

#[cfg(test)]
mod testutil;

pub use config::{load_source_config, parse_source_config, SourceConfig};
pub use entry_point::EntryPoint;
pub use error::{EntryPointError, Error, Result, StreamError};
pub use registry::{DecodeFailure, Decoder};
pub use source::SmbiosData;
pub use table::{Table, TableHeader};
pub use types::{format_size, Baseboard, Bios, Chassis, MemoryDevice, MemorySize, Processor, System};
