//! Backends that produce the raw entry point and structure table.
//!
//! The sysfs exposure is preferred: it needs no privilege and is an atomic
//! snapshot. Physical memory is the fallback and requires read access to
//! the memory device. Either way the whole read runs on a worker thread
//! and is abandoned if it outlives the configured timeout.

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use log::{debug, error, warn};

use crate::config::SourceConfig;
use crate::entry_point::{find_anchor, EntryPoint};
use crate::error::{Error, Result};
use crate::platform;
use crate::table::{parse_tables, Table};

/// Entry point plus every structure of the table, in table order.
#[derive(Debug, Clone)]
pub struct SmbiosData {
    pub entry_point: EntryPoint,
    pub tables: Vec<Table>,
}

pub trait Backend: Send {
    fn name(&self) -> &'static str;
    fn read(&self) -> Result<SmbiosData>;
}

/// Reads SMBIOS data from the first usable backend, bounded by
/// `config.timeout`.
pub fn read(config: &SourceConfig) -> Result<SmbiosData> {
    let backend = select_backend(config).inspect_err(|e| error!("{}", e))?;
    debug!("reading SMBIOS data via {}", backend.name());
    with_timeout(config.timeout, move || backend.read()).inspect_err(|e| error!("{}", e))
}

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        fn select_backend(config: &SourceConfig) -> Result<Box<dyn Backend>> {
            let sysfs = Sysfs::new(&config.entry_point, &config.table);
            if sysfs.available() {
                return Ok(Box::new(sysfs));
            }
            if config.allow_dev_mem && platform::physical_memory_accessible(&config.dev_mem) {
                warn!(
                    "{} not present, scanning {} (uid {})",
                    config.entry_point.display(),
                    config.dev_mem.display(),
                    platform::effective_uid()
                );
                return Ok(Box::new(DevMem::open(config)?));
            }
            Err(Error::SourceUnavailable(format!(
                "{} is missing and {} is not readable",
                config.entry_point.display(),
                config.dev_mem.display()
            )))
        }
    } else {
        fn select_backend(_config: &SourceConfig) -> Result<Box<dyn Backend>> {
            Err(Error::SourceUnavailable("SMBIOS access is only implemented for Linux".into()))
        }
    }
}

/// Limits the table stream to the length declared by a 32-bit entry point.
/// The 64-bit length is only an upper bound and the stream is used as is.
pub fn table_window<'a>(entry_point: &EntryPoint, stream: &'a [u8]) -> &'a [u8] {
    if entry_point.table_length_is_advisory() {
        return stream;
    }
    let (_, length) = entry_point.table();
    &stream[..stream.len().min(length as usize)]
}

/// Runs `work` on a worker thread and waits at most `timeout` for it. On
/// timeout the worker is abandoned; whatever it owns is released when it
/// finishes.
pub fn with_timeout<T, F>(timeout: Duration, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("hwdmi-read".into())
        .spawn(move || {
            // the receiver is gone if we already timed out
            let _ = tx.send(work());
        })
        .map_err(|e| Error::SourceUnavailable(format!("cannot start reader thread: {}", e)))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(Error::Timeout(timeout)),
        Err(RecvTimeoutError::Disconnected) => {
            Err(Error::SourceUnavailable("reader thread exited without a result".into()))
        }
    }
}

/// `/sys/firmware/dmi/tables`: the entry point and table stream as files.
pub struct Sysfs {
    entry_point: PathBuf,
    table: PathBuf,
}

impl Sysfs {
    pub fn new(entry_point: impl AsRef<Path>, table: impl AsRef<Path>) -> Self {
        Sysfs { entry_point: entry_point.as_ref().to_path_buf(), table: table.as_ref().to_path_buf() }
    }

    pub fn available(&self) -> bool {
        self.entry_point.exists()
    }
}

impl Backend for Sysfs {
    fn name(&self) -> &'static str {
        "sysfs"
    }

    fn read(&self) -> Result<SmbiosData> {
        let raw = fs::read(&self.entry_point).map_err(|e| Error::io(&self.entry_point, e))?;
        let entry_point = EntryPoint::parse(&raw)?;

        let stream = fs::read(&self.table).map_err(|e| Error::io(&self.table, e))?;
        let tables = parse_tables(table_window(&entry_point, &stream))?;
        debug!("{}: {} structures from {} bytes", self.table.display(), tables.len(), stream.len());

        Ok(SmbiosData { entry_point, tables })
    }
}

/// Physical memory: scan the legacy BIOS window for an anchor, then read
/// the table from the address the entry point names.
pub struct DevMem {
    path: PathBuf,
    window: Range<u64>,
    read_timeout: Duration,
    // seek-then-read pairs must not interleave
    file: Arc<Mutex<File>>,
}

impl DevMem {
    pub fn open(config: &SourceConfig) -> Result<Self> {
        if config.scan_start >= config.scan_end {
            return Err(Error::EmptyScanWindow { start: config.scan_start, end: config.scan_end });
        }
        let file = File::open(&config.dev_mem).map_err(|e| Error::io(&config.dev_mem, e))?;
        Ok(DevMem {
            path: config.dev_mem.clone(),
            window: config.scan_start..config.scan_end,
            read_timeout: config.read_timeout,
            file: Arc::new(Mutex::new(file)),
        })
    }

    /// Reads `len` bytes at physical `address`, bounded by the per-read
    /// timeout.
    pub fn read_at(&self, address: u64, len: usize) -> Result<Vec<u8>> {
        let file = Arc::clone(&self.file);
        let path = self.path.clone();
        with_timeout(self.read_timeout, move || {
            let mut file = file.lock().unwrap_or_else(PoisonError::into_inner);
            let mut buf = vec![0u8; len];
            file.seek(SeekFrom::Start(address))
                .and_then(|_| file.read_exact(&mut buf))
                .map_err(|e| Error::io(&path, e))?;
            Ok(buf)
        })
    }
}

impl Backend for DevMem {
    fn name(&self) -> &'static str {
        "physical memory"
    }

    fn read(&self) -> Result<SmbiosData> {
        let Range { start, end } = self.window;
        let len = end
            .checked_sub(start)
            .and_then(|n| usize::try_from(n).ok())
            .ok_or(Error::EmptyScanWindow { start, end })?;
        let window = self.read_at(start, len)?;
        let offset = find_anchor(&window).ok_or(Error::AnchorNotFound { start, end })?;
        debug!("entry point anchor at {:#x}", start + offset as u64);

        let entry_point = EntryPoint::parse(&window[offset..])?;
        let (address, length) = entry_point.table();
        let stream = self.read_at(address, length as usize)?;
        let tables = parse_tables(&stream)?;

        Ok(SmbiosData { entry_point, tables })
    }
}
