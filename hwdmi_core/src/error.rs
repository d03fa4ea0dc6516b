use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Which entry point invariant failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntryPointError {
    #[error("unrecognized anchor {0:02x?}")]
    UnknownAnchor(Vec<u8>),
    #[error("buffer holds {got} bytes, {need} required")]
    Truncated { need: usize, got: usize },
    #[error("declared length {found:#04x}, expected {expected:#04x}")]
    BadLength { expected: u8, found: u8 },
    #[error("checksum sums to {0:#04x}, expected 0")]
    BadChecksum(u8),
    #[error("intermediate anchor {0:02x?} is not _DMI_")]
    BadIntermediateAnchor(Vec<u8>),
    #[error("intermediate checksum sums to {0:#04x}, expected 0")]
    BadIntermediateChecksum(u8),
}

/// Why the table stream could not be split into structures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("header needs 4 bytes, {0} remain")]
    TruncatedHeader(usize),
    #[error("declared length {0} is shorter than the 4-byte header")]
    LengthBelowHeader(u8),
    #[error("formatted area needs {need} bytes, {got} remain")]
    TruncatedFormatted { need: usize, got: usize },
    #[error("string area is not terminated by a double NUL")]
    UnterminatedStrings,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Neither the sysfs exposure nor physical memory can be used.
    #[error("no SMBIOS source available: {0}")]
    SourceUnavailable(String),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("reading SMBIOS data timed out after {0:?}")]
    Timeout(Duration),

    #[error("scan window {start:#x}..{end:#x} is empty")]
    EmptyScanWindow { start: u64, end: u64 },

    #[error("no SMBIOS anchor found in {start:#x}..{end:#x}")]
    AnchorNotFound { start: u64, end: u64 },

    #[error("invalid entry point: {0}")]
    InvalidEntryPoint(#[from] EntryPointError),

    #[error("malformed table stream at offset {offset:#x}: {reason}")]
    MalformedStream { offset: usize, reason: StreamError },

    #[error("{type_name}: field {field} at offset {offset:#x} runs past the formatted area")]
    FieldOutOfBounds {
        type_name: &'static str,
        field: &'static str,
        offset: usize,
    },

    #[error("{type_name}: field {field} references string {index}, only {count} present")]
    StringIndex {
        type_name: &'static str,
        field: &'static str,
        index: u8,
        count: usize,
    },

    #[error("no parser registered for structure type {0}")]
    NoParser(u8),

    #[error("structure type {0} is registered with a different record type")]
    TypeMismatch(u8),

    #[error("invalid configuration on line {line}: {reason}")]
    Config { line: usize, reason: String },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }

    /// True for errors that abort decoder construction.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::SourceUnavailable(_)
                | Error::Io { .. }
                | Error::Timeout(_)
                | Error::EmptyScanWindow { .. }
                | Error::AnchorNotFound { .. }
                | Error::InvalidEntryPoint(_)
                | Error::MalformedStream { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        assert!(Error::SourceUnavailable("x".into()).is_fatal());
        assert!(Error::Timeout(Duration::from_secs(1)).is_fatal());
        assert!(Error::EmptyScanWindow { start: 0x100000, end: 0xF0000 }.is_fatal());
        assert!(Error::InvalidEntryPoint(EntryPointError::BadChecksum(3)).is_fatal());
        assert!(!Error::NoParser(9).is_fatal());
        assert!(!Error::StringIndex { type_name: "BIOS", field: "Vendor", index: 4, count: 1 }.is_fatal());
    }

    #[test]
    fn messages_name_the_failure() {
        let err = Error::FieldOutOfBounds { type_name: "Processor", field: "CoreCount2", offset: 0x26 };
        assert_eq!(err.to_string(), "Processor: field CoreCount2 at offset 0x26 runs past the formatted area");

        let err: Error = EntryPointError::BadLength { expected: 0x1f, found: 0x1e }.into();
        assert_eq!(err.to_string(), "invalid entry point: declared length 0x1e, expected 0x1f");
    }
}
