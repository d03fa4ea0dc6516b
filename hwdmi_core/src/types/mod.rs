//! Standard structure types and their human-readable accessors.

use std::borrow::Cow;

mod baseboard;
mod bios;
mod chassis;
mod memory;
mod processor;
mod system;

pub use baseboard::Baseboard;
pub use bios::Bios;
pub use chassis::{Chassis, ContainedElement};
pub use memory::{MemoryDevice, MemorySize};
pub use processor::{Processor, Voltage};
pub use system::{System, Uuid};

/// Name for `code` in a table whose first entry has code `first`; codes
/// outside the table come back as hex.
pub(crate) fn indexed(code: u16, first: u16, names: &[&'static str]) -> Cow<'static, str> {
    code.checked_sub(first)
        .and_then(|i| names.get(usize::from(i)))
        .map(|name| Cow::Borrowed(*name))
        .unwrap_or_else(|| hex(code))
}

/// Name for `code` in a sparse `(code, name)` table.
pub(crate) fn paired(code: u16, names: &[(u16, &'static str)]) -> Cow<'static, str> {
    names
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| Cow::Borrowed(*name))
        .unwrap_or_else(|| hex(code))
}

pub(crate) fn hex(code: u16) -> Cow<'static, str> {
    if code > 0xFF {
        Cow::Owned(format!("{:#06x}", code))
    } else {
        Cow::Owned(format!("{:#04x}", code))
    }
}

/// Names of the set bits of `value`, lowest bit first. Entry `i` names bit
/// `i`; empty entries are reserved bits and never reported.
pub(crate) fn flags(value: u64, names: &[&'static str]) -> Vec<&'static str> {
    names
        .iter()
        .enumerate()
        .filter(|(bit, name)| !name.is_empty() && value & (1u64 << bit) != 0)
        .map(|(_, name)| *name)
        .collect()
}

/// Byte count in the largest unit that divides it exactly.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [(u64, &str); 4] = [(1 << 40, "TB"), (1 << 30, "GB"), (1 << 20, "MB"), (1 << 10, "kB")];
    for (unit, name) in UNITS {
        if bytes >= unit && bytes % unit == 0 {
            return format!("{} {}", bytes / unit, name);
        }
    }
    format!("{} bytes", bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_fall_back_to_hex() {
        const NAMES: &[&str] = &["Other", "Unknown"];
        assert_eq!(indexed(1, 1, NAMES), "Other");
        assert_eq!(indexed(2, 1, NAMES), "Unknown");
        assert_eq!(indexed(0, 1, NAMES), "0x00");
        assert_eq!(indexed(0x2a, 1, NAMES), "0x2a");
        assert_eq!(paired(0x101, &[(0x101, "ARMv8")]), "ARMv8");
        assert_eq!(paired(0x1ff, &[(0x101, "ARMv8")]), "0x01ff");
    }

    #[test]
    fn flag_names_skip_reserved_bits() {
        assert_eq!(flags(0b1011, &["", "one", "two", "three"]), vec!["one", "three"]);
        assert!(flags(0, &["a", "b"]).is_empty());
    }

    #[test]
    fn sizes_use_largest_exact_unit() {
        assert_eq!(format_size(64 << 10), "64 kB");
        assert_eq!(format_size(16 << 30), "16 GB");
        assert_eq!(format_size(1536 << 20), "1536 MB");
        assert_eq!(format_size(2 << 40), "2 TB");
        assert_eq!(format_size(1000), "1000 bytes");
    }
}
