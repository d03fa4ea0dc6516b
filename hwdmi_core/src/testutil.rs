//! Builders for synthetic SMBIOS images used by the unit tests.

use crate::entry_point::checksum;

fn fix_checksum(buf: &mut [u8], range: std::ops::Range<usize>, at: usize) {
    buf[at] = 0;
    buf[at] = 0u8.wrapping_sub(checksum(&buf[range]));
}

pub fn entry_point_32(table_address: u32, table_length: u16) -> Vec<u8> {
    let mut buf = vec![0u8; 0x1F];
    buf[0..4].copy_from_slice(b"_SM_");
    buf[5] = 0x1F;
    buf[6] = 2;
    buf[7] = 8;
    buf[8..10].copy_from_slice(&0x100u16.to_le_bytes());
    buf[0x10..0x15].copy_from_slice(b"_DMI_");
    buf[0x16..0x18].copy_from_slice(&table_length.to_le_bytes());
    buf[0x18..0x1C].copy_from_slice(&table_address.to_le_bytes());
    buf[0x1C..0x1E].copy_from_slice(&3u16.to_le_bytes());
    buf[0x1E] = 0x28;
    fix_checksum(&mut buf, 0x10..0x1F, 0x15);
    fix_checksum(&mut buf, 0..0x1F, 4);
    buf
}

pub fn entry_point_64(table_address: u64, table_max_size: u32) -> Vec<u8> {
    let mut buf = vec![0u8; 0x18];
    buf[0..5].copy_from_slice(b"_SM3_");
    buf[6] = 0x18;
    buf[7] = 3;
    buf[8] = 4;
    buf[10] = 1;
    buf[0x0C..0x10].copy_from_slice(&table_max_size.to_le_bytes());
    buf[0x10..0x18].copy_from_slice(&table_address.to_le_bytes());
    fix_checksum(&mut buf, 0..0x18, 5);
    buf
}

/// One structure: header, `formatted` bytes and the string list.
pub fn structure(kind: u8, handle: u16, formatted: &[u8], strings: &[&str]) -> Vec<u8> {
    let mut buf = vec![kind, (formatted.len() + 4) as u8];
    buf.extend(handle.to_le_bytes());
    buf.extend_from_slice(formatted);
    if strings.is_empty() {
        buf.extend([0, 0]);
    } else {
        for s in strings {
            buf.extend_from_slice(s.as_bytes());
            buf.push(0);
        }
        buf.push(0);
    }
    buf
}

pub fn end_of_table(handle: u16) -> Vec<u8> {
    structure(127, handle, &[], &[])
}

/// Little-endian byte writer for formatted areas.
#[derive(Default)]
pub struct Formatted(pub Vec<u8>);

impl Formatted {
    pub fn u8(mut self, v: u8) -> Self {
        self.0.push(v);
        self
    }

    pub fn u16(mut self, v: u16) -> Self {
        self.0.extend(v.to_le_bytes());
        self
    }

    pub fn u32(mut self, v: u32) -> Self {
        self.0.extend(v.to_le_bytes());
        self
    }

    pub fn u64(mut self, v: u64) -> Self {
        self.0.extend(v.to_le_bytes());
        self
    }

    pub fn bytes(mut self, v: &[u8]) -> Self {
        self.0.extend_from_slice(v);
        self
    }

    /// Pads with zeros until the formatted area is `len` bytes long.
    pub fn pad_to(mut self, len: usize) -> Self {
        self.0.resize(len, 0);
        self
    }
}
