//! SMBIOS entry point structures.
//!
//! The entry point anchors the structure table: it carries the SMBIOS
//! version and the physical address and size of the table stream. Two
//! layouts exist, the legacy 32-bit `_SM_` structure (with its embedded
//! `_DMI_` intermediate structure) and the 64-bit `_SM3_` structure.
//! See DSP0134 section 5.2.

use bytes::Buf;
use serde::Serialize;

use crate::error::{EntryPointError, Result};

pub const ANCHOR_32: &[u8; 4] = b"_SM_";
pub const ANCHOR_64: &[u8; 5] = b"_SM3_";
const INTERMEDIATE_ANCHOR: &[u8; 5] = b"_DMI_";

/// Fixed size of the 32-bit entry point.
pub const LENGTH_32: usize = 0x1F;
/// Fixed size of the 64-bit entry point.
pub const LENGTH_64: usize = 0x18;

// the intermediate (_DMI_) structure spans 0x10..0x1F
const INTERMEDIATE_START: usize = 0x10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryPoint32 {
    pub checksum: u8,
    pub length: u8,
    pub major: u8,
    pub minor: u8,
    pub max_structure_size: u16,
    pub revision: u8,
    pub formatted_area: [u8; 5],
    pub intermediate_checksum: u8,
    pub table_length: u16,
    pub table_address: u32,
    pub structure_count: u16,
    pub bcd_revision: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryPoint64 {
    pub checksum: u8,
    pub length: u8,
    pub major: u8,
    pub minor: u8,
    pub docrev: u8,
    pub revision: u8,
    pub reserved: u8,
    pub table_max_size: u32,
    pub table_address: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum EntryPoint {
    Bits32(EntryPoint32),
    Bits64(EntryPoint64),
}

impl EntryPoint {
    /// Recognizes and validates an entry point at the start of `buf`.
    ///
    /// Trailing bytes past the fixed structure size are ignored, so the
    /// buffer may be a slice of a larger memory window.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.starts_with(ANCHOR_64) {
            Ok(EntryPoint::Bits64(parse_64(buf)?))
        } else if buf.starts_with(ANCHOR_32) {
            Ok(EntryPoint::Bits32(parse_32(buf)?))
        } else {
            let n = buf.len().min(ANCHOR_64.len());
            Err(EntryPointError::UnknownAnchor(buf[..n].to_vec()).into())
        }
    }

    /// Physical address and length of the structure table.
    ///
    /// For the 64-bit layout the length is a maximum, not the exact size.
    pub fn table(&self) -> (u64, u32) {
        match self {
            EntryPoint::Bits32(ep) => (u64::from(ep.table_address), u32::from(ep.table_length)),
            EntryPoint::Bits64(ep) => (ep.table_address, ep.table_max_size),
        }
    }

    /// SMBIOS (major, minor, revision). The 32-bit layout has no revision.
    pub fn version(&self) -> (u8, u8, u8) {
        match self {
            EntryPoint::Bits32(ep) => (ep.major, ep.minor, 0),
            EntryPoint::Bits64(ep) => (ep.major, ep.minor, ep.docrev),
        }
    }

    pub fn max_structure_size(&self) -> u32 {
        match self {
            EntryPoint::Bits32(ep) => u32::from(ep.max_structure_size),
            EntryPoint::Bits64(ep) => ep.table_max_size,
        }
    }

    /// The 64-bit table length is an upper bound; the stream ends at the
    /// end-of-table structure.
    pub fn table_length_is_advisory(&self) -> bool {
        matches!(self, EntryPoint::Bits64(_))
    }

    pub fn anchor(&self) -> &'static str {
        match self {
            EntryPoint::Bits32(_) => "_SM_",
            EntryPoint::Bits64(_) => "_SM3_",
        }
    }
}

/// Wrapping byte sum; a valid checksummed range sums to zero.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Offset of the first `_SM3_` or `_SM_` anchor in `window`, scanning
/// byte by byte.
pub fn find_anchor(window: &[u8]) -> Option<usize> {
    (0..window.len()).find(|&i| {
        let rest = &window[i..];
        rest.starts_with(ANCHOR_64) || rest.starts_with(ANCHOR_32)
    })
}

fn require(buf: &[u8], need: usize) -> std::result::Result<&[u8], EntryPointError> {
    if buf.len() < need {
        return Err(EntryPointError::Truncated { need, got: buf.len() });
    }
    Ok(&buf[..need])
}

fn parse_32(buf: &[u8]) -> Result<EntryPoint32> {
    let raw = require(buf, LENGTH_32)?;

    let length = raw[5];
    if usize::from(length) != LENGTH_32 {
        return Err(EntryPointError::BadLength { expected: LENGTH_32 as u8, found: length }.into());
    }

    let sum = checksum(raw);
    if sum != 0 {
        return Err(EntryPointError::BadChecksum(sum).into());
    }

    let intermediate = &raw[INTERMEDIATE_START..];
    if !intermediate.starts_with(INTERMEDIATE_ANCHOR) {
        return Err(EntryPointError::BadIntermediateAnchor(intermediate[..5].to_vec()).into());
    }
    let sum = checksum(intermediate);
    if sum != 0 {
        return Err(EntryPointError::BadIntermediateChecksum(sum).into());
    }

    let mut cur = &raw[ANCHOR_32.len()..];
    let checksum = cur.get_u8();
    let length = cur.get_u8();
    let major = cur.get_u8();
    let minor = cur.get_u8();
    let max_structure_size = cur.get_u16_le();
    let revision = cur.get_u8();
    let mut formatted_area = [0u8; 5];
    cur.copy_to_slice(&mut formatted_area);
    cur.advance(INTERMEDIATE_ANCHOR.len());
    let intermediate_checksum = cur.get_u8();
    let table_length = cur.get_u16_le();
    let table_address = cur.get_u32_le();
    let structure_count = cur.get_u16_le();
    let bcd_revision = cur.get_u8();

    Ok(EntryPoint32 {
        checksum,
        length,
        major,
        minor,
        max_structure_size,
        revision,
        formatted_area,
        intermediate_checksum,
        table_length,
        table_address,
        structure_count,
        bcd_revision,
    })
}

fn parse_64(buf: &[u8]) -> Result<EntryPoint64> {
    let raw = require(buf, LENGTH_64)?;

    let length = raw[6];
    if usize::from(length) != LENGTH_64 {
        return Err(EntryPointError::BadLength { expected: LENGTH_64 as u8, found: length }.into());
    }

    let sum = checksum(raw);
    if sum != 0 {
        return Err(EntryPointError::BadChecksum(sum).into());
    }

    let mut cur = &raw[ANCHOR_64.len()..];
    Ok(EntryPoint64 {
        checksum: cur.get_u8(),
        length: cur.get_u8(),
        major: cur.get_u8(),
        minor: cur.get_u8(),
        docrev: cur.get_u8(),
        revision: cur.get_u8(),
        reserved: cur.get_u8(),
        table_max_size: cur.get_u32_le(),
        table_address: cur.get_u64_le(),
    })
}
