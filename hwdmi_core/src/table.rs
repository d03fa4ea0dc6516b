//! Structure table stream: splits raw table bytes into header, formatted
//! area and string list for each structure.

use bytes::{Buf, Bytes};
use serde::Serialize;

use crate::error::{Error, Result, StreamError};

/// Type tag of the structure that terminates the table stream.
pub const END_OF_TABLE: u8 = 127;

pub const HEADER_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TableHeader {
    pub kind: u8,
    /// Header plus formatted area; excludes the string area.
    pub length: u8,
    pub handle: u16,
}

/// One raw structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub header: TableHeader,
    formatted: Bytes,
    strings: Vec<String>,
}

impl Table {
    pub fn new(header: TableHeader, formatted: impl Into<Bytes>, strings: Vec<String>) -> Self {
        Table { header, formatted: formatted.into(), strings }
    }

    pub fn kind(&self) -> u8 {
        self.header.kind
    }

    pub fn handle(&self) -> u16 {
        self.header.handle
    }

    /// Bytes following the header, up to the declared length.
    pub fn formatted(&self) -> &[u8] {
        &self.formatted
    }

    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    /// Resolves a 1-based string reference. Index 0 means "no string" and
    /// yields `None`, as does an index past the string list.
    pub fn string(&self, index: u8) -> Option<&str> {
        match index {
            0 => None,
            i => self.strings.get(usize::from(i) - 1).map(String::as_str),
        }
    }
}

/// Splits a table stream into structures.
///
/// Parsing stops after the end-of-table structure (type 127) or when the
/// input is exhausted on a structure boundary. Running out of bytes in the
/// middle of a structure is a malformed stream.
pub fn parse_tables(stream: &[u8]) -> Result<Vec<Table>> {
    let mut buf = stream;
    let mut tables = Vec::new();

    while buf.has_remaining() {
        let offset = stream.len() - buf.remaining();
        let malformed = |reason| Error::MalformedStream { offset, reason };

        if buf.remaining() < HEADER_LEN {
            return Err(malformed(StreamError::TruncatedHeader(buf.remaining())));
        }
        let header = TableHeader {
            kind: buf.get_u8(),
            length: buf.get_u8(),
            handle: buf.get_u16_le(),
        };

        let formatted_len = usize::from(header.length)
            .checked_sub(HEADER_LEN)
            .ok_or_else(|| malformed(StreamError::LengthBelowHeader(header.length)))?;
        if buf.remaining() < formatted_len {
            return Err(malformed(StreamError::TruncatedFormatted {
                need: formatted_len,
                got: buf.remaining(),
            }));
        }
        let formatted = Bytes::copy_from_slice(&buf[..formatted_len]);
        buf.advance(formatted_len);

        let strings = parse_strings(&mut buf).ok_or_else(|| malformed(StreamError::UnterminatedStrings))?;

        tables.push(Table { header, formatted, strings });

        if header.kind == END_OF_TABLE {
            break;
        }
    }

    Ok(tables)
}

/// Reads a double-NUL terminated string list, dropping empty entries.
/// Returns `None` when the input ends before the terminator.
fn parse_strings(buf: &mut &[u8]) -> Option<Vec<String>> {
    let mut strings = Vec::new();

    if buf.len() < 2 {
        return None;
    }
    if buf[0] == 0 && buf[1] == 0 {
        buf.advance(2);
        return Some(strings);
    }

    loop {
        let end = buf.iter().position(|&b| b == 0)?;
        if end > 0 {
            strings.push(String::from_utf8_lossy(&buf[..end]).into_owned());
        }
        buf.advance(end + 1);

        match buf.first() {
            Some(0) => {
                buf.advance(1);
                return Some(strings);
            }
            Some(_) => continue,
            None => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    fn single(bytes: &[u8]) -> Table {
        let mut tables = parse_tables(bytes).expect("valid stream");
        assert_eq!(tables.len(), 1);
        tables.remove(0)
    }

    #[test]
    fn header_only_structure() {
        let t = single(&[127, 0x04, 0x01, 0x00, 0x00, 0x00]);
        assert_eq!(t.header, TableHeader { kind: 127, length: 4, handle: 1 });
        assert!(t.formatted().is_empty());
        assert!(t.strings().is_empty());
    }

    #[test]
    fn formatted_without_strings() {
        let t = single(&[127, 0x06, 0x01, 0x00, 0x01, 0x02, 0x00, 0x00]);
        assert_eq!(t.formatted(), &[1, 2]);
        assert!(t.strings().is_empty());
    }

    #[test]
    fn formatted_and_strings() {
        let t = single(&[
            127, 0x06, 0x01, 0x00, 0x01, 0x02, b'a', b'b', b'c', b'd', 0x00, b'1', b'2', b'3', b'4',
            0x00, 0x00,
        ]);
        assert_eq!(t.formatted(), &[1, 2]);
        assert_eq!(t.strings(), &["abcd".to_string(), "1234".to_string()]);
        assert_eq!(t.string(1), Some("abcd"));
        assert_eq!(t.string(2), Some("1234"));
        assert_eq!(t.string(0), None);
        assert_eq!(t.string(3), None);
    }

    #[test]
    fn leading_empty_string_is_dropped() {
        let t = single(&[127, 0x04, 0x00, 0x00, 0x00, b'x', b'y', 0x00, 0x00]);
        assert_eq!(t.strings(), &["xy".to_string()]);
    }

    #[test]
    fn stops_at_end_of_table() {
        let mut stream = testutil::structure(2, 0x10, &[1, 2, 3, 4], &["board"]);
        stream.extend(testutil::end_of_table(0x11));
        // trailing garbage after the terminator must not be read
        stream.extend([0xde, 0xad]);

        let tables = parse_tables(&stream).expect("valid stream");
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].kind(), 2);
        assert_eq!(tables[0].string(1), Some("board"));
        assert_eq!(tables.last().map(Table::kind), Some(END_OF_TABLE));
    }

    #[test]
    fn exhaustion_on_boundary_ends_stream() {
        let mut stream = testutil::structure(0, 1, &[0; 0x14], &["vendor", "1.0"]);
        stream.extend(testutil::structure(1, 2, &[0; 4], &[]));
        let tables = parse_tables(&stream).expect("valid stream");
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].handle(), 2);
    }

    #[test]
    fn rejects_malformed_records() {
        let err = parse_tables(&[4, 0x03, 0x00, 0x00, 0x00, 0x00]).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedStream { offset: 0, reason: StreamError::LengthBelowHeader(3) }
        ));

        let err = parse_tables(&[4, 0x10, 0x00, 0x00, 0x01]).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedStream { reason: StreamError::TruncatedFormatted { need: 12, got: 1 }, .. }
        ));

        let err = parse_tables(&[4, 0x05, 0x00, 0x00, 0x01, b'a', b'b', 0x00]).unwrap_err();
        assert!(matches!(err, Error::MalformedStream { reason: StreamError::UnterminatedStrings, .. }));

        let mut stream = testutil::structure(1, 1, &[], &[]);
        stream.extend([17, 0x20]);
        let err = parse_tables(&stream).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedStream { offset: 6, reason: StreamError::TruncatedHeader(2) }
        ));
    }
}
