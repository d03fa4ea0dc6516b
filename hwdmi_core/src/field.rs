//! Schema-driven decoding of a structure's formatted area.
//!
//! Each record type lists its fields in wire order as a `const` table of
//! [`Field`]s. [`decode`] walks that table left to right with a cursor into
//! the formatted area, reading fixed-width little-endian integers, string
//! references, nested sub-records and custom variable-length fields.
//!
//! Structures written by older firmware are shorter than the current
//! layout. Once the cursor reaches the end of the formatted area, the
//! remaining top-level fields take their declared fallback (or stay at the
//! record's `Default`) instead of failing. Nested sub-records are always
//! present on the wire and must decode completely.

use bytes::Buf;

use crate::error::{Error, Result};
use crate::table::{Table, TableHeader};

/// Decode hook for nested and variable-length fields: receives the record,
/// a reader over the table and the cursor, returns the new cursor.
pub type Hook<T> = fn(&mut T, &Reader<'_>, usize) -> Result<usize>;

pub enum FieldKind<T> {
    U8(fn(&mut T, u8)),
    U16(fn(&mut T, u16)),
    U32(fn(&mut T, u32)),
    U64(fn(&mut T, u64)),
    /// One byte holding a 1-based index into the string area.
    Str(fn(&mut T, String)),
    /// An always-present sub-structure, decoded with [`decode_nested`].
    Nested(Hook<T>),
    /// A field whose extent is only known at runtime, such as a
    /// count-prefixed handle list.
    Custom(Hook<T>),
    /// Not backed by wire bytes.
    Ignored,
    /// Consumes bytes without assigning anything.
    Skip(usize),
}

/// Value for a field that lies beyond a short formatted area.
#[derive(Debug, Clone, Copy)]
pub enum Fallback {
    Int(u64),
    Str(&'static str),
}

pub struct Field<T> {
    pub name: &'static str,
    pub kind: FieldKind<T>,
    pub fallback: Option<Fallback>,
}

impl<T> Field<T> {
    const fn new(name: &'static str, kind: FieldKind<T>) -> Self {
        Field { name, kind, fallback: None }
    }

    pub const fn u8(name: &'static str, set: fn(&mut T, u8)) -> Self {
        Self::new(name, FieldKind::U8(set))
    }

    pub const fn u16(name: &'static str, set: fn(&mut T, u16)) -> Self {
        Self::new(name, FieldKind::U16(set))
    }

    pub const fn u32(name: &'static str, set: fn(&mut T, u32)) -> Self {
        Self::new(name, FieldKind::U32(set))
    }

    pub const fn u64(name: &'static str, set: fn(&mut T, u64)) -> Self {
        Self::new(name, FieldKind::U64(set))
    }

    pub const fn string(name: &'static str, set: fn(&mut T, String)) -> Self {
        Self::new(name, FieldKind::Str(set))
    }

    pub const fn nested(name: &'static str, hook: Hook<T>) -> Self {
        Self::new(name, FieldKind::Nested(hook))
    }

    pub const fn custom(name: &'static str, hook: Hook<T>) -> Self {
        Self::new(name, FieldKind::Custom(hook))
    }

    pub const fn ignore(name: &'static str) -> Self {
        Self::new(name, FieldKind::Ignored)
    }

    pub const fn skip(name: &'static str, bytes: usize) -> Self {
        Self::new(name, FieldKind::Skip(bytes))
    }

    /// Numeric value used when the structure ends before this field.
    pub const fn or(mut self, value: u64) -> Self {
        self.fallback = Some(Fallback::Int(value));
        self
    }

    /// String used when the structure ends before this field.
    pub const fn or_str(mut self, value: &'static str) -> Self {
        self.fallback = Some(Fallback::Str(value));
        self
    }
}

/// A record type with a wire layout.
pub trait Schema: Default + Sized {
    fn schema() -> &'static [Field<Self>];
}

/// A top-level structure type decoded from one table.
pub trait Structure: Schema + Send + Sync + 'static {
    const KIND: u8;
    const NAME: &'static str;

    /// Stores the header, which the schema marks as ignored.
    fn set_header(&mut self, header: TableHeader);
}

/// Bounds-checked access to one table on behalf of a named field.
pub struct Reader<'a> {
    table: &'a Table,
    type_name: &'static str,
    field: &'static str,
}

impl<'a> Reader<'a> {
    pub fn new(table: &'a Table, type_name: &'static str, field: &'static str) -> Self {
        Reader { table, type_name, field }
    }

    pub fn table(&self) -> &'a Table {
        self.table
    }

    /// Length of the formatted area.
    pub fn len(&self) -> usize {
        self.table.formatted().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn for_field(&self, field: &'static str) -> Reader<'a> {
        Reader { field, ..*self }
    }

    fn out_of_bounds(&self, offset: usize) -> Error {
        Error::FieldOutOfBounds { type_name: self.type_name, field: self.field, offset }
    }

    /// The `width` bytes at `offset`, or an error naming this field.
    pub fn bytes(&self, offset: usize, width: usize) -> Result<&'a [u8]> {
        let end = offset.checked_add(width).ok_or_else(|| self.out_of_bounds(offset))?;
        self.table.formatted().get(offset..end).ok_or_else(|| self.out_of_bounds(offset))
    }

    pub fn u8(&self, offset: usize) -> Result<u8> {
        Ok(self.bytes(offset, 1)?.get_u8())
    }

    pub fn u16(&self, offset: usize) -> Result<u16> {
        Ok(self.bytes(offset, 2)?.get_u16_le())
    }

    pub fn u32(&self, offset: usize) -> Result<u32> {
        Ok(self.bytes(offset, 4)?.get_u32_le())
    }

    pub fn u64(&self, offset: usize) -> Result<u64> {
        Ok(self.bytes(offset, 8)?.get_u64_le())
    }

    /// Resolves the string reference byte at `offset`; index 0 is empty.
    pub fn string(&self, offset: usize) -> Result<String> {
        let index = self.u8(offset)?;
        if index == 0 {
            return Ok(String::new());
        }
        match self.table.string(index) {
            Some(s) => Ok(s.to_owned()),
            None => Err(Error::StringIndex {
                type_name: self.type_name,
                field: self.field,
                index,
                count: self.table.strings().len(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Fields past the end of the formatted area take their fallback.
    Lenient,
    /// Every field must be present.
    Complete,
}

/// Decodes `table` as `T`, returning the record and the final cursor.
pub fn decode<T: Structure>(table: &Table) -> Result<(T, usize)> {
    let mut record = T::default();
    record.set_header(table.header);
    let reader = Reader::new(table, T::NAME, "");
    let end = walk(&mut record, &reader, T::schema(), 0, Mode::Lenient)?;
    Ok((record, end))
}

/// Decodes an always-present sub-record starting at `offset`. Running out
/// of bytes before the sub-schema is satisfied is an error.
pub fn decode_nested<S: Schema + 'static>(reader: &Reader<'_>, offset: usize) -> Result<(S, usize)> {
    let mut record = S::default();
    let end = walk(&mut record, reader, S::schema(), offset, Mode::Complete)?;
    Ok((record, end))
}

fn walk<T>(record: &mut T, reader: &Reader<'_>, schema: &[Field<T>], start: usize, mode: Mode) -> Result<usize> {
    let mut cursor = start;
    let len = reader.len();

    for field in schema {
        if let FieldKind::Ignored = field.kind {
            continue;
        }

        let reader = reader.for_field(field.name);

        if cursor >= len {
            match mode {
                Mode::Lenient => {
                    apply_fallback(record, field);
                    continue;
                }
                Mode::Complete => return Err(reader.out_of_bounds(cursor)),
            }
        }

        cursor = match field.kind {
            FieldKind::U8(set) => {
                set(record, reader.u8(cursor)?);
                cursor + 1
            }
            FieldKind::U16(set) => {
                set(record, reader.u16(cursor)?);
                cursor + 2
            }
            FieldKind::U32(set) => {
                set(record, reader.u32(cursor)?);
                cursor + 4
            }
            FieldKind::U64(set) => {
                set(record, reader.u64(cursor)?);
                cursor + 8
            }
            FieldKind::Str(set) => {
                set(record, reader.string(cursor)?);
                cursor + 1
            }
            FieldKind::Nested(hook) | FieldKind::Custom(hook) => hook(record, &reader, cursor)?,
            FieldKind::Skip(n) => cursor + n,
            FieldKind::Ignored => cursor,
        };
    }

    Ok(cursor)
}

fn apply_fallback<T>(record: &mut T, field: &Field<T>) {
    let Some(fallback) = field.fallback else {
        return;
    };
    match (&field.kind, fallback) {
        (FieldKind::U8(set), Fallback::Int(v)) => set(record, v as u8),
        (FieldKind::U16(set), Fallback::Int(v)) => set(record, v as u16),
        (FieldKind::U32(set), Fallback::Int(v)) => set(record, v as u32),
        (FieldKind::U64(set), Fallback::Int(v)) => set(record, v),
        (FieldKind::Str(set), Fallback::Str(s)) => set(record, s.to_owned()),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Formatted;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Pair {
        lo: u8,
        hi: u8,
    }

    impl Schema for Pair {
        fn schema() -> &'static [Field<Self>] {
            const SCHEMA: &[Field<Pair>] = &[Field::u8("Lo", |r, v| r.lo = v), Field::u8("Hi", |r, v| r.hi = v)];
            SCHEMA
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Sample {
        header: TableHeader,
        a: u8,
        b: u16,
        name: String,
        pair: Pair,
        list: Vec<u8>,
        c: u32,
        d: u64,
        label: String,
    }

    const SAMPLE_SCHEMA: &[Field<Sample>] = &[
        Field::ignore("Header"),
        Field::u8("A", |r, v| r.a = v),
        Field::skip("Reserved", 1),
        Field::u16("B", |r, v| r.b = v),
        Field::string("Name", |r, v| r.name = v),
        Field::nested("Pair", |r, rd, off| {
            let (pair, end) = decode_nested::<Pair>(rd, off)?;
            r.pair = pair;
            Ok(end)
        }),
        Field::custom("List", |r, rd, off| {
            let count = usize::from(rd.u8(off)?);
            r.list = rd.bytes(off + 1, count)?.to_vec();
            Ok(off + 1 + count)
        }),
        Field::<Sample>::u32("C", |r, v| r.c = v).or(0xdead_beef),
        Field::u64("D", |r, v| r.d = v),
        Field::<Sample>::string("Label", |r, v| r.label = v).or_str("none"),
    ];

    impl Schema for Sample {
        fn schema() -> &'static [Field<Self>] {
            SAMPLE_SCHEMA
        }
    }

    impl Structure for Sample {
        const KIND: u8 = 200;
        const NAME: &'static str = "Sample";

        fn set_header(&mut self, header: TableHeader) {
            self.header = header;
        }
    }

    fn table(formatted: Vec<u8>, strings: &[&str]) -> Table {
        let header = TableHeader { kind: 200, length: (formatted.len() + 4) as u8, handle: 7 };
        Table::new(header, formatted, strings.iter().map(|s| s.to_string()).collect())
    }

    fn full() -> Vec<u8> {
        Formatted::default()
            .u8(0x11)
            .u8(0xff)
            .u16(0x2233)
            .u8(1)
            .u8(5)
            .u8(6)
            .u8(2)
            .bytes(&[9, 8])
            .u32(0x4455_6677)
            .u64(0x0102_0304_0506_0708)
            .u8(2)
            .0
    }

    #[test]
    fn decodes_every_kind() {
        let t = table(full(), &["first", "second"]);
        let (rec, end) = decode::<Sample>(&t).expect("decodes");
        assert_eq!(end, t.formatted().len());
        assert_eq!(rec.header.handle, 7);
        assert_eq!(rec.a, 0x11);
        assert_eq!(rec.b, 0x2233);
        assert_eq!(rec.name, "first");
        assert_eq!(rec.pair, Pair { lo: 5, hi: 6 });
        assert_eq!(rec.list, vec![9, 8]);
        assert_eq!(rec.c, 0x4455_6677);
        assert_eq!(rec.d, 0x0102_0304_0506_0708);
        assert_eq!(rec.label, "second");
    }

    #[test]
    fn decoding_is_idempotent() {
        let t = table(full(), &["first", "second"]);
        let (a, _) = decode::<Sample>(&t).expect("decodes");
        let (b, _) = decode::<Sample>(&t).expect("decodes");
        assert_eq!(a, b);
    }

    #[test]
    fn short_structure_takes_fallbacks() {
        // ends right after the handle list
        let mut bytes = full();
        bytes.truncate(10);
        let t = table(bytes, &["first"]);
        let (rec, end) = decode::<Sample>(&t).expect("short structures are not an error");
        assert_eq!(end, 10);
        assert_eq!(rec.list, vec![9, 8]);
        assert_eq!(rec.c, 0xdead_beef);
        assert_eq!(rec.d, 0);
        assert_eq!(rec.label, "none");
    }

    #[test]
    fn empty_formatted_area_decodes_to_defaults() {
        let t = table(Vec::new(), &[]);
        let (rec, end) = decode::<Sample>(&t).expect("decodes");
        assert_eq!(end, 0);
        assert_eq!(rec.a, 0);
        assert_eq!(rec.name, "");
        assert_eq!(rec.c, 0xdead_beef);
    }

    #[test]
    fn field_straddling_the_end_is_an_error() {
        let mut bytes = full();
        bytes.truncate(3);
        let t = table(bytes, &[]);
        match decode::<Sample>(&t) {
            Err(Error::FieldOutOfBounds { type_name: "Sample", field: "B", offset: 2 }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn nested_record_must_be_complete() {
        let mut bytes = full();
        bytes.truncate(6);
        let t = table(bytes, &["first"]);
        match decode::<Sample>(&t) {
            Err(Error::FieldOutOfBounds { field: "Hi", offset: 6, .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn string_index_past_string_area() {
        let t = table(full(), &["only"]);
        match decode::<Sample>(&t) {
            Err(Error::StringIndex { field: "Label", index: 2, count: 1, .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}
