use std::borrow::Cow;
use std::fmt;

use serde::Serialize;

use crate::field::{decode_nested, Field, Schema, Structure};
use crate::table::TableHeader;
use crate::types::indexed;

/// System Information (type 1).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct System {
    pub header: TableHeader,
    pub manufacturer: String,
    pub product_name: String,
    pub version: String,
    pub serial_number: String,
    pub uuid: Uuid,
    pub wake_up_type: u8,
    pub sku_number: String,
    pub family: String,
}

/// The 16-byte system UUID. The first three fields are little-endian on
/// the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Uuid {
    pub time_low: u32,
    pub time_mid: u16,
    pub time_hi_and_version: u16,
    pub clock_seq_hi: u8,
    pub clock_seq_low: u8,
    pub node: [u8; 6],
}

const UUID_SCHEMA: &[Field<Uuid>] = &[
    Field::u32("TimeLow", |u, v| u.time_low = v),
    Field::u16("TimeMid", |u, v| u.time_mid = v),
    Field::u16("TimeHiAndVersion", |u, v| u.time_hi_and_version = v),
    Field::u8("ClockSeqHi", |u, v| u.clock_seq_hi = v),
    Field::u8("ClockSeqLow", |u, v| u.clock_seq_low = v),
    Field::custom("Node", |u, rd, off| {
        u.node.copy_from_slice(rd.bytes(off, 6)?);
        Ok(off + 6)
    }),
];

impl Schema for Uuid {
    fn schema() -> &'static [Field<Self>] {
        UUID_SCHEMA
    }
}

impl Uuid {
    fn octets(&self) -> impl Iterator<Item = u8> + '_ {
        self.time_low
            .to_le_bytes()
            .into_iter()
            .chain(self.time_mid.to_le_bytes())
            .chain(self.time_hi_and_version.to_le_bytes())
            .chain([self.clock_seq_hi, self.clock_seq_low])
            .chain(self.node)
    }

    /// Firmware marks an absent UUID with all ones.
    pub fn is_present(&self) -> bool {
        self.octets().any(|b| b != 0xFF)
    }

    /// All zeros: present but not yet set.
    pub fn is_settable(&self) -> bool {
        self.octets().any(|b| b != 0)
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_present() {
            return f.write_str("Not Present");
        }
        if !self.is_settable() {
            return f.write_str("Not Settable");
        }
        write!(
            f,
            "{:08X}-{:04X}-{:04X}-{:02X}{:02X}-",
            self.time_low, self.time_mid, self.time_hi_and_version, self.clock_seq_hi, self.clock_seq_low
        )?;
        for b in self.node {
            write!(f, "{:02X}", b)?;
        }
        Ok(())
    }
}

const SCHEMA: &[Field<System>] = &[
    Field::ignore("Header"),
    Field::string("Manufacturer", |r, v| r.manufacturer = v),
    Field::string("ProductName", |r, v| r.product_name = v),
    Field::string("Version", |r, v| r.version = v),
    Field::string("SerialNumber", |r, v| r.serial_number = v),
    // 2.1+
    Field::nested("UUID", |r, rd, off| {
        let (uuid, end) = decode_nested::<Uuid>(rd, off)?;
        r.uuid = uuid;
        Ok(end)
    }),
    Field::u8("WakeUpType", |r, v| r.wake_up_type = v),
    // 2.4+
    Field::string("SKUNumber", |r, v| r.sku_number = v),
    Field::string("Family", |r, v| r.family = v),
];

impl Schema for System {
    fn schema() -> &'static [Field<Self>] {
        SCHEMA
    }
}

impl Structure for System {
    const KIND: u8 = 1;
    const NAME: &'static str = "System Information";

    fn set_header(&mut self, header: TableHeader) {
        self.header = header;
    }
}

const WAKE_UP_TYPES: &[&str] = &[
    "Reserved",
    "Other",
    "Unknown",
    "APM Timer",
    "Modem Ring",
    "LAN Remote",
    "Power Switch",
    "PCI PME#",
    "AC Power Restored",
];

impl System {
    pub fn wake_up_type_name(&self) -> Cow<'static, str> {
        indexed(self.wake_up_type.into(), 0, WAKE_UP_TYPES)
    }
}

impl fmt::Display for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "System: {} {}", self.manufacturer, self.product_name)?;
        writeln!(f, "  Version: {}", self.version)?;
        writeln!(f, "  Serial Number: {}", self.serial_number)?;
        writeln!(f, "  UUID: {}", self.uuid)?;
        writeln!(f, "  Wake-up Type: {}", self.wake_up_type_name())?;
        writeln!(f, "  SKU Number: {}", self.sku_number)?;
        writeln!(f, "  Family: {}", self.family)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::field::decode;
    use crate::table::Table;
    use crate::testutil::Formatted;

    fn table(formatted: Vec<u8>) -> Table {
        let header = TableHeader { kind: 1, length: (formatted.len() + 4) as u8, handle: 1 };
        let strings = ["Dell Inc.", "PowerEdge R740", "", "ABC1234", "SKU=0715", "PowerEdge"];
        Table::new(header, formatted, strings.iter().map(|s| s.to_string()).collect())
    }

    fn full() -> Formatted {
        Formatted::default()
            .bytes(&[1, 2, 0, 4])
            .bytes(&[0x44, 0x45, 0x4C, 0x4C, 0x34, 0x00, 0x10, 0x4E, 0x80, 0x52, 0xB4, 0xC0, 0x4F, 0x42, 0x4D, 0x32])
            .u8(6)
            .u8(5)
            .u8(6)
    }

    #[test]
    fn decodes_full_structure() {
        let (system, end) = decode::<System>(&table(full().0)).expect("decodes");
        assert_eq!(end, 0x17);
        assert_eq!(system.manufacturer, "Dell Inc.");
        assert_eq!(system.product_name, "PowerEdge R740");
        assert_eq!(system.version, "");
        assert_eq!(system.serial_number, "ABC1234");
        assert_eq!(system.uuid.to_string(), "4C4C4544-0034-4E10-8052-B4C04F424D32");
        assert_eq!(system.wake_up_type_name(), "Power Switch");
        assert_eq!(system.sku_number, "SKU=0715");
        assert_eq!(system.family, "PowerEdge");
    }

    #[test]
    fn uuid_special_values() {
        let absent = Uuid {
            time_low: u32::MAX,
            time_mid: u16::MAX,
            time_hi_and_version: u16::MAX,
            clock_seq_hi: 0xFF,
            clock_seq_low: 0xFF,
            node: [0xFF; 6],
        };
        assert_eq!(absent.to_string(), "Not Present");
        assert_eq!(Uuid::default().to_string(), "Not Settable");
    }

    #[test]
    fn version_2_0_structure_has_no_uuid() {
        let mut bytes = full().0;
        bytes.truncate(4);
        let (system, end) = decode::<System>(&table(bytes)).expect("decodes");
        assert_eq!(end, 4);
        assert_eq!(system.uuid, Uuid::default());
        assert_eq!(system.family, "");
    }

    #[test]
    fn truncated_uuid_is_an_error() {
        let mut bytes = full().0;
        bytes.truncate(16);
        match decode::<System>(&table(bytes)) {
            Err(Error::FieldOutOfBounds { type_name: "System Information", field: "Node", offset: 14 }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}
