use std::borrow::Cow;
use std::fmt;

use serde::Serialize;

use crate::field::{Field, Schema, Structure};
use crate::table::TableHeader;
use crate::types::{flags, indexed};

/// Baseboard (or Module) Information (type 2).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Baseboard {
    pub header: TableHeader,
    pub manufacturer: String,
    pub product: String,
    pub version: String,
    pub serial_number: String,
    pub asset_tag: String,
    pub feature_flags: u8,
    pub location_in_chassis: String,
    pub chassis_handle: u16,
    pub board_type: u8,
    pub contained_object_handles: Vec<u16>,
}

const SCHEMA: &[Field<Baseboard>] = &[
    Field::ignore("Header"),
    Field::string("Manufacturer", |r, v| r.manufacturer = v),
    Field::string("Product", |r, v| r.product = v),
    Field::string("Version", |r, v| r.version = v),
    Field::string("SerialNumber", |r, v| r.serial_number = v),
    Field::string("AssetTag", |r, v| r.asset_tag = v),
    Field::u8("FeatureFlags", |r, v| r.feature_flags = v),
    Field::string("LocationInChassis", |r, v| r.location_in_chassis = v),
    Field::u16("ChassisHandle", |r, v| r.chassis_handle = v),
    Field::u8("BoardType", |r, v| r.board_type = v),
    Field::custom("ContainedObjectHandles", |r, rd, off| {
        let count = usize::from(rd.u8(off)?);
        r.contained_object_handles = (0..count).map(|i| rd.u16(off + 1 + 2 * i)).collect::<crate::Result<_>>()?;
        Ok(off + 1 + 2 * count)
    }),
];

impl Schema for Baseboard {
    fn schema() -> &'static [Field<Self>] {
        SCHEMA
    }
}

impl Structure for Baseboard {
    const KIND: u8 = 2;
    const NAME: &'static str = "Base Board Information";

    fn set_header(&mut self, header: TableHeader) {
        self.header = header;
    }
}

const FEATURES: &[&str] = &[
    "Board is a hosting board",
    "Board requires at least one daughter board",
    "Board is removable",
    "Board is replaceable",
    "Board is hot swappable",
];

const BOARD_TYPES: &[&str] = &[
    "Unknown",
    "Other",
    "Server Blade",
    "Connectivity Switch",
    "System Management Module",
    "Processor Module",
    "I/O Module",
    "Memory Module",
    "Daughter Board",
    "Motherboard",
    "Processor+Memory Module",
    "Processor+I/O Module",
    "Interconnect Board",
];

impl Baseboard {
    pub fn feature_names(&self) -> Vec<&'static str> {
        flags(self.feature_flags.into(), FEATURES)
    }

    pub fn board_type_name(&self) -> Cow<'static, str> {
        board_type(self.board_type)
    }
}

pub(crate) fn board_type(code: u8) -> Cow<'static, str> {
    indexed(code.into(), 1, BOARD_TYPES)
}

impl fmt::Display for Baseboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Base Board: {} {}", self.manufacturer, self.product)?;
        writeln!(f, "  Version: {}", self.version)?;
        writeln!(f, "  Serial Number: {}", self.serial_number)?;
        writeln!(f, "  Asset Tag: {}", self.asset_tag)?;
        writeln!(f, "  Type: {}", self.board_type_name())?;
        writeln!(f, "  Location In Chassis: {}", self.location_in_chassis)?;
        writeln!(f, "  Chassis Handle: {:#06x}", self.chassis_handle)?;
        for name in self.feature_names() {
            writeln!(f, "  {}", name)?;
        }
        for handle in &self.contained_object_handles {
            writeln!(f, "  Contains: {:#06x}", handle)?;
        }
        Ok(())
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
        let header = TableHeader { kind: 2, length: (formatted.len() + 4) as u8, handle: 2 };
        let strings = ["ASUSTeK COMPUTER INC.", "PRIME X570-PRO", "Rev X.0x", "190456789012345", "Default string", "Default string"];
        Table::new(header, formatted, strings.iter().map(|s| s.to_string()).collect())
    }

    fn base() -> Formatted {
        Formatted::default().bytes(&[1, 2, 3, 4, 5]).u8(0x09).u8(6).u16(0x0003).u8(0x0A)
    }

    #[test]
    fn decodes_contained_handles() {
        let bytes = base().u8(2).u16(0x0020).u16(0x0021).0;
        let (board, end) = decode::<Baseboard>(&table(bytes)).expect("decodes");
        assert_eq!(end, 0x0F);
        assert_eq!(board.manufacturer, "ASUSTeK COMPUTER INC.");
        assert_eq!(board.product, "PRIME X570-PRO");
        assert_eq!(board.location_in_chassis, "Default string");
        assert_eq!(board.chassis_handle, 3);
        assert_eq!(board.board_type_name(), "Motherboard");
        assert_eq!(board.feature_names(), vec!["Board is a hosting board", "Board is replaceable"]);
        assert_eq!(board.contained_object_handles, vec![0x20, 0x21]);
    }

    #[test]
    fn minimal_structure_takes_defaults() {
        let bytes = Formatted::default().bytes(&[1, 2, 3, 4]).0;
        let (board, _) = decode::<Baseboard>(&table(bytes)).expect("decodes");
        assert_eq!(board.serial_number, "190456789012345");
        assert_eq!(board.asset_tag, "");
        assert!(board.contained_object_handles.is_empty());
        assert_eq!(board.board_type_name(), "0x00");
    }

    #[test]
    fn handle_count_past_the_end_fails() {
        let bytes = base().u8(3).u16(0x0020).0;
        match decode::<Baseboard>(&table(bytes)) {
            Err(Error::FieldOutOfBounds { field: "ContainedObjectHandles", .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}
