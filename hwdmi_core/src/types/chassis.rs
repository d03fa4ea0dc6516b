use std::borrow::Cow;
use std::fmt;

use serde::Serialize;

use crate::field::{Field, Schema, Structure};
use crate::table::TableHeader;
use crate::types::baseboard::board_type;
use crate::types::indexed;

/// System Enclosure or Chassis (type 3).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Chassis {
    pub header: TableHeader,
    pub manufacturer: String,
    /// Bit 7 is the lock flag, bits 6:0 the enclosure type.
    pub chassis_type: u8,
    pub version: String,
    pub serial_number: String,
    pub asset_tag: String,
    pub boot_up_state: u8,
    pub power_supply_state: u8,
    pub thermal_state: u8,
    pub security_status: u8,
    pub oem_defined: u32,
    pub height: u8,
    pub power_cords: u8,
    pub contained_elements: Vec<ContainedElement>,
    pub sku_number: String,
}

/// One entry of the contained element list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContainedElement {
    /// Bit 7 set: bits 6:0 are a structure type. Clear: a baseboard type.
    pub element_type: u8,
    pub minimum: u8,
    pub maximum: u8,
}

impl fmt::Display for ContainedElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.element_type & 0x80 != 0 {
            write!(f, "structure type {}", self.element_type & 0x7F)?;
        } else {
            write!(f, "{}", board_type(self.element_type))?;
        }
        if self.minimum == self.maximum {
            write!(f, " ({})", self.minimum)
        } else {
            write!(f, " ({}-{})", self.minimum, self.maximum)
        }
    }
}

const SCHEMA: &[Field<Chassis>] = &[
    Field::ignore("Header"),
    Field::string("Manufacturer", |r, v| r.manufacturer = v),
    Field::u8("Type", |r, v| r.chassis_type = v),
    Field::string("Version", |r, v| r.version = v),
    Field::string("SerialNumber", |r, v| r.serial_number = v),
    Field::string("AssetTag", |r, v| r.asset_tag = v),
    // 2.1+
    Field::u8("BootUpState", |r, v| r.boot_up_state = v),
    Field::u8("PowerSupplyState", |r, v| r.power_supply_state = v),
    Field::u8("ThermalState", |r, v| r.thermal_state = v),
    Field::u8("SecurityStatus", |r, v| r.security_status = v),
    // 2.3+
    Field::u32("OEMDefined", |r, v| r.oem_defined = v),
    Field::u8("Height", |r, v| r.height = v),
    Field::u8("NumberOfPowerCords", |r, v| r.power_cords = v),
    Field::custom("ContainedElements", |r, rd, off| {
        let count = usize::from(rd.u8(off)?);
        let record_len = usize::from(rd.u8(off + 1)?);
        let list = rd.bytes(off + 2, count * record_len)?;
        r.contained_elements = list
            .chunks_exact(record_len.max(1))
            .take(count)
            .map(|e| ContainedElement {
                element_type: e.first().copied().unwrap_or_default(),
                minimum: e.get(1).copied().unwrap_or_default(),
                maximum: e.get(2).copied().unwrap_or_default(),
            })
            .collect();
        Ok(off + 2 + count * record_len)
    }),
    // 2.7+
    Field::string("SKUNumber", |r, v| r.sku_number = v),
];

impl Schema for Chassis {
    fn schema() -> &'static [Field<Self>] {
        SCHEMA
    }
}

impl Structure for Chassis {
    const KIND: u8 = 3;
    const NAME: &'static str = "Chassis Information";

    fn set_header(&mut self, header: TableHeader) {
        self.header = header;
    }
}

const TYPES: &[&str] = &[
    "Other",
    "Unknown",
    "Desktop",
    "Low Profile Desktop",
    "Pizza Box",
    "Mini Tower",
    "Tower",
    "Portable",
    "Laptop",
    "Notebook",
    "Hand Held",
    "Docking Station",
    "All In One",
    "Sub Notebook",
    "Space-saving",
    "Lunch Box",
    "Main Server Chassis",
    "Expansion Chassis",
    "Sub Chassis",
    "Bus Expansion Chassis",
    "Peripheral Chassis",
    "RAID Chassis",
    "Rack Mount Chassis",
    "Sealed-case PC",
    "Multi-system",
    "CompactPCI",
    "AdvancedTCA",
    "Blade",
    "Blade Enclosing",
    "Tablet",
    "Convertible",
    "Detachable",
    "IoT Gateway",
    "Embedded PC",
    "Mini PC",
    "Stick PC",
];

const STATES: &[&str] = &["Other", "Unknown", "Safe", "Warning", "Critical", "Non-recoverable"];

const SECURITY: &[&str] = &["Other", "Unknown", "None", "External Interface Locked Out", "External Interface Enabled"];

impl Chassis {
    pub fn type_name(&self) -> Cow<'static, str> {
        indexed((self.chassis_type & 0x7F).into(), 1, TYPES)
    }

    pub fn lock_present(&self) -> bool {
        self.chassis_type & 0x80 != 0
    }

    pub fn boot_up_state_name(&self) -> Cow<'static, str> {
        indexed(self.boot_up_state.into(), 1, STATES)
    }

    pub fn power_supply_state_name(&self) -> Cow<'static, str> {
        indexed(self.power_supply_state.into(), 1, STATES)
    }

    pub fn thermal_state_name(&self) -> Cow<'static, str> {
        indexed(self.thermal_state.into(), 1, STATES)
    }

    pub fn security_status_name(&self) -> Cow<'static, str> {
        indexed(self.security_status.into(), 1, SECURITY)
    }

    /// Enclosure height in rack units.
    pub fn height_string(&self) -> String {
        match self.height {
            0 => "Unspecified".to_string(),
            u => format!("{} U", u),
        }
    }
}

impl fmt::Display for Chassis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Chassis: {} {}", self.manufacturer, self.type_name())?;
        writeln!(f, "  Lock: {}", if self.lock_present() { "Present" } else { "Not Present" })?;
        writeln!(f, "  Version: {}", self.version)?;
        writeln!(f, "  Serial Number: {}", self.serial_number)?;
        writeln!(f, "  Asset Tag: {}", self.asset_tag)?;
        writeln!(f, "  Boot-up State: {}", self.boot_up_state_name())?;
        writeln!(f, "  Power Supply State: {}", self.power_supply_state_name())?;
        writeln!(f, "  Thermal State: {}", self.thermal_state_name())?;
        writeln!(f, "  Security Status: {}", self.security_status_name())?;
        writeln!(f, "  Height: {}", self.height_string())?;
        writeln!(f, "  Power Cords: {}", self.power_cords)?;
        for element in &self.contained_elements {
            writeln!(f, "  Contains: {}", element)?;
        }
        writeln!(f, "  SKU Number: {}", self.sku_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::decode;
    use crate::table::Table;
    use crate::testutil::Formatted;

    fn table(formatted: Vec<u8>) -> Table {
        let header = TableHeader { kind: 3, length: (formatted.len() + 4) as u8, handle: 3 };
        let strings = ["Supermicro", "0123456789", "C8260LB03M01234", "Default string", "SKU-R2U"];
        Table::new(header, formatted, strings.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn decodes_rack_chassis_with_elements() {
        let bytes = Formatted::default()
            .u8(1)
            .u8(0x97)
            .bytes(&[2, 3, 4])
            .bytes(&[3, 3, 3, 3])
            .u32(0)
            .u8(2)
            .u8(2)
            .u8(2)
            .u8(3)
            .bytes(&[0x91, 1, 2, 0x0A, 1, 1])
            .u8(5)
            .0;
        let (chassis, end) = decode::<Chassis>(&table(bytes)).expect("decodes");
        assert_eq!(end, 0x18);
        assert_eq!(chassis.type_name(), "Rack Mount Chassis");
        assert!(chassis.lock_present());
        assert_eq!(chassis.boot_up_state_name(), "Safe");
        assert_eq!(chassis.security_status_name(), "None");
        assert_eq!(chassis.height_string(), "2 U");
        assert_eq!(chassis.power_cords, 2);
        assert_eq!(
            chassis.contained_elements,
            vec![
                ContainedElement { element_type: 0x91, minimum: 1, maximum: 2 },
                ContainedElement { element_type: 0x0A, minimum: 1, maximum: 1 },
            ]
        );
        assert_eq!(chassis.contained_elements[0].to_string(), "structure type 17 (1-2)");
        assert_eq!(chassis.contained_elements[1].to_string(), "Motherboard (1)");
        assert_eq!(chassis.sku_number, "SKU-R2U");
    }

    #[test]
    fn version_2_0_chassis() {
        let bytes = Formatted::default().u8(1).u8(0x03).bytes(&[0, 0, 0]).0;
        let (chassis, _) = decode::<Chassis>(&table(bytes)).expect("decodes");
        assert_eq!(chassis.type_name(), "Desktop");
        assert!(!chassis.lock_present());
        assert_eq!(chassis.height_string(), "Unspecified");
        assert_eq!(chassis.thermal_state_name(), "0x00");
        assert!(chassis.contained_elements.is_empty());
    }
}
