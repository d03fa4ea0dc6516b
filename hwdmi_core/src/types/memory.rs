use std::borrow::Cow;
use std::fmt;

use serde::Serialize;

use crate::field::{Field, Schema, Structure};
use crate::table::TableHeader;
use crate::types::{flags, format_size, indexed};

/// Memory Device (type 17).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemoryDevice {
    pub header: TableHeader,
    pub physical_memory_array_handle: u16,
    pub error_information_handle: u16,
    /// Bits; `0xFFFF` when unknown.
    pub total_width: u16,
    pub data_width: u16,
    pub size: u16,
    pub form_factor: u8,
    pub device_set: u8,
    pub device_locator: String,
    pub bank_locator: String,
    pub memory_type: u8,
    pub type_detail: u16,
    /// MT/s; `0xFFFF` defers to `extended_speed`.
    pub speed: u16,
    pub manufacturer: String,
    pub serial_number: String,
    pub asset_tag: String,
    pub part_number: String,
    pub attributes: u8,
    /// MiB in bits 30:0, used when `size` is `0x7FFF`.
    pub extended_size: u32,
    pub configured_memory_speed: u16,
    /// Millivolts, zero when unknown.
    pub minimum_voltage: u16,
    pub maximum_voltage: u16,
    pub configured_voltage: u16,
    pub memory_technology: u8,
    pub operating_mode_capability: u16,
    pub firmware_version: String,
    pub module_manufacturer_id: u16,
    pub module_product_id: u16,
    pub subsystem_controller_manufacturer_id: u16,
    pub subsystem_controller_product_id: u16,
    pub non_volatile_size: u64,
    pub volatile_size: u64,
    pub cache_size: u64,
    pub logical_size: u64,
    pub extended_speed: u32,
    pub extended_configured_speed: u32,
    pub pmic0_manufacturer_id: u16,
    pub pmic0_revision: u16,
    pub rcd_manufacturer_id: u16,
    pub rcd_revision: u16,
}

const SCHEMA: &[Field<MemoryDevice>] = &[
    Field::ignore("Header"),
    Field::u16("PhysicalMemoryArrayHandle", |r, v| r.physical_memory_array_handle = v),
    Field::u16("MemoryErrorInformationHandle", |r, v| r.error_information_handle = v),
    Field::u16("TotalWidth", |r, v| r.total_width = v),
    Field::u16("DataWidth", |r, v| r.data_width = v),
    Field::u16("Size", |r, v| r.size = v),
    Field::u8("FormFactor", |r, v| r.form_factor = v),
    Field::u8("DeviceSet", |r, v| r.device_set = v),
    Field::string("DeviceLocator", |r, v| r.device_locator = v),
    Field::string("BankLocator", |r, v| r.bank_locator = v),
    Field::u8("MemoryType", |r, v| r.memory_type = v),
    Field::u16("TypeDetail", |r, v| r.type_detail = v),
    // 2.3+
    Field::u16("Speed", |r, v| r.speed = v),
    Field::string("Manufacturer", |r, v| r.manufacturer = v),
    Field::string("SerialNumber", |r, v| r.serial_number = v),
    Field::string("AssetTag", |r, v| r.asset_tag = v),
    Field::string("PartNumber", |r, v| r.part_number = v),
    // 2.6+
    Field::u8("Attributes", |r, v| r.attributes = v),
    // 2.7+
    Field::u32("ExtendedSize", |r, v| r.extended_size = v),
    Field::u16("ConfiguredMemorySpeed", |r, v| r.configured_memory_speed = v),
    // 2.8+
    Field::u16("MinimumVoltage", |r, v| r.minimum_voltage = v),
    Field::u16("MaximumVoltage", |r, v| r.maximum_voltage = v),
    Field::u16("ConfiguredVoltage", |r, v| r.configured_voltage = v),
    // 3.2+
    Field::u8("MemoryTechnology", |r, v| r.memory_technology = v),
    Field::u16("MemoryOperatingModeCapability", |r, v| r.operating_mode_capability = v),
    Field::string("FirmwareVersion", |r, v| r.firmware_version = v),
    Field::u16("ModuleManufacturerID", |r, v| r.module_manufacturer_id = v),
    Field::u16("ModuleProductID", |r, v| r.module_product_id = v),
    Field::u16("MemorySubsystemControllerManufacturerID", |r, v| r.subsystem_controller_manufacturer_id = v),
    Field::u16("MemorySubsystemControllerProductID", |r, v| r.subsystem_controller_product_id = v),
    Field::u64("NonVolatileSize", |r, v| r.non_volatile_size = v),
    Field::u64("VolatileSize", |r, v| r.volatile_size = v),
    Field::u64("CacheSize", |r, v| r.cache_size = v),
    Field::u64("LogicalSize", |r, v| r.logical_size = v),
    // 3.3+
    Field::u32("ExtendedSpeed", |r, v| r.extended_speed = v),
    Field::u32("ExtendedConfiguredMemorySpeed", |r, v| r.extended_configured_speed = v),
    // 3.7+
    Field::u16("PMIC0ManufacturerID", |r, v| r.pmic0_manufacturer_id = v),
    Field::u16("PMIC0RevisionNumber", |r, v| r.pmic0_revision = v),
    Field::u16("RCDManufacturerID", |r, v| r.rcd_manufacturer_id = v),
    Field::u16("RCDRevisionNumber", |r, v| r.rcd_revision = v),
];

impl Schema for MemoryDevice {
    fn schema() -> &'static [Field<Self>] {
        SCHEMA
    }
}

impl Structure for MemoryDevice {
    const KIND: u8 = 17;
    const NAME: &'static str = "Memory Device";

    fn set_header(&mut self, header: TableHeader) {
        self.header = header;
    }
}

/// Installed capacity of a memory device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MemorySize {
    NotInstalled,
    Unknown,
    Bytes(u64),
}

impl fmt::Display for MemorySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MemorySize::NotInstalled => f.write_str("No Module Installed"),
            MemorySize::Unknown => f.write_str("Unknown"),
            MemorySize::Bytes(b) => f.write_str(&format_size(b)),
        }
    }
}

const FORM_FACTORS: &[&str] = &[
    "Other",
    "Unknown",
    "SIMM",
    "SIP",
    "Chip",
    "DIP",
    "ZIP",
    "Proprietary Card",
    "DIMM",
    "TSOP",
    "Row Of Chips",
    "RIMM",
    "SODIMM",
    "SRIMM",
    "FB-DIMM",
    "Die",
    "CAMM",
];

const TYPES: &[&str] = &[
    "Other",
    "Unknown",
    "DRAM",
    "EDRAM",
    "VRAM",
    "SRAM",
    "RAM",
    "ROM",
    "Flash",
    "EEPROM",
    "FEPROM",
    "EPROM",
    "CDRAM",
    "3DRAM",
    "SDRAM",
    "SGRAM",
    "RDRAM",
    "DDR",
    "DDR2",
    "DDR2 FB-DIMM",
    "Reserved",
    "Reserved",
    "Reserved",
    "DDR3",
    "FBD2",
    "DDR4",
    "LPDDR",
    "LPDDR2",
    "LPDDR3",
    "LPDDR4",
    "Logical non-volatile device",
    "HBM",
    "HBM2",
    "DDR5",
    "LPDDR5",
    "HBM3",
];

const TYPE_DETAILS: &[&str] = &[
    "",
    "Other",
    "Unknown",
    "Fast-paged",
    "Static Column",
    "Pseudo-static",
    "RAMBus",
    "Synchronous",
    "CMOS",
    "EDO",
    "Window DRAM",
    "Cache DRAM",
    "Non-Volatile",
    "Registered (Buffered)",
    "Unbuffered (Unregistered)",
    "LRDIMM",
];

const TECHNOLOGIES: &[&str] = &[
    "Other",
    "Unknown",
    "DRAM",
    "NVDIMM-N",
    "NVDIMM-F",
    "NVDIMM-P",
    "Intel Optane persistent memory",
];

/// Speed in MT/s; `None` when unknown.
fn speed(short: u16, extended: u32) -> Option<u32> {
    match short {
        0 => None,
        0xFFFF => Some(extended & 0x7FFF_FFFF).filter(|s| *s != 0),
        s => Some(u32::from(s)),
    }
}

fn voltage_string(millivolts: u16) -> String {
    let volts = f64::from(millivolts) / 1000.0;
    match millivolts {
        0 => "Unknown".to_string(),
        mv if mv % 100 == 0 => format!("{:.1} V", volts),
        _ => format!("{:.3} V", volts),
    }
}

impl MemoryDevice {
    pub fn size(&self) -> MemorySize {
        match self.size {
            0 => MemorySize::NotInstalled,
            0xFFFF => MemorySize::Unknown,
            0x7FFF => MemorySize::Bytes(u64::from(self.extended_size & 0x7FFF_FFFF) << 20),
            s if s & 0x8000 != 0 => MemorySize::Bytes(u64::from(s & 0x7FFF) << 10),
            s => MemorySize::Bytes(u64::from(s) << 20),
        }
    }

    pub fn is_installed(&self) -> bool {
        self.size != 0
    }

    pub fn speed(&self) -> Option<u32> {
        speed(self.speed, self.extended_speed)
    }

    pub fn configured_speed(&self) -> Option<u32> {
        speed(self.configured_memory_speed, self.extended_configured_speed)
    }

    pub fn form_factor_name(&self) -> Cow<'static, str> {
        indexed(self.form_factor.into(), 1, FORM_FACTORS)
    }

    pub fn type_name(&self) -> Cow<'static, str> {
        indexed(self.memory_type.into(), 1, TYPES)
    }

    pub fn type_detail_names(&self) -> Vec<&'static str> {
        flags(self.type_detail.into(), TYPE_DETAILS)
    }

    pub fn technology_name(&self) -> Cow<'static, str> {
        indexed(self.memory_technology.into(), 1, TECHNOLOGIES)
    }

    /// Rank from the low nibble of the attributes; `None` when unknown.
    pub fn rank(&self) -> Option<u8> {
        Some(self.attributes & 0x0F).filter(|r| *r != 0)
    }

    pub fn width_string(width: u16) -> String {
        match width {
            0xFFFF | 0 => "Unknown".to_string(),
            w => format!("{} bits", w),
        }
    }

    pub fn configured_voltage_string(&self) -> String {
        voltage_string(self.configured_voltage)
    }

    pub fn minimum_voltage_string(&self) -> String {
        voltage_string(self.minimum_voltage)
    }

    pub fn maximum_voltage_string(&self) -> String {
        voltage_string(self.maximum_voltage)
    }
}

impl fmt::Display for MemoryDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Memory Device: {} {}", self.device_locator, self.bank_locator)?;
        writeln!(f, "  Size: {}", self.size())?;
        if !self.is_installed() {
            return Ok(());
        }
        writeln!(f, "  Form Factor: {}", self.form_factor_name())?;
        writeln!(f, "  Type: {}", self.type_name())?;
        writeln!(f, "  Type Detail: {}", self.type_detail_names().join(" "))?;
        writeln!(f, "  Total Width: {}", Self::width_string(self.total_width))?;
        writeln!(f, "  Data Width: {}", Self::width_string(self.data_width))?;
        match self.speed() {
            Some(s) => writeln!(f, "  Speed: {} MT/s", s)?,
            None => writeln!(f, "  Speed: Unknown")?,
        }
        match self.configured_speed() {
            Some(s) => writeln!(f, "  Configured Memory Speed: {} MT/s", s)?,
            None => writeln!(f, "  Configured Memory Speed: Unknown")?,
        }
        writeln!(f, "  Manufacturer: {}", self.manufacturer)?;
        writeln!(f, "  Serial Number: {}", self.serial_number)?;
        writeln!(f, "  Part Number: {}", self.part_number)?;
        match self.rank() {
            Some(r) => writeln!(f, "  Rank: {}", r)?,
            None => writeln!(f, "  Rank: Unknown")?,
        }
        writeln!(f, "  Configured Voltage: {}", self.configured_voltage_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::decode;
    use crate::table::Table;
    use crate::testutil::Formatted;

    fn table(formatted: Vec<u8>) -> Table {
        let header = TableHeader { kind: 17, length: (formatted.len() + 4) as u8, handle: 0x1100 };
        let strings = ["DIMM_A1", "BANK 0", "Samsung", "12345678", "A1_AssetTag", "M393A4K40DB3-CWE"];
        Table::new(header, formatted, strings.iter().map(|s| s.to_string()).collect())
    }

    fn dimm(size: u16, extended_size: u32) -> Formatted {
        Formatted::default()
            .u16(0x1000)
            .u16(0xFFFE)
            .u16(72)
            .u16(64)
            .u16(size)
            .u8(0x09)
            .u8(0)
            .u8(1)
            .u8(2)
            .u8(0x1A)
            .u16(0x2080)
            .u16(3200)
            .bytes(&[3, 4, 5, 6])
            .u8(0x02)
            .u32(extended_size)
            .u16(2933)
            .u16(1200)
            .u16(1200)
            .u16(1200)
    }

    #[test]
    fn decodes_ddr4_rdimm() {
        let (dev, end) = decode::<MemoryDevice>(&table(dimm(0x4000, 0).0)).expect("decodes");
        assert_eq!(end, 0x24);
        assert_eq!(dev.device_locator, "DIMM_A1");
        assert_eq!(dev.bank_locator, "BANK 0");
        assert_eq!(dev.form_factor_name(), "DIMM");
        assert_eq!(dev.type_name(), "DDR4");
        assert_eq!(dev.type_detail_names(), vec!["Synchronous", "Registered (Buffered)"]);
        assert_eq!(dev.speed(), Some(3200));
        assert_eq!(dev.configured_speed(), Some(2933));
        assert_eq!(dev.rank(), Some(2));
        assert_eq!(dev.configured_voltage_string(), "1.2 V");
        assert_eq!(dev.part_number, "M393A4K40DB3-CWE");
        assert_eq!(MemoryDevice::width_string(dev.total_width), "72 bits");
    }

    #[test]
    fn size_encodings() {
        let sized = |size, extended_size| MemoryDevice { size, extended_size, ..MemoryDevice::default() };
        assert_eq!(sized(0, 0).size(), MemorySize::NotInstalled);
        assert_eq!(sized(0xFFFF, 0).size(), MemorySize::Unknown);
        assert_eq!(sized(0x4000, 0).size().to_string(), "16 GB");
        assert_eq!(sized(0x8200, 0).size().to_string(), "512 kB");
        assert_eq!(sized(0x7FFF, 0x0002_0000).size().to_string(), "128 GB");
    }

    #[test]
    fn extended_size_reaches_terabytes() {
        let (dev, _) = decode::<MemoryDevice>(&table(dimm(0x7FFF, 0x0020_0000).0)).expect("decodes");
        assert_eq!(dev.size(), MemorySize::Bytes(2 << 40));
        assert_eq!(dev.size().to_string(), "2 TB");
    }

    #[test]
    fn speeds_defer_to_extended_fields() {
        let dev = MemoryDevice { speed: 0xFFFF, extended_speed: 70_000, configured_memory_speed: 0, ..MemoryDevice::default() };
        assert_eq!(dev.speed(), Some(70_000));
        assert_eq!(dev.configured_speed(), None);
        assert_eq!(dev.rank(), None);
        assert_eq!(dev.configured_voltage_string(), "Unknown");
        assert_eq!(voltage_string(1250), "1.250 V");
    }

    #[test]
    fn empty_slot_stops_after_size() {
        let (dev, _) = decode::<MemoryDevice>(&table(dimm(0, 0).0)).expect("decodes");
        assert!(!dev.is_installed());
        assert_eq!(dev.to_string(), "Memory Device: DIMM_A1 BANK 0\n  Size: No Module Installed\n");
    }
}
