use std::borrow::Cow;
use std::fmt;

use serde::Serialize;

use crate::field::{Field, Schema, Structure};
use crate::table::TableHeader;
use crate::types::{flags, indexed, paired};

/// Processor Information (type 4).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Processor {
    pub header: TableHeader,
    pub socket_designation: String,
    pub processor_type: u8,
    /// `0xFE` defers to `family2`.
    pub family: u8,
    pub manufacturer: String,
    /// Raw processor ID; on x86 the low half is the CPUID leaf 1 EAX.
    pub id: u64,
    pub version: String,
    pub voltage: u8,
    /// MHz; zero when unknown.
    pub external_clock: u16,
    pub max_speed: u16,
    pub current_speed: u16,
    pub status: u8,
    pub upgrade: u8,
    pub l1_cache_handle: u16,
    pub l2_cache_handle: u16,
    pub l3_cache_handle: u16,
    pub serial_number: String,
    pub asset_tag: String,
    pub part_number: String,
    pub core_count_byte: u8,
    pub core_enabled_byte: u8,
    pub thread_count_byte: u8,
    pub characteristics: u16,
    pub family2: u16,
    pub core_count2: u16,
    pub core_enabled2: u16,
    pub thread_count2: u16,
    pub thread_enabled: u16,
    pub socket_type: String,
}

const SCHEMA: &[Field<Processor>] = &[
    Field::ignore("Header"),
    Field::string("SocketDesignation", |r, v| r.socket_designation = v),
    Field::u8("ProcessorType", |r, v| r.processor_type = v),
    Field::u8("ProcessorFamily", |r, v| r.family = v),
    Field::string("ProcessorManufacturer", |r, v| r.manufacturer = v),
    Field::u64("ProcessorID", |r, v| r.id = v),
    Field::string("ProcessorVersion", |r, v| r.version = v),
    Field::u8("Voltage", |r, v| r.voltage = v),
    Field::u16("ExternalClock", |r, v| r.external_clock = v),
    Field::u16("MaxSpeed", |r, v| r.max_speed = v),
    Field::u16("CurrentSpeed", |r, v| r.current_speed = v),
    Field::u8("Status", |r, v| r.status = v),
    Field::u8("ProcessorUpgrade", |r, v| r.upgrade = v),
    // 2.1+
    Field::<Processor>::u16("L1CacheHandle", |r, v| r.l1_cache_handle = v).or(0xFFFF),
    Field::<Processor>::u16("L2CacheHandle", |r, v| r.l2_cache_handle = v).or(0xFFFF),
    Field::<Processor>::u16("L3CacheHandle", |r, v| r.l3_cache_handle = v).or(0xFFFF),
    // 2.3+
    Field::string("SerialNumber", |r, v| r.serial_number = v),
    Field::string("AssetTag", |r, v| r.asset_tag = v),
    Field::string("PartNumber", |r, v| r.part_number = v),
    // 2.5+
    Field::u8("CoreCount", |r, v| r.core_count_byte = v),
    Field::u8("CoreEnabled", |r, v| r.core_enabled_byte = v),
    Field::u8("ThreadCount", |r, v| r.thread_count_byte = v),
    Field::u16("ProcessorCharacteristics", |r, v| r.characteristics = v),
    // 2.6+
    Field::u16("ProcessorFamily2", |r, v| r.family2 = v),
    // 3.0+
    Field::u16("CoreCount2", |r, v| r.core_count2 = v),
    Field::u16("CoreEnabled2", |r, v| r.core_enabled2 = v),
    Field::u16("ThreadCount2", |r, v| r.thread_count2 = v),
    // 3.6+
    Field::u16("ThreadEnabled", |r, v| r.thread_enabled = v),
    // 3.8+
    Field::string("SocketType", |r, v| r.socket_type = v),
];

impl Schema for Processor {
    fn schema() -> &'static [Field<Self>] {
        SCHEMA
    }
}

impl Structure for Processor {
    const KIND: u8 = 4;
    const NAME: &'static str = "Processor Information";

    fn set_header(&mut self, header: TableHeader) {
        self.header = header;
    }
}

/// Decoded voltage byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Voltage {
    /// Current voltage in tenths of a volt.
    Current(u8),
    /// Legacy mode: the voltages the socket supports.
    Supported { v5_0: bool, v3_3: bool, v2_9: bool },
}

impl fmt::Display for Voltage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Voltage::Current(dv) => write!(f, "{}.{} V", dv / 10, dv % 10),
            Voltage::Supported { v5_0, v3_3, v2_9 } => {
                let supported: Vec<&str> = [(v5_0, "5.0 V"), (v3_3, "3.3 V"), (v2_9, "2.9 V")]
                    .into_iter()
                    .filter_map(|(set, name)| set.then_some(name))
                    .collect();
                if supported.is_empty() {
                    f.write_str("Unknown")
                } else {
                    f.write_str(&supported.join(" "))
                }
            }
        }
    }
}

const TYPES: &[&str] = &["Other", "Unknown", "Central Processor", "Math Processor", "DSP Processor", "Video Processor"];

const STATUS: &[&str] = &[
    "Unknown",
    "Enabled",
    "Disabled By User",
    "Disabled By BIOS",
    "Idle",
    "Reserved",
    "Reserved",
    "Other",
];

const CHARACTERISTICS: &[&str] = &[
    "",
    "Unknown",
    "64-bit capable",
    "Multi-Core",
    "Hardware Thread",
    "Execute Protection",
    "Enhanced Virtualization",
    "Power/Performance Control",
    "128-bit Capable",
    "Arm64 SoC ID",
];

const FAMILIES: &[(u16, &str)] = &[
    (0x01, "Other"),
    (0x02, "Unknown"),
    (0x03, "8086"),
    (0x04, "80286"),
    (0x05, "80386"),
    (0x06, "80486"),
    (0x07, "8087"),
    (0x08, "80287"),
    (0x09, "80387"),
    (0x0A, "80487"),
    (0x0B, "Pentium"),
    (0x0C, "Pentium Pro"),
    (0x0D, "Pentium II"),
    (0x0E, "Pentium MMX"),
    (0x0F, "Celeron"),
    (0x10, "Pentium II Xeon"),
    (0x11, "Pentium III"),
    (0x12, "M1"),
    (0x13, "M2"),
    (0x14, "Celeron M"),
    (0x15, "Pentium 4 HT"),
    (0x18, "Duron"),
    (0x19, "K5"),
    (0x1A, "K6"),
    (0x1B, "K6-2"),
    (0x1C, "K6-3"),
    (0x1D, "Athlon"),
    (0x1E, "AMD29000"),
    (0x1F, "K6-2+"),
    (0x28, "Core Duo"),
    (0x29, "Core Duo Mobile"),
    (0x2A, "Core Solo Mobile"),
    (0x2B, "Atom"),
    (0x2C, "Core M"),
    (0x2D, "Core m3"),
    (0x2E, "Core m5"),
    (0x2F, "Core m7"),
    (0x6B, "Zen"),
    (0x83, "Athlon 64"),
    (0x84, "Opteron"),
    (0x85, "Sempron"),
    (0x86, "Turion 64"),
    (0x87, "Dual-Core Opteron"),
    (0x88, "Athlon 64 X2"),
    (0x8A, "Phenom FX"),
    (0x8B, "Phenom X4"),
    (0xB3, "Xeon"),
    (0xB5, "Pentium M"),
    (0xBF, "Core 2 Duo"),
    (0xC0, "Core 2 Solo"),
    (0xC1, "Core 2 Extreme"),
    (0xC2, "Core 2 Quad"),
    (0xC6, "Core i7"),
    (0xC7, "Dual-Core Celeron"),
    (0xCD, "Core i5"),
    (0xCE, "Core i3"),
    (0xCF, "Core i9"),
    (0xFA, "i860"),
    (0xFB, "i960"),
    (0x100, "ARMv7"),
    (0x101, "ARMv8"),
    (0x102, "ARMv9"),
    (0x104, "SH-3"),
    (0x105, "SH-4"),
    (0x118, "ARM"),
    (0x119, "StrongARM"),
    (0x12C, "6x86"),
    (0x12D, "MediaGX"),
    (0x12E, "MII"),
    (0x140, "WinChip"),
    (0x15E, "DSP"),
    (0x1F4, "Video Processor"),
    (0x200, "RV32"),
    (0x201, "RV64"),
    (0x202, "RV128"),
    (0x258, "LoongArch"),
];

const UPGRADES: &[&str] = &[
    "Other",
    "Unknown",
    "Daughter Board",
    "ZIF Socket",
    "Replaceable Piggy Back",
    "None",
    "LIF Socket",
    "Slot 1",
    "Slot 2",
    "370-pin Socket",
    "Slot A",
    "Slot M",
    "Socket 423",
    "Socket A (Socket 462)",
    "Socket 478",
    "Socket 754",
    "Socket 940",
    "Socket 939",
    "Socket mPGA604",
    "Socket LGA771",
    "Socket LGA775",
    "Socket S1",
    "Socket AM2",
    "Socket F (1207)",
    "Socket LGA1366",
    "Socket G34",
    "Socket AM3",
    "Socket C32",
    "Socket LGA1156",
    "Socket LGA1567",
    "Socket PGA988A",
    "Socket BGA1288",
    "Socket rPGA988B",
    "Socket BGA1023",
    "Socket BGA1224",
    "Socket LGA1155",
    "Socket LGA1356",
    "Socket LGA2011",
    "Socket FS1",
    "Socket FS2",
    "Socket FM1",
    "Socket FM2",
    "Socket LGA2011-3",
    "Socket LGA1356-3",
    "Socket LGA1150",
    "Socket BGA1168",
    "Socket BGA1234",
    "Socket BGA1364",
    "Socket AM4",
    "Socket LGA1151",
    "Socket BGA1356",
    "Socket BGA1440",
    "Socket BGA1515",
    "Socket LGA3647-1",
    "Socket SP3",
    "Socket SP3r2",
    "Socket LGA2066",
    "Socket BGA1392",
    "Socket BGA1510",
    "Socket BGA1528",
    "Socket LGA4189",
    "Socket LGA1200",
    "Socket LGA4677",
    "Socket LGA1700",
    "Socket BGA1744",
    "Socket BGA1781",
    "Socket BGA1211",
    "Socket BGA2422",
    "Socket LGA1211",
    "Socket LGA2422",
    "Socket LGA5773",
    "Socket BGA5773",
    "Socket AM5",
    "Socket SP5",
    "Socket SP6",
    "Socket BGA883",
    "Socket BGA1190",
    "Socket BGA4129",
    "Socket LGA4710",
    "Socket LGA7529",
];

/// The 16-bit count when the byte saturates at `0xFF`, otherwise the byte.
fn widened(byte: u8, word: u16) -> u16 {
    if byte == 0xFF && word != 0 {
        word
    } else {
        u16::from(byte)
    }
}

impl Processor {
    pub fn core_count(&self) -> u16 {
        widened(self.core_count_byte, self.core_count2)
    }

    pub fn core_enabled(&self) -> u16 {
        widened(self.core_enabled_byte, self.core_enabled2)
    }

    pub fn thread_count(&self) -> u16 {
        widened(self.thread_count_byte, self.thread_count2)
    }

    pub fn voltage(&self) -> Voltage {
        let v = self.voltage;
        if v & 0x80 != 0 {
            Voltage::Current(v & 0x7F)
        } else {
            Voltage::Supported { v5_0: v & 0x01 != 0, v3_3: v & 0x02 != 0, v2_9: v & 0x04 != 0 }
        }
    }

    /// Family code, resolving the `0xFE` escape to the 16-bit field.
    pub fn family_code(&self) -> u16 {
        if self.family == 0xFE && self.family2 != 0 {
            self.family2
        } else {
            u16::from(self.family)
        }
    }

    pub fn family_name(&self) -> Cow<'static, str> {
        paired(self.family_code(), FAMILIES)
    }

    pub fn type_name(&self) -> Cow<'static, str> {
        indexed(self.processor_type.into(), 1, TYPES)
    }

    pub fn upgrade_name(&self) -> Cow<'static, str> {
        indexed(self.upgrade.into(), 1, UPGRADES)
    }

    pub fn socket_populated(&self) -> bool {
        self.status & 0x40 != 0
    }

    pub fn status_name(&self) -> &'static str {
        STATUS[usize::from(self.status & 0x07)]
    }

    pub fn characteristic_names(&self) -> Vec<&'static str> {
        flags(self.characteristics.into(), CHARACTERISTICS)
    }

    /// `(family, model, stepping)` from the CPUID signature half of the
    /// processor ID, with the extended family and model folded in.
    pub fn x86_signature(&self) -> (u32, u32, u32) {
        let eax = self.id as u32;
        let base_family = (eax >> 8) & 0x0F;
        let mut family = base_family;
        let mut model = (eax >> 4) & 0x0F;
        if base_family == 0x0F {
            family += (eax >> 20) & 0xFF;
        }
        if base_family == 0x06 || base_family == 0x0F {
            model |= ((eax >> 16) & 0x0F) << 4;
        }
        (family, model, eax & 0x0F)
    }
}

impl fmt::Display for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Processor: {} ({})", self.socket_designation, self.type_name())?;
        writeln!(f, "  Family: {}", self.family_name())?;
        writeln!(f, "  Manufacturer: {}", self.manufacturer)?;
        writeln!(f, "  ID: {:016X}", self.id)?;
        writeln!(f, "  Version: {}", self.version)?;
        writeln!(f, "  Voltage: {}", self.voltage())?;
        writeln!(f, "  Max Speed: {} MHz", self.max_speed)?;
        writeln!(f, "  Current Speed: {} MHz", self.current_speed)?;
        if self.socket_populated() {
            writeln!(f, "  Status: Populated, {}", self.status_name())?;
        } else {
            writeln!(f, "  Status: Unpopulated")?;
        }
        writeln!(f, "  Upgrade: {}", self.upgrade_name())?;
        writeln!(f, "  Core Count: {}", self.core_count())?;
        writeln!(f, "  Core Enabled: {}", self.core_enabled())?;
        writeln!(f, "  Thread Count: {}", self.thread_count())?;
        for name in self.characteristic_names() {
            writeln!(f, "  {}", name)?;
        }
        Ok(())
    }
}
