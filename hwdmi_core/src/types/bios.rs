use std::fmt;

use serde::Serialize;

use crate::field::{Field, Schema, Structure};
use crate::table::TableHeader;
use crate::types::{flags, format_size};

/// BIOS Information (type 0).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Bios {
    pub header: TableHeader,
    pub vendor: String,
    pub version: String,
    pub starting_segment: u16,
    pub release_date: String,
    /// Legacy ROM size code, `(n + 1) * 64 KiB`; `0xFF` defers to
    /// `extended_rom_size`.
    pub rom_size: u8,
    pub characteristics: u64,
    pub characteristics_ext1: u8,
    pub characteristics_ext2: u8,
    pub bios_major: u8,
    pub bios_minor: u8,
    pub ec_major: u8,
    pub ec_minor: u8,
    pub extended_rom_size: u16,
}

const SCHEMA: &[Field<Bios>] = &[
    Field::ignore("Header"),
    Field::string("Vendor", |r, v| r.vendor = v),
    Field::string("Version", |r, v| r.version = v),
    Field::u16("StartingSegment", |r, v| r.starting_segment = v),
    Field::string("ReleaseDate", |r, v| r.release_date = v),
    Field::u8("RomSize", |r, v| r.rom_size = v),
    Field::u64("Characteristics", |r, v| r.characteristics = v),
    // 2.4+
    Field::u8("CharacteristicsExt1", |r, v| r.characteristics_ext1 = v),
    Field::u8("CharacteristicsExt2", |r, v| r.characteristics_ext2 = v),
    Field::<Bios>::u8("BiosMajor", |r, v| r.bios_major = v).or(0xFF),
    Field::<Bios>::u8("BiosMinor", |r, v| r.bios_minor = v).or(0xFF),
    Field::<Bios>::u8("EcMajor", |r, v| r.ec_major = v).or(0xFF),
    Field::<Bios>::u8("EcMinor", |r, v| r.ec_minor = v).or(0xFF),
    // 3.1+
    Field::u16("ExtendedRomSize", |r, v| r.extended_rom_size = v),
];

impl Schema for Bios {
    fn schema() -> &'static [Field<Self>] {
        SCHEMA
    }
}

impl Structure for Bios {
    const KIND: u8 = 0;
    const NAME: &'static str = "BIOS Information";

    fn set_header(&mut self, header: TableHeader) {
        self.header = header;
    }
}

const CHARACTERISTICS: &[&str] = &[
    "",
    "",
    "Unknown",
    "BIOS characteristics not supported",
    "ISA is supported",
    "MCA is supported",
    "EISA is supported",
    "PCI is supported",
    "PC Card (PCMCIA) is supported",
    "PNP is supported",
    "APM is supported",
    "BIOS is upgradeable",
    "BIOS shadowing is allowed",
    "VLB is supported",
    "ESCD support is available",
    "Boot from CD is supported",
    "Selectable boot is supported",
    "BIOS ROM is socketed",
    "Boot from PC Card (PCMCIA) is supported",
    "EDD is supported",
    "Japanese floppy for NEC 9800 1.2 MB is supported (int 13h)",
    "Japanese floppy for Toshiba 1.2 MB is supported (int 13h)",
    "5.25\"/360 kB floppy services are supported (int 13h)",
    "5.25\"/1.2 MB floppy services are supported (int 13h)",
    "3.5\"/720 kB floppy services are supported (int 13h)",
    "3.5\"/2.88 MB floppy services are supported (int 13h)",
    "Print screen service is supported (int 5h)",
    "8042 keyboard services are supported (int 9h)",
    "Serial services are supported (int 14h)",
    "Printer services are supported (int 17h)",
    "CGA/mono video services are supported (int 10h)",
    "NEC PC-98",
];

const CHARACTERISTICS_EXT1: &[&str] = &[
    "ACPI is supported",
    "USB legacy is supported",
    "AGP is supported",
    "I2O boot is supported",
    "LS-120 boot is supported",
    "ATAPI Zip drive boot is supported",
    "IEEE 1394 boot is supported",
    "Smart battery is supported",
];

const CHARACTERISTICS_EXT2: &[&str] = &[
    "BIOS boot specification is supported",
    "Function key-initiated network boot is supported",
    "Targeted content distribution is supported",
    "UEFI is supported",
    "System is a virtual machine",
    "Manufacturing mode is supported",
    "Manufacturing mode is enabled",
];

impl Bios {
    /// ROM size in bytes, or `None` when the extended size uses a reserved
    /// unit.
    pub fn rom_size_bytes(&self) -> Option<u64> {
        if self.rom_size != 0xFF {
            return Some((u64::from(self.rom_size) + 1) << 16);
        }
        let size = u64::from(self.extended_rom_size & 0x3FFF);
        match self.extended_rom_size >> 14 {
            0 => Some(size << 20),
            1 => Some(size << 30),
            _ => None,
        }
    }

    pub fn rom_size_string(&self) -> String {
        match self.rom_size_bytes() {
            Some(bytes) => format_size(bytes),
            None => "Unknown".to_string(),
        }
    }

    /// Physical address of the BIOS image.
    pub fn address(&self) -> u32 {
        u32::from(self.starting_segment) << 4
    }

    /// Bytes between the BIOS image and the end of the first megabyte.
    /// Zero on UEFI systems, which leave the segment unset.
    pub fn runtime_size(&self) -> u32 {
        if self.starting_segment == 0 {
            return 0;
        }
        (0x10000 - u32::from(self.starting_segment)) << 4
    }

    /// Characteristic names from the base and extension bytes.
    pub fn characteristic_names(&self) -> Vec<&'static str> {
        let mut names = flags(self.characteristics & 0xFFFF_FFFF, CHARACTERISTICS);
        names.extend(flags(u64::from(self.characteristics_ext1), CHARACTERISTICS_EXT1));
        names.extend(flags(u64::from(self.characteristics_ext2), CHARACTERISTICS_EXT2));
        names
    }

    /// System BIOS release, absent when the firmware reports `0xFF`.
    pub fn bios_revision(&self) -> Option<String> {
        revision(self.bios_major, self.bios_minor)
    }

    /// Embedded controller firmware release.
    pub fn firmware_revision(&self) -> Option<String> {
        revision(self.ec_major, self.ec_minor)
    }
}

fn revision(major: u8, minor: u8) -> Option<String> {
    (major != 0xFF).then(|| format!("{}.{}", major, minor))
}

impl fmt::Display for Bios {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BIOS: {} {} ({})", self.vendor, self.version, self.release_date)?;
        writeln!(f, "  ROM Size: {}", self.rom_size_string())?;
        if let Some(rev) = self.bios_revision() {
            writeln!(f, "  BIOS Revision: {}", rev)?;
        }
        if let Some(rev) = self.firmware_revision() {
            writeln!(f, "  Firmware Revision: {}", rev)?;
        }
        for name in self.characteristic_names() {
            writeln!(f, "  {}", name)?;
        }
        Ok(())
    }
}
