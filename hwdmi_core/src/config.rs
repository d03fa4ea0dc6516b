use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

pub const SYSFS_ENTRY_POINT: &str = "/sys/firmware/dmi/tables/smbios_entry_point";
pub const SYSFS_TABLE: &str = "/sys/firmware/dmi/tables/DMI";
pub const DEV_MEM: &str = "/dev/mem";

/// Legacy BIOS area searched for the entry point anchor.
pub const SCAN_START: u64 = 0x000F_0000;
pub const SCAN_END: u64 = 0x0010_0000;

/// Where and how SMBIOS data is read.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub entry_point: PathBuf,
    pub table: PathBuf,
    pub dev_mem: PathBuf,
    pub scan_start: u64,
    pub scan_end: u64,
    /// Bound on the whole read, whichever backend serves it.
    pub timeout: Duration,
    /// Bound on each individual physical memory read.
    pub read_timeout: Duration,
    pub allow_dev_mem: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            entry_point: PathBuf::from(SYSFS_ENTRY_POINT),
            table: PathBuf::from(SYSFS_TABLE),
            dev_mem: PathBuf::from(DEV_MEM),
            scan_start: SCAN_START,
            scan_end: SCAN_END,
            timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(2),
            allow_dev_mem: true,
        }
    }
}

pub fn load_source_config(path: &str) -> Result<SourceConfig> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse_source_config(&text)
}

/// Parses `key=value` lines on top of the defaults.
pub fn parse_source_config(text: &str) -> Result<SourceConfig> {
    let mut config = SourceConfig::default();
    let mut window_line = 0;

    for (line_no, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        let line_no = line_no + 1;
        let invalid = |reason: String| Error::Config { line: line_no, reason };

        // skip blank lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| invalid(format!("expected key=value, got '{}'", raw_line)))?;
        let (key, value) = (key.trim(), value.trim());

        match key {
            "entry_point" => config.entry_point = PathBuf::from(value),
            "table" => config.table = PathBuf::from(value),
            "dev_mem" => config.dev_mem = PathBuf::from(value),
            "scan_start" => {
                config.scan_start = parse_address(value).ok_or_else(|| invalid(format!("invalid address '{}'", value)))?;
                window_line = line_no;
            }
            "scan_end" => {
                config.scan_end = parse_address(value).ok_or_else(|| invalid(format!("invalid address '{}'", value)))?;
                window_line = line_no;
            }
            "timeout_ms" => config.timeout = parse_millis(value).ok_or_else(|| invalid(format!("invalid timeout '{}'", value)))?,
            "read_timeout_ms" => {
                config.read_timeout = parse_millis(value).ok_or_else(|| invalid(format!("invalid timeout '{}'", value)))?
            }
            "allow_dev_mem" => {
                config.allow_dev_mem = value.parse::<bool>().map_err(|_| invalid(format!("expected true or false, got '{}'", value)))?
            }
            other => return Err(invalid(format!("unknown key '{}'", other))),
        }
    }

    if config.scan_start >= config.scan_end {
        return Err(Error::Config {
            line: window_line,
            reason: format!("empty scan window {:#x}..{:#x}", config.scan_start, config.scan_end),
        });
    }

    Ok(config)
}

fn parse_address(value: &str) -> Option<u64> {
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

fn parse_millis(value: &str) -> Option<Duration> {
    value.parse::<u64>().ok().filter(|ms| *ms > 0).map(Duration::from_millis)
}
