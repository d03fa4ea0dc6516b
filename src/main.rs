use std::error::Error;
use std::fmt::Display;
use std::process::exit;
use std::sync::Arc;

use hwdmi_core::{load_source_config, Decoder, EntryPoint, SourceConfig};
use hwdmi_core::{Baseboard, Bios, Chassis, MemoryDevice, Processor, System};
use serde::Serialize;

type CliResult<T> = std::result::Result<T, Box<dyn Error>>;

#[derive(Serialize)]
struct Report<'a> {
    entry_point: &'a EntryPoint,
    bios: &'a [Bios],
    system: &'a [System],
    baseboards: &'a [Baseboard],
    chassis: &'a [Chassis],
    processors: &'a [Processor],
    memory_devices: &'a [MemoryDevice],
}

fn usage() -> ! {
    eprintln!("usage: hwdmi [--json] [--config <path>]");
    eprintln!("decodes the SMBIOS tables of this machine");
    exit(2);
}

fn main() {
    let mut json = false;
    let mut config_path: Option<String> = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--json" => json = true,
            "--config" => match args.next() {
                Some(path) => config_path = Some(path),
                None => usage(),
            },
            _ => usage(),
        }
    }

    let config = match config_path {
        Some(path) => load_source_config(&path).unwrap_or_else(|e| {
            eprintln!("{}", e);
            exit(2);
        }),
        None => SourceConfig::default(),
    };

    let decoder = match Decoder::new(&config) {
        Ok(decoder) => decoder,
        Err(e) => {
            eprintln!("{}", e);
            exit(1);
        }
    };
    decoder.decode_all();

    let result = if json { print_json(&decoder) } else { print_text(&decoder) };
    if let Err(e) = result {
        eprintln!("{}", e);
        exit(1);
    }

    for kind in [0u8, 1, 2, 3, 4, 17] {
        if let Ok(failures) = decoder.failures(kind) {
            for failure in failures.iter() {
                eprintln!("warning: type {} handle {:#06x}: {}", kind, failure.handle, failure.error);
            }
        }
    }
}

fn print_json(decoder: &Decoder) -> CliResult<()> {
    println!("{}", render_json(decoder)?);
    Ok(())
}

fn render_json(decoder: &Decoder) -> CliResult<String> {
    let (bios, system, baseboards) = (decoder.bios()?, decoder.system()?, decoder.baseboards()?);
    let (chassis, processors, memory_devices) = (decoder.chassis()?, decoder.processors()?, decoder.memory_devices()?);

    let report = Report {
        entry_point: decoder.entry_point(),
        bios: &bios,
        system: &system,
        baseboards: &baseboards,
        chassis: &chassis,
        processors: &processors,
        memory_devices: &memory_devices,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

fn print_text(decoder: &Decoder) -> CliResult<()> {
    let ep = decoder.entry_point();
    let (major, minor, rev) = ep.version();
    let (address, length) = ep.table();
    println!("SMBIOS {}.{}.{} present ({})", major, minor, rev, ep.anchor());
    println!("Table at {:#010x}, {} bytes", address, length);
    println!();

    print_all(&decoder.bios()?);
    print_all(&decoder.system()?);
    print_all(&decoder.baseboards()?);
    print_all(&decoder.chassis()?);
    print_all(&decoder.processors()?);
    print_all(&decoder.memory_devices()?);
    Ok(())
}

fn print_all<T: Display>(records: &Arc<Vec<T>>) {
    for record in records.iter() {
        println!("{}", record);
    }
}
