use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::config::SourceConfig;
use crate::entry_point::EntryPoint;
use crate::error::{Error, Result};
use crate::field::{self, Structure};
use crate::source::{self, SmbiosData};
use crate::table::{parse_tables, Table};
use crate::types::{Baseboard, Bios, Chassis, MemoryDevice, Processor, System};

type Records = Arc<dyn Any + Send + Sync>;
type DecodeAll = Box<dyn Fn(&[Table]) -> Decoded + Send + Sync>;

/// A structure that failed to decode; siblings of the same type are
/// unaffected.
#[derive(Debug)]
pub struct DecodeFailure {
    pub handle: u16,
    pub error: Error,
}

#[derive(Clone)]
struct Decoded {
    records: Records,
    failures: Arc<Vec<DecodeFailure>>,
}

/// A registered parser and its memoized result.
struct Slot {
    decode: DecodeAll,
    decoded: OnceLock<Decoded>,
}

/// Owns the raw structure table and memoizes typed decodes per type tag.
///
/// Each type is decoded at most once, on its first query; afterwards
/// readers share the cached records without blocking each other.
pub struct Decoder {
    entry_point: EntryPoint,
    tables: BTreeMap<u8, Vec<Table>>,
    slots: HashMap<u8, Slot>,
}

impl Decoder {
    /// Reads SMBIOS data from the first usable source in `config` and
    /// registers the standard structure types.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let data = source::read(config)?;
        Ok(Self::from_data(data))
    }

    /// Builds a decoder from an entry point buffer and the raw table stream.
    pub fn from_bytes(entry_point: &[u8], table_stream: &[u8]) -> Result<Self> {
        let entry_point = EntryPoint::parse(entry_point)?;
        let tables = parse_tables(source::table_window(&entry_point, table_stream))?;
        Ok(Self::from_data(SmbiosData { entry_point, tables }))
    }

    pub fn from_data(data: SmbiosData) -> Self {
        let SmbiosData { entry_point, tables } = data;
        let count = tables.len();

        let mut by_kind: BTreeMap<u8, Vec<Table>> = BTreeMap::new();
        for table in tables {
            by_kind.entry(table.kind()).or_default().push(table);
        }

        let (major, minor, rev) = entry_point.version();
        info!("SMBIOS {}.{}.{} ({}), {} structures", major, minor, rev, entry_point.anchor(), count);

        let mut decoder = Decoder {
            entry_point,
            tables: by_kind,
            slots: HashMap::new(),
        };
        decoder.register_standard();
        decoder
    }

    fn register_standard(&mut self) {
        self.register_structure::<Bios>();
        self.register_structure::<System>();
        self.register_structure::<Baseboard>();
        self.register_structure::<Chassis>();
        self.register_structure::<Processor>();
        self.register_structure::<MemoryDevice>();
    }

    /// Registers a schema-described structure under its own type tag.
    pub fn register_structure<T: Structure>(&mut self) {
        self.register(T::KIND, |table: &Table| field::decode::<T>(table).map(|(record, _)| record));
    }

    /// Registers `decode` for every structure tagged `kind`, replacing any
    /// earlier registration and its cached results.
    pub fn register<T, F>(&mut self, kind: u8, decode: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&Table) -> Result<T> + Send + Sync + 'static,
    {
        let decode_all = move |tables: &[Table]| {
            let mut records: Vec<T> = Vec::with_capacity(tables.len());
            let mut failures = Vec::new();
            for table in tables {
                match decode(table) {
                    Ok(record) => records.push(record),
                    Err(error) => {
                        warn!("type {} handle {:#06x}: {}", table.kind(), table.handle(), error);
                        failures.push(DecodeFailure { handle: table.handle(), error });
                    }
                }
            }
            Decoded { records: Arc::new(records), failures: Arc::new(failures) }
        };
        self.slots.insert(kind, Slot { decode: Box::new(decode_all), decoded: OnceLock::new() });
    }

    pub fn entry_point(&self) -> &EntryPoint {
        &self.entry_point
    }

    /// Raw structures of one type, in table order.
    pub fn tables(&self, kind: u8) -> &[Table] {
        self.tables.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Type tags present in the table, ascending.
    pub fn kinds(&self) -> impl Iterator<Item = u8> + '_ {
        self.tables.keys().copied()
    }

    /// All decoded records of type tag `kind`.
    ///
    /// An empty list means the structure is absent, which is normal for
    /// most types. Structures that failed to decode are left out; see
    /// [`Decoder::failures`].
    pub fn get<T: Send + Sync + 'static>(&self, kind: u8) -> Result<Arc<Vec<T>>> {
        downcast(kind, self.decoded(kind)?)
    }

    /// Decode failures recorded for `kind`, decoding it first if needed.
    pub fn failures(&self, kind: u8) -> Result<Arc<Vec<DecodeFailure>>> {
        Ok(self.decoded(kind)?.failures)
    }

    // Concurrent first queries of one type wait on its slot; other types
    // are unaffected.
    fn decoded(&self, kind: u8) -> Result<Decoded> {
        let slot = self.slots.get(&kind).ok_or(Error::NoParser(kind))?;
        let decoded = slot.decoded.get_or_init(|| {
            let tables = self.tables(kind);
            let decoded = (slot.decode)(tables);
            debug!(
                "decoded type {}: {} ok, {} failed",
                kind,
                tables.len() - decoded.failures.len(),
                decoded.failures.len()
            );
            decoded
        });
        Ok(decoded.clone())
    }

    fn is_decoded(&self, kind: u8) -> bool {
        self.slots.get(&kind).is_some_and(|slot| slot.decoded.get().is_some())
    }

    /// Decodes every registered type not yet cached, in parallel.
    pub fn decode_all(&self) {
        let pending: Vec<u8> = self.slots.keys().copied().filter(|kind| !self.is_decoded(*kind)).collect();
        if pending.is_empty() {
            return;
        }

        let threads = num_cpus::get().clamp(1, pending.len());
        let warm = |kind: &u8| {
            // every pending kind has a slot
            let _ = self.decoded(*kind);
        };
        match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => pool.install(|| pending.par_iter().for_each(warm)),
            Err(err) => {
                debug!("rayon pool unavailable ({}), decoding serially", err);
                pending.iter().for_each(warm);
            }
        }
    }

    pub fn bios(&self) -> Result<Arc<Vec<Bios>>> {
        self.get(Bios::KIND)
    }

    pub fn system(&self) -> Result<Arc<Vec<System>>> {
        self.get(System::KIND)
    }

    pub fn baseboards(&self) -> Result<Arc<Vec<Baseboard>>> {
        self.get(Baseboard::KIND)
    }

    pub fn chassis(&self) -> Result<Arc<Vec<Chassis>>> {
        self.get(Chassis::KIND)
    }

    pub fn processors(&self) -> Result<Arc<Vec<Processor>>> {
        self.get(Processor::KIND)
    }

    pub fn memory_devices(&self) -> Result<Arc<Vec<MemoryDevice>>> {
        self.get(MemoryDevice::KIND)
    }
}

fn downcast<T: Send + Sync + 'static>(kind: u8, decoded: Decoded) -> Result<Arc<Vec<T>>> {
    decoded.records.downcast::<Vec<T>>().map_err(|_| Error::TypeMismatch(kind))
}
