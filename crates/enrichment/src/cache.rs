//! Shared, persistent airport cache.
//!
//! One `AirportCache` is built per batch run and handed to every task. All
//! access goes through a single `RwLock` around the table: lookups share
//! the read side, and the check-then-insert sequence runs entirely under
//! the write side so two tasks can never both add the same code.
//!
//! The cache is loaded once before the batch and saved once after every
//! task has joined.

use std::sync::Arc;

use common::{AirportRecord, Error};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::store::CacheStore;
use crate::table::AirportTable;

/// How the cache for a run came to be.
#[derive(Debug)]
pub enum CacheStart {
    /// Parsed from the store, or empty because nothing was stored yet.
    Loaded(LoadReport),
    /// The stored data is not a cache document; saving replaces it.
    Corrupt(Error),
    /// The store could not be read at all.
    Unreadable(Error),
}

impl CacheStart {
    /// Whether the end-of-run save may overwrite the store.
    pub fn allows_save(&self) -> bool {
        !matches!(self, CacheStart::Unreadable(_))
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            CacheStart::Loaded(_) => None,
            CacheStart::Corrupt(e) | CacheStart::Unreadable(e) => Some(e),
        }
    }
}

/// Thread-safe airport cache keyed by ICAO code.
#[derive(Debug, Clone, Default)]
pub struct AirportCache {
    table: Arc<RwLock<AirportTable>>,
}

/// What a successful load found in the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub malformed: usize,
    pub duplicates: usize,
}

impl AirportCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(table: AirportTable) -> Self {
        Self {
            table: Arc::new(RwLock::new(table)),
        }
    }

    pub fn lookup(&self, code: &str) -> Option<AirportRecord> {
        self.table.read().get(code).cloned()
    }

    /// Insert if the code is absent. A duplicate is logged and ignored;
    /// the record already cached stays untouched.
    pub fn insert(&self, record: AirportRecord) -> bool {
        let code = record.code.clone();
        let inserted = self.table.write().insert(record);
        if !inserted {
            debug!("Airport {} already cached; keeping existing record", code);
        }
        inserted
    }

    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }

    /// Snapshot of every record, sorted by code.
    pub fn records(&self) -> Vec<AirportRecord> {
        let mut records: Vec<AirportRecord> = self.table.read().iter().cloned().collect();
        records.sort_by(|a, b| a.code.cmp(&b.code));
        records
    }

    // ── Persistence ──────────────────────────────────────────────────

    /// Parse a serialized cache: a JSON array of records.
    ///
    /// Entries that do not deserialize are skipped and counted; repeated
    /// codes keep their first occurrence. Anything other than an array is
    /// a `CacheLoad` error.
    pub fn from_json(bytes: &[u8]) -> Result<(Self, LoadReport), Error> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| Error::CacheLoad(format!("invalid JSON: {}", e)))?;
        let Value::Array(entries) = value else {
            return Err(Error::CacheLoad("expected a JSON array of airports".into()));
        };

        let mut table = AirportTable::new();
        let mut report = LoadReport::default();

        for entry in entries {
            match serde_json::from_value::<AirportRecord>(entry) {
                Ok(record) => {
                    if table.insert(record) {
                        report.loaded += 1;
                    } else {
                        report.duplicates += 1;
                    }
                }
                Err(e) => {
                    debug!("Skipping malformed cache entry: {}", e);
                    report.malformed += 1;
                }
            }
        }

        debug!(
            "Airport table: load factor {:.3}, longest chain {}",
            table.load_factor(),
            table.longest_chain()
        );
        Ok((Self::with_table(table), report))
    }

    /// Serialize every record as a flat array, sorted by code.
    pub fn to_json(&self) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(&self.records()).map_err(|e| Error::CacheSave(e.to_string()))
    }

    fn read_store(store: &dyn CacheStore) -> Result<Option<Vec<u8>>, Error> {
        store.read().map_err(|e| {
            Error::CacheLoad(format!("failed to read {}: {}", store.describe(), e))
        })
    }

    fn parse_stored(
        store: &dyn CacheStore,
        bytes: Option<Vec<u8>>,
    ) -> Result<(Self, LoadReport), Error> {
        let Some(bytes) = bytes else {
            info!("No airport cache at {}; starting empty", store.describe());
            return Ok((Self::new(), LoadReport::default()));
        };

        let (cache, report) = Self::from_json(&bytes)
            .map_err(|e| Error::CacheLoad(format!("{}: {}", store.describe(), e)))?;

        if report.malformed > 0 || report.duplicates > 0 {
            warn!(
                "Airport cache {}: skipped {} malformed entries, merged {} duplicates",
                store.describe(),
                report.malformed,
                report.duplicates
            );
        }
        info!("Loaded {} airports from {}", report.loaded, store.describe());

        Ok((cache, report))
    }

    /// Load from `store`. A store with nothing in it yields an empty cache.
    pub fn load(store: &dyn CacheStore) -> Result<(Self, LoadReport), Error> {
        let bytes = Self::read_store(store)?;
        Self::parse_stored(store, bytes)
    }

    /// Load from `store`, falling back to an empty cache on any error.
    ///
    /// The returned `CacheStart` says whether a later `save` is safe: a
    /// store that could not be read may still hold good data, so it must
    /// not be overwritten with this run's airports alone.
    pub fn load_or_empty(store: &dyn CacheStore) -> (Self, CacheStart) {
        let bytes = match Self::read_store(store) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("{}; continuing with an empty airport cache", e);
                return (Self::new(), CacheStart::Unreadable(e));
            }
        };

        match Self::parse_stored(store, bytes) {
            Ok((cache, report)) => (cache, CacheStart::Loaded(report)),
            Err(e) => {
                warn!("{}; continuing with an empty airport cache", e);
                (Self::new(), CacheStart::Corrupt(e))
            }
        }
    }

    /// Replace the stored cache with every record currently held.
    pub fn save(&self, store: &dyn CacheStore) -> Result<usize, Error> {
        let count = self.len();
        let bytes = self.to_json()?;

        store.write(&bytes).map_err(|e| {
            Error::CacheSave(format!("failed to write {}: {}", store.describe(), e))
        })?;

        info!("Saved {} airports to {}", count, store.describe());
        Ok(count)
    }
}
