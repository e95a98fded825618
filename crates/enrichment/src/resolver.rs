//! Cache-first airport resolution.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use common::{AirportRecord, Error};
use tracing::{debug, warn};

use crate::cache::AirportCache;

/// External source of airport metadata, consulted on a cache miss.
///
/// `Ok(None)` means the service does not know the code. Implementations
/// own their timeout; a timed-out call surfaces as an `Err`.
#[async_trait]
pub trait AirportLookup: Send + Sync {
    async fn lookup_airport(&self, code: &str) -> Result<Option<AirportRecord>, Error>;
}

/// Resolves codes against the shared cache, falling back to the external
/// lookup and caching complete answers. Negative results are never cached.
pub struct AirportResolver {
    cache: AirportCache,
    lookup: Arc<dyn AirportLookup>,
    external_calls: AtomicUsize,
    missing: AtomicUsize,
}

fn is_complete(record: &AirportRecord) -> bool {
    !record.name.trim().is_empty() && record.latitude.is_finite() && record.longitude.is_finite()
}

impl AirportResolver {
    pub fn new(cache: AirportCache, lookup: Arc<dyn AirportLookup>) -> Self {
        Self {
            cache,
            lookup,
            external_calls: AtomicUsize::new(0),
            missing: AtomicUsize::new(0),
        }
    }

    pub fn cache(&self) -> &AirportCache {
        &self.cache
    }

    /// External lookups performed so far.
    pub fn external_calls(&self) -> usize {
        self.external_calls.load(Ordering::Relaxed)
    }

    /// Resolutions that ended unresolved so far.
    pub fn missing_count(&self) -> usize {
        self.missing.load(Ordering::Relaxed)
    }

    pub async fn resolve(&self, code: &str) -> Option<AirportRecord> {
        if let Some(record) = self.cache.lookup(code) {
            return Some(record);
        }

        if code.trim().is_empty() {
            debug!("Empty airport code; not querying the lookup service");
            self.missing.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        self.external_calls.fetch_add(1, Ordering::Relaxed);
        match self.lookup.lookup_airport(code).await {
            Ok(Some(mut record)) if is_complete(&record) => {
                // Key by the code we were asked for, whatever casing came back.
                record.code = code.to_string();
                self.cache.insert(record.clone());
                Some(record)
            }
            Ok(Some(_)) => {
                debug!("Incomplete airport data for {}", code);
                self.missing.fetch_add(1, Ordering::Relaxed);
                None
            }
            Ok(None) => {
                debug!("Airport {} not found", code);
                self.missing.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                warn!("Airport lookup for {} failed: {}", code, e);
                self.missing.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Scripted lookup service that counts every call.
    #[derive(Default)]
    pub(crate) struct ScriptedLookup {
        answers: HashMap<String, Result<Option<AirportRecord>, String>>,
        pub(crate) calls: AtomicUsize,
        pub(crate) requested: Mutex<Vec<String>>,
    }

    impl ScriptedLookup {
        pub(crate) fn knowing(codes: &[&str]) -> Self {
            let mut lookup = Self::default();
            for (i, code) in codes.iter().enumerate() {
                lookup = lookup.answer(
                    code,
                    Ok(Some(AirportRecord::new(
                        *code,
                        format!("{} Airport", code),
                        10.0 + i as f64,
                        20.0 + i as f64,
                    ))),
                );
            }
            lookup
        }

        pub(crate) fn answer(
            mut self,
            code: &str,
            answer: Result<Option<AirportRecord>, String>,
        ) -> Self {
            self.answers.insert(code.to_string(), answer);
            self
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AirportLookup for ScriptedLookup {
        async fn lookup_airport(&self, code: &str) -> Result<Option<AirportRecord>, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().push(code.to_string());
            match self.answers.get(code) {
                Some(Ok(record)) => Ok(record.clone()),
                Some(Err(message)) => Err(Error::ExternalLookup(message.clone())),
                None => Ok(None),
            }
        }
    }
}
