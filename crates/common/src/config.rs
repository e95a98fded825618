//! Collector configuration types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level collector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// airportdb.io access token. Only required when routes are collected.
    #[serde(default)]
    pub airportdb_api_token: String,

    /// Base URL of the flylat site (company pages and JSON endpoints).
    #[serde(default = "default_flylat_base_url")]
    pub flylat_base_url: String,

    /// Base URL of the airportdb API.
    #[serde(default = "default_airportdb_base_url")]
    pub airportdb_base_url: String,

    /// Root directory for cache, snapshots and company data.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory for the run journal.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Airline list, relative to `data_dir`.
    #[serde(default = "default_airlines_file")]
    pub airlines_file: String,

    /// Airport cache file, relative to `data_dir`.
    #[serde(default = "default_airport_cache_file")]
    pub airport_cache_file: String,

    /// Upper bound on airlines fetched at the same time.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Per-request timeout for every HTTP call.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// airportdb request budget.
    #[serde(default = "default_airportdb_rps")]
    pub airportdb_requests_per_sec: u32,

    /// Company data is published for the previous day; the collection
    /// date is shifted back by this many hours.
    #[serde(default = "default_collection_offset_hours")]
    pub collection_offset_hours: i64,
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_flylat_base_url() -> String {
    "https://flylat.net".into()
}
fn default_airportdb_base_url() -> String {
    "https://airportdb.io/api/v1".into()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("flylat/data")
}
fn default_log_dir() -> PathBuf {
    PathBuf::from("logs/flylat")
}
fn default_airlines_file() -> String {
    "airlines.json".into()
}
fn default_airport_cache_file() -> String {
    "airports.json".into()
}
fn default_max_concurrent_fetches() -> usize {
    10
}
fn default_http_timeout() -> u64 {
    30
}
fn default_airportdb_rps() -> u32 {
    5
}
fn default_collection_offset_hours() -> i64 {
    12
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            airportdb_api_token: String::new(),
            flylat_base_url: default_flylat_base_url(),
            airportdb_base_url: default_airportdb_base_url(),
            data_dir: default_data_dir(),
            log_dir: default_log_dir(),
            airlines_file: default_airlines_file(),
            airport_cache_file: default_airport_cache_file(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            http_timeout_secs: default_http_timeout(),
            airportdb_requests_per_sec: default_airportdb_rps(),
            collection_offset_hours: default_collection_offset_hours(),
        }
    }
}

impl CollectorConfig {
    pub fn airlines_path(&self) -> PathBuf {
        self.data_dir.join(&self.airlines_file)
    }

    pub fn airport_cache_path(&self) -> PathBuf {
        self.data_dir.join(&self.airport_cache_file)
    }
}
