//! Snapshot writers.
//!
//! Route snapshots are whole-document overwrites per airline. Company data
//! is kept per airline in period-keyed files (one entry per day, one per
//! month) where a rerun replaces its period instead of appending.

pub mod company;
pub mod routes;

pub use company::{is_last_day_of_month, CompanyDataStore, Period};
pub use routes::SnapshotStore;
