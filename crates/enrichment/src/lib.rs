//! Airport cache and route enrichment.
//!
//! Resolves route endpoints against a persistent airport cache, falls back
//! to an external lookup on a miss, and fans the work out per airline.

pub mod batch;
pub mod cache;
pub mod coordinator;
pub mod pipeline;
pub mod resolver;
pub mod store;
pub mod table;

pub use batch::{enrich_airlines, RouteSource};
pub use cache::{AirportCache, CacheStart, LoadReport};
pub use coordinator::{
    BatchOutcome, BatchPhase, EntityFailure, FetchCoordinator, TaskOutcome,
    DEFAULT_MAX_CONCURRENT,
};
pub use pipeline::RouteEnrichmentPipeline;
pub use resolver::{AirportLookup, AirportResolver};
pub use store::{CacheStore, FileCacheStore};
pub use table::AirportTable;
