//! Shared types, config, and error definitions for the flylat collector.

pub mod config;
pub mod error;
pub mod fs;
pub mod types;

pub use config::CollectorConfig;
pub use error::Error;
pub use types::*;

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
