//! Storage backends for the serialized airport cache.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A byte-oriented location holding the serialized cache.
pub trait CacheStore: Send + Sync {
    /// Current contents, or `None` if nothing has been stored yet.
    fn read(&self) -> std::io::Result<Option<Vec<u8>>>;

    /// Replace the stored contents. Must never leave a partial write behind.
    fn write(&self, bytes: &[u8]) -> std::io::Result<()>;

    /// Human-readable location for log lines.
    fn describe(&self) -> String;
}

/// Cache kept in a single JSON file, replaced atomically on save.
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    path: PathBuf,
}

impl FileCacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheStore for FileCacheStore {
    fn read(&self) -> std::io::Result<Option<Vec<u8>>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, bytes: &[u8]) -> std::io::Result<()> {
        common::fs::write_atomic(&self.path, bytes)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
