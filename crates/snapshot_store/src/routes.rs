//! Enriched route snapshots, one file per airline.

use std::path::{Path, PathBuf};

use common::{EntityId, EntitySnapshot, Error};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    /// Snapshots live under `<data_dir>/routes`.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            root: data_dir.join("routes"),
        }
    }

    pub fn path_for(&self, entity_id: EntityId) -> PathBuf {
        self.root.join(format!("{}.json", entity_id))
    }

    /// Replace the airline's snapshot file with `snapshot`.
    pub fn write_route_snapshot(&self, snapshot: &EntitySnapshot) -> Result<PathBuf, Error> {
        let path = self.path_for(snapshot.entity_id);
        let bytes = serde_json::to_vec(snapshot)?;

        common::fs::write_atomic(&path, &bytes)
            .map_err(|e| Error::Snapshot(format!("{}: {}", path.display(), e)))?;

        debug!(
            "Wrote {} routes for airline {} to {}",
            snapshot.routes.len(),
            snapshot.entity_id,
            path.display()
        );
        Ok(path)
    }
}
