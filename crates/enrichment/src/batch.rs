//! Route collection for a batch of airlines.

use std::sync::Arc;

use async_trait::async_trait;
use common::{EntityId, EntitySnapshot, Error, RawRouteSet};

use crate::coordinator::{BatchOutcome, FetchCoordinator};
use crate::pipeline::RouteEnrichmentPipeline;

/// Source of raw route data for one airline.
#[async_trait]
pub trait RouteSource: Send + Sync {
    async fn fetch_raw_routes(&self, entity_id: EntityId) -> Result<RawRouteSet, Error>;
}

/// Fetch and enrich every airline's routes through `coordinator`.
///
/// Each success carries the snapshot and its unresolved-endpoint count.
/// A fetch failure is that airline's failure only.
pub async fn enrich_airlines(
    coordinator: &FetchCoordinator,
    source: Arc<dyn RouteSource>,
    pipeline: RouteEnrichmentPipeline,
    entities: Vec<EntityId>,
) -> BatchOutcome<(EntitySnapshot, usize)> {
    coordinator
        .run(entities, move |entity_id| {
            let source = source.clone();
            let pipeline = pipeline.clone();
            async move {
                let set = source
                    .fetch_raw_routes(entity_id)
                    .await
                    .map_err(|e| match e {
                        Error::EntityFetch { .. } => e,
                        other => Error::entity_fetch(entity_id, other),
                    })?;
                Ok(pipeline.enrich_set(set).await)
            }
        })
        .await
}
