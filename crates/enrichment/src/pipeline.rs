//! Route enrichment: replace every endpoint code with airport metadata.

use std::sync::Arc;

use chrono::Utc;
use common::{AirportEndpoint, EnrichedRoute, EntityId, EntitySnapshot, RawRoute, RawRouteSet};
use tracing::debug;

use crate::resolver::AirportResolver;

/// Enriches one airline's routes through a shared resolver.
#[derive(Clone)]
pub struct RouteEnrichmentPipeline {
    resolver: Arc<AirportResolver>,
}

impl RouteEnrichmentPipeline {
    pub fn new(resolver: Arc<AirportResolver>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &AirportResolver {
        &self.resolver
    }

    /// Build the snapshot for one airline.
    ///
    /// Every input route yields exactly one output route, in input order.
    /// Unresolved endpoints keep their code with null metadata; the second
    /// value counts them. Failed resolutions are not retried here.
    pub async fn enrich(
        &self,
        entity_id: EntityId,
        entity_name: &str,
        raw_routes: Vec<RawRoute>,
    ) -> (EntitySnapshot, usize) {
        let mut missing = 0usize;
        let mut routes = Vec::with_capacity(raw_routes.len());

        for raw in raw_routes {
            let departure = self.endpoint(&raw.departure_code, &mut missing).await;
            let destination = self.endpoint(&raw.destination_code, &mut missing).await;
            routes.push(EnrichedRoute {
                departure,
                destination,
                attributes: raw.attributes,
            });
        }

        debug!(
            "Enriched {} routes for airline {} ({} endpoints unresolved)",
            routes.len(),
            entity_id,
            missing
        );

        let snapshot = EntitySnapshot {
            entity_name: entity_name.to_string(),
            entity_id,
            update_timestamp: Utc::now(),
            routes,
        };
        (snapshot, missing)
    }

    pub async fn enrich_set(&self, set: RawRouteSet) -> (EntitySnapshot, usize) {
        self.enrich(set.entity_id, &set.entity_name, set.routes).await
    }

    async fn endpoint(&self, code: &str, missing: &mut usize) -> AirportEndpoint {
        match self.resolver.resolve(code).await {
            Some(record) => AirportEndpoint::resolved(&record),
            None => {
                *missing += 1;
                AirportEndpoint::unresolved(code)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::AirportCache;
    use crate::resolver::testing::ScriptedLookup;
    use serde_json::json;

    fn pipeline_with(lookup: Arc<ScriptedLookup>) -> RouteEnrichmentPipeline {
        let resolver = AirportResolver::new(AirportCache::new(), lookup);
        RouteEnrichmentPipeline::new(Arc::new(resolver))
    }

    #[tokio::test]
    async fn test_shared_departure_hits_cache() {
        let lookup = Arc::new(ScriptedLookup::knowing(&["KJFK", "EGLL", "LFPG"]));
        let pipeline = pipeline_with(lookup.clone());

        let routes = vec![RawRoute::new("KJFK", "EGLL"), RawRoute::new("KJFK", "LFPG")];
        let (snapshot, missing) = pipeline.enrich(1, "Transatlantic", routes).await;

        assert_eq!(lookup.call_count(), 3);
        assert_eq!(
            *lookup.requested.lock(),
            vec!["KJFK".to_string(), "EGLL".into(), "LFPG".into()]
        );
        assert_eq!(pipeline.resolver().cache().len(), 3);
        assert_eq!(missing, 0);
        assert_eq!(snapshot.routes.len(), 2);
        assert!(snapshot.routes.iter().all(|r| r.departure.is_resolved()));
    }

    #[tokio::test]
    async fn test_every_route_kept_in_order_with_missing_count() {
        let lookup = Arc::new(
            ScriptedLookup::knowing(&["KJFK", "EGLL"]).answer("FAIL", Err("503".into())),
        );
        let pipeline = pipeline_with(lookup);

        let mut first = RawRoute::new("KJFK", "NOPE");
        first.attributes.route_id = Some(json!(11));
        let mut second = RawRoute::new("FAIL", "EGLL");
        second.attributes.route_id = Some(json!(12));
        let mut third = RawRoute::new("NOPE", "FAIL");
        third.attributes.route_id = Some(json!(13));

        let (snapshot, missing) = pipeline
            .enrich(42, "Patchy Air", vec![first, second, third])
            .await;

        assert_eq!(missing, 4);
        let ids: Vec<_> = snapshot
            .routes
            .iter()
            .map(|r| r.attributes.route_id.clone())
            .collect();
        assert_eq!(ids, vec![Some(json!(11)), Some(json!(12)), Some(json!(13))]);

        let third = &snapshot.routes[2];
        assert_eq!(third.departure.code, "NOPE");
        assert!(third.departure.name.is_none());
        assert_eq!(third.destination, AirportEndpoint::unresolved("FAIL"));
        assert!(snapshot.routes[1].destination.is_resolved());
        assert_eq!(snapshot.entity_id, 42);
        assert_eq!(snapshot.entity_name, "Patchy Air");
    }

    #[tokio::test]
    async fn test_empty_route_list_yields_empty_snapshot() {
        let lookup = Arc::new(ScriptedLookup::default());
        let pipeline = pipeline_with(lookup.clone());

        let set = RawRouteSet {
            entity_id: 3,
            entity_name: "Grounded".into(),
            routes: Vec::new(),
        };
        let (snapshot, missing) = pipeline.enrich_set(set).await;

        assert!(snapshot.routes.is_empty());
        assert_eq!(missing, 0);
        assert_eq!(lookup.call_count(), 0);
    }
}
