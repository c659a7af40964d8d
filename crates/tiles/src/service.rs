//! Trail write path: store mutation, synchronous index recompute, event
//! publish.
//!
//! The index recompute runs inside the write (single authority for
//! trail↔tile membership); cache invalidation rides on the event published
//! afterward. A handler failure is logged, not returned — the next write to
//! the same trail recomputes the index again, so invalidation is eventually
//! consistent.

use crate::error::TileError;
use crate::events::{DomainEvent, EventDispatcher, EventPayload};
use crate::index::compute_tiles;
use singletrack_core::config::TileConfig;
use singletrack_core::{NewTrail, Trail};
use singletrack_store::{StoreError, TrailRow, TrailStore};
use std::collections::BTreeSet;
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

/// Engagement aggregates pushed by the ratings/comments collaborator.
#[derive(Debug, Clone, Copy)]
pub struct EngagementSnapshot {
    pub rating_avg: f64,
    pub rating_count: i64,
    pub comment_count: i64,
    pub ridden: bool,
}

/// What publishing a mutation event did downstream. Callers use this to
/// account for pipeline activity; it never carries an error.
#[derive(Debug, Clone, Copy)]
pub struct EventReceipt {
    /// Tiles the event flagged for regeneration.
    pub invalidated_tiles: usize,
    /// Handlers that returned an error. Logged, never fatal to the write.
    pub handler_failures: usize,
}

/// A stored trail plus the pipeline receipt for the mutation.
#[derive(Debug)]
pub struct WriteOutcome {
    pub trail: Trail,
    pub events: EventReceipt,
}

/// Mutating entry points for trails.
pub struct TrailService {
    store: Arc<dyn TrailStore>,
    dispatcher: Arc<EventDispatcher>,
    config: TileConfig,
}

impl TrailService {
    pub fn new(
        store: Arc<dyn TrailStore>,
        dispatcher: Arc<EventDispatcher>,
        config: TileConfig,
    ) -> Self {
        Self {
            store,
            dispatcher,
            config,
        }
    }

    fn tiles_of(&self, trail: &Trail) -> BTreeSet<singletrack_core::TileCoord> {
        trail
            .geometry
            .as_ref()
            .map(|g| compute_tiles(g, self.config.min_zoom, self.config.max_zoom))
            .unwrap_or_default()
    }

    pub async fn create_trail(&self, new: NewTrail) -> Result<WriteOutcome, TileError> {
        let trail = Trail::from_new(Uuid::new_v4(), new, OffsetDateTime::now_utc());
        self.store
            .create_trail(&TrailRow::from_trail(&trail)?)
            .await?;

        let tiles = self.tiles_of(&trail);
        self.store.replace_tile_index(trail.id, &tiles).await?;

        let events = self
            .publish(EventPayload::TrailCreated {
                trail_id: trail.id,
                tiles,
            })
            .await;
        Ok(WriteOutcome { trail, events })
    }

    /// Full replacement update. Geometry attributes re-derive; the tile
    /// index is rebuilt and the event carries both membership sets.
    pub async fn update_trail(&self, id: Uuid, new: NewTrail) -> Result<WriteOutcome, TileError> {
        let row = self
            .store
            .get_trail(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("trail {id}")))?;
        let mut trail = row.into_trail()?;

        let old_tiles = self.store.tiles_for_trail(id).await?;
        trail.apply(new, OffsetDateTime::now_utc());
        self.store.update_trail(&TrailRow::from_trail(&trail)?).await?;

        let new_tiles = self.tiles_of(&trail);
        self.store.replace_tile_index(id, &new_tiles).await?;

        let events = self
            .publish(EventPayload::TrailUpdated {
                trail_id: id,
                old_tiles,
                new_tiles,
            })
            .await;
        Ok(WriteOutcome { trail, events })
    }

    pub async fn delete_trail(&self, id: Uuid) -> Result<EventReceipt, TileError> {
        // The index is the only record of which tiles this trail covered,
        // and it cascades away with the row. Capture it first.
        let tiles = self.store.tiles_for_trail(id).await?;
        self.store.delete_trail(id).await?;

        let events = self
            .publish(EventPayload::TrailDeleted {
                trail_id: id,
                tiles,
            })
            .await;
        Ok(events)
    }

    pub async fn record_engagement(
        &self,
        id: Uuid,
        snapshot: EngagementSnapshot,
    ) -> Result<WriteOutcome, TileError> {
        self.store
            .update_engagement(
                id,
                snapshot.rating_avg,
                snapshot.rating_count,
                snapshot.comment_count,
                snapshot.ridden,
                OffsetDateTime::now_utc(),
            )
            .await?;

        let tiles = self.store.tiles_for_trail(id).await?;
        let events = self
            .publish(EventPayload::EngagementUpdated {
                trail_id: id,
                tiles,
            })
            .await;

        let row = self
            .store
            .get_trail(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("trail {id}")))?;
        Ok(WriteOutcome {
            trail: row.into_trail()?,
            events,
        })
    }

    pub async fn get_trail(&self, id: Uuid) -> Result<Option<Trail>, TileError> {
        match self.store.get_trail(id).await? {
            Some(row) => Ok(Some(row.into_trail()?)),
            None => Ok(None),
        }
    }

    pub async fn list_trails(&self) -> Result<Vec<Trail>, TileError> {
        let rows = self.store.list_trails().await?;
        let mut trails = Vec::with_capacity(rows.len());
        for row in rows {
            trails.push(row.into_trail()?);
        }
        Ok(trails)
    }

    async fn publish(&self, payload: EventPayload) -> EventReceipt {
        let invalidated_tiles = payload.affected_tiles().len();
        let event = DomainEvent::new(payload);
        let handler_failures = match self.dispatcher.publish(&event).await {
            Ok(()) => 0,
            Err(e) => {
                tracing::warn!(
                    event_id = %event.id,
                    kind = event.payload.kind().as_str(),
                    error = %e,
                    "event handlers failed; invalidation retries on next write"
                );
                match e {
                    TileError::HandlerFailures { failed, .. } => failed,
                    _ => 1,
                }
            }
        };
        EventReceipt {
            invalidated_tiles,
            handler_failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{TileCache, TileStatus};
    use crate::handlers::standard_dispatcher;
    use singletrack_core::trail::line_from_lonlat;
    use singletrack_core::{Difficulty, TileCoord};
    use singletrack_store::{SqliteStore, TileIndexRepo};

    async fn fixture() -> (
        tempfile::TempDir,
        Arc<SqliteStore>,
        Arc<TileCache>,
        TrailService,
    ) {
        let temp = tempfile::tempdir().unwrap();
        let store = Arc::new(
            SqliteStore::new(temp.path().join("trails.db")).await.unwrap(),
        );
        let cache = Arc::new(TileCache::new());
        let dispatcher = standard_dispatcher(cache.clone(), store.clone());
        let service = TrailService::new(store.clone(), dispatcher, TileConfig::default());
        (temp, store, cache, service)
    }

    fn new_trail(line: &[[f64; 2]]) -> NewTrail {
        NewTrail {
            name: "Götzner".to_string(),
            description: String::new(),
            difficulty: Difficulty::Advanced,
            tags: vec!["jumps".to_string()],
            owner_id: Uuid::new_v4(),
            geometry: Some(line_from_lonlat(line).unwrap()),
        }
    }

    #[tokio::test]
    async fn create_indexes_and_invalidates_new_tiles() {
        let (_temp, store, cache, service) = fixture().await;

        let trail = service
            .create_trail(new_trail(&[[11.30, 47.25], [11.35, 47.27]]))
            .await
            .unwrap()
            .trail;

        let tiles = store.tiles_for_trail(trail.id).await.unwrap();
        assert!(!tiles.is_empty());
        for tile in &tiles {
            assert_eq!(cache.get(*tile).unwrap().status, TileStatus::Invalidated);
        }
    }

    #[tokio::test]
    async fn create_without_geometry_touches_nothing() {
        let (_temp, store, cache, service) = fixture().await;

        let mut new = new_trail(&[[11.30, 47.25], [11.35, 47.27]]);
        new.geometry = None;
        let trail = service.create_trail(new).await.unwrap().trail;

        assert!(store.tiles_for_trail(trail.id).await.unwrap().is_empty());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn update_replaces_index_and_invalidates_old_and_new_tiles() {
        let (_temp, store, cache, service) = fixture().await;

        let trail = service
            .create_trail(new_trail(&[[11.30, 47.25], [11.35, 47.27]]))
            .await
            .unwrap()
            .trail;
        let old_tiles = store.tiles_for_trail(trail.id).await.unwrap();

        // Mark everything valid so the update's invalidation is visible.
        for tile in &old_tiles {
            cache.store(*tile, vec![1]);
        }

        // Move the trail to a different valley.
        service
            .update_trail(trail.id, new_trail(&[[11.50, 47.10], [11.55, 47.12]]))
            .await
            .unwrap();
        let new_tiles = store.tiles_for_trail(trail.id).await.unwrap();
        assert!(!new_tiles.is_empty());
        assert_ne!(old_tiles, new_tiles);

        for tile in old_tiles.union(&new_tiles) {
            assert_eq!(
                cache.get(*tile).unwrap().status,
                TileStatus::Invalidated,
                "tile {tile} should be invalidated"
            );
        }
    }

    #[tokio::test]
    async fn delete_invalidates_prior_tiles_captured_before_cascade() {
        let (_temp, store, cache, service) = fixture().await;

        let trail = service
            .create_trail(new_trail(&[[11.30, 47.25], [11.35, 47.27]]))
            .await
            .unwrap()
            .trail;
        let tiles = store.tiles_for_trail(trail.id).await.unwrap();
        for tile in &tiles {
            cache.store(*tile, vec![1]);
        }

        service.delete_trail(trail.id).await.unwrap();

        assert!(store.tiles_for_trail(trail.id).await.unwrap().is_empty());
        for tile in &tiles {
            assert_eq!(cache.get(*tile).unwrap().status, TileStatus::Invalidated);
        }
    }

    #[tokio::test]
    async fn delete_missing_trail_is_not_found() {
        let (_temp, _store, _cache, service) = fixture().await;
        let err = service.delete_trail(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, TileError::Store(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn engagement_updates_aggregates_and_invalidates_tiles() {
        let (_temp, store, cache, service) = fixture().await;

        let trail = service
            .create_trail(new_trail(&[[11.30, 47.25], [11.35, 47.27]]))
            .await
            .unwrap()
            .trail;
        let tiles = store.tiles_for_trail(trail.id).await.unwrap();
        for tile in &tiles {
            cache.store(*tile, vec![1]);
        }

        let updated = service
            .record_engagement(
                trail.id,
                EngagementSnapshot {
                    rating_avg: 4.5,
                    rating_count: 12,
                    comment_count: 3,
                    ridden: true,
                },
            )
            .await
            .unwrap()
            .trail;

        assert_eq!(updated.rating_count, 12);
        assert!(updated.ridden);
        for tile in &tiles {
            assert_eq!(cache.get(*tile).unwrap().status, TileStatus::Invalidated);
        }
    }

    #[tokio::test]
    async fn write_outcome_reports_invalidated_tile_count() {
        let (_temp, store, cache, service) = fixture().await;

        let outcome = service
            .create_trail(new_trail(&[[11.30, 47.25], [11.35, 47.27]]))
            .await
            .unwrap();

        let tiles = store.tiles_for_trail(outcome.trail.id).await.unwrap();
        assert_eq!(outcome.events.invalidated_tiles, tiles.len());
        assert_eq!(outcome.events.handler_failures, 0);
        assert_eq!(cache.len(), tiles.len());

        let receipt = service.delete_trail(outcome.trail.id).await.unwrap();
        assert_eq!(receipt.invalidated_tiles, tiles.len());
        assert_eq!(receipt.handler_failures, 0);
    }

    struct FailingHandler;

    #[async_trait::async_trait]
    impl crate::events::EventHandler for FailingHandler {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn handle(&self, _event: &DomainEvent) -> Result<(), TileError> {
            Err(TileError::HandlerFailures {
                failed: 1,
                total: 1,
                details: "sink unavailable".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn handler_failure_is_counted_but_does_not_fail_the_write() {
        let (_temp, store, cache, service) = fixture().await;
        service
            .dispatcher
            .subscribe_all(Arc::new(FailingHandler));

        let outcome = service
            .create_trail(new_trail(&[[11.30, 47.25], [11.35, 47.27]]))
            .await
            .unwrap();

        assert_eq!(outcome.events.handler_failures, 1);
        // The write and the sibling invalidation handler still landed.
        let tiles = store.tiles_for_trail(outcome.trail.id).await.unwrap();
        assert!(!tiles.is_empty());
        for tile in &tiles {
            assert_eq!(cache.get(*tile).unwrap().status, TileStatus::Invalidated);
        }
    }

    #[tokio::test]
    async fn update_tile_sets_cover_scenario_geometry_moves() {
        // A trail leaves a tile entirely: that tile must be in the
        // invalidated set so the next read renders it empty.
        let (_temp, store, cache, service) = fixture().await;

        let trail = service
            .create_trail(new_trail(&[[11.30, 47.25], [11.32, 47.26]]))
            .await
            .unwrap()
            .trail;
        let old_tiles = store.tiles_for_trail(trail.id).await.unwrap();
        let left_tile: TileCoord = *old_tiles.iter().next().unwrap();
        cache.store(left_tile, vec![42]);

        service
            .update_trail(trail.id, new_trail(&[[12.80, 46.80], [12.82, 46.81]]))
            .await
            .unwrap();

        let new_tiles = store.tiles_for_trail(trail.id).await.unwrap();
        assert!(!new_tiles.contains(&left_tile));
        assert_eq!(
            cache.get(left_tile).unwrap().status,
            TileStatus::Invalidated
        );
        // Stale bytes retained for fallback.
        assert_eq!(cache.get(left_tile).unwrap().bytes, vec![42]);
    }
}
