//! Built-in event handlers: cache invalidation, audit logging, store sync.

use crate::cache::TileCache;
use crate::error::TileError;
use crate::events::{DomainEvent, EventDispatcher, EventHandler, EventPayload};
use async_trait::async_trait;
use singletrack_core::TileCoord;
use singletrack_store::TrailStore;
use std::sync::Arc;

/// Marks the tiles affected by a mutation as invalidated. The affected set
/// comes from `EventPayload::affected_tiles` (union semantics for updates).
pub struct CacheInvalidationHandler {
    cache: Arc<TileCache>,
}

impl CacheInvalidationHandler {
    pub fn new(cache: Arc<TileCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl EventHandler for CacheInvalidationHandler {
    fn name(&self) -> &'static str {
        "cache-invalidation"
    }

    async fn handle(&self, event: &DomainEvent) -> Result<(), TileError> {
        let affected: Vec<TileCoord> = event.payload.affected_tiles().into_iter().collect();
        let count = self.cache.invalidate(&affected);
        tracing::debug!(
            event_id = %event.id,
            trail_id = %event.payload.trail_id(),
            kind = event.payload.kind().as_str(),
            tiles = count,
            "cache entries invalidated"
        );
        Ok(())
    }
}

/// Writes a structured audit line for every event. Runs independently of
/// invalidation; the dispatcher guarantees neither can suppress the other.
pub struct AuditLogHandler;

#[async_trait]
impl EventHandler for AuditLogHandler {
    fn name(&self) -> &'static str {
        "audit-log"
    }

    async fn handle(&self, event: &DomainEvent) -> Result<(), TileError> {
        tracing::info!(
            event_id = %event.id,
            occurred_at = %event.occurred_at,
            kind = event.payload.kind().as_str(),
            trail_id = %event.payload.trail_id(),
            "domain event"
        );
        Ok(())
    }
}

/// Confirms engagement aggregates landed in the store after an
/// `EngagementUpdated` event. The store is authoritative; this handler
/// only surfaces drift in the logs.
pub struct EngagementSyncHandler {
    store: Arc<dyn TrailStore>,
}

impl EngagementSyncHandler {
    pub fn new(store: Arc<dyn TrailStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl EventHandler for EngagementSyncHandler {
    fn name(&self) -> &'static str {
        "engagement-sync"
    }

    async fn handle(&self, event: &DomainEvent) -> Result<(), TileError> {
        let EventPayload::EngagementUpdated { trail_id, .. } = &event.payload else {
            return Ok(());
        };
        match self.store.get_trail(*trail_id).await? {
            Some(row) => {
                tracing::debug!(
                    trail_id = %trail_id,
                    rating_avg = row.rating_avg,
                    rating_count = row.rating_count,
                    comment_count = row.comment_count,
                    "engagement aggregates synced"
                );
                Ok(())
            }
            None => {
                tracing::warn!(trail_id = %trail_id, "engagement event for missing trail");
                Ok(())
            }
        }
    }
}

/// Wire up the standard pipeline: invalidation and audit on every kind,
/// engagement sync on engagement events.
pub fn standard_dispatcher(
    cache: Arc<TileCache>,
    store: Arc<dyn TrailStore>,
) -> Arc<EventDispatcher> {
    let dispatcher = Arc::new(EventDispatcher::new());
    dispatcher.subscribe_all(Arc::new(CacheInvalidationHandler::new(cache)));
    dispatcher.subscribe_all(Arc::new(AuditLogHandler));
    dispatcher.subscribe(
        crate::events::EventKind::EngagementUpdated,
        Arc::new(EngagementSyncHandler::new(store)),
    );
    dispatcher
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TileStatus;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn coord(x: u32, y: u32) -> TileCoord {
        TileCoord { z: 10, x, y }
    }

    fn set(coords: &[TileCoord]) -> BTreeSet<TileCoord> {
        coords.iter().copied().collect()
    }

    #[tokio::test]
    async fn create_invalidates_the_full_new_set() {
        let cache = Arc::new(TileCache::new());
        let handler = CacheInvalidationHandler::new(cache.clone());

        let event = DomainEvent::new(EventPayload::TrailCreated {
            trail_id: Uuid::new_v4(),
            tiles: set(&[coord(1, 1), coord(1, 2)]),
        });
        handler.handle(&event).await.unwrap();

        for c in [coord(1, 1), coord(1, 2)] {
            assert_eq!(cache.get(c).unwrap().status, TileStatus::Invalidated);
        }
    }

    #[tokio::test]
    async fn update_invalidates_the_union_of_old_and_new_sets() {
        let cache = Arc::new(TileCache::new());
        for c in [coord(1, 1), coord(1, 2), coord(1, 3), coord(1, 4)] {
            cache.store(c, vec![1]);
        }
        let handler = CacheInvalidationHandler::new(cache.clone());

        // old {1,1 / 1,2}, new {1,2 / 1,3}: the kept tile 1,2 goes stale
        // too since its payload embeds trail attributes.
        let event = DomainEvent::new(EventPayload::TrailUpdated {
            trail_id: Uuid::new_v4(),
            old_tiles: set(&[coord(1, 1), coord(1, 2)]),
            new_tiles: set(&[coord(1, 2), coord(1, 3)]),
        });
        handler.handle(&event).await.unwrap();

        for c in [coord(1, 1), coord(1, 2), coord(1, 3)] {
            assert_eq!(cache.get(c).unwrap().status, TileStatus::Invalidated);
        }
        // An unrelated tile is untouched.
        assert_eq!(cache.get(coord(1, 4)).unwrap().status, TileStatus::Valid);
    }

    #[tokio::test]
    async fn delete_invalidates_the_prior_set() {
        let cache = Arc::new(TileCache::new());
        cache.store(coord(4, 4), vec![1]);
        let handler = CacheInvalidationHandler::new(cache.clone());

        let event = DomainEvent::new(EventPayload::TrailDeleted {
            trail_id: Uuid::new_v4(),
            tiles: set(&[coord(4, 4)]),
        });
        handler.handle(&event).await.unwrap();
        assert_eq!(cache.get(coord(4, 4)).unwrap().status, TileStatus::Invalidated);
    }

    #[tokio::test]
    async fn update_into_an_uncached_tile_leaves_a_placeholder() {
        // The open question from the design review: a tile the trail newly
        // intersects may never have been rendered. Invalidation must still
        // leave a marker so the next read regenerates.
        let cache = Arc::new(TileCache::new());
        let handler = CacheInvalidationHandler::new(cache.clone());

        let event = DomainEvent::new(EventPayload::TrailUpdated {
            trail_id: Uuid::new_v4(),
            old_tiles: BTreeSet::new(),
            new_tiles: set(&[coord(9, 9)]),
        });
        handler.handle(&event).await.unwrap();

        let entry = cache.get(coord(9, 9)).unwrap();
        assert_eq!(entry.status, TileStatus::Invalidated);
        assert!(entry.bytes.is_empty());
    }
}
