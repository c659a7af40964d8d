//! Domain events and the dispatcher that fans them out.

use crate::error::TileError;
use async_trait::async_trait;
use futures::future::join_all;
use singletrack_core::TileCoord;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};
use time::OffsetDateTime;
use uuid::Uuid;

/// Discriminant of an event payload; the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TrailCreated,
    TrailUpdated,
    TrailDeleted,
    EngagementUpdated,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::TrailCreated,
        EventKind::TrailUpdated,
        EventKind::TrailDeleted,
        EventKind::EngagementUpdated,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TrailCreated => "trail_created",
            Self::TrailUpdated => "trail_updated",
            Self::TrailDeleted => "trail_deleted",
            Self::EngagementUpdated => "engagement_updated",
        }
    }
}

/// Typed event payloads. Tile sets are computed by the write path while it
/// still has both sides of the mutation in hand; handlers never re-derive
/// them from geometry.
#[derive(Debug, Clone)]
pub enum EventPayload {
    TrailCreated {
        trail_id: Uuid,
        tiles: BTreeSet<TileCoord>,
    },
    TrailUpdated {
        trail_id: Uuid,
        old_tiles: BTreeSet<TileCoord>,
        new_tiles: BTreeSet<TileCoord>,
    },
    /// `tiles` is the prior tile set, captured before the index rows
    /// cascade away with the trail.
    TrailDeleted {
        trail_id: Uuid,
        tiles: BTreeSet<TileCoord>,
    },
    EngagementUpdated {
        trail_id: Uuid,
        tiles: BTreeSet<TileCoord>,
    },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::TrailCreated { .. } => EventKind::TrailCreated,
            Self::TrailUpdated { .. } => EventKind::TrailUpdated,
            Self::TrailDeleted { .. } => EventKind::TrailDeleted,
            Self::EngagementUpdated { .. } => EventKind::EngagementUpdated,
        }
    }

    pub fn trail_id(&self) -> Uuid {
        match self {
            Self::TrailCreated { trail_id, .. }
            | Self::TrailUpdated { trail_id, .. }
            | Self::TrailDeleted { trail_id, .. }
            | Self::EngagementUpdated { trail_id, .. } => *trail_id,
        }
    }

    /// The tiles this mutation makes stale.
    ///
    /// For an update this is the full union of the old and new sets, not
    /// just the symmetric difference: tiles the trail keeps covering still
    /// render the same line, but the payload embeds mutable attributes
    /// (name, difficulty, engagement tags), so kept tiles go stale too.
    pub fn affected_tiles(&self) -> BTreeSet<TileCoord> {
        match self {
            Self::TrailCreated { tiles, .. }
            | Self::TrailDeleted { tiles, .. }
            | Self::EngagementUpdated { tiles, .. } => tiles.clone(),
            Self::TrailUpdated {
                old_tiles,
                new_tiles,
                ..
            } => old_tiles.union(new_tiles).copied().collect(),
        }
    }
}

/// An immutable record of a state change. Published at most once per
/// mutation by the originating write path.
#[derive(Debug, Clone)]
pub struct DomainEvent {
    pub id: Uuid,
    pub occurred_at: OffsetDateTime,
    pub payload: EventPayload,
}

impl DomainEvent {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            occurred_at: OffsetDateTime::now_utc(),
            payload,
        }
    }
}

/// A subscriber in the invalidation pipeline.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Stable name, used in logs and aggregated error reports.
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &DomainEvent) -> Result<(), TileError>;
}

/// Fans events out to subscribed handlers.
///
/// `publish` runs all handlers for an event's kind concurrently and joins
/// before returning; every handler runs even when a sibling fails, and the
/// failures come back aggregated. Handlers doing unrelated work (cache
/// invalidation, audit logging, store sync) therefore cannot suppress each
/// other.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: RwLock<HashMap<EventKind, Vec<Arc<dyn EventHandler>>>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) {
        self.handlers
            .write()
            .expect("dispatcher lock poisoned")
            .entry(kind)
            .or_default()
            .push(handler);
    }

    /// Subscribe one handler to every event kind.
    pub fn subscribe_all(&self, handler: Arc<dyn EventHandler>) {
        for kind in EventKind::ALL {
            self.subscribe(kind, handler.clone());
        }
    }

    fn handlers_for(&self, kind: EventKind) -> Vec<Arc<dyn EventHandler>> {
        self.handlers
            .read()
            .expect("dispatcher lock poisoned")
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    /// Invoke all handlers for the event's kind concurrently; wait for all;
    /// aggregate failures.
    pub async fn publish(&self, event: &DomainEvent) -> Result<(), TileError> {
        let handlers = self.handlers_for(event.payload.kind());
        let total = handlers.len();
        let results = join_all(handlers.iter().map(|h| h.handle(event))).await;

        let failures: Vec<String> = handlers
            .iter()
            .zip(results)
            .filter_map(|(h, r)| r.err().map(|e| format!("{}: {e}", h.name())))
            .collect();
        aggregate(event, total, failures)
    }

    /// Sequential variant for callers that need deterministic handler
    /// ordering. Still runs every handler.
    pub async fn publish_sync(&self, event: &DomainEvent) -> Result<(), TileError> {
        let handlers = self.handlers_for(event.payload.kind());
        let total = handlers.len();
        let mut failures = Vec::new();
        for handler in &handlers {
            if let Err(e) = handler.handle(event).await {
                failures.push(format!("{}: {e}", handler.name()));
            }
        }
        aggregate(event, total, failures)
    }
}

fn aggregate(event: &DomainEvent, total: usize, failures: Vec<String>) -> Result<(), TileError> {
    if failures.is_empty() {
        return Ok(());
    }
    tracing::warn!(
        event_id = %event.id,
        kind = event.payload.kind().as_str(),
        failed = failures.len(),
        total,
        "event handlers failed"
    );
    Err(TileError::HandlerFailures {
        failed: failures.len(),
        total,
        details: failures.join("; "),
    })
}
