//! Tile generation, spatial indexing, and cache invalidation for
//! singletrack.
//!
//! This crate is the core pipeline:
//! - `index` maps trail geometries to the tiles they intersect
//! - `render` turns a tile coordinate into MVT bytes
//! - `cache` tracks rendered payloads with an explicit freshness state
//! - `events` + `handlers` fan trail mutations out to decoupled handlers
//! - `service` is the write path (index recompute + event publish)
//! - `coordinator` is the read path (bounded regeneration, stale fallback)

pub mod cache;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod handlers;
pub mod index;
pub mod render;
pub mod service;

pub use cache::{CachedTile, TileCache, TileStatus};
pub use coordinator::{TileOutcome, TileResponse, TileService};
pub use error::TileError;
pub use events::{DomainEvent, EventDispatcher, EventHandler, EventKind, EventPayload};
pub use handlers::{
    AuditLogHandler, CacheInvalidationHandler, EngagementSyncHandler, standard_dispatcher,
};
pub use index::{compute_tiles, simplification_tolerance};
pub use render::TileRenderer;
pub use service::{EngagementSnapshot, EventReceipt, TrailService, WriteOutcome};
