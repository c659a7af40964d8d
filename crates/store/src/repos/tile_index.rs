//! Trail-to-tile index repository trait.

use crate::error::StoreResult;
use crate::models::TrailRow;
use async_trait::async_trait;
use singletrack_core::TileCoord;
use std::collections::BTreeSet;
use uuid::Uuid;

/// Repository for the trail↔tile membership relation.
///
/// The index is the only source of truth for which tiles a trail affects.
/// It is fully replaced on every geometry write; there is no row-level
/// diffing at this layer.
#[async_trait]
pub trait TileIndexRepo: Send + Sync {
    /// Delete all index rows for `trail_id` and insert `tiles` atomically.
    async fn replace_tile_index(
        &self,
        trail_id: Uuid,
        tiles: &BTreeSet<TileCoord>,
    ) -> StoreResult<()>;

    /// Current tile membership of one trail.
    async fn tiles_for_trail(&self, trail_id: Uuid) -> StoreResult<BTreeSet<TileCoord>>;

    /// All trails indexed to one tile, ordered by trail id so renders are
    /// deterministic.
    async fn trails_for_tile(&self, coord: TileCoord) -> StoreResult<Vec<TrailRow>>;
}
