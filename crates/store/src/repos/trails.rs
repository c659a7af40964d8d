//! Trail repository trait.

use crate::error::StoreResult;
use crate::models::TrailRow;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Repository for trail records.
#[async_trait]
pub trait TrailRepo: Send + Sync {
    /// Insert a new trail.
    async fn create_trail(&self, row: &TrailRow) -> StoreResult<()>;

    /// Get a trail by id.
    async fn get_trail(&self, trail_id: Uuid) -> StoreResult<Option<TrailRow>>;

    /// Fully replace an existing trail row.
    async fn update_trail(&self, row: &TrailRow) -> StoreResult<()>;

    /// Delete a trail. Index rows cascade.
    async fn delete_trail(&self, trail_id: Uuid) -> StoreResult<()>;

    /// List all trails, ordered by id.
    async fn list_trails(&self) -> StoreResult<Vec<TrailRow>>;

    /// Overwrite the engagement aggregates on a trail row.
    async fn update_engagement(
        &self,
        trail_id: Uuid,
        rating_avg: f64,
        rating_count: i64,
        comment_count: i64,
        ridden: bool,
        updated_at: OffsetDateTime,
    ) -> StoreResult<()>;
}
