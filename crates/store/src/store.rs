//! Trail store trait and the SQLite implementation.

use crate::error::{StoreError, StoreResult};
use crate::models::TrailRow;
use crate::repos::{TileIndexRepo, TrailRepo};
use async_trait::async_trait;
use singletrack_core::TileCoord;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

/// Combined trail store trait.
#[async_trait]
pub trait TrailStore: TrailRepo + TileIndexRepo + Send + Sync {
    /// Run database migrations.
    async fn migrate(&self) -> StoreResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> StoreResult<()>;
}

/// SQLite-based trail store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Create a new SQLite store, running migrations on open.
    pub async fn new(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Config(format!("create {}: {e}", parent.display())))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))
            .map_err(sqlx::Error::from)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection avoids
            // persistent "database is locked" failures under axum concurrency.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl TrailStore for SqliteStore {
    async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trails (
                trail_id      BLOB PRIMARY KEY,
                name          TEXT NOT NULL,
                description   TEXT NOT NULL DEFAULT '',
                difficulty    TEXT NOT NULL,
                tags          TEXT NOT NULL DEFAULT '[]',
                owner_id      BLOB NOT NULL,
                geometry      TEXT,
                min_lon       REAL,
                min_lat       REAL,
                max_lon       REAL,
                max_lat       REAL,
                distance_m    REAL NOT NULL DEFAULT 0,
                rating_avg    REAL NOT NULL DEFAULT 0,
                rating_count  INTEGER NOT NULL DEFAULT 0,
                comment_count INTEGER NOT NULL DEFAULT 0,
                ridden        INTEGER NOT NULL DEFAULT 0,
                created_at    TEXT NOT NULL,
                updated_at    TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trail_tiles (
                trail_id BLOB NOT NULL REFERENCES trails(trail_id) ON DELETE CASCADE,
                z        INTEGER NOT NULL,
                x        INTEGER NOT NULL,
                y        INTEGER NOT NULL,
                PRIMARY KEY (trail_id, z, x, y)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Read path looks tiles up by coordinate, not by trail.
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_trail_tiles_zxy ON trail_tiles(z, x, y)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl TrailRepo for SqliteStore {
    async fn create_trail(&self, row: &TrailRow) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO trails (
                trail_id, name, description, difficulty, tags, owner_id,
                geometry, min_lon, min_lat, max_lon, max_lat, distance_m,
                rating_avg, rating_count, comment_count, ridden,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(row.trail_id)
        .bind(&row.name)
        .bind(&row.description)
        .bind(&row.difficulty)
        .bind(&row.tags)
        .bind(row.owner_id)
        .bind(&row.geometry)
        .bind(row.min_lon)
        .bind(row.min_lat)
        .bind(row.max_lon)
        .bind(row.max_lat)
        .bind(row.distance_m)
        .bind(row.rating_avg)
        .bind(row.rating_count)
        .bind(row.comment_count)
        .bind(row.ridden)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_trail(&self, trail_id: Uuid) -> StoreResult<Option<TrailRow>> {
        let row = sqlx::query_as::<_, TrailRow>("SELECT * FROM trails WHERE trail_id = ?")
            .bind(trail_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_trail(&self, row: &TrailRow) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE trails SET
                name = ?, description = ?, difficulty = ?, tags = ?,
                owner_id = ?, geometry = ?, min_lon = ?, min_lat = ?,
                max_lon = ?, max_lat = ?, distance_m = ?, updated_at = ?
            WHERE trail_id = ?
            "#,
        )
        .bind(&row.name)
        .bind(&row.description)
        .bind(&row.difficulty)
        .bind(&row.tags)
        .bind(row.owner_id)
        .bind(&row.geometry)
        .bind(row.min_lon)
        .bind(row.min_lat)
        .bind(row.max_lon)
        .bind(row.max_lat)
        .bind(row.distance_m)
        .bind(row.updated_at)
        .bind(row.trail_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("trail {}", row.trail_id)));
        }
        Ok(())
    }

    async fn delete_trail(&self, trail_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM trails WHERE trail_id = ?")
            .bind(trail_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("trail {trail_id}")));
        }
        Ok(())
    }

    async fn list_trails(&self) -> StoreResult<Vec<TrailRow>> {
        let rows = sqlx::query_as::<_, TrailRow>("SELECT * FROM trails ORDER BY trail_id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn update_engagement(
        &self,
        trail_id: Uuid,
        rating_avg: f64,
        rating_count: i64,
        comment_count: i64,
        ridden: bool,
        updated_at: OffsetDateTime,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE trails SET
                rating_avg = ?, rating_count = ?, comment_count = ?,
                ridden = ?, updated_at = ?
            WHERE trail_id = ?
            "#,
        )
        .bind(rating_avg)
        .bind(rating_count)
        .bind(comment_count)
        .bind(ridden)
        .bind(updated_at)
        .bind(trail_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("trail {trail_id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl TileIndexRepo for SqliteStore {
    async fn replace_tile_index(
        &self,
        trail_id: Uuid,
        tiles: &BTreeSet<TileCoord>,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM trail_tiles WHERE trail_id = ?")
            .bind(trail_id)
            .execute(&mut *tx)
            .await?;

        for tile in tiles {
            sqlx::query("INSERT INTO trail_tiles (trail_id, z, x, y) VALUES (?, ?, ?, ?)")
                .bind(trail_id)
                .bind(tile.z as i64)
                .bind(tile.x as i64)
                .bind(tile.y as i64)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        tracing::debug!(trail_id = %trail_id, tiles = tiles.len(), "tile index replaced");
        Ok(())
    }

    async fn tiles_for_trail(&self, trail_id: Uuid) -> StoreResult<BTreeSet<TileCoord>> {
        let rows: Vec<(i64, i64, i64)> =
            sqlx::query_as("SELECT z, x, y FROM trail_tiles WHERE trail_id = ?")
                .bind(trail_id)
                .fetch_all(&self.pool)
                .await?;

        let mut tiles = BTreeSet::new();
        for (z, x, y) in rows {
            tiles.insert(TileCoord {
                z: z as u8,
                x: x as u32,
                y: y as u32,
            });
        }
        Ok(tiles)
    }

    async fn trails_for_tile(&self, coord: TileCoord) -> StoreResult<Vec<TrailRow>> {
        let rows = sqlx::query_as::<_, TrailRow>(
            r#"
            SELECT t.* FROM trails t
            JOIN trail_tiles tt ON tt.trail_id = t.trail_id
            WHERE tt.z = ? AND tt.x = ? AND tt.y = ?
            ORDER BY t.trail_id
            "#,
        )
        .bind(coord.z as i64)
        .bind(coord.x as i64)
        .bind(coord.y as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
