//! Trail and tile-index storage for the singletrack tile server.
//!
//! This crate provides the spatial source of truth:
//! - Trail records with geometry, derived attributes, and engagement
//!   aggregates
//! - The trail↔tile membership index the renderer reads from
//!
//! The tile cache upstream is an accelerator only; everything here can be
//! rebuilt from these tables.

pub mod error;
pub mod models;
pub mod repos;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use models::TrailRow;
pub use repos::{TileIndexRepo, TrailRepo};
pub use store::{SqliteStore, TrailStore};

use singletrack_core::config::StoreConfig;
use std::sync::Arc;

/// Create a trail store from configuration.
pub async fn from_config(config: &StoreConfig) -> StoreResult<Arc<dyn TrailStore>> {
    match config {
        StoreConfig::Sqlite { path } => {
            let store = SqliteStore::new(path).await?;
            Ok(Arc::new(store) as Arc<dyn TrailStore>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn from_config_sqlite_opens_and_migrates() {
        let temp = tempfile::tempdir().unwrap();
        let config = StoreConfig::Sqlite {
            path: temp.path().join("trails.db"),
        };
        let store = from_config(&config).await.unwrap();
        store.health_check().await.unwrap();
    }
}
