//! Error types for the tile pipeline.

use singletrack_store::StoreError;
use thiserror::Error;

/// Tile pipeline error type.
#[derive(Debug, Error)]
pub enum TileError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("core error: {0}")]
    Core(#[from] singletrack_core::Error),

    #[error("tile encoding error: {0}")]
    Encode(#[from] mvt::Error),

    #[error("{failed} of {total} event handlers failed: {details}")]
    HandlerFailures {
        failed: usize,
        total: usize,
        details: String,
    },
}
