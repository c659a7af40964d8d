//! Tile read path: cache consultation, bounded regeneration, stale fallback.

use crate::cache::{TileCache, TileStatus};
use crate::error::TileError;
use crate::render::TileRenderer;
use singletrack_core::TileCoord;
use singletrack_core::config::TileConfig;
use std::sync::Arc;
use std::time::Duration;

/// How a tile response was produced. Label for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileOutcome {
    /// Served straight from a fresh cache entry.
    CacheHit,
    /// Rendered on this request and stored.
    Rendered,
    /// Regeneration of an invalidated tile failed or timed out; the stale
    /// prior payload was served instead.
    StaleFallback,
    /// Regeneration failed with no stale payload to fall back on.
    FallbackEmpty,
}

impl TileOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CacheHit => "cache_hit",
            Self::Rendered => "rendered",
            Self::StaleFallback => "stale_fallback",
            Self::FallbackEmpty => "fallback_empty",
        }
    }
}

/// A produced tile payload. Empty bytes map to 204 upstream.
#[derive(Debug)]
pub struct TileResponse {
    pub bytes: Vec<u8>,
    pub outcome: TileOutcome,
}

/// Coordinates tile reads against the cache and the renderer.
///
/// Readers are never blocked indefinitely: regeneration of an invalidated
/// tile is bounded by the configured timeout and degrades to the stale
/// payload. Only a first render (no cache entry at all) runs unbounded,
/// since there is nothing to fall back to. Concurrent readers of the same
/// invalidated tile may each trigger a render; there is no per-coordinate
/// single-flight yet.
pub struct TileService {
    cache: Arc<TileCache>,
    renderer: TileRenderer,
    regen_timeout: Duration,
}

impl TileService {
    pub fn new(cache: Arc<TileCache>, renderer: TileRenderer, config: &TileConfig) -> Self {
        Self {
            cache,
            renderer,
            regen_timeout: Duration::from_millis(config.regen_timeout_ms),
        }
    }

    pub fn cache(&self) -> &Arc<TileCache> {
        &self.cache
    }

    /// Serve one tile. The caller has already validated the coordinate.
    pub async fn get_tile(&self, coord: TileCoord) -> Result<TileResponse, TileError> {
        // Rendering happens outside the cache lock; `get` only snapshots
        // the entry.
        match self.cache.get(coord) {
            Some(entry) if entry.status != TileStatus::Invalidated => Ok(TileResponse {
                bytes: entry.bytes,
                outcome: TileOutcome::CacheHit,
            }),
            Some(stale) => self.regenerate(coord, stale.bytes).await,
            None => {
                let bytes = self.renderer.render(coord).await?;
                self.cache.store(coord, bytes.clone());
                Ok(TileResponse {
                    bytes,
                    outcome: TileOutcome::Rendered,
                })
            }
        }
    }

    /// Priority regeneration with a bounded deadline and stale fallback.
    async fn regenerate(
        &self,
        coord: TileCoord,
        stale: Vec<u8>,
    ) -> Result<TileResponse, TileError> {
        match tokio::time::timeout(self.regen_timeout, self.renderer.render(coord)).await {
            Ok(Ok(bytes)) => {
                self.cache.store(coord, bytes.clone());
                Ok(TileResponse {
                    bytes,
                    outcome: TileOutcome::Rendered,
                })
            }
            Ok(Err(e)) => {
                tracing::warn!(tile = %coord, error = %e, "regeneration failed, serving stale");
                Ok(self.fallback(stale))
            }
            Err(_) => {
                tracing::warn!(
                    tile = %coord,
                    timeout_ms = self.regen_timeout.as_millis() as u64,
                    "regeneration timed out, serving stale"
                );
                Ok(self.fallback(stale))
            }
        }
    }

    fn fallback(&self, stale: Vec<u8>) -> TileResponse {
        if stale.is_empty() {
            TileResponse {
                bytes: Vec::new(),
                outcome: TileOutcome::FallbackEmpty,
            }
        } else {
            TileResponse {
                bytes: stale,
                outcome: TileOutcome::StaleFallback,
            }
        }
    }
}
