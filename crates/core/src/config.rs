//! Configuration types shared across crates.

use crate::error::{Error, Result};
use crate::MAX_ZOOM_LIMIT;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Enable request tracing.
    #[serde(default)]
    pub enable_tracing: bool,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    /// When enabled, restrict the endpoint to the scraper network at the
    /// infrastructure level.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
    /// Public URL template advertised in /tiles.json
    /// (e.g., "https://tiles.example.com/tiles/{z}/{x}/{y}.mvt").
    #[serde(default = "default_tile_url")]
    pub tile_url: String,
}

/// Tile pipeline configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TileConfig {
    /// Lowest zoom level indexed and served.
    #[serde(default = "default_min_zoom")]
    pub min_zoom: u8,
    /// Highest zoom level indexed and served.
    #[serde(default = "default_max_zoom")]
    pub max_zoom: u8,
    /// MVT extent per tile.
    #[serde(default = "default_extent")]
    pub extent: u32,
    /// Clip buffer around each tile, in extent units.
    #[serde(default = "default_buffer")]
    pub buffer: u32,
    /// Upper bound on synchronous regeneration of an invalidated tile.
    /// On expiry the request falls back to the stale payload.
    #[serde(default = "default_regen_timeout_ms")]
    pub regen_timeout_ms: u64,
}

/// Trail store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    Sqlite {
        /// Database file path.
        path: PathBuf,
    },
}

/// Top-level application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tiles: TileConfig,
    pub store: StoreConfig,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_tile_url() -> String {
    "http://localhost:8080/tiles/{z}/{x}/{y}.mvt".to_string()
}

fn default_min_zoom() -> u8 {
    6
}

fn default_max_zoom() -> u8 {
    16
}

fn default_extent() -> u32 {
    crate::TILE_EXTENT
}

fn default_buffer() -> u32 {
    crate::TILE_BUFFER
}

fn default_regen_timeout_ms() -> u64 {
    2_000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            enable_tracing: false,
            metrics_enabled: default_metrics_enabled(),
            tile_url: default_tile_url(),
        }
    }
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            min_zoom: default_min_zoom(),
            max_zoom: default_max_zoom(),
            extent: default_extent(),
            buffer: default_buffer(),
            regen_timeout_ms: default_regen_timeout_ms(),
        }
    }
}

impl TileConfig {
    /// Validate zoom and extent bounds. Fails fast at startup.
    pub fn validate(&self) -> Result<()> {
        if self.min_zoom > self.max_zoom {
            return Err(Error::InvalidZoomRange {
                min: self.min_zoom,
                max: self.max_zoom,
            });
        }
        if self.max_zoom > MAX_ZOOM_LIMIT {
            return Err(Error::Config(format!(
                "max_zoom {} exceeds limit {MAX_ZOOM_LIMIT}",
                self.max_zoom
            )));
        }
        if self.extent == 0 {
            return Err(Error::Config("extent must be nonzero".to_string()));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Create a test configuration backed by a SQLite file under `dir`.
    ///
    /// **For testing only.**
    pub fn for_testing(dir: &std::path::Path) -> Self {
        Self {
            server: ServerConfig::default(),
            tiles: TileConfig::default(),
            store: StoreConfig::Sqlite {
                path: dir.join("trails.db"),
            },
        }
    }
}
