//! Core domain types and shared logic for the singletrack trail tile server.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Tile coordinates and Web-Mercator projection math
//! - Trail records with derived geometry attributes
//! - Configuration types consumed by the binary

pub mod config;
pub mod error;
pub mod tile;
pub mod trail;

pub use config::{AppConfig, ServerConfig, StoreConfig, TileConfig};
pub use error::{Error, Result};
pub use tile::TileCoord;
pub use trail::{Difficulty, NewTrail, Trail};

/// MVT tile extent: coordinates within a tile span [0, 4096).
pub const TILE_EXTENT: u32 = 4096;

/// Clip buffer around each tile, in extent units. Geometry within this
/// margin beyond the tile edge is kept so strokes crossing tile borders
/// render without seams.
pub const TILE_BUFFER: u32 = 256;

/// Hard upper bound on zoom levels accepted from configuration.
pub const MAX_ZOOM_LIMIT: u8 = 22;

/// Zoom level at or above which geometry is rendered without simplification.
pub const DETAIL_ZOOM: u8 = 13;
