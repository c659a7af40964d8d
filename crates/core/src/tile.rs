//! Slippy-map tile coordinates and Web-Mercator (EPSG:3857) projection math.

use crate::error::{Error, Result};
use geo_types::{Coord, Rect};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Half the width of the Web-Mercator plane in meters (x of longitude 180°).
pub const MERCATOR_EXTENT: f64 = 20_037_508.342_789_244;

/// Latitude beyond which Web Mercator is undefined; inputs are clamped.
pub const MAX_LATITUDE: f64 = 85.051_128_78;

/// Project a longitude (degrees) to Web-Mercator x (meters).
pub fn lon_to_mercator(lon: f64) -> f64 {
    lon * MERCATOR_EXTENT / 180.0
}

/// Project a latitude (degrees) to Web-Mercator y (meters).
pub fn lat_to_mercator(lat: f64) -> f64 {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    (PI / 4.0 + lat.to_radians() / 2.0).tan().ln() * MERCATOR_EXTENT / PI
}

/// A slippy-map tile address.
///
/// Valid when `z` lies within the configured zoom range and `x`, `y` are
/// inside the `2^z` grid. Construct through [`TileCoord::new`] so invalid
/// addresses are rejected before they reach the cache or the database.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    /// Validate and build a tile coordinate against a zoom range.
    pub fn new(z: u8, x: u32, y: u32, min_zoom: u8, max_zoom: u8) -> Result<Self> {
        if min_zoom > max_zoom {
            return Err(Error::InvalidZoomRange {
                min: min_zoom,
                max: max_zoom,
            });
        }
        if z < min_zoom || z > max_zoom {
            return Err(Error::InvalidCoordinate {
                z: z as u32,
                x,
                y,
                reason: format!("zoom outside [{min_zoom}, {max_zoom}]"),
            });
        }
        let n = 1u64 << z;
        if (x as u64) >= n || (y as u64) >= n {
            return Err(Error::InvalidCoordinate {
                z: z as u32,
                x,
                y,
                reason: format!("x/y outside 2^{z} grid"),
            });
        }
        Ok(Self { z, x, y })
    }

    /// Build without range validation. For internal enumeration where
    /// `x`/`y` are already clamped to the grid.
    pub(crate) fn unchecked(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Number of tiles per axis at this zoom level.
    pub fn grid_size(self) -> u64 {
        1u64 << self.z
    }

    /// Width (== height) of this tile in Web-Mercator meters.
    pub fn span(self) -> f64 {
        2.0 * MERCATOR_EXTENT / self.grid_size() as f64
    }

    /// The tile's envelope in Web-Mercator meters.
    ///
    /// Tile y grows southward, Mercator y northward, so row 0 sits at the
    /// top of the plane.
    pub fn envelope(self) -> Rect<f64> {
        let span = self.span();
        let min_x = -MERCATOR_EXTENT + self.x as f64 * span;
        let max_y = MERCATOR_EXTENT - self.y as f64 * span;
        Rect::new(
            Coord {
                x: min_x,
                y: max_y - span,
            },
            Coord {
                x: min_x + span,
                y: max_y,
            },
        )
    }

    /// The envelope expanded by `buffer` extent units on every side.
    pub fn buffered_envelope(self, extent: u32, buffer: u32) -> Rect<f64> {
        let margin = self.span() * buffer as f64 / extent as f64;
        let env = self.envelope();
        Rect::new(
            Coord {
                x: env.min().x - margin,
                y: env.min().y - margin,
            },
            Coord {
                x: env.max().x + margin,
                y: env.max().y + margin,
            },
        )
    }

    /// The tile containing a lon/lat position at zoom `z`.
    pub fn containing(lon: f64, lat: f64, z: u8) -> Self {
        let n = (1u64 << z) as f64;
        let world = 2.0 * MERCATOR_EXTENT;
        let fx = (lon_to_mercator(lon) + MERCATOR_EXTENT) / world;
        let fy = (MERCATOR_EXTENT - lat_to_mercator(lat)) / world;
        let clamp = |f: f64| ((f * n).floor().max(0.0) as u64).min((1u64 << z) - 1) as u32;
        Self::unchecked(z, clamp(fx), clamp(fy))
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}
