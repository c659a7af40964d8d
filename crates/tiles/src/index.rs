//! Spatial index: which tiles does a trail geometry touch?

use geo::{BoundingRect, Intersects};
use geo_types::{Coord, LineString, Point};
use singletrack_core::tile::{MERCATOR_EXTENT, lat_to_mercator, lon_to_mercator};
use singletrack_core::{DETAIL_ZOOM, TileCoord};
use std::collections::BTreeSet;

/// Maximum allowed deviation (degrees) when thinning a line for zoom `z`.
///
/// Monotonically non-increasing; zero at and above [`DETAIL_ZOOM`], where
/// geometry renders untouched.
pub fn simplification_tolerance(z: u8) -> f64 {
    if z >= DETAIL_ZOOM {
        return 0.0;
    }
    match z {
        0..=7 => 0.002,
        8..=9 => 0.001,
        10..=11 => 0.0005,
        _ => 0.0001,
    }
}

/// Compute the exact set of tiles `line` intersects across a zoom range.
///
/// Candidates come from the projected bounding box per zoom; each candidate
/// is kept only if its Web-Mercator envelope truly intersects the projected
/// polyline, so a diagonal trail does not claim every tile its bbox covers.
/// The result is a full replacement set for the trail's index rows.
pub fn compute_tiles(line: &LineString<f64>, min_zoom: u8, max_zoom: u8) -> BTreeSet<TileCoord> {
    let mut tiles = BTreeSet::new();
    if line.0.is_empty() || min_zoom > max_zoom {
        return tiles;
    }

    let projected: LineString<f64> = line
        .coords()
        .map(|c| Coord {
            x: lon_to_mercator(c.x),
            y: lat_to_mercator(c.y),
        })
        .collect::<Vec<_>>()
        .into();
    let Some(bounds) = projected.bounding_rect() else {
        return tiles;
    };

    for z in min_zoom..=max_zoom {
        let n = 1u64 << z;
        let span = 2.0 * MERCATOR_EXTENT / n as f64;
        let clamp = |f: f64| (f.floor().max(0.0) as u64).min(n - 1) as u32;
        let col = |mx: f64| clamp((mx + MERCATOR_EXTENT) / span);
        let row = |my: f64| clamp((MERCATOR_EXTENT - my) / span);

        let (x0, x1) = (col(bounds.min().x), col(bounds.max().x));
        // Mercator y grows northward, rows southward.
        let (y0, y1) = (row(bounds.max().y), row(bounds.min().y));

        for x in x0..=x1 {
            for y in y0..=y1 {
                let tile = TileCoord { z, x, y };
                let env = tile.envelope();
                // A single-coordinate line has no segments, so Intersects
                // never fires; fall back to a point containment test.
                let hit = if projected.0.len() < 2 {
                    env.intersects(&Point::from(projected.0[0]))
                } else {
                    env.intersects(&projected)
                };
                if hit {
                    tiles.insert(tile);
                }
            }
        }
    }
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use singletrack_core::trail::line_from_lonlat;

    #[test]
    fn tolerance_is_monotone_and_zero_above_detail_zoom() {
        for z in 0..DETAIL_ZOOM {
            assert!(simplification_tolerance(z) >= simplification_tolerance(z + 1));
            assert!(simplification_tolerance(z) > 0.0);
        }
        assert_eq!(simplification_tolerance(DETAIL_ZOOM), 0.0);
        assert_eq!(simplification_tolerance(20), 0.0);
    }

    #[test]
    fn empty_line_yields_no_tiles() {
        let line = LineString::<f64>::new(vec![]);
        assert!(compute_tiles(&line, 6, 12).is_empty());
    }

    #[test]
    fn single_point_yields_containing_tile_at_every_zoom() {
        let line = line_from_lonlat(&[[11.39, 47.26]]).unwrap();
        let tiles = compute_tiles(&line, 6, 12);
        for z in 6..=12u8 {
            let expected = TileCoord::containing(11.39, 47.26, z);
            assert!(tiles.contains(&expected), "missing {expected}");
        }
        assert_eq!(tiles.len(), 7);
    }

    #[test]
    fn result_is_idempotent() {
        let line = line_from_lonlat(&[[11.30, 47.25], [11.45, 47.30], [11.60, 47.22]]).unwrap();
        let a = compute_tiles(&line, 6, 14);
        let b = compute_tiles(&line, 6, 14);
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn every_vertex_tile_is_covered() {
        let coords = [[11.30, 47.25], [11.45, 47.30], [11.60, 47.22]];
        let line = line_from_lonlat(&coords).unwrap();
        let tiles = compute_tiles(&line, 8, 14);
        for [lon, lat] in coords {
            for z in 8..=14u8 {
                assert!(tiles.contains(&TileCoord::containing(lon, lat, z)));
            }
        }
    }

    #[test]
    fn diagonal_line_claims_fewer_tiles_than_its_bbox() {
        // A long diagonal at high zoom: the bbox range is a large square,
        // the line itself only grazes the tiles along the diagonal.
        let line = line_from_lonlat(&[[11.0, 47.0], [12.0, 48.0]]).unwrap();
        let tiles = compute_tiles(&line, 12, 12);

        let a = TileCoord::containing(11.0, 47.0, 12);
        let b = TileCoord::containing(12.0, 48.0, 12);
        let bbox_count =
            (u64::from(b.x.abs_diff(a.x)) + 1) * (u64::from(a.y.abs_diff(b.y)) + 1);
        assert!(
            (tiles.len() as u64) < bbox_count / 2,
            "{} tiles vs bbox {}",
            tiles.len(),
            bbox_count
        );
    }

    #[test]
    fn tiles_stay_inside_the_grid() {
        // Hug the antimeridian and the mercator clip latitude.
        let line = line_from_lonlat(&[[-179.999, 84.9], [-179.0, 85.05]]).unwrap();
        for tile in compute_tiles(&line, 4, 8) {
            assert!(u64::from(tile.x) < 1u64 << tile.z);
            assert!(u64::from(tile.y) < 1u64 << tile.z);
        }
    }
}
