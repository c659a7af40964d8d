//! Tile renderer: trails intersecting a tile → binary MVT payload.

use crate::error::TileError;
use crate::index::simplification_tolerance;
use geo::Simplify;
use geo_types::{Coord, LineString};
use mvt::{Feature, GeomEncoder, GeomType, Tile};
use singletrack_core::config::TileConfig;
use singletrack_core::tile::{lat_to_mercator, lon_to_mercator};
use singletrack_core::{TileCoord, Trail};
use singletrack_store::TrailStore;
use std::sync::Arc;

const EPS: f64 = 1e-9;

/// Renders tiles from the trails the spatial index maps to them.
///
/// Rendering the same coordinate twice against unchanged trail data yields
/// byte-identical output: the store returns trails ordered by id and every
/// later stage is a pure function of that sequence.
pub struct TileRenderer {
    store: Arc<dyn TrailStore>,
    config: TileConfig,
}

/// Projects lon/lat into tile-local extent units (y grows southward).
struct TileProjection {
    min_x: f64,
    max_y: f64,
    scale: f64,
}

impl TileProjection {
    fn new(coord: TileCoord, extent: u32) -> Self {
        let env = coord.envelope();
        Self {
            min_x: env.min().x,
            max_y: env.max().y,
            scale: extent as f64 / coord.span(),
        }
    }

    fn project(&self, c: Coord<f64>) -> (f64, f64) {
        (
            (lon_to_mercator(c.x) - self.min_x) * self.scale,
            (self.max_y - lat_to_mercator(c.y)) * self.scale,
        )
    }
}

impl TileRenderer {
    pub fn new(store: Arc<dyn TrailStore>, config: TileConfig) -> Self {
        Self { store, config }
    }

    /// Render one tile. Empty bytes mean zero features, which is a valid
    /// outcome distinct from an error.
    pub async fn render(&self, coord: TileCoord) -> Result<Vec<u8>, TileError> {
        let rows = self.store.trails_for_tile(coord).await?;
        let mut trails = Vec::with_capacity(rows.len());
        for row in rows {
            trails.push(row.into_trail()?);
        }
        self.encode(coord, &trails)
    }

    fn encode(&self, coord: TileCoord, trails: &[Trail]) -> Result<Vec<u8>, TileError> {
        let extent = self.config.extent;
        let buffer = self.config.buffer as f64;
        let tolerance = simplification_tolerance(coord.z);
        let projection = TileProjection::new(coord, extent);
        let (lo, hi) = (-buffer, extent as f64 + buffer);

        // First pass: clip every line, keeping the trails that survive.
        let mut lines: Vec<(&Trail, Vec<Vec<(f64, f64)>>)> = Vec::new();
        for trail in trails {
            let Some(geometry) = trail.geometry.as_ref() else {
                continue;
            };
            let simplified;
            let line: &LineString<f64> = if tolerance > 0.0 {
                simplified = geometry.simplify(&tolerance);
                &simplified
            } else {
                geometry
            };
            let local: Vec<(f64, f64)> =
                line.coords().map(|c| projection.project(*c)).collect();
            let parts = snap(clip_polyline(&local, lo, hi));
            if !parts.is_empty() {
                lines.push((trail, parts));
            }
        }

        // Second pass: start/end markers that land inside the buffered
        // window, including those of trails whose line clipped away (a
        // degenerate single-point geometry has no renderable line at all).
        let mut markers: Vec<(&Trail, &'static str, (f64, f64))> = Vec::new();
        for trail in trails {
            for (kind, point) in [("start", trail.start()), ("end", trail.end())] {
                let Some(c) = point else { continue };
                let (x, y) = projection.project(c);
                if x >= lo && x <= hi && y >= lo && y <= hi {
                    markers.push((trail, kind, (x.round(), y.round())));
                }
            }
        }

        if lines.is_empty() && markers.is_empty() {
            return Ok(Vec::new());
        }

        let mut tile = Tile::new(extent);

        let mut layer = tile.create_layer("trails");
        for (trail, parts) in &lines {
            let mut encoder = GeomEncoder::new(GeomType::Linestring);
            for part in parts {
                for (x, y) in part {
                    encoder = encoder.point(*x, *y)?;
                }
                encoder = encoder.complete()?;
            }
            let geom = encoder.encode()?;
            let mut feature = layer.into_feature(geom);
            feature.set_id(feature_id(trail));
            add_trail_tags(&mut feature, trail);
            layer = feature.into_layer();
        }
        tile.add_layer(layer)?;

        let mut marker_layer = tile.create_layer("trail_markers");
        for (trail, kind, (x, y)) in &markers {
            let geom = GeomEncoder::new(GeomType::Point)
                .point(*x, *y)?
                .encode()?;
            let mut feature = marker_layer.into_feature(geom);
            feature.add_tag_string("trail_id", &trail.id.to_string());
            feature.add_tag_string("name", &trail.name);
            feature.add_tag_string("kind", kind);
            marker_layer = feature.into_layer();
        }
        tile.add_layer(marker_layer)?;

        Ok(tile.to_bytes()?)
    }
}

/// Stable numeric feature id derived from the trail uuid.
fn feature_id(trail: &Trail) -> u64 {
    let b = trail.id.as_bytes();
    u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
}

fn add_trail_tags(feature: &mut Feature, trail: &Trail) {
    feature.add_tag_string("id", &trail.id.to_string());
    feature.add_tag_string("name", &trail.name);
    feature.add_tag_string("description", &trail.description);
    feature.add_tag_string("difficulty", trail.difficulty.as_str());
    feature.add_tag_string("tags", &trail.tags.join(","));
    feature.add_tag_string("owner_id", &trail.owner_id.to_string());
    feature.add_tag_sint("created_at", trail.created_at.unix_timestamp());
    feature.add_tag_sint("updated_at", trail.updated_at.unix_timestamp());
    if let Some(bbox) = trail.bbox {
        feature.add_tag_double("min_lon", bbox.min().x);
        feature.add_tag_double("min_lat", bbox.min().y);
        feature.add_tag_double("max_lon", bbox.max().x);
        feature.add_tag_double("max_lat", bbox.max().y);
    }
    if let (Some(start), Some(end)) = (trail.start(), trail.end()) {
        feature.add_tag_double("start_lon", start.x);
        feature.add_tag_double("start_lat", start.y);
        feature.add_tag_double("end_lon", end.x);
        feature.add_tag_double("end_lat", end.y);
    }
    feature.add_tag_double("distance_m", trail.distance_m);
    feature.add_tag_double("rating_avg", trail.rating_avg);
    feature.add_tag_sint("rating_count", trail.rating_count);
    feature.add_tag_sint("comment_count", trail.comment_count);
    feature.add_tag_bool("ridden", trail.ridden);
}

fn close(a: (f64, f64), b: (f64, f64)) -> bool {
    (a.0 - b.0).abs() < EPS && (a.1 - b.1).abs() < EPS
}

/// Liang–Barsky clip of one segment against the square window `[lo, hi]²`.
fn clip_segment(
    a: (f64, f64),
    b: (f64, f64),
    lo: f64,
    hi: f64,
) -> Option<((f64, f64), (f64, f64))> {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;
    for (p, q) in [
        (-dx, a.0 - lo),
        (dx, hi - a.0),
        (-dy, a.1 - lo),
        (dy, hi - a.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                if r > t0 {
                    t0 = r;
                }
            } else {
                if r < t0 {
                    return None;
                }
                if r < t1 {
                    t1 = r;
                }
            }
        }
    }
    Some((
        (a.0 + t0 * dx, a.1 + t0 * dy),
        (a.0 + t1 * dx, a.1 + t1 * dy),
    ))
}

/// Clip an open polyline to the window, splitting into parts wherever the
/// line leaves and re-enters.
fn clip_polyline(points: &[(f64, f64)], lo: f64, hi: f64) -> Vec<Vec<(f64, f64)>> {
    let mut parts = Vec::new();
    let mut current: Vec<(f64, f64)> = Vec::new();

    let mut flush = |current: &mut Vec<(f64, f64)>, parts: &mut Vec<Vec<(f64, f64)>>| {
        if current.len() >= 2 {
            parts.push(std::mem::take(current));
        } else {
            current.clear();
        }
    };

    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        match clip_segment(a, b, lo, hi) {
            Some((p, q)) => {
                match current.last() {
                    Some(last) if close(*last, p) => {}
                    Some(_) => {
                        flush(&mut current, &mut parts);
                        current.push(p);
                    }
                    None => current.push(p),
                }
                if !close(p, q) {
                    current.push(q);
                }
                // Exited the window mid-segment: the next segment starts a
                // fresh part even if it re-enters.
                if !close(q, b) {
                    flush(&mut current, &mut parts);
                }
            }
            None => flush(&mut current, &mut parts),
        }
    }
    flush(&mut current, &mut parts);
    parts
}

/// Round to extent integers and drop parts that collapse.
fn snap(parts: Vec<Vec<(f64, f64)>>) -> Vec<Vec<(f64, f64)>> {
    parts
        .into_iter()
        .filter_map(|part| {
            let mut out: Vec<(f64, f64)> = Vec::with_capacity(part.len());
            for (x, y) in part {
                let p = (x.round(), y.round());
                if out.last().is_none_or(|last| *last != p) {
                    out.push(p);
                }
            }
            (out.len() >= 2).then_some(out)
        })
        .collect()
}
