//! Tile read path endpoints.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use singletrack_core::TileCoord;
use singletrack_tiles::TileOutcome;
use std::time::Instant;

const MVT_CONTENT_TYPE: &str = "application/vnd.mapbox-vector-tile";
const TILE_CACHE_CONTROL: &str = "public, max-age=86400";

/// Parse one slippy path segment. The `y` segment carries the `.mvt`
/// suffix because axum cannot route `/{param}.suffix`.
fn parse_segment<T: std::str::FromStr>(raw: &str, name: &str) -> ApiResult<T> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid tile coordinate {name}: {raw}")))
}

/// GET /tiles/{z}/{x}/{y}.mvt - render or serve a cached vector tile.
///
/// Coordinate validation runs before any cache or database access, so a
/// malformed request is a pure 400.
pub async fn get_tile(
    State(state): State<AppState>,
    Path((z, x, y)): Path<(String, String, String)>,
) -> ApiResult<Response> {
    let y = y
        .strip_suffix(".mvt")
        .ok_or_else(|| ApiError::BadRequest(format!("expected .mvt tile path, got {y}")))?;

    let z: u8 = parse_segment(&z, "z")?;
    let x: u32 = parse_segment(&x, "x")?;
    let y: u32 = parse_segment(y, "y")?;

    let tiles = &state.config.tiles;
    let coord = TileCoord::new(z, x, y, tiles.min_zoom, tiles.max_zoom)?;

    let started = Instant::now();
    let response = state.tiles.get_tile(coord).await.inspect_err(|_| {
        metrics::TILE_RENDER_FAILURES.inc();
    })?;

    metrics::TILES_SERVED
        .with_label_values(&[response.outcome.as_str()])
        .inc();
    match response.outcome {
        TileOutcome::CacheHit => metrics::CACHE_HITS.inc(),
        TileOutcome::Rendered => {
            metrics::CACHE_MISSES.inc();
            metrics::TILE_RENDERS.inc();
            metrics::TILE_RENDER_DURATION.observe(started.elapsed().as_secs_f64());
        }
        TileOutcome::StaleFallback => {
            metrics::CACHE_MISSES.inc();
            metrics::TILE_RENDER_FAILURES.inc();
            metrics::STALE_FALLBACKS.inc();
        }
        TileOutcome::FallbackEmpty => {
            metrics::CACHE_MISSES.inc();
            metrics::TILE_RENDER_FAILURES.inc();
        }
    }
    metrics::CACHED_TILES.set(state.tiles.cache().len() as i64);

    if response.bytes.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, MVT_CONTENT_TYPE),
            (CACHE_CONTROL, TILE_CACHE_CONTROL),
        ],
        response.bytes,
    )
        .into_response())
}

/// GET /tiles.json - TileJSON 3.0 discovery document.
pub async fn tilejson(State(state): State<AppState>) -> Json<Value> {
    let tiles = &state.config.tiles;
    Json(json!({
        "tilejson": "3.0.0",
        "name": "singletrack",
        "tiles": [state.config.server.tile_url],
        "minzoom": tiles.min_zoom,
        "maxzoom": tiles.max_zoom,
        "vector_layers": [
            {
                "id": "trails",
                "description": "Trail centerlines with attributes",
                "minzoom": tiles.min_zoom,
                "maxzoom": tiles.max_zoom,
                "fields": {
                    "id": "String",
                    "name": "String",
                    "description": "String",
                    "difficulty": "String",
                    "tags": "String",
                    "owner_id": "String",
                    "created_at": "Number",
                    "updated_at": "Number",
                    "min_lon": "Number",
                    "min_lat": "Number",
                    "max_lon": "Number",
                    "max_lat": "Number",
                    "start_lon": "Number",
                    "start_lat": "Number",
                    "end_lon": "Number",
                    "end_lat": "Number",
                    "distance_m": "Number",
                    "rating_avg": "Number",
                    "rating_count": "Number",
                    "comment_count": "Number",
                    "ridden": "Boolean"
                }
            },
            {
                "id": "trail_markers",
                "description": "Trail start and end points",
                "minzoom": tiles.min_zoom,
                "maxzoom": tiles.max_zoom,
                "fields": {
                    "trail_id": "String",
                    "name": "String",
                    "kind": "String"
                }
            }
        ]
    }))
}
