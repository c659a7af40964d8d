//! Trail write path endpoints.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use singletrack_core::trail::{line_from_lonlat, lonlat_pairs};
use singletrack_core::{Difficulty, NewTrail, Trail};
use singletrack_tiles::{EngagementSnapshot, EventReceipt};
use uuid::Uuid;

/// Account for one published mutation event and what it did downstream.
fn record_pipeline(kind: &'static str, receipt: &EventReceipt) {
    metrics::EVENTS_PUBLISHED.with_label_values(&[kind]).inc();
    metrics::TILES_INVALIDATED.inc_by(receipt.invalidated_tiles as u64);
    metrics::HANDLER_FAILURES.inc_by(receipt.handler_failures as u64);
}

/// Request body for trail create and update.
#[derive(Debug, Deserialize)]
pub struct TrailRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub tags: Vec<String>,
    pub owner_id: Uuid,
    /// Polyline as `[[lon, lat], ...]`. Absent means no geometry yet.
    pub geometry: Option<Vec<[f64; 2]>>,
}

impl TrailRequest {
    fn into_new_trail(self) -> ApiResult<NewTrail> {
        if self.name.trim().is_empty() {
            return Err(ApiError::BadRequest("trail name must not be empty".to_string()));
        }
        let geometry = match self.geometry {
            Some(pairs) => Some(line_from_lonlat(&pairs)?),
            None => None,
        };
        Ok(NewTrail {
            name: self.name,
            description: self.description,
            difficulty: self.difficulty,
            tags: self.tags,
            owner_id: self.owner_id,
            geometry,
        })
    }
}

/// Trail representation returned by the API.
#[derive(Debug, Serialize)]
pub struct TrailResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    pub owner_id: Uuid,
    pub geometry: Option<Vec<[f64; 2]>>,
    pub bbox: Option<[f64; 4]>,
    pub distance_m: f64,
    pub rating_avg: f64,
    pub rating_count: i64,
    pub comment_count: i64,
    pub ridden: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: time::OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: time::OffsetDateTime,
}

impl From<Trail> for TrailResponse {
    fn from(t: Trail) -> Self {
        Self {
            id: t.id,
            name: t.name,
            description: t.description,
            difficulty: t.difficulty,
            tags: t.tags,
            owner_id: t.owner_id,
            geometry: t.geometry.as_ref().map(lonlat_pairs),
            bbox: t
                .bbox
                .map(|r| [r.min().x, r.min().y, r.max().x, r.max().y]),
            distance_m: t.distance_m,
            rating_avg: t.rating_avg,
            rating_count: t.rating_count,
            comment_count: t.comment_count,
            ridden: t.ridden,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

/// POST /v1/trails - create a trail and index it.
pub async fn create_trail(
    State(state): State<AppState>,
    Json(body): Json<TrailRequest>,
) -> ApiResult<(StatusCode, Json<TrailResponse>)> {
    let outcome = state.trails.create_trail(body.into_new_trail()?).await?;
    record_pipeline("trail_created", &outcome.events);
    Ok((StatusCode::CREATED, Json(outcome.trail.into())))
}

/// GET /v1/trails - list all trails.
pub async fn list_trails(State(state): State<AppState>) -> ApiResult<Json<Vec<TrailResponse>>> {
    let trails = state.trails.list_trails().await?;
    Ok(Json(trails.into_iter().map(TrailResponse::from).collect()))
}

/// GET /v1/trails/{id} - fetch a single trail.
pub async fn get_trail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TrailResponse>> {
    let trail = state
        .trails
        .get_trail(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("trail {id}")))?;
    Ok(Json(trail.into()))
}

/// PUT /v1/trails/{id} - full replacement update.
pub async fn update_trail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<TrailRequest>,
) -> ApiResult<Json<TrailResponse>> {
    let outcome = state
        .trails
        .update_trail(id, body.into_new_trail()?)
        .await?;
    record_pipeline("trail_updated", &outcome.events);
    Ok(Json(outcome.trail.into()))
}

/// DELETE /v1/trails/{id} - delete a trail and invalidate its tiles.
pub async fn delete_trail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let receipt = state.trails.delete_trail(id).await?;
    record_pipeline("trail_deleted", &receipt);
    Ok(StatusCode::NO_CONTENT)
}

/// Engagement aggregates pushed by the ratings/comments service.
#[derive(Debug, Deserialize)]
pub struct EngagementRequest {
    pub rating_avg: f64,
    pub rating_count: i64,
    pub comment_count: i64,
    pub ridden: bool,
}

/// PUT /v1/trails/{id}/engagement - replace engagement aggregates.
pub async fn update_engagement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<EngagementRequest>,
) -> ApiResult<Json<TrailResponse>> {
    if !(0.0..=5.0).contains(&body.rating_avg) || !body.rating_avg.is_finite() {
        return Err(ApiError::BadRequest(format!(
            "rating_avg must be within [0, 5], got {}",
            body.rating_avg
        )));
    }
    if body.rating_count < 0 || body.comment_count < 0 {
        return Err(ApiError::BadRequest(
            "rating_count and comment_count must be non-negative".to_string(),
        ));
    }

    let outcome = state
        .trails
        .record_engagement(
            id,
            EngagementSnapshot {
                rating_avg: body.rating_avg,
                rating_count: body.rating_count,
                comment_count: body.comment_count,
                ridden: body.ridden,
            },
        )
        .await?;
    record_pipeline("engagement_updated", &outcome.events);
    Ok(Json(outcome.trail.into()))
}
