//! Test data helpers.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

/// A short trail near Innsbruck covering a handful of tiles.
#[allow(dead_code)]
pub fn innsbruck_line() -> Vec<[f64; 2]> {
    vec![[11.30, 47.25], [11.32, 47.26], [11.35, 47.27]]
}

/// A trail body for POST /v1/trails.
#[allow(dead_code)]
pub fn trail_body(name: &str, geometry: Option<Vec<[f64; 2]>>) -> Value {
    json!({
        "name": name,
        "description": "flow trail through the forest",
        "difficulty": "advanced",
        "tags": ["flow", "jumps"],
        "owner_id": uuid::Uuid::new_v4(),
        "geometry": geometry,
    })
}

/// Helper to make JSON requests.
#[allow(dead_code)]
pub async fn json_request(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    let body = match body {
        Some(v) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };

    let request = builder.body(body).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json: Value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

/// Fetch a tile, returning status and raw bytes.
#[allow(dead_code)]
pub async fn get_tile(router: &axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}
