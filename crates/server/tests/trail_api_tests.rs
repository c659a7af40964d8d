//! Integration tests for the trail write path.

mod common;

use axum::http::StatusCode;
use common::{TestServer, innsbruck_line, json_request, trail_body};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn trail_crud_round_trip() {
    let server = TestServer::new().await;

    // Create
    let (status, created) = json_request(
        &server.router,
        "POST",
        "/v1/trails",
        Some(trail_body("Arzler Alm", Some(innsbruck_line()))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["name"], "Arzler Alm");
    assert_eq!(created["difficulty"], "advanced");
    assert!(created["distance_m"].as_f64().unwrap() > 0.0);
    assert_eq!(created["rating_count"], 0);

    // Read
    let (status, fetched) =
        json_request(&server.router, "GET", &format!("/v1/trails/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], created["id"]);
    assert_eq!(
        fetched["geometry"].as_array().unwrap().len(),
        innsbruck_line().len()
    );

    // List
    let (status, list) = json_request(&server.router, "GET", "/v1/trails", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    // Update
    let (status, updated) = json_request(
        &server.router,
        "PUT",
        &format!("/v1/trails/{id}"),
        Some(trail_body("Arzler Alm Nord", Some(innsbruck_line()))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Arzler Alm Nord");

    // Delete
    let (status, _) =
        json_request(&server.router, "DELETE", &format!("/v1/trails/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = json_request(&server.router, "GET", &format!("/v1/trails/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_trail_returns_404() {
    let server = TestServer::new().await;
    let id = Uuid::new_v4();

    for (method, uri) in [
        ("GET", format!("/v1/trails/{id}")),
        ("DELETE", format!("/v1/trails/{id}")),
    ] {
        let (status, body) = json_request(&server.router, method, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
        assert_eq!(body["code"], "not_found");
    }

    let (status, _) = json_request(
        &server.router,
        "PUT",
        &format!("/v1/trails/{id}"),
        Some(trail_body("ghost", None)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_name_is_rejected() {
    let server = TestServer::new().await;

    let (status, body) = json_request(
        &server.router,
        "POST",
        "/v1/trails",
        Some(trail_body("  ", None)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn invalid_geometry_is_rejected() {
    let server = TestServer::new().await;

    // Longitude out of range
    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/trails",
        Some(trail_body("bad", Some(vec![[200.0, 47.0], [11.0, 47.0]]))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn trail_without_geometry_is_allowed() {
    let server = TestServer::new().await;

    let (status, created) = json_request(
        &server.router,
        "POST",
        "/v1/trails",
        Some(trail_body("planned trail", None)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created["geometry"].is_null());
    assert!(created["bbox"].is_null());
    assert_eq!(created["distance_m"], 0.0);
}

#[tokio::test]
async fn engagement_snapshot_replaces_aggregates() {
    let server = TestServer::new().await;

    let (_, created) = json_request(
        &server.router,
        "POST",
        "/v1/trails",
        Some(trail_body("Arzler Alm", Some(innsbruck_line()))),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, updated) = json_request(
        &server.router,
        "PUT",
        &format!("/v1/trails/{id}/engagement"),
        Some(json!({
            "rating_avg": 4.5,
            "rating_count": 12,
            "comment_count": 3,
            "ridden": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["rating_avg"], 4.5);
    assert_eq!(updated["rating_count"], 12);
    assert_eq!(updated["comment_count"], 3);
    assert_eq!(updated["ridden"], true);
}

#[tokio::test]
async fn engagement_validation_rejects_bad_aggregates() {
    let server = TestServer::new().await;

    let (_, created) = json_request(
        &server.router,
        "POST",
        "/v1/trails",
        Some(trail_body("Arzler Alm", Some(innsbruck_line()))),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();

    for bad in [
        json!({"rating_avg": 6.0, "rating_count": 1, "comment_count": 0, "ridden": false}),
        json!({"rating_avg": -0.5, "rating_count": 1, "comment_count": 0, "ridden": false}),
        json!({"rating_avg": 3.0, "rating_count": -1, "comment_count": 0, "ridden": false}),
    ] {
        let (status, _) = json_request(
            &server.router,
            "PUT",
            &format!("/v1/trails/{id}/engagement"),
            Some(bad.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {bad}");
    }
}
