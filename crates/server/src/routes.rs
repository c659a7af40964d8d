//! Route configuration.

use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post, put};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let tile_routes = Router::new()
        // The y segment carries the .mvt suffix; axum cannot route
        // /{param}.suffix so the handler strips it.
        .route("/tiles/{z}/{x}/{y}", get(handlers::get_tile))
        .route("/tiles.json", get(handlers::tilejson));

    let api_routes = Router::new()
        // Health check (intentionally unauthenticated for load balancers/k8s probes)
        .route("/v1/health", get(handlers::health_check))
        // Trail write path
        .route(
            "/v1/trails",
            post(handlers::create_trail).get(handlers::list_trails),
        )
        .route(
            "/v1/trails/{trail_id}",
            get(handlers::get_trail)
                .put(handlers::update_trail)
                .delete(handlers::delete_trail),
        )
        .route(
            "/v1/trails/{trail_id}/engagement",
            put(handlers::update_engagement),
        );

    let mut router = Router::new().merge(tile_routes).merge(api_routes);

    // Conditionally add metrics endpoint based on config.
    // When enabled this endpoint should be network-restricted to
    // authorized Prometheus scraper IPs.
    if state.config.server.metrics_enabled {
        crate::metrics::register_metrics();
        let metrics_routes = Router::new().route("/metrics", get(metrics_handler));
        router = router.merge(metrics_routes);
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
