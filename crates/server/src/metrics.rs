//! Prometheus metrics for the singletrack server.
//!
//! The `/metrics` endpoint is unauthenticated to allow Prometheus scraping
//! and is gated by `server.metrics_enabled`. Restrict it at the network
//! level when exposed beyond localhost.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Tile read path

pub static TILES_SERVED: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "singletrack_tiles_served_total",
            "Total tile requests served, by outcome",
        ),
        &["outcome"],
    )
    .expect("metric creation failed")
});

pub static CACHE_HITS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "singletrack_tile_cache_hits_total",
        "Total tile requests answered from valid cache entries",
    )
    .expect("metric creation failed")
});

pub static CACHE_MISSES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "singletrack_tile_cache_misses_total",
        "Total tile requests that required a render",
    )
    .expect("metric creation failed")
});

pub static TILE_RENDERS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "singletrack_tile_renders_total",
        "Total tile renders attempted",
    )
    .expect("metric creation failed")
});

pub static TILE_RENDER_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "singletrack_tile_render_duration_seconds",
            "Time taken to render a tile, including the database read",
        )
        .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]),
    )
    .expect("metric creation failed")
});

pub static TILE_RENDER_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "singletrack_tile_render_failures_total",
        "Total tile renders that failed or timed out",
    )
    .expect("metric creation failed")
});

pub static STALE_FALLBACKS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "singletrack_tile_stale_fallbacks_total",
        "Total tile requests answered with stale bytes after a failed regeneration",
    )
    .expect("metric creation failed")
});

// Invalidation pipeline

pub static TILES_INVALIDATED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "singletrack_tiles_invalidated_total",
        "Total tile invalidations triggered by trail writes",
    )
    .expect("metric creation failed")
});

pub static EVENTS_PUBLISHED: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "singletrack_events_published_total",
            "Total domain events published, by kind",
        ),
        &["kind"],
    )
    .expect("metric creation failed")
});

pub static HANDLER_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "singletrack_event_handler_failures_total",
        "Total event handler invocations that returned an error",
    )
    .expect("metric creation failed")
});

// Current state gauges

pub static CACHED_TILES: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "singletrack_cached_tiles",
        "Current number of entries in the tile cache",
    )
    .expect("metric creation failed")
});

/// Guard to ensure metrics are only registered once.
static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
///
/// Idempotent so integration tests and embedded routers can call it freely.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(TILES_SERVED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(CACHE_HITS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(CACHE_MISSES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(TILE_RENDERS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(TILE_RENDER_DURATION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(TILE_RENDER_FAILURES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(STALE_FALLBACKS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(TILES_INVALIDATED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(EVENTS_PUBLISHED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(HANDLER_FAILURES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(CACHED_TILES.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        // This would panic if any metric creation failed
        register_metrics();
    }
}
