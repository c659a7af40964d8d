//! HTTP API server for the singletrack trail tile service.
//!
//! This crate provides the HTTP surface:
//! - Vector tile delivery (`/tiles/{z}/{x}/{y}.mvt`)
//! - TileJSON discovery (`/tiles.json`)
//! - Trail CRUD and engagement snapshots (`/v1/trails`)
//! - Health check and Prometheus metrics

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
