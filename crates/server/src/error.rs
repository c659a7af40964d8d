//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use singletrack_store::StoreError;
use singletrack_tiles::TileError;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("tile error: {0}")]
    Tile(TileError),

    #[error("core error: {0}")]
    Core(#[from] singletrack_core::Error),
}

// Manual From so a NotFound surfacing through the tile pipeline keeps
// its 404 instead of collapsing into a 500.
impl From<TileError> for ApiError {
    fn from(e: TileError) -> Self {
        match e {
            TileError::Store(store) => Self::Store(store),
            TileError::Core(core) => Self::Core(core),
            other => Self::Tile(other),
        }
    }
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::Internal(_) => "internal_error",
            Self::Store(e) => match e {
                StoreError::NotFound(_) => "not_found",
                _ => "store_error",
            },
            Self::Tile(_) => "tile_error",
            Self::Core(_) => "bad_request",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Store(e) => match e {
                StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Tile(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // Core errors are validation failures (coordinates, zoom
            // ranges, geometry), always caused by the request.
            Self::Core(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_maps_to_404() {
        let err = ApiError::Store(StoreError::NotFound("trail x".to_string()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn core_error_maps_to_400() {
        let err = ApiError::Core(singletrack_core::Error::InvalidCoordinate {
            z: 10,
            x: 9999,
            y: 0,
            reason: "x out of range".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn tile_error_carrying_not_found_stays_404() {
        let err: ApiError =
            TileError::Store(StoreError::NotFound("trail x".to_string())).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
