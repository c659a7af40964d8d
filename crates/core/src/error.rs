//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid tile coordinate z={z} x={x} y={y}: {reason}")]
    InvalidCoordinate { z: u32, x: u32, y: u32, reason: String },

    #[error("invalid zoom range: min {min} > max {max}")]
    InvalidZoomRange { min: u8, max: u8 },

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("invalid difficulty: {0}")]
    InvalidDifficulty(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
