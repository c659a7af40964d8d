//! HTTP request handlers.

pub mod health;
pub mod tiles;
pub mod trails;

pub use health::*;
pub use tiles::*;
pub use trails::*;
