//! Repository traits implemented by the store backends.

pub mod tile_index;
pub mod trails;

pub use tile_index::TileIndexRepo;
pub use trails::TrailRepo;
