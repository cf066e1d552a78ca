#![forbid(unsafe_code)]

pub mod error;
pub mod fuse;
pub mod grid;
pub mod raycast;

pub use error::FusionError;
pub use fuse::fuse_clouds;
pub use grid::{OccupancyGrid, OccupancyParams, VoxelKey};
pub use raycast::ray_keys;
