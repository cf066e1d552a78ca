#![forbid(unsafe_code)]

pub mod estimate;
pub mod kernels;

pub use estimate::{estimate_organized_normals, NormalEstimationParams, NormalsError};
