#![forbid(unsafe_code)]

pub mod band;
pub mod voxel_downsample;

pub use band::band_filter;
pub use voxel_downsample::voxel_downsample;
