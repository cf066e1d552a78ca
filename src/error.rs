use tabletop_fusion::FusionError;
use tabletop_normals::NormalsError;
use tabletop_segmentation::SegmentationError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum SegmentError {
    /// No candidate plane qualified as a table and no hint was supplied.
    #[error("no table detected among {points} points")]
    NoTableDetected { points: usize },
    #[error(transparent)]
    Normals(#[from] NormalsError),
    #[error(transparent)]
    Segmentation(#[from] SegmentationError),
    #[error(transparent)]
    Fusion(#[from] FusionError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, SegmentError>;
