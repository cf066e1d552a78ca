use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SegmentationError {
    /// A threshold, tolerance or size that cannot drive the algorithm.
    #[error("invalid parameter `{name}`: {value}")]
    InvalidParameter { name: &'static str, value: f32 },
}

pub type Result<T> = std::result::Result<T, SegmentationError>;

pub(crate) fn require_positive(name: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SegmentationError::InvalidParameter { name, value })
    }
}

pub(crate) fn require_finite(name: &'static str, value: f32) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SegmentationError::InvalidParameter { name, value })
    }
}
