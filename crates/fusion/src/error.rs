use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FusionError {
    #[error("invalid occupancy parameter `{name}`: {value}")]
    InvalidParameter { name: &'static str, value: f32 },
}
