//! Segmenter configuration, loadable from JSON.
//!
//! Every field has a default, so a file only needs the values it changes:
//!
//! ```json
//! { "tabletop": { "max_radius": 0.15 }, "table_planes": { "seed": 7 } }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tabletop_fusion::OccupancyParams;
use tabletop_normals::NormalEstimationParams;
use tabletop_segmentation::{PlaneExtractionParams, ScoringWeights, TabletopParams};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    pub normals: NormalEstimationParams,
    /// Voxel leaf used to thin the cloud before table detection, in meters.
    pub simplify_leaf_size: f32,
    /// Plane search used to find the table.
    pub table_planes: PlaneExtractionParams,
    /// Tighter plane search used on fused clouds.
    pub flippable_planes: PlaneExtractionParams,
    pub scoring: ScoringWeights,
    pub tabletop: TabletopParams,
    pub fusion: OccupancyParams,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            normals: NormalEstimationParams::default(),
            simplify_leaf_size: 0.005,
            table_planes: PlaneExtractionParams::default(),
            flippable_planes: PlaneExtractionParams {
                distance_threshold: 0.001,
                ..PlaneExtractionParams::default()
            },
            scoring: ScoringWeights::default(),
            tabletop: TabletopParams::default(),
            fusion: OccupancyParams::default(),
        }
    }
}

impl SegmenterConfig {
    /// Checks every stage's parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.normals
            .validate()
            .map_err(|e| invalid("normals", e))?;
        if !(self.simplify_leaf_size.is_finite() && self.simplify_leaf_size > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "simplify_leaf_size must be positive, got {}",
                self.simplify_leaf_size
            )));
        }
        self.table_planes
            .validate()
            .map_err(|e| invalid("table_planes", e))?;
        self.flippable_planes
            .validate()
            .map_err(|e| invalid("flippable_planes", e))?;
        self.scoring
            .validate()
            .map_err(|e| invalid("scoring", e))?;
        self.tabletop
            .validate()
            .map_err(|e| invalid("tabletop", e))?;
        self.fusion
            .validate()
            .map_err(|e| invalid("fusion", e))?;
        Ok(())
    }
}

fn invalid(section: &str, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid(format!("{section}: {err}"))
}

/// Reads and validates a JSON config; missing fields take their defaults.
pub fn load_config(path: &Path) -> Result<SegmenterConfig, ConfigError> {
    let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: SegmenterConfig =
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    config.validate()?;
    Ok(config)
}
