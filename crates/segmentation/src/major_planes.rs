use log::debug;
use serde::{Deserialize, Serialize};
use tabletop_core::PointCloud;
use tabletop_filters::voxel_downsample;

use crate::error::{require_positive, Result, SegmentationError};
use crate::euclidean_cluster::largest_cluster;
use crate::ransac_plane::{fit_plane, PlaneFitParams};

/// Tuning for [`extract_major_planes`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaneExtractionParams {
    /// Voxel leaf applied to the input before the search; `None` keeps it.
    pub downsample_leaf: Option<f32>,
    /// Point-to-plane inlier distance, in meters.
    pub distance_threshold: f32,
    pub max_planes: usize,
    /// A plane is accepted only if its largest connected patch has strictly
    /// more points than this.
    pub min_cluster_size: usize,
    pub max_cluster_size: usize,
    /// Neighbour distance for the connected-patch search, in meters.
    pub cluster_tolerance: f32,
    pub ransac_iterations: usize,
    pub refine: bool,
    /// Plane `k` is fitted with seed `seed + k`.
    pub seed: u64,
}

impl Default for PlaneExtractionParams {
    fn default() -> Self {
        Self {
            downsample_leaf: None,
            distance_threshold: 0.005,
            max_planes: 5,
            min_cluster_size: 100,
            max_cluster_size: 1_000_000,
            cluster_tolerance: 0.05,
            ransac_iterations: 200,
            refine: true,
            seed: 0,
        }
    }
}

impl PlaneExtractionParams {
    pub fn validate(&self) -> Result<()> {
        require_positive("distance_threshold", self.distance_threshold)?;
        require_positive("cluster_tolerance", self.cluster_tolerance)?;
        if let Some(leaf) = self.downsample_leaf {
            require_positive("downsample_leaf", leaf)?;
        }
        if self.ransac_iterations == 0 {
            return Err(SegmentationError::InvalidParameter {
                name: "ransac_iterations",
                value: 0.0,
            });
        }
        if self.max_cluster_size <= self.min_cluster_size {
            return Err(SegmentationError::InvalidParameter {
                name: "max_cluster_size",
                value: self.max_cluster_size as f32,
            });
        }
        Ok(())
    }

    fn fit_params(&self) -> PlaneFitParams {
        PlaneFitParams {
            distance_threshold: self.distance_threshold,
            iterations: self.ransac_iterations,
            refine: self.refine,
        }
    }
}

/// A planar patch found by [`extract_major_planes`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneCandidate {
    /// Point on the fitted plane.
    pub origin: [f32; 3],
    /// Unit normal of the fitted plane, arbitrary sign.
    pub normal: [f32; 3],
    /// The largest connected patch among the plane's inliers.
    pub inliers: PointCloud,
}

/// One extraction step: fits a plane to `residual` and keeps the largest
/// connected patch of its inliers.
///
/// Returns the candidate together with the next residual (the plane's
/// outliers), or `None` when no plane is found or its patch is too small.
/// Inliers outside the patch belong to neither output.
pub fn extract_next_plane(
    residual: &PointCloud,
    params: &PlaneExtractionParams,
    seed: u64,
) -> Option<(PlaneCandidate, PointCloud)> {
    let fit = fit_plane(residual, &params.fit_params(), seed)?;

    let inlier_cloud = residual.select(&fit.inliers);
    let patch = largest_cluster(
        &inlier_cloud,
        params.cluster_tolerance,
        1,
        params.max_cluster_size,
    );
    if patch.len() <= params.min_cluster_size {
        debug!(
            "plane with {} inliers rejected: largest patch has {} points",
            fit.inliers.len(),
            patch.len()
        );
        return None;
    }

    let candidate = PlaneCandidate {
        origin: fit.origin,
        normal: fit.model.normal,
        inliers: inlier_cloud.select(&patch),
    };
    Some((candidate, residual.select(&fit.outliers)))
}

/// Repeatedly peels the dominant plane off the cloud.
///
/// Stops after `max_planes` candidates or at the first step that finds no
/// qualifying plane. Candidates come in discovery order and their inlier
/// clouds are pairwise disjoint. An empty cloud yields no candidates.
pub fn extract_major_planes(
    cloud: &PointCloud,
    params: &PlaneExtractionParams,
) -> Result<Vec<PlaneCandidate>> {
    if cloud.is_empty() {
        return Ok(Vec::new());
    }
    params.validate()?;

    let mut residual = match params.downsample_leaf {
        Some(leaf) => voxel_downsample(cloud, leaf),
        None => cloud.clone(),
    };

    let mut candidates = Vec::new();
    for k in 0..params.max_planes {
        let seed = params.seed.wrapping_add(k as u64);
        let Some((candidate, next)) = extract_next_plane(&residual, params, seed) else {
            break;
        };
        debug!(
            "plane {}: {} points, normal {:?}, {} points left",
            k,
            candidate.inliers.len(),
            candidate.normal,
            next.len()
        );
        candidates.push(candidate);
        residual = next;
    }

    debug!(
        "extract_major_planes: {} planes from {} points",
        candidates.len(),
        cloud.len()
    );
    Ok(candidates)
}
