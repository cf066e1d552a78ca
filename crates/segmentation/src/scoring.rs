use log::debug;
use serde::{Deserialize, Serialize};
use tabletop_core::{vec3, PointCloud};

use crate::error::{require_finite, Result, SegmentationError};
use crate::major_planes::PlaneCandidate;
use crate::table::{orient_toward_camera, TableModel};

/// Relative weights of the three table-likeness terms. Lower scores win.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Lateral offset of the patch centroid from the optical axis.
    pub centrality: f32,
    /// Depth of the patch centroid.
    pub closeness: f32,
    /// Inverse of the largest per-axis spread of the patch.
    pub compactness: f32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            centrality: 2.0,
            closeness: 10.0,
            compactness: 1.0,
        }
    }
}

impl ScoringWeights {
    pub fn validate(&self) -> Result<()> {
        for (name, w) in [
            ("centrality", self.centrality),
            ("closeness", self.closeness),
            ("compactness", self.compactness),
        ] {
            require_finite(name, w)?;
            if w < 0.0 {
                return Err(SegmentationError::InvalidParameter { name, value: w });
            }
        }
        let total = self.total();
        if total <= 0.0 {
            return Err(SegmentationError::InvalidParameter {
                name: "weight sum",
                value: total,
            });
        }
        Ok(())
    }

    fn total(&self) -> f32 {
        self.centrality + self.closeness + self.compactness
    }
}

/// Score of one candidate plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneScore {
    pub centroid: [f32; 3],
    /// Population standard deviation per axis.
    pub spread: [f32; 3],
    pub score: f32,
    /// `score` min-max normalized over the batch; 0 when all scores are equal.
    pub normalized: f32,
}

/// Centroid and per-axis population standard deviation. `None` for an empty
/// cloud.
pub fn centroid_and_spread(cloud: &PointCloud) -> Option<([f32; 3], [f32; 3])> {
    if cloud.is_empty() {
        return None;
    }
    let n = cloud.len() as f64;
    let mut mean = [0.0f64; 3];
    for p in cloud.iter_points() {
        for axis in 0..3 {
            mean[axis] += p[axis] as f64;
        }
    }
    mean.iter_mut().for_each(|m| *m /= n);

    let mut var = [0.0f64; 3];
    for p in cloud.iter_points() {
        for axis in 0..3 {
            let d = p[axis] as f64 - mean[axis];
            var[axis] += d * d;
        }
    }

    Some((
        mean.map(|m| m as f32),
        var.map(|v| (v / n).sqrt() as f32),
    ))
}

/// Scores every candidate:
///
/// ```text
/// score = (wc * |centroid_xy| + wz * centroid_z + ws / max(spread)) / (wc + wz + ws)
/// ```
///
/// The largest spread is floored at `f32::EPSILON`. A candidate without
/// points scores `+inf`.
pub fn score_planes(candidates: &[PlaneCandidate], weights: &ScoringWeights) -> Vec<PlaneScore> {
    let total = weights.total();
    let mut scores: Vec<PlaneScore> = candidates
        .iter()
        .map(|c| match centroid_and_spread(&c.inliers) {
            Some((centroid, spread)) => {
                let lateral = centroid[0].hypot(centroid[1]);
                let max_spread = spread.iter().copied().fold(f32::EPSILON, f32::max);
                let score = (weights.centrality * lateral
                    + weights.closeness * centroid[2]
                    + weights.compactness / max_spread)
                    / total;
                PlaneScore {
                    centroid,
                    spread,
                    score,
                    normalized: 0.0,
                }
            }
            None => PlaneScore {
                centroid: [f32::NAN; 3],
                spread: [0.0; 3],
                score: f32::INFINITY,
                normalized: 1.0,
            },
        })
        .collect();

    let finite = scores.iter().map(|s| s.score).filter(|s| s.is_finite());
    let (lo, hi) = finite.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), s| {
        (lo.min(s), hi.max(s))
    });
    let range = hi - lo;
    for s in scores.iter_mut().filter(|s| s.score.is_finite()) {
        s.normalized = if range > 0.0 { (s.score - lo) / range } else { 0.0 };
    }
    scores
}

/// Index of the lowest finite score; the first one wins ties.
pub fn best_candidate(scores: &[PlaneScore]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .filter(|(_, s)| s.score.is_finite())
        .fold(None, |best: Option<(usize, f32)>, (i, s)| match best {
            Some((_, b)) if b <= s.score => best,
            _ => Some((i, s.score)),
        })
        .map(|(i, _)| i)
}

/// Picks the lowest-scoring candidate as the table.
///
/// The normal is flipped toward the camera if needed and the anchor moves to
/// the projection of the patch centroid onto the plane. `None` when no
/// candidate has points.
///
/// # Panics
///
/// Panics if `scores` does not hold one entry per candidate.
pub fn select_table(candidates: &[PlaneCandidate], scores: &[PlaneScore]) -> Option<TableModel> {
    assert_eq!(
        candidates.len(),
        scores.len(),
        "select_table needs one score per candidate"
    );
    let best = best_candidate(scores)?;
    let candidate = &candidates[best];
    let normal = orient_toward_camera(vec3::normalize(candidate.normal)?);
    let m = scores[best].centroid;
    let offset = vec3::dot(vec3::sub(m, candidate.origin), normal);
    let point = vec3::sub(m, vec3::scale(normal, offset));

    debug!(
        "table is plane {} of {} (score {:.4}), point {:?}, normal {:?}",
        best,
        candidates.len(),
        scores[best].score,
        point,
        normal
    );
    TableModel::new(point, normal)
}
