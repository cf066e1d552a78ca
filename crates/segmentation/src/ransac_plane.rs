use nalgebra::{Matrix3, SymmetricEigen};
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;
use tabletop_core::{vec3, PointCloud};

/// A 3D plane `n . x + d = 0` with unit normal `n`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneModel {
    pub normal: [f32; 3],
    pub d: f32,
}

impl PlaneModel {
    /// Plane through `point` with the given unit normal.
    pub fn from_point_normal(point: [f32; 3], normal: [f32; 3]) -> Self {
        Self {
            normal,
            d: -vec3::dot(normal, point),
        }
    }

    /// Signed distance; positive on the side the normal points to.
    #[inline]
    pub fn signed_distance(&self, point: &[f32; 3]) -> f32 {
        vec3::dot(self.normal, *point) + self.d
    }

    #[inline]
    pub fn distance_to_point(&self, point: &[f32; 3]) -> f32 {
        self.signed_distance(point).abs()
    }

    /// Orthogonal projection of `point` onto the plane.
    pub fn project(&self, point: [f32; 3]) -> [f32; 3] {
        vec3::sub(point, vec3::scale(self.normal, self.signed_distance(&point)))
    }
}

impl Default for PlaneModel {
    fn default() -> Self {
        Self {
            normal: [0.0, 0.0, 1.0],
            d: 0.0,
        }
    }
}

/// Fits a plane to the point cloud using the RANSAC algorithm.
///
/// Uses a random (non-deterministic) seed. For reproducible results, use
/// [`ransac_plane_seeded`] instead.
pub fn ransac_plane(
    cloud: &PointCloud,
    distance_threshold: f32,
    iterations: usize,
) -> (PlaneModel, Vec<usize>) {
    let seed = rand::thread_rng().next_u64();
    ransac_plane_seeded(cloud, distance_threshold, iterations, seed)
}

/// Fits a plane to the point cloud using the RANSAC algorithm with a
/// deterministic seed for the random number generator.
///
/// # Algorithm
///
/// 1. Pre-generate all random samples upfront for determinism.
/// 2. Large clouds score hypotheses in parallel with rayon; ties keep the
///    earliest sample.
/// 3. Small clouds run sequentially with adaptive early termination.
/// 4. Return the best plane model and its inlier indices (ascending).
pub fn ransac_plane_seeded(
    cloud: &PointCloud,
    distance_threshold: f32,
    iterations: usize,
    seed: u64,
) -> (PlaneModel, Vec<usize>) {
    let n = cloud.len();

    if n < 3 {
        return (PlaneModel::default(), Vec::new());
    }

    let points = cloud.to_points();

    let mut rng = StdRng::seed_from_u64(seed);
    let samples: Vec<(usize, usize, usize)> = (0..iterations)
        .filter_map(|_| sample_three_distinct(n, &mut rng))
        .collect();

    let use_parallel = n >= 10_000 && samples.len() >= 16;

    let best_model = if use_parallel {
        samples
            .par_iter()
            .filter_map(|&(i0, i1, i2)| {
                let model = plane_through(&points[i0], &points[i1], &points[i2])?;
                let count = count_inliers(&points, &model, distance_threshold);
                Some((model, count))
            })
            .reduce_with(|a, b| if a.1 >= b.1 { a } else { b })
            .map(|(model, _)| model)
    } else {
        let mut best: Option<(PlaneModel, usize)> = None;

        for (iter, &(i0, i1, i2)) in samples.iter().enumerate() {
            let Some(model) = plane_through(&points[i0], &points[i1], &points[i2]) else {
                continue;
            };

            let inlier_count = count_inliers(&points, &model, distance_threshold);

            if best.map_or(true, |(_, count)| inlier_count > count) {
                best = Some((model, inlier_count));

                // Adaptive early termination
                let w = inlier_count as f64 / n as f64;
                if w > 0.5 {
                    let needed = (1.0 - 0.999f64).ln() / (1.0 - w.powi(3)).ln();
                    if (iter as f64) > needed {
                        break;
                    }
                }
            }
        }

        best.map(|(model, _)| model)
    };

    // every sampled triple was degenerate
    let Some(best_model) = best_model else {
        return (PlaneModel::default(), Vec::new());
    };

    let inliers = collect_inliers(&points, &best_model, distance_threshold);
    (best_model, inliers)
}

const REFINE_ROUNDS: usize = 3;

/// Settings for [`fit_plane`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneFitParams {
    pub distance_threshold: f32,
    pub iterations: usize,
    /// Re-fit the winning hypothesis to its inliers by least squares until
    /// the inlier set stops changing.
    pub refine: bool,
}

/// Inlier/outlier partition of a cloud against a fitted plane.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneFit {
    pub model: PlaneModel,
    /// Inlier centroid projected onto the plane.
    pub origin: [f32; 3],
    pub inliers: Vec<usize>,
    pub outliers: Vec<usize>,
}

/// Robust plane fit returning both sides of the partition plus an origin on
/// the plane.
///
/// Returns `None` when the cloud has fewer than 3 points or no
/// non-degenerate hypothesis exists.
pub fn fit_plane(cloud: &PointCloud, params: &PlaneFitParams, seed: u64) -> Option<PlaneFit> {
    let (mut model, mut inliers) =
        ransac_plane_seeded(cloud, params.distance_threshold, params.iterations, seed);
    if inliers.len() < 3 {
        return None;
    }

    let points = cloud.to_points();
    if params.refine {
        for _ in 0..REFINE_ROUNDS {
            let Some(refined) = least_squares_plane(&points, &inliers, model.normal) else {
                break;
            };
            let refined_inliers = collect_inliers(&points, &refined, params.distance_threshold);
            if refined_inliers.len() < inliers.len() {
                break;
            }
            let converged = refined_inliers == inliers;
            model = refined;
            inliers = refined_inliers;
            if converged {
                break;
            }
        }
    }

    let origin = model.project(centroid(&points, &inliers));
    let mut is_inlier = vec![false; points.len()];
    for &i in &inliers {
        is_inlier[i] = true;
    }
    let outliers = (0..points.len()).filter(|&i| !is_inlier[i]).collect();

    Some(PlaneFit {
        model,
        origin,
        inliers,
        outliers,
    })
}

/// Total-least-squares plane through the selected points: the normal is the
/// eigenvector of the smallest covariance eigenvalue, oriented like `hint`.
fn least_squares_plane(points: &[[f32; 3]], indices: &[usize], hint: [f32; 3]) -> Option<PlaneModel> {
    if indices.len() < 3 {
        return None;
    }
    let c = centroid(points, indices);
    let mut cov = Matrix3::<f64>::zeros();
    for &i in indices {
        let d = vec3::sub(points[i], c);
        for r in 0..3 {
            for k in 0..3 {
                cov[(r, k)] += d[r] as f64 * d[k] as f64;
            }
        }
    }

    let eigen = SymmetricEigen::new(cov);
    let (min_idx, _) = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let v = eigen.eigenvectors.column(min_idx);
    let mut normal = vec3::normalize([v[0] as f32, v[1] as f32, v[2] as f32])?;
    if vec3::dot(normal, hint) < 0.0 {
        normal = vec3::scale(normal, -1.0);
    }
    Some(PlaneModel::from_point_normal(c, normal))
}

fn centroid(points: &[[f32; 3]], indices: &[usize]) -> [f32; 3] {
    let mut sum = [0.0f64; 3];
    for &i in indices {
        for axis in 0..3 {
            sum[axis] += points[i][axis] as f64;
        }
    }
    let n = indices.len().max(1) as f64;
    [(sum[0] / n) as f32, (sum[1] / n) as f32, (sum[2] / n) as f32]
}

#[inline]
fn count_inliers(points: &[[f32; 3]], model: &PlaneModel, threshold: f32) -> usize {
    points
        .iter()
        .filter(|p| model.distance_to_point(p) <= threshold)
        .count()
}

fn collect_inliers(points: &[[f32; 3]], model: &PlaneModel, threshold: f32) -> Vec<usize> {
    (0..points.len())
        .filter(|&j| model.distance_to_point(&points[j]) <= threshold)
        .collect()
}

/// Samples 3 distinct indices in [0, n).
fn sample_three_distinct(n: usize, rng: &mut StdRng) -> Option<(usize, usize, usize)> {
    if n < 3 {
        return None;
    }
    let i0 = rng.gen_range(0..n);
    let mut i1 = rng.gen_range(0..n);
    let mut attempts = 0;
    while i1 == i0 {
        if attempts > 100 {
            return None;
        }
        i1 = rng.gen_range(0..n);
        attempts += 1;
    }
    let mut i2 = rng.gen_range(0..n);
    attempts = 0;
    while i2 == i0 || i2 == i1 {
        if attempts > 100 {
            return None;
        }
        i2 = rng.gen_range(0..n);
        attempts += 1;
    }
    Some((i0, i1, i2))
}

/// Plane through 3 points, `None` if they are collinear.
fn plane_through(p0: &[f32; 3], p1: &[f32; 3], p2: &[f32; 3]) -> Option<PlaneModel> {
    let n = vec3::cross(vec3::sub(*p1, *p0), vec3::sub(*p2, *p0));
    if vec3::norm(n) < 1e-10 {
        return None;
    }
    let normal = vec3::normalize(n)?;
    Some(PlaneModel::from_point_normal(*p0, normal))
}
