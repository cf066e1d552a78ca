use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tabletop_core::axes::TOWARD_CAMERA;
use tabletop_core::{vec3, FilteredFrame, NormalImage, OrganizedCloud};
use thiserror::Error;

use crate::kernels::{box_blur, sobel};

/// Tuning for [`estimate_organized_normals`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalEstimationParams {
    /// Depth written into no-return cells before smoothing, in meters.
    pub no_return_fill: f32,
    /// Box-blur aperture used for hole filling.
    pub blur_kernel_size: usize,
    /// Number of blur passes; valid cells are restored after each one.
    pub blur_passes: usize,
    /// Sobel aperture for the tangent derivatives.
    pub gradient_kernel_size: usize,
    /// Minimum `dot(normal, TOWARD_CAMERA)` for a normal to be kept
    /// (inclusive). Rejects grazing surfaces.
    pub min_view_cosine: f32,
}

impl Default for NormalEstimationParams {
    fn default() -> Self {
        Self {
            no_return_fill: 30.0,
            blur_kernel_size: 5,
            blur_passes: 10,
            gradient_kernel_size: 11,
            min_view_cosine: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalsError {
    #[error("{name} must be an odd aperture >= {min}, got {value}")]
    BadAperture {
        name: &'static str,
        min: usize,
        value: usize,
    },
    #[error("{name} must be finite, got {value}")]
    NotFinite { name: &'static str, value: f32 },
}

impl NormalEstimationParams {
    pub fn validate(&self) -> Result<(), NormalsError> {
        check_aperture("blur_kernel_size", 1, self.blur_kernel_size)?;
        check_aperture("gradient_kernel_size", 3, self.gradient_kernel_size)?;
        check_finite("no_return_fill", self.no_return_fill)?;
        check_finite("min_view_cosine", self.min_view_cosine)?;
        Ok(())
    }
}

fn check_aperture(name: &'static str, min: usize, value: usize) -> Result<(), NormalsError> {
    if value < min || value % 2 == 0 {
        return Err(NormalsError::BadAperture { name, min, value });
    }
    Ok(())
}

fn check_finite(name: &'static str, value: f32) -> Result<(), NormalsError> {
    if !value.is_finite() {
        return Err(NormalsError::NotFinite { name, value });
    }
    Ok(())
}

/// Estimates per-pixel normals for an organized frame and drops pixels whose
/// surface is noisy or seen at a grazing angle.
///
/// # Algorithm
///
/// 1. No-return cells are filled with `no_return_fill`.
/// 2. Each coordinate channel is box-blurred `blur_passes` times, writing the
///    original values back into cells with a return after every pass. Holes
///    fill in by diffusion while valid pixels stay untouched.
/// 3. Sobel derivatives of X, Y and Z along columns and rows give the two
///    tangents `dP/dcol` and `dP/drow`.
/// 4. `n = -(dP/dcol x dP/drow)`, unit-normalized, points back toward the
///    sensor. A zero-length cross product leaves the cell invalid.
/// 5. Cells with `dot(n, TOWARD_CAMERA) < min_view_cosine` are rejected.
///
/// Rejected and no-return cells are NaN in the returned points and `None` in
/// the returned normals.
///
/// # Errors
///
/// Returns [`NormalsError`] when `params` fails [`NormalEstimationParams::validate`].
pub fn estimate_organized_normals(
    frame: &OrganizedCloud,
    params: &NormalEstimationParams,
) -> Result<FilteredFrame, NormalsError> {
    params.validate()?;
    let (width, height) = (frame.width(), frame.height());
    if frame.is_empty() {
        return Ok(FilteredFrame {
            points: OrganizedCloud::new(width, height, Vec::new()),
            normals: NormalImage::new(width, height, Vec::new()),
        });
    }

    let has_return: Vec<bool> = (0..frame.len()).map(|i| frame.has_return(i)).collect();

    let filled: Vec<Vec<f32>> = (0..3)
        .map(|axis| {
            let mut channel = frame.channel(axis);
            for (v, &ok) in channel.iter_mut().zip(&has_return) {
                if !ok {
                    *v = params.no_return_fill;
                }
            }
            channel
        })
        .collect();

    let mut smoothed = filled.clone();
    for _ in 0..params.blur_passes {
        for (channel, original) in smoothed.iter_mut().zip(&filled) {
            let blurred = box_blur(channel, width, height, params.blur_kernel_size);
            for (i, (dst, b)) in channel.iter_mut().zip(blurred).enumerate() {
                *dst = if has_return[i] { original[i] } else { b };
            }
        }
    }

    let ksize = params.gradient_kernel_size;
    let d_col: Vec<Vec<f32>> = smoothed
        .iter()
        .map(|c| sobel(c, width, height, 1, 0, ksize))
        .collect();
    let d_row: Vec<Vec<f32>> = smoothed
        .iter()
        .map(|c| sobel(c, width, height, 0, 1, ksize))
        .collect();

    let accepted: Vec<Option<[f32; 3]>> = (0..frame.len())
        .into_par_iter()
        .map(|i| {
            if !has_return[i] {
                return None;
            }
            let t_col = [d_col[0][i], d_col[1][i], d_col[2][i]];
            let t_row = [d_row[0][i], d_row[1][i], d_row[2][i]];
            let n = vec3::normalize(vec3::scale(vec3::cross(t_col, t_row), -1.0))?;
            (vec3::dot(n, TOWARD_CAMERA) >= params.min_view_cosine).then_some(n)
        })
        .collect();

    let points: Vec<[f32; 3]> = frame
        .points()
        .iter()
        .zip(&accepted)
        .map(|(p, n)| if n.is_some() { *p } else { [f32::NAN; 3] })
        .collect();

    let normals = NormalImage::new(width, height, accepted);
    debug!(
        "estimate_organized_normals: {}x{} frame, {} returns, {} accepted normals",
        width,
        height,
        frame.count_returns(),
        normals.count_valid()
    );

    Ok(FilteredFrame {
        points: OrganizedCloud::new(width, height, points),
        normals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    const W: usize = 40;
    const H: usize = 30;
    const PIXEL: f32 = 0.004;

    /// Plane `z = depth + slope * x` sampled on a regular lateral grid.
    fn slanted_plane(slope: f32, depth: f32) -> OrganizedCloud {
        OrganizedCloud::from_fn(W, H, |row, col| {
            let x = (col as f32 - W as f32 / 2.0) * PIXEL;
            let y = (row as f32 - H as f32 / 2.0) * PIXEL;
            [x, y, depth + slope * x]
        })
    }

    fn interior(frame: &FilteredFrame) -> Vec<Option<[f32; 3]>> {
        let mut out = Vec::new();
        for row in 6..H - 6 {
            for col in 6..W - 6 {
                out.push(frame.normals.get(row, col));
            }
        }
        out
    }

    #[test]
    fn fronto_parallel_plane_faces_camera() {
        let out = estimate_organized_normals(&slanted_plane(0.0, 1.0), &NormalEstimationParams::default()).unwrap();
        for n in interior(&out) {
            let n = n.expect("interior normal should be valid");
            assert_abs_diff_eq!(n[0], 0.0, epsilon = 1e-4);
            assert_abs_diff_eq!(n[1], 0.0, epsilon = 1e-4);
            assert_abs_diff_eq!(n[2], -1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn border_pixels_have_no_normal() {
        let out = estimate_organized_normals(&slanted_plane(0.0, 1.0), &NormalEstimationParams::default()).unwrap();
        for col in 0..W {
            assert!(out.normals.get(0, col).is_none());
            assert!(out.points.get(0, col)[2].is_nan());
        }
        for row in 0..H {
            assert!(out.normals.get(row, W - 1).is_none());
        }
    }

    #[test]
    fn view_cosine_just_above_threshold_is_kept() {
        // cos = 1 / sqrt(1 + slope^2) = 0.21
        let slope = (1.0f32 / (0.21 * 0.21) - 1.0).sqrt();
        let out = estimate_organized_normals(&slanted_plane(slope, 2.0), &NormalEstimationParams::default()).unwrap();
        for n in interior(&out) {
            let n = n.expect("normal above the cosine threshold should survive");
            assert_abs_diff_eq!(vec3::dot(n, TOWARD_CAMERA), 0.21, epsilon = 1e-3);
        }
    }

    #[test]
    fn view_cosine_just_below_threshold_is_rejected() {
        // cos = 0.19
        let slope = (1.0f32 / (0.19 * 0.19) - 1.0).sqrt();
        let out = estimate_organized_normals(&slanted_plane(slope, 2.0), &NormalEstimationParams::default()).unwrap();
        assert_eq!(out.normals.count_valid(), 0);
        assert_eq!(out.points.count_returns(), 0);
    }

    #[test]
    fn threshold_override_changes_acceptance() {
        let slope = (1.0f32 / (0.19 * 0.19) - 1.0).sqrt();
        let params = NormalEstimationParams {
            min_view_cosine: 0.1,
            ..Default::default()
        };
        let out = estimate_organized_normals(&slanted_plane(slope, 2.0), &params).unwrap();
        assert!(interior(&out).iter().all(|n| n.is_some()));
    }

    #[test]
    fn holes_stay_invalid_and_do_not_disturb_neighbours() {
        let mut pts = slanted_plane(0.0, 1.0).points().to_vec();
        for row in 12..16 {
            for col in 18..22 {
                pts[row * W + col] = [f32::NAN; 3];
            }
        }
        let frame = OrganizedCloud::new(W, H, pts);
        let out = estimate_organized_normals(&frame, &NormalEstimationParams::default()).unwrap();

        for row in 12..16 {
            for col in 18..22 {
                assert!(out.normals.get(row, col).is_none());
                assert!(out.points.get(row, col)[0].is_nan());
            }
        }
        // accepted points keep their raw coordinates
        let kept = out.points.get(6, 6);
        assert_eq!(kept, frame.get(6, 6));
    }

    #[test]
    fn all_no_return_frame_yields_nothing() {
        let out = estimate_organized_normals(&OrganizedCloud::no_returns(16, 12), &NormalEstimationParams::default()).unwrap();
        assert_eq!(out.normals.count_valid(), 0);
        assert!(out.to_cloud().is_empty());
    }

    #[test]
    fn empty_frame_yields_empty_grids() {
        let out = estimate_organized_normals(&OrganizedCloud::new(0, 0, Vec::new()), &NormalEstimationParams::default()).unwrap();
        assert!(out.points.is_empty());
        assert!(out.normals.is_empty());
    }

    #[test]
    fn bad_params_are_reported_instead_of_panicking() {
        let frame = slanted_plane(0.0, 1.0);
        let even_gradient = NormalEstimationParams {
            gradient_kernel_size: 4,
            ..Default::default()
        };
        assert_eq!(
            estimate_organized_normals(&frame, &even_gradient).unwrap_err(),
            NormalsError::BadAperture {
                name: "gradient_kernel_size",
                min: 3,
                value: 4
            }
        );
        let empty_blur = NormalEstimationParams {
            blur_kernel_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            estimate_organized_normals(&frame, &empty_blur),
            Err(NormalsError::BadAperture { name: "blur_kernel_size", .. })
        ));
        let nan_cosine = NormalEstimationParams {
            min_view_cosine: f32::NAN,
            ..Default::default()
        };
        assert!(matches!(
            estimate_organized_normals(&frame, &nan_cosine),
            Err(NormalsError::NotFinite { name: "min_view_cosine", .. })
        ));
        // the empty frame is no exception
        let empty = OrganizedCloud::new(0, 0, Vec::new());
        assert!(estimate_organized_normals(&empty, &even_gradient).is_err());
    }

    #[test]
    fn validate_rejects_even_apertures() {
        let params = NormalEstimationParams {
            gradient_kernel_size: 10,
            ..Default::default()
        };
        assert!(matches!(params.validate(), Err(NormalsError::BadAperture { .. })));
        assert!(NormalEstimationParams::default().validate().is_ok());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn normals_are_unit_or_invalid(
            depths in prop::collection::vec(prop::option::weighted(0.9, 0.5f32..3.0), 12 * 10)
        ) {
            let frame = OrganizedCloud::from_fn(12, 10, |row, col| match depths[row * 12 + col] {
                Some(z) => [(col as f32 - 6.0) * 0.01 * z, (row as f32 - 5.0) * 0.01 * z, z],
                None => [f32::NAN; 3],
            });
            let params = NormalEstimationParams {
                gradient_kernel_size: 3,
                ..Default::default()
            };
            let out = estimate_organized_normals(&frame, &params).unwrap();
            for n in out.normals.normals().iter().flatten() {
                prop_assert!((vec3::norm(*n) - 1.0).abs() < 1e-4);
                prop_assert!(vec3::dot(*n, TOWARD_CAMERA) >= params.min_view_cosine);
            }
        }
    }
}
