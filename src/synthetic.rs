//! Pinhole rendering of a simple tabletop scene: a disc-shaped table, a
//! sphere resting on it and an optional back wall.
//!
//! Used by tests, benches and demos in place of a live depth sensor.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tabletop_core::{vec3, OrganizedCloud};
use tabletop_segmentation::TableModel;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneParams {
    pub width: usize,
    pub height: usize,
    /// Focal length in pixels; the principal point is the image center.
    pub focal: f32,
    /// Center of the table disc.
    pub table_center: [f32; 3],
    /// Table normal; it is flipped toward the camera if needed.
    pub table_normal: [f32; 3],
    pub table_radius: f32,
    /// Radius of the sphere touching the table at `table_center`; 0 disables it.
    pub object_radius: f32,
    /// Depth of a fronto-parallel wall behind the table.
    pub wall_depth: Option<f32>,
    /// Half-width of the uniform range noise, in meters.
    pub noise: f32,
    pub seed: u64,
}

impl Default for SceneParams {
    fn default() -> Self {
        Self {
            width: 160,
            height: 120,
            focal: 150.0,
            table_center: [0.0, 0.25, 0.8],
            table_normal: [0.0, -0.8, -0.6],
            table_radius: 0.15,
            object_radius: 0.04,
            wall_depth: None,
            noise: 0.0005,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticScene {
    pub frame: OrganizedCloud,
    /// Ground-truth table, oriented toward the camera.
    pub table: TableModel,
    pub object_center: Option<[f32; 3]>,
}

/// Renders `params` into an organized frame. Pixels that hit nothing are
/// no-returns.
///
/// Returns `None` when the table normal is degenerate.
pub fn render_scene(params: &SceneParams) -> Option<SyntheticScene> {
    let table = TableModel::new(params.table_center, params.table_normal)?;
    let object_center = (params.object_radius > 0.0)
        .then(|| vec3::add(table.point, vec3::scale(table.normal, params.object_radius)));

    let mut rng = StdRng::seed_from_u64(params.seed);
    let cx = (params.width as f32 - 1.0) / 2.0;
    let cy = (params.height as f32 - 1.0) / 2.0;

    let frame = OrganizedCloud::from_fn(params.width, params.height, |row, col| {
        let ray = [
            (col as f32 - cx) / params.focal,
            (row as f32 - cy) / params.focal,
            1.0,
        ];
        let hits = [
            hit_disc(ray, &table, params.table_radius),
            object_center.and_then(|c| hit_sphere(ray, c, params.object_radius)),
            params.wall_depth.filter(|d| *d > 0.0),
        ];
        match hits.into_iter().flatten().min_by(f32::total_cmp) {
            Some(t) => {
                let t = t + rng.gen_range(-params.noise..=params.noise);
                vec3::scale(ray, t)
            }
            None => [f32::NAN; 3],
        }
    });

    Some(SyntheticScene {
        frame,
        table,
        object_center,
    })
}

/// Ray parameter of the hit with the table disc, if any.
fn hit_disc(ray: [f32; 3], table: &TableModel, radius: f32) -> Option<f32> {
    let denom = vec3::dot(ray, table.normal);
    if denom.abs() < 1e-9 {
        return None;
    }
    let t = vec3::dot(table.point, table.normal) / denom;
    let p = vec3::scale(ray, t);
    (t > 0.0 && vec3::norm(vec3::sub(p, table.point)) <= radius).then_some(t)
}

/// Nearest positive ray parameter of the hit with a sphere.
fn hit_sphere(ray: [f32; 3], center: [f32; 3], radius: f32) -> Option<f32> {
    let a = vec3::dot(ray, ray);
    let b = -2.0 * vec3::dot(ray, center);
    let c = vec3::dot(center, center) - radius * radius;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let t = (-b - disc.sqrt()) / (2.0 * a);
    (t > 0.0).then_some(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn noiseless_table_points_lie_on_the_plane() {
        let params = SceneParams {
            noise: 0.0,
            object_radius: 0.0,
            ..Default::default()
        };
        let scene = render_scene(&params).unwrap();
        let mut hits = 0;
        for p in scene.frame.points().iter().filter(|p| vec3::is_finite(**p)) {
            assert_abs_diff_eq!(scene.table.signed_height(*p), 0.0, epsilon = 1e-5);
            hits += 1;
        }
        assert!(hits > 800, "only {hits} table pixels");
        // corners look past the table
        assert!(!vec3::is_finite(scene.frame.get(0, 0)));
    }

    #[test]
    fn sphere_sits_on_the_table() {
        let params = SceneParams {
            noise: 0.0,
            ..Default::default()
        };
        let scene = render_scene(&params).unwrap();
        let center = scene.object_center.unwrap();
        assert_abs_diff_eq!(scene.table.signed_height(center), 0.04, epsilon = 1e-6);
        let on_sphere = scene
            .frame
            .points()
            .iter()
            .filter(|p| vec3::is_finite(**p))
            .filter(|p| (vec3::norm(vec3::sub(**p, center)) - 0.04).abs() < 1e-4)
            .count();
        assert!(on_sphere > 50, "only {on_sphere} sphere pixels");
    }

    #[test]
    fn wall_fills_the_background() {
        let params = SceneParams {
            wall_depth: Some(3.0),
            ..Default::default()
        };
        let scene = render_scene(&params).unwrap();
        assert_eq!(scene.frame.count_returns(), scene.frame.len());
        assert_abs_diff_eq!(scene.frame.get(0, 0)[2], 3.0, epsilon = 1e-3);
    }

    #[test]
    fn same_seed_same_frame() {
        let a = render_scene(&SceneParams::default()).unwrap();
        let b = render_scene(&SceneParams::default()).unwrap();
        let bits = |s: &SyntheticScene| -> Vec<[u32; 3]> {
            s.frame.points().iter().map(|p| p.map(f32::to_bits)).collect()
        };
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn degenerate_normal_renders_nothing() {
        let params = SceneParams {
            table_normal: [0.0; 3],
            ..Default::default()
        };
        assert!(render_scene(&params).is_none());
    }
}
