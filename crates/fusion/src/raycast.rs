//! Voxel traversal along a segment (Amanatides & Woo 3D DDA).

use crate::grid::{key_of, VoxelKey};

/// Voxels crossed by the segment `origin -> end`, starting with the origin's
/// voxel and stopping before the voxel that contains `end`.
///
/// Empty when both ends share a voxel or either end is not finite or lies
/// outside the grid extent, so the traversal never exceeds
/// `6 * MAX_KEY` voxels (see [`MAX_KEY`](crate::grid::MAX_KEY)).
pub fn ray_keys(origin: [f32; 3], end: [f32; 3], cell: f32) -> Vec<VoxelKey> {
    let (Some(start), Some(goal)) = (key_of(origin, cell), key_of(end, cell)) else {
        return Vec::new();
    };
    if start == goal {
        return Vec::new();
    }

    let cell = cell as f64;
    let o = origin.map(|v| v as f64);
    let d = [
        end[0] as f64 - o[0],
        end[1] as f64 - o[1],
        end[2] as f64 - o[2],
    ];
    let length = (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt();
    let dir = d.map(|v| v / length);

    let mut step = [0i32; 3];
    let mut t_max = [f64::INFINITY; 3];
    let mut t_delta = [f64::INFINITY; 3];
    for axis in 0..3 {
        if dir[axis] > 0.0 {
            step[axis] = 1;
            let border = (start[axis] as f64 + 1.0) * cell;
            t_max[axis] = (border - o[axis]) / dir[axis];
            t_delta[axis] = cell / dir[axis];
        } else if dir[axis] < 0.0 {
            step[axis] = -1;
            let border = start[axis] as f64 * cell;
            t_max[axis] = (border - o[axis]) / dir[axis];
            t_delta[axis] = -cell / dir[axis];
        }
    }

    let budget: i64 = (0..3)
        .map(|a| (goal[a] as i64 - start[a] as i64).abs())
        .sum();
    let mut keys = Vec::with_capacity(budget as usize + 1);
    let mut current = start;
    keys.push(current);

    for _ in 0..budget {
        let axis = if t_max[0] < t_max[1] {
            if t_max[0] < t_max[2] {
                0
            } else {
                2
            }
        } else if t_max[1] < t_max[2] {
            1
        } else {
            2
        };
        if t_max[axis] > length {
            break;
        }
        current[axis] += step[axis];
        t_max[axis] += t_delta[axis];
        if current == goal {
            break;
        }
        keys.push(current);
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_aligned_ray_visits_every_voxel_before_the_end() {
        let keys = ray_keys([0.001, 0.001, 0.001], [0.011, 0.001, 0.001], 0.002);
        let expected: Vec<VoxelKey> = (0..5).map(|i| [i, 0, 0]).collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn negative_direction() {
        let keys = ray_keys([0.001, 0.001, 0.001], [-0.005, 0.001, 0.001], 0.002);
        assert_eq!(keys, vec![[0, 0, 0], [-1, 0, 0], [-2, 0, 0]]);
    }

    #[test]
    fn same_voxel_gives_nothing() {
        assert!(ray_keys([0.0001; 3], [0.0015; 3], 0.002).is_empty());
    }

    #[test]
    fn non_finite_end_gives_nothing() {
        assert!(ray_keys([0.0; 3], [f32::NAN, 0.0, 1.0], 0.002).is_empty());
    }

    #[test]
    fn end_outside_the_extent_gives_nothing() {
        assert!(ray_keys([0.0; 3], [0.0, 0.0, 1.0e7], 0.002).is_empty());
        // a long ray inside the extent is still traversed in full
        let keys = ray_keys([0.0001; 3], [0.0001, 0.0001, 60.0], 0.002);
        assert_eq!(keys.len(), 29_999);
        assert_eq!(*keys.last().unwrap(), [0, 0, 29_998]);
    }

    #[test]
    fn diagonal_steps_are_face_connected() {
        let keys = ray_keys([0.0005, 0.0005, 0.0005], [0.0195, 0.0113, 0.0071], 0.002);
        assert_eq!(keys[0], [0, 0, 0]);
        for w in keys.windows(2) {
            let manhattan: i32 = (0..3).map(|a| (w[1][a] - w[0][a]).abs()).sum();
            assert_eq!(manhattan, 1, "{:?} -> {:?}", w[0], w[1]);
        }
        assert!(!keys.contains(&[9, 5, 3]));
    }
}
