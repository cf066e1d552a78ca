use hashbrown::HashMap;
use tabletop_core::PointCloud;

#[derive(Default, Clone, Copy)]
struct VoxelAccum {
    sum: [f64; 3],
    n: u32,
}

/// Integer voxel coordinates of `p` for a grid with edge `leaf`.
#[inline]
pub fn voxel_key(p: [f32; 3], leaf: f32) -> (i32, i32, i32) {
    (
        (p[0] / leaf).floor() as i32,
        (p[1] / leaf).floor() as i32,
        (p[2] / leaf).floor() as i32,
    )
}

/// Replaces the points in every occupied voxel of edge `leaf` by their
/// centroid.
///
/// Output order follows the sorted voxel keys, so the result is
/// deterministic. Non-finite points are skipped. The output carries no
/// normals.
///
/// # Panics
///
/// Panics unless `leaf` is finite and positive.
pub fn voxel_downsample(cloud: &PointCloud, leaf: f32) -> PointCloud {
    assert!(
        leaf.is_finite() && leaf > 0.0,
        "voxel leaf size must be > 0 and finite"
    );

    if cloud.is_empty() {
        return PointCloud::new();
    }

    let mut bins: HashMap<(i32, i32, i32), VoxelAccum> = HashMap::new();
    for p in cloud.iter_points() {
        if !p.iter().all(|v| v.is_finite()) {
            continue;
        }
        let entry = bins.entry(voxel_key(p, leaf)).or_default();
        for axis in 0..3 {
            entry.sum[axis] += p[axis] as f64;
        }
        entry.n += 1;
    }

    let mut cells: Vec<((i32, i32, i32), VoxelAccum)> = bins.into_iter().collect();
    cells.sort_unstable_by_key(|(key, _)| *key);

    let mut x = Vec::with_capacity(cells.len());
    let mut y = Vec::with_capacity(cells.len());
    let mut z = Vec::with_capacity(cells.len());
    for (_, a) in cells {
        let denom = a.n as f64;
        x.push((a.sum[0] / denom) as f32);
        y.push((a.sum[1] / denom) as f32);
        z.push((a.sum[2] / denom) as f32);
    }

    PointCloud::from_xyz(x, y, z)
}
