use std::collections::VecDeque;

use tabletop_core::PointCloud;
use tabletop_spatial::KdTree;

/// Extracts clusters from a point cloud using Euclidean distance-based
/// connected-component analysis.
///
/// Points whose pairwise distance is less than or equal to `tolerance` are
/// connected. Each connected component forms a cluster; only clusters whose
/// size falls within `[min_size, max_size]` are returned.
///
/// The returned clusters are sorted by size (largest first, ties by lowest
/// member index), and the indices within each cluster are ascending.
pub fn euclidean_cluster(
    cloud: &PointCloud,
    tolerance: f32,
    min_size: usize,
    max_size: usize,
) -> Vec<Vec<usize>> {
    if cloud.is_empty() || tolerance.is_nan() || tolerance <= 0.0 || min_size == 0 {
        return Vec::new();
    }

    let tree = KdTree::build(cloud);
    let n = cloud.len();
    let mut visited = vec![false; n];
    let mut clusters = Vec::new();

    for seed in 0..n {
        if visited[seed] {
            continue;
        }

        // The whole component is walked even when it grows past `max_size`,
        // so its points cannot seed a second, truncated cluster.
        let mut cluster = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(seed);
        visited[seed] = true;

        while let Some(current) = queue.pop_front() {
            cluster.push(current);

            for neighbor in tree.radius_search(&cloud.point(current), tolerance) {
                if !visited[neighbor] {
                    visited[neighbor] = true;
                    queue.push_back(neighbor);
                }
            }
        }

        if cluster.len() >= min_size && cluster.len() <= max_size {
            cluster.sort_unstable();
            clusters.push(cluster);
        }
    }

    // stable: equal sizes keep seed order
    clusters.sort_by_key(|c| std::cmp::Reverse(c.len()));
    clusters
}

/// Indices of the largest qualifying cluster, or an empty vector when no
/// cluster fits the size bounds.
pub fn largest_cluster(
    cloud: &PointCloud,
    tolerance: f32,
    min_size: usize,
    max_size: usize,
) -> Vec<usize> {
    euclidean_cluster(cloud, tolerance, min_size, max_size)
        .into_iter()
        .next()
        .unwrap_or_default()
}
