use kiddo::float::distance::SquaredEuclidean;
use kiddo::immutable::float::kdtree::ImmutableKdTree;
use tabletop_core::PointCloud;

/// Immutable KD-tree over the points of a cloud, answering radius queries
/// with indices into that cloud.
///
/// Wraps kiddo's `ImmutableKdTree`, which is built once in a cache-friendly
/// layout and cannot be modified afterwards.
#[derive(Debug, Clone)]
pub struct KdTree {
    tree: ImmutableKdTree<f32, u32, 3, 32>,
    num_points: usize,
}

impl KdTree {
    pub fn build(cloud: &PointCloud) -> Self {
        Self::from_points(&cloud.to_points())
    }

    pub fn from_points(points: &[[f32; 3]]) -> Self {
        Self {
            tree: ImmutableKdTree::new_from_slice(points),
            num_points: points.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.num_points
    }

    pub fn is_empty(&self) -> bool {
        self.num_points == 0
    }

    /// Indices of all points with `euclidean_dist <= radius`, ascending.
    ///
    /// Empty for an empty tree, a non-positive or non-finite radius, or a
    /// query with a non-finite coordinate.
    pub fn radius_search(&self, query: &[f32; 3], radius: f32) -> Vec<usize> {
        if self.is_empty()
            || radius <= 0.0
            || !radius.is_finite()
            || !query.iter().all(|v| v.is_finite())
        {
            return Vec::new();
        }

        let radius_sq = radius * radius;
        // kiddo compares with strict `<`; widen slightly, then filter with `<=`
        let widened = radius_sq + f32::EPSILON * radius_sq.max(1.0);

        let mut indices: Vec<usize> = self
            .tree
            .within_unsorted::<SquaredEuclidean>(query, widened)
            .into_iter()
            .filter(|nn| nn.distance <= radius_sq)
            .map(|nn| nn.item as usize)
            .collect();
        indices.sort_unstable();
        indices
    }
}
