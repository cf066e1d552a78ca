use crate::Aabb;

/// Unordered point set in structure-of-arrays layout.
///
/// Every filtering or transform step produces a new cloud; nothing in the
/// workspace mutates a cloud that another stage may still be reading.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub z: Vec<f32>,
    pub normals: Option<Normals>,
}

/// Per-point unit normals, index-aligned with the owning cloud.
#[derive(Debug, Clone, PartialEq)]
pub struct Normals {
    pub nx: Vec<f32>,
    pub ny: Vec<f32>,
    pub nz: Vec<f32>,
}

impl Normals {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            nx: Vec::with_capacity(n),
            ny: Vec::with_capacity(n),
            nz: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.nx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nx.is_empty()
    }

    pub fn get(&self, i: usize) -> [f32; 3] {
        [self.nx[i], self.ny[i], self.nz[i]]
    }

    pub fn push(&mut self, n: [f32; 3]) {
        self.nx.push(n[0]);
        self.ny.push(n[1]);
        self.nz.push(n[2]);
    }
}

impl PointCloud {
    pub fn new() -> Self {
        Self {
            x: Vec::new(),
            y: Vec::new(),
            z: Vec::new(),
            normals: None,
        }
    }

    pub fn from_xyz(x: Vec<f32>, y: Vec<f32>, z: Vec<f32>) -> Self {
        assert_eq!(x.len(), y.len(), "x and y must have same length");
        assert_eq!(x.len(), z.len(), "x and z must have same length");

        Self {
            x,
            y,
            z,
            normals: None,
        }
    }

    pub fn from_points(points: &[[f32; 3]]) -> Self {
        Self::from_xyz(
            points.iter().map(|p| p[0]).collect(),
            points.iter().map(|p| p[1]).collect(),
            points.iter().map(|p| p[2]).collect(),
        )
    }

    /// Builds a cloud whose `i`-th point carries the `i`-th normal.
    pub fn from_points_normals(points: &[[f32; 3]], normals: &[[f32; 3]]) -> Self {
        assert_eq!(
            points.len(),
            normals.len(),
            "every point needs exactly one normal"
        );
        let mut cloud = Self::from_points(points);
        let mut n = Normals::with_capacity(normals.len());
        for &normal in normals {
            n.push(normal);
        }
        cloud.normals = Some(n);
        cloud
    }

    pub fn len(&self) -> usize {
        debug_assert_eq!(self.x.len(), self.y.len());
        debug_assert_eq!(self.x.len(), self.z.len());
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_xyz(&self.x, &self.y, &self.z)
    }

    pub fn point(&self, i: usize) -> [f32; 3] {
        [self.x[i], self.y[i], self.z[i]]
    }

    /// Normal of point `i`, if the cloud carries normals.
    pub fn normal(&self, i: usize) -> Option<[f32; 3]> {
        self.normals.as_ref().map(|n| n.get(i))
    }

    pub fn iter_points(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .zip(&self.z)
            .map(|((x, y), z)| [*x, *y, *z])
    }

    /// Points copied into a contiguous array-of-structs buffer.
    pub fn to_points(&self) -> Vec<[f32; 3]> {
        self.iter_points().collect()
    }

    /// Gathers the given indices (in the given order) into a new cloud.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    pub fn select(&self, indices: &[usize]) -> Self {
        let n = self.len();
        let mut out = Self::from_xyz(
            Vec::with_capacity(indices.len()),
            Vec::with_capacity(indices.len()),
            Vec::with_capacity(indices.len()),
        );

        for &idx in indices {
            assert!(idx < n, "index {idx} out of bounds in select (len {n})");
            out.x.push(self.x[idx]);
            out.y.push(self.y[idx]);
            out.z.push(self.z[idx]);
        }

        out.normals = self.normals.as_ref().map(|src| {
            let mut dst = Normals::with_capacity(indices.len());
            for &idx in indices {
                dst.push(src.get(idx));
            }
            dst
        });

        out
    }
}

impl Default for PointCloud {
    fn default() -> Self {
        Self::new()
    }
}
