//! Row/column indexed frames as delivered by a depth sensor.

use crate::vec3;
use crate::{Normals, PointCloud};

/// A `height x width` grid of 3D points in row-major order.
///
/// A cell with any non-finite coordinate is a "no return" and never carries
/// geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct OrganizedCloud {
    width: usize,
    height: usize,
    points: Vec<[f32; 3]>,
}

impl OrganizedCloud {
    /// # Panics
    ///
    /// Panics if `points.len() != width * height`.
    pub fn new(width: usize, height: usize, points: Vec<[f32; 3]>) -> Self {
        assert_eq!(
            points.len(),
            width * height,
            "organized cloud must have width * height cells"
        );
        Self {
            width,
            height,
            points,
        }
    }

    /// Frame where every cell is a no-return.
    pub fn no_returns(width: usize, height: usize) -> Self {
        Self::new(width, height, vec![[f32::NAN; 3]; width * height])
    }

    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(usize, usize) -> [f32; 3],
    ) -> Self {
        let mut points = Vec::with_capacity(width * height);
        for row in 0..height {
            for col in 0..width {
                points.push(f(row, col));
            }
        }
        Self::new(width, height, points)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < self.height && col < self.width);
        row * self.width + col
    }

    pub fn get(&self, row: usize, col: usize) -> [f32; 3] {
        self.points[self.index(row, col)]
    }

    pub fn points(&self) -> &[[f32; 3]] {
        &self.points
    }

    /// True when the cell holds a finite return.
    pub fn has_return(&self, i: usize) -> bool {
        vec3::is_finite(self.points[i])
    }

    pub fn count_returns(&self) -> usize {
        self.points.iter().filter(|p| vec3::is_finite(**p)).count()
    }

    /// One coordinate channel (0 = x, 1 = y, 2 = z) as a flat image.
    pub fn channel(&self, axis: usize) -> Vec<f32> {
        assert!(axis < 3, "axis must be 0, 1 or 2");
        self.points.iter().map(|p| p[axis]).collect()
    }
}

/// Per-cell unit normals matching an [`OrganizedCloud`] grid. `None` marks an
/// invalid cell.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalImage {
    width: usize,
    height: usize,
    normals: Vec<Option<[f32; 3]>>,
}

impl NormalImage {
    /// # Panics
    ///
    /// Panics if `normals.len() != width * height`.
    pub fn new(width: usize, height: usize, normals: Vec<Option<[f32; 3]>>) -> Self {
        assert_eq!(
            normals.len(),
            width * height,
            "normal image must have width * height cells"
        );
        Self {
            width,
            height,
            normals,
        }
    }

    pub fn invalid(width: usize, height: usize) -> Self {
        Self::new(width, height, vec![None; width * height])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.normals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.normals.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<[f32; 3]> {
        self.normals[row * self.width + col]
    }

    pub fn normals(&self) -> &[Option<[f32; 3]>] {
        &self.normals
    }

    pub fn count_valid(&self) -> usize {
        self.normals.iter().filter(|n| n.is_some()).count()
    }
}

/// Points and normals that survived normal estimation; rejected cells are
/// NaN in `points` and `None` in `normals`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredFrame {
    pub points: OrganizedCloud,
    pub normals: NormalImage,
}

impl FilteredFrame {
    pub fn empty() -> Self {
        Self {
            points: OrganizedCloud::new(0, 0, Vec::new()),
            normals: NormalImage::new(0, 0, Vec::new()),
        }
    }

    /// Flattens into an unordered cloud; see [`assemble_cloud`].
    pub fn to_cloud(&self) -> PointCloud {
        assemble_cloud(&self.points, &self.normals)
    }
}

/// Flattens an organized point grid and its normal image into an unordered
/// cloud with normals.
///
/// Cells are visited row-major. A cell is kept only when its point is finite
/// and its normal is valid, so the `i`-th output normal always belongs to the
/// `i`-th output point.
///
/// # Panics
///
/// Panics if the two grids differ in shape.
pub fn assemble_cloud(points: &OrganizedCloud, normals: &NormalImage) -> PointCloud {
    assert_eq!(
        (points.width(), points.height()),
        (normals.width(), normals.height()),
        "point and normal grids must share a shape"
    );

    let mut x = Vec::new();
    let mut y = Vec::new();
    let mut z = Vec::new();
    let mut out_normals = Normals::with_capacity(0);

    for (p, n) in points.points().iter().zip(normals.normals()) {
        let Some(n) = n else { continue };
        if !vec3::is_finite(*p) || !vec3::is_finite(*n) {
            continue;
        }
        x.push(p[0]);
        y.push(p[1]);
        z.push(p[2]);
        out_normals.push(*n);
    }

    let mut cloud = PointCloud::from_xyz(x, y, z);
    cloud.normals = Some(out_normals);
    cloud
}
