use nalgebra::{Matrix3, Vector3};

use crate::{vec3, Normals, PointCloud};

/// Rigid transform `p' = R * p + t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    pub rotation: [[f32; 3]; 3],
    pub translation: [f32; 3],
}

impl RigidTransform {
    pub fn identity() -> Self {
        Self {
            rotation: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            translation: [0.0, 0.0, 0.0],
        }
    }

    /// Frame anchored at `point` whose local +Z axis is `normal`.
    ///
    /// The tangent basis is the closed form
    ///
    /// ```text
    /// s    = sqrt(nx^2 + ny^2)
    /// row0 = ( ny/s,     -nx/s,     0 )
    /// row1 = ( nx*nz/s,  ny*nz/s,  -s )
    /// row2 = ( nx,       ny,        nz)
    /// ```
    ///
    /// and the returned rotation is its transpose, so the transform maps local
    /// coordinates to world coordinates. A normal parallel to Z has no unique
    /// tangent basis; the rotation is then the identity.
    pub fn from_point_normal(point: [f32; 3], normal: [f32; 3]) -> Self {
        let [nx, ny, nz] = normal;
        let s2 = nx * nx + ny * ny;

        let rotation = if s2 != 0.0 {
            let s = s2.sqrt();
            let basis = [
                [ny / s, -nx / s, 0.0],
                [nx * nz / s, ny * nz / s, -s],
                [nx, ny, nz],
            ];
            transpose(&basis)
        } else {
            Self::identity().rotation
        };

        Self {
            rotation,
            translation: point,
        }
    }

    pub fn is_identity(&self, eps: f32) -> bool {
        let id = Self::identity();
        let rot_ok = (0..3).all(|r| (0..3).all(|c| (self.rotation[r][c] - id.rotation[r][c]).abs() <= eps));
        rot_ok && self.translation.iter().all(|t| t.abs() <= eps)
    }

    /// Apply the rigid transform to a single point: R * p + t
    pub fn apply_to_point(&self, p: &[f32; 3]) -> [f32; 3] {
        vec3::add(self.rotate(p), self.translation)
    }

    /// Rotation only; used for directions such as normals.
    pub fn rotate(&self, v: &[f32; 3]) -> [f32; 3] {
        let r = &self.rotation;
        [
            r[0][0] * v[0] + r[0][1] * v[1] + r[0][2] * v[2],
            r[1][0] * v[0] + r[1][1] * v[1] + r[1][2] * v[2],
            r[2][0] * v[0] + r[2][1] * v[1] + r[2][2] * v[2],
        ]
    }

    /// Rigid inverse: `R' = R^T`, `t' = -R^T t`.
    pub fn inverse(&self) -> Self {
        let rt = mat3_from_arrays(&self.rotation).transpose();
        let t = -(rt * Vector3::from(self.translation));
        Self {
            rotation: mat3_to_arrays(&rt),
            translation: [t[0], t[1], t[2]],
        }
    }

    /// Compose two transforms: apply `self` first, then `other`.
    pub fn compose(&self, other: &RigidTransform) -> RigidTransform {
        let r_self = mat3_from_arrays(&self.rotation);
        let r_other = mat3_from_arrays(&other.rotation);
        let t_new = r_other * Vector3::from(self.translation) + Vector3::from(other.translation);

        RigidTransform {
            rotation: mat3_to_arrays(&(r_other * r_self)),
            translation: [t_new[0], t_new[1], t_new[2]],
        }
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Transforms every point of `cloud`; normals, when present, are rotated but
/// not translated.
pub fn apply_transform(cloud: &PointCloud, transform: &RigidTransform) -> PointCloud {
    let n = cloud.len();
    let mut x = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    let mut z = Vec::with_capacity(n);

    for p in cloud.iter_points() {
        let tp = transform.apply_to_point(&p);
        x.push(tp[0]);
        y.push(tp[1]);
        z.push(tp[2]);
    }

    let mut out = PointCloud::from_xyz(x, y, z);
    out.normals = cloud.normals.as_ref().map(|src| {
        let mut dst = Normals::with_capacity(src.len());
        for i in 0..src.len() {
            dst.push(transform.rotate(&src.get(i)));
        }
        dst
    });
    out
}

fn transpose(m: &[[f32; 3]; 3]) -> [[f32; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for (r, row) in m.iter().enumerate() {
        for (c, v) in row.iter().enumerate() {
            out[c][r] = *v;
        }
    }
    out
}

fn mat3_from_arrays(r: &[[f32; 3]; 3]) -> Matrix3<f32> {
    Matrix3::new(
        r[0][0], r[0][1], r[0][2], r[1][0], r[1][1], r[1][2], r[2][0], r[2][1], r[2][2],
    )
}

fn mat3_to_arrays(m: &Matrix3<f32>) -> [[f32; 3]; 3] {
    [
        [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
        [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
        [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn assert_vec_eq(a: [f32; 3], b: [f32; 3], eps: f32) {
        for i in 0..3 {
            assert_abs_diff_eq!(a[i], b[i], epsilon = eps);
        }
    }

    #[test]
    fn degenerate_normal_gives_identity_rotation() {
        let tf = RigidTransform::from_point_normal([1.0, 2.0, 3.0], [0.0, 0.0, 1.0]);
        assert_eq!(tf.rotation, RigidTransform::identity().rotation);
        assert_eq!(tf.translation, [1.0, 2.0, 3.0]);

        let down = RigidTransform::from_point_normal([0.0; 3], [0.0, 0.0, -1.0]);
        assert!(down.is_identity(0.0));
    }

    #[test]
    fn local_z_maps_to_normal() {
        let n = vec3::normalize([0.3, -0.5, -0.8]).unwrap();
        let tf = RigidTransform::from_point_normal([0.1, 0.2, 0.9], n);
        assert_vec_eq(tf.rotate(&[0.0, 0.0, 1.0]), n, 1e-6);
        assert_vec_eq(tf.apply_to_point(&[0.0, 0.0, 0.0]), [0.1, 0.2, 0.9], 1e-6);
    }

    #[test]
    fn basis_is_right_handed_and_orthonormal() {
        let n = vec3::normalize([-0.2, 0.7, -0.4]).unwrap();
        let tf = RigidTransform::from_point_normal([0.0; 3], n);
        let ex = tf.rotate(&[1.0, 0.0, 0.0]);
        let ey = tf.rotate(&[0.0, 1.0, 0.0]);
        let ez = tf.rotate(&[0.0, 0.0, 1.0]);
        assert_abs_diff_eq!(vec3::dot(ex, ey), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(vec3::norm(ex), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(vec3::norm(ey), 1.0, epsilon = 1e-6);
        assert_vec_eq(vec3::cross(ex, ey), ez, 1e-6);
    }

    #[test]
    fn inverse_expresses_height_along_normal_as_local_z() {
        let p = [0.0, 0.1, 0.8];
        let n = vec3::normalize([0.0, 0.4, -1.0]).unwrap();
        let world_to_table = RigidTransform::from_point_normal(p, n).inverse();
        let above = vec3::add(p, vec3::scale(n, 0.03));
        assert_vec_eq(world_to_table.apply_to_point(&above), [0.0, 0.0, 0.03], 1e-6);
    }

    #[test]
    fn compose_with_inverse_is_identity() {
        let tf = RigidTransform::from_point_normal([1.0, -2.0, 0.5], [0.6, 0.0, 0.8]);
        assert!(tf.compose(&tf.inverse()).is_identity(1e-6));
        assert!(tf.inverse().compose(&tf).is_identity(1e-6));
    }

    #[test]
    fn apply_transform_rotates_normals_without_translation() {
        let cloud = PointCloud::from_points_normals(&[[1.0, 0.0, 0.0]], &[[1.0, 0.0, 0.0]]);
        let tf = RigidTransform {
            rotation: [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
            translation: [0.0, 0.0, 5.0],
        };
        let out = apply_transform(&cloud, &tf);
        assert_vec_eq(out.point(0), [0.0, 1.0, 5.0], 1e-6);
        assert_vec_eq(out.normal(0).unwrap(), [0.0, 1.0, 0.0], 1e-6);
    }

    #[test]
    fn apply_transform_on_empty_cloud() {
        let out = apply_transform(&PointCloud::new(), &RigidTransform::identity());
        assert!(out.is_empty());
        assert!(out.normals.is_none());
    }

    proptest! {
        #[test]
        fn round_trip_through_canonical_frame(
            p in (-2.0f32..2.0, -2.0f32..2.0, -2.0f32..2.0),
            n in (-1.0f32..1.0, -1.0f32..1.0, -1.0f32..1.0),
            q in (-2.0f32..2.0, -2.0f32..2.0, -2.0f32..2.0),
        ) {
            let Some(n) = vec3::normalize([n.0, n.1, n.2]) else { return Ok(()) };
            prop_assume!(n[0].abs() > 1e-3 || n[1].abs() > 1e-3);
            let tf = RigidTransform::from_point_normal([p.0, p.1, p.2], n);
            let q = [q.0, q.1, q.2];
            let back = tf.apply_to_point(&tf.inverse().apply_to_point(&q));
            for i in 0..3 {
                prop_assert!((back[i] - q[i]).abs() < 1e-4, "{:?} vs {:?}", back, q);
            }
        }
    }
}
