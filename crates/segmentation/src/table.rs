use tabletop_core::axes::CAMERA_FORWARD;
use tabletop_core::{vec3, RigidTransform};

/// The selected support plane: a point on it and a unit normal pointing back
/// toward the camera side (`dot(normal, CAMERA_FORWARD) <= 0`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableModel {
    pub point: [f32; 3],
    pub normal: [f32; 3],
}

impl TableModel {
    /// Normalizes `normal` and orients it away from the camera's viewing
    /// direction. `None` for a zero or non-finite normal or point.
    pub fn new(point: [f32; 3], normal: [f32; 3]) -> Option<Self> {
        if !vec3::is_finite(point) {
            return None;
        }
        let normal = vec3::normalize(normal)?;
        Some(Self {
            point,
            normal: orient_toward_camera(normal),
        })
    }

    /// Height of `p` above the table along its normal.
    #[inline]
    pub fn signed_height(&self, p: [f32; 3]) -> f32 {
        vec3::dot(vec3::sub(p, self.point), self.normal)
    }

    /// Table frame to world: local origin at `point`, local +Z along `normal`.
    pub fn table_to_world(&self) -> RigidTransform {
        RigidTransform::from_point_normal(self.point, self.normal)
    }

    /// World to table frame; tabletop points come out with their height as
    /// local z.
    pub fn world_to_table(&self) -> RigidTransform {
        self.table_to_world().inverse()
    }
}

/// Flips `n` if it points along the camera's viewing direction.
#[inline]
pub fn orient_toward_camera(n: [f32; 3]) -> [f32; 3] {
    if vec3::dot(n, CAMERA_FORWARD) > 0.0 {
        vec3::scale(n, -1.0)
    } else {
        n
    }
}
