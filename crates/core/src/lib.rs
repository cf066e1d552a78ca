#![forbid(unsafe_code)]

pub mod axes;
pub mod bbox;
pub mod cloud;
pub mod organized;
pub mod transform;
pub mod vec3;

pub use bbox::Aabb;
pub use cloud::{Normals, PointCloud};
pub use organized::{assemble_cloud, FilteredFrame, NormalImage, OrganizedCloud};
pub use transform::{apply_transform, RigidTransform};
