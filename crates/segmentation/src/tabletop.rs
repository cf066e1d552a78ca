use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tabletop_core::{apply_transform, vec3, PointCloud, RigidTransform};
use tabletop_filters::band_filter;

use crate::error::{require_finite, Result, SegmentationError};
use crate::table::TableModel;

/// Region above the table that counts as "on the table".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabletopParams {
    /// Height band along the table normal, in meters. The lower bound skips
    /// the table surface itself.
    pub min_height: f32,
    pub max_height: f32,
    /// Distance band from the table point, in meters. Full 3D distance, not
    /// the in-plane radius.
    pub min_radius: f32,
    pub max_radius: f32,
}

impl Default for TabletopParams {
    fn default() -> Self {
        Self {
            min_height: 0.005,
            max_height: 0.05,
            min_radius: 0.0,
            max_radius: 0.1,
        }
    }
}

impl TabletopParams {
    pub fn validate(&self) -> Result<()> {
        require_finite("min_height", self.min_height)?;
        require_finite("max_height", self.max_height)?;
        require_finite("min_radius", self.min_radius)?;
        require_finite("max_radius", self.max_radius)?;
        if self.max_height < self.min_height {
            return Err(SegmentationError::InvalidParameter {
                name: "max_height",
                value: self.max_height,
            });
        }
        if self.max_radius < self.min_radius {
            return Err(SegmentationError::InvalidParameter {
                name: "max_radius",
                value: self.max_radius,
            });
        }
        Ok(())
    }
}

/// Points resting on the table, expressed in the table frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Tabletop {
    pub cloud: PointCloud,
    /// The transform that was applied to the selected points.
    pub world_to_table: RigidTransform,
}

/// Keeps the points inside the height and radius bands around `table` and
/// re-expresses them in the table frame (local +Z = table normal, origin at
/// the table point). Normals are rotated along.
///
/// Heights are measured along `table.normal` as given; it is normalized but
/// not reoriented.
pub fn extract_tabletop(
    cloud: &PointCloud,
    table: &TableModel,
    params: &TabletopParams,
) -> Result<Tabletop> {
    params.validate()?;
    let normal = vec3::normalize(table.normal)
        .filter(|_| vec3::is_finite(table.point))
        .ok_or(SegmentationError::InvalidParameter {
            name: "table normal",
            value: vec3::norm(table.normal),
        })?;
    let table = TableModel {
        point: table.point,
        normal,
    };
    let world_to_table = table.world_to_table();

    let heights: Vec<f32> = (0..cloud.len())
        .into_par_iter()
        .map(|i| table.signed_height(cloud.point(i)))
        .collect();
    let slab = band_filter(cloud, &heights, params.min_height, params.max_height);

    let distances: Vec<f32> = (0..slab.len())
        .into_par_iter()
        .map(|i| vec3::norm(vec3::sub(slab.point(i), table.point)))
        .collect();
    let near = band_filter(&slab, &distances, params.min_radius, params.max_radius);

    debug!(
        "extract_tabletop: {} points -> {} in height band -> {} in radius",
        cloud.len(),
        slab.len(),
        near.len()
    );

    Ok(Tabletop {
        cloud: apply_transform(&near, &world_to_table),
        world_to_table,
    })
}
