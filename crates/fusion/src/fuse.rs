use log::debug;
use tabletop_core::axes::SENSOR_ORIGIN;
use tabletop_core::PointCloud;

use crate::grid::{OccupancyGrid, OccupancyParams};
use crate::FusionError;

/// Fuses clouds that share a frame into one cloud of occupied voxel centers.
///
/// Every cloud is ray-cast from the sensor origin into a fresh grid; voxels
/// at or above `params.occupancy_threshold` are returned. Points seen in too
/// few clouds simply do not appear.
pub fn fuse_clouds(clouds: &[PointCloud], params: &OccupancyParams) -> Result<PointCloud, FusionError> {
    let mut grid = OccupancyGrid::new(*params)?;
    for cloud in clouds {
        grid.insert_cloud(cloud, SENSOR_ORIGIN);
    }
    let fused = grid.occupied_centers(params.occupancy_threshold);
    debug!(
        "fuse_clouds: {} clouds, {} observed voxels, {} occupied",
        clouds.len(),
        grid.len(),
        fused.len()
    );
    Ok(fused)
}
