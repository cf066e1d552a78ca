use hashbrown::{HashMap, HashSet};
use log::debug;
use serde::{Deserialize, Serialize};
use tabletop_core::PointCloud;

use crate::raycast::ray_keys;
use crate::FusionError;

/// Integer voxel coordinates, `floor(p / cell)` per axis.
pub type VoxelKey = [i32; 3];

/// Sensor model and grid resolution for [`OccupancyGrid`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OccupancyParams {
    /// Voxel edge length, in meters.
    pub cell_size: f32,
    /// Probability assigned to the voxel a ray ends in.
    pub prob_hit: f32,
    /// Probability assigned to voxels a ray passes through.
    pub prob_miss: f32,
    pub clamp_min: f32,
    pub clamp_max: f32,
    /// Voxels at or above this probability are reported as occupied.
    pub occupancy_threshold: f32,
}

impl Default for OccupancyParams {
    fn default() -> Self {
        Self {
            cell_size: 0.002,
            prob_hit: 0.7,
            prob_miss: 0.4,
            clamp_min: 0.1192,
            clamp_max: 0.971,
            occupancy_threshold: 0.9,
        }
    }
}

impl OccupancyParams {
    pub fn validate(&self) -> Result<(), FusionError> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(FusionError::InvalidParameter {
                name: "cell_size",
                value: self.cell_size,
            });
        }
        for (name, p) in [
            ("prob_hit", self.prob_hit),
            ("prob_miss", self.prob_miss),
            ("clamp_min", self.clamp_min),
            ("clamp_max", self.clamp_max),
            ("occupancy_threshold", self.occupancy_threshold),
        ] {
            if !(p > 0.0 && p < 1.0) {
                return Err(FusionError::InvalidParameter { name, value: p });
            }
        }
        if self.clamp_min >= self.clamp_max {
            return Err(FusionError::InvalidParameter {
                name: "clamp_min",
                value: self.clamp_min,
            });
        }
        Ok(())
    }
}

#[inline]
pub fn logit(p: f32) -> f32 {
    (p / (1.0 - p)).ln()
}

#[inline]
pub fn probability(log_odds: f32) -> f32 {
    1.0 / (1.0 + (-log_odds).exp())
}

/// Voxel index bound per axis, the extent of a 16-level octree: keys lie in
/// `-MAX_KEY..MAX_KEY`.
pub const MAX_KEY: i32 = 1 << 15;

/// Voxel containing `p`, `None` for non-finite input or a point outside the
/// grid extent.
#[inline]
pub fn key_of(p: [f32; 3], cell: f32) -> Option<VoxelKey> {
    let cell = cell as f64;
    let bound = MAX_KEY as f64;
    let mut key = [0i32; 3];
    for (k, v) in key.iter_mut().zip(p) {
        let index = (v as f64 / cell).floor();
        // NaN and infinities fail the range check too
        if !(-bound..bound).contains(&index) {
            return None;
        }
        *k = index as i32;
    }
    Some(key)
}

/// Sparse log-odds occupancy grid updated by ray casting.
///
/// Unknown voxels are absent from the map and count as probability 0.5.
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    params: OccupancyParams,
    hit: f32,
    miss: f32,
    min: f32,
    max: f32,
    cells: HashMap<VoxelKey, f32>,
}

impl OccupancyGrid {
    pub fn new(params: OccupancyParams) -> Result<Self, FusionError> {
        params.validate()?;
        Ok(Self {
            hit: logit(params.prob_hit),
            miss: logit(params.prob_miss),
            min: logit(params.clamp_min),
            max: logit(params.clamp_max),
            params,
            cells: HashMap::new(),
        })
    }

    pub fn params(&self) -> &OccupancyParams {
        &self.params
    }

    /// Number of voxels observed at least once.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn key_of(&self, p: [f32; 3]) -> Option<VoxelKey> {
        key_of(p, self.params.cell_size)
    }

    pub fn center_of(&self, key: VoxelKey) -> [f32; 3] {
        let cell = self.params.cell_size as f64;
        key.map(|k| ((k as f64 + 0.5) * cell) as f32)
    }

    pub fn log_odds(&self, key: VoxelKey) -> Option<f32> {
        self.cells.get(&key).copied()
    }

    pub fn probability(&self, key: VoxelKey) -> Option<f32> {
        self.log_odds(key).map(probability)
    }

    /// Casts a ray from `origin` to every finite point of `cloud`.
    ///
    /// Endpoint voxels take one hit and every other traversed voxel one miss.
    /// A voxel is updated at most once per call, and a voxel that holds an
    /// endpoint is never also updated as free. Points outside the grid
    /// extent (see [`MAX_KEY`]) are skipped, as is the whole cloud when
    /// `origin` is.
    pub fn insert_cloud(&mut self, cloud: &PointCloud, origin: [f32; 3]) {
        let cell = self.params.cell_size;
        if key_of(origin, cell).is_none() {
            debug!("insert_cloud: origin {:?} is outside the grid, skipping", origin);
            return;
        }
        let mut occupied: HashSet<VoxelKey> = HashSet::new();
        let mut free: HashSet<VoxelKey> = HashSet::new();
        let mut skipped = 0usize;

        for p in cloud.iter_points() {
            let Some(end) = key_of(p, cell) else {
                skipped += 1;
                continue;
            };
            occupied.insert(end);
            free.extend(ray_keys(origin, p, cell));
        }
        if skipped > 0 {
            debug!("insert_cloud: skipped {skipped} non-finite or out-of-extent points");
        }

        for key in free.difference(&occupied) {
            self.update(*key, self.miss);
        }
        for key in &occupied {
            self.update(*key, self.hit);
        }
    }

    fn update(&mut self, key: VoxelKey, delta: f32) {
        let (min, max) = (self.min, self.max);
        let l = self.cells.entry(key).or_insert(0.0);
        *l = (*l + delta).clamp(min, max);
    }

    /// Keys of voxels with probability `>= threshold`, sorted.
    pub fn occupied_keys(&self, threshold: f32) -> Vec<VoxelKey> {
        let mut keys: Vec<VoxelKey> = self
            .cells
            .iter()
            .filter(|&(_, &l)| probability(l) >= threshold)
            .map(|(k, _)| *k)
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Centers of the voxels with probability `>= threshold`, in sorted key
    /// order. The cloud carries no normals.
    pub fn occupied_centers(&self, threshold: f32) -> PointCloud {
        let centers: Vec<[f32; 3]> = self
            .occupied_keys(threshold)
            .into_iter()
            .map(|k| self.center_of(k))
            .collect();
        PointCloud::from_points(&centers)
    }
}
