#![forbid(unsafe_code)]

pub mod error;
pub mod euclidean_cluster;
pub mod major_planes;
pub mod ransac_plane;
pub mod scoring;
pub mod table;
pub mod tabletop;

pub use error::SegmentationError;
pub use euclidean_cluster::{euclidean_cluster, largest_cluster};
pub use major_planes::{extract_major_planes, extract_next_plane, PlaneCandidate, PlaneExtractionParams};
pub use ransac_plane::{fit_plane, ransac_plane, ransac_plane_seeded, PlaneFit, PlaneFitParams, PlaneModel};
pub use scoring::{best_candidate, score_planes, select_table, PlaneScore, ScoringWeights};
pub use table::TableModel;
pub use tabletop::{extract_tabletop, Tabletop, TabletopParams};
