#![forbid(unsafe_code)]
//! Tabletop segmentation for organized depth frames.
//!
//! A frame goes through normal estimation, table detection (plane
//! extraction plus scoring) and tabletop extraction, ending as the points
//! resting on the table expressed in the table's own frame:
//!
//! ```no_run
//! use tabletop::synthetic::{render_scene, SceneParams};
//! use tabletop::{SegmenterConfig, TabletopSegmenter};
//!
//! let scene = render_scene(&SceneParams::default()).unwrap();
//! let mut segmenter = TabletopSegmenter::new(SegmenterConfig::default()).unwrap();
//! let result = segmenter.process_frame(&scene.frame, None).unwrap();
//! println!("{} points on the table", result.cloud.len());
//! ```

pub mod config;
pub mod error;
pub mod segmenter;
pub mod synthetic;
pub mod visualize;

pub use config::{load_config, ConfigError, SegmenterConfig};
pub use error::SegmentError;
pub use segmenter::{TabletopSegmentation, TabletopSegmenter};
pub use visualize::{Drawable, NoopVisualizer, RecordingVisualizer, Visualizer};

pub use tabletop_core::{OrganizedCloud, PointCloud, RigidTransform};
pub use tabletop_segmentation::TableModel;
