use log::{debug, warn};
use tabletop_core::{apply_transform, OrganizedCloud, PointCloud, RigidTransform};
use tabletop_filters::voxel_downsample;
use tabletop_fusion::fuse_clouds;
use tabletop_normals::estimate_organized_normals;
use tabletop_segmentation::{
    best_candidate, extract_major_planes, extract_tabletop, score_planes, select_table,
    PlaneCandidate, PlaneExtractionParams, TableModel,
};

use crate::config::SegmenterConfig;
use crate::error::{Result, SegmentError};
use crate::visualize::{score_color, Drawable, NoopVisualizer, Visualizer};

const TABLETOP_COLOR: [f32; 3] = [0.0, 0.0, 1.0];

/// Output of one segmentation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct TabletopSegmentation {
    /// Points resting on the table, in the table frame, with normals.
    pub cloud: PointCloud,
    /// The table that was used. Pass it back as the next frame's hint to
    /// skip plane detection.
    pub table: TableModel,
    pub world_to_table: RigidTransform,
}

/// Runs the full pipeline: normals, table detection, tabletop extraction and
/// optional multi-view fusion.
///
/// The segmenter keeps no state between frames. Intermediate results are
/// pushed to the injected [`Visualizer`].
#[derive(Debug, Clone)]
pub struct TabletopSegmenter<V: Visualizer = NoopVisualizer> {
    config: SegmenterConfig,
    visualizer: V,
}

impl TabletopSegmenter<NoopVisualizer> {
    pub fn new(config: SegmenterConfig) -> Result<Self> {
        Self::with_visualizer(config, NoopVisualizer)
    }
}

impl<V: Visualizer> TabletopSegmenter<V> {
    pub fn with_visualizer(config: SegmenterConfig, visualizer: V) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, visualizer })
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    pub fn visualizer(&self) -> &V {
        &self.visualizer
    }

    pub fn visualizer_mut(&mut self) -> &mut V {
        &mut self.visualizer
    }

    pub fn into_visualizer(self) -> V {
        self.visualizer
    }

    /// Estimates normals on the organized frame and flattens the accepted
    /// pixels into an unordered cloud with normals.
    pub fn preprocess(&self, frame: &OrganizedCloud) -> Result<PointCloud> {
        let cloud = estimate_organized_normals(frame, &self.config.normals)?.to_cloud();
        debug!(
            "preprocess: {} of {} pixels kept",
            cloud.len(),
            frame.len()
        );
        Ok(cloud)
    }

    /// Finds the most table-like plane in `cloud`, or `None` when no plane
    /// qualifies.
    pub fn detect_table(&mut self, cloud: &PointCloud) -> Result<Option<TableModel>> {
        if cloud.is_empty() {
            return Ok(None);
        }
        let simplified = voxel_downsample(cloud, self.config.simplify_leaf_size);
        debug!(
            "detect_table: simplified {} points to {}",
            cloud.len(),
            simplified.len()
        );
        self.visualizer.draw(
            "simplified_input",
            Drawable::PointCloud {
                cloud: simplified.clone(),
                color: None,
                size: 1.0,
                with_normals: false,
            },
        );

        let params = self.config.table_planes;
        let Some((table, candidate)) = self.best_plane(&simplified, &params, "planes")? else {
            return Ok(None);
        };
        self.visualizer.draw("table", table_box(&table, &candidate));
        Ok(Some(table))
    }

    /// Selects the table (from `plane_hint` when given, else by detection)
    /// and extracts the points resting on it.
    ///
    /// A usable hint is re-normalized and oriented toward the camera. A hint
    /// with a degenerate normal is ignored and the table is detected instead.
    pub fn segment(
        &mut self,
        cloud: &PointCloud,
        plane_hint: Option<TableModel>,
    ) -> Result<TabletopSegmentation> {
        let hint = plane_hint.and_then(|h| {
            let table = TableModel::new(h.point, h.normal);
            if table.is_none() {
                warn!("ignoring degenerate plane hint {:?}", h);
            }
            table
        });

        let table = match hint {
            Some(table) => table,
            None => match self.detect_table(cloud)? {
                Some(table) => table,
                None => {
                    warn!("no table detected in {} points", cloud.len());
                    return Err(SegmentError::NoTableDetected {
                        points: cloud.len(),
                    });
                }
            },
        };

        let tabletop = extract_tabletop(cloud, &table, &self.config.tabletop)?;
        debug!(
            "segment: {} tabletop points above table at {:?}",
            tabletop.cloud.len(),
            table.point
        );
        self.visualizer.draw(
            "tabletop_points",
            Drawable::PointCloud {
                cloud: tabletop.cloud.clone(),
                color: Some(TABLETOP_COLOR),
                size: 3.0,
                with_normals: true,
            },
        );

        Ok(TabletopSegmentation {
            cloud: tabletop.cloud,
            table,
            world_to_table: tabletop.world_to_table,
        })
    }

    /// [`preprocess`](Self::preprocess) followed by [`segment`](Self::segment).
    pub fn process_frame(
        &mut self,
        frame: &OrganizedCloud,
        plane_hint: Option<TableModel>,
    ) -> Result<TabletopSegmentation> {
        let cloud = self.preprocess(frame)?;
        self.segment(&cloud, plane_hint)
    }

    /// Table search with the tighter flippable-plane threshold and no
    /// simplification, for dense fused clouds.
    pub fn find_flippable_planes(&mut self, cloud: &PointCloud) -> Result<Option<TableModel>> {
        let params = self.config.flippable_planes;
        Ok(self
            .best_plane(cloud, &params, "flippable")?
            .map(|(table, _)| table))
    }

    /// Fuses views that share a frame into one occupancy-filtered cloud.
    pub fn fuse(&mut self, clouds: &[PointCloud]) -> Result<PointCloud> {
        let fused = fuse_clouds(clouds, &self.config.fusion)?;
        debug!("fuse: {} views -> {} voxels", clouds.len(), fused.len());
        self.visualizer.draw(
            "fused_cloud",
            Drawable::PointCloud {
                cloud: fused.clone(),
                color: None,
                size: 1.0,
                with_normals: false,
            },
        );
        Ok(fused)
    }

    fn best_plane(
        &mut self,
        cloud: &PointCloud,
        params: &PlaneExtractionParams,
        layer: &str,
    ) -> Result<Option<(TableModel, PlaneCandidate)>> {
        let mut candidates = extract_major_planes(cloud, params)?;
        let scores = score_planes(&candidates, &self.config.scoring);
        for (k, (candidate, score)) in candidates.iter().zip(&scores).enumerate() {
            debug!(
                "{layer}/{k:02}: {} points, score {:.4}",
                candidate.inliers.len(),
                score.score
            );
            self.visualizer.draw(
                &format!("{layer}/{k:02}"),
                Drawable::PointCloud {
                    cloud: candidate.inliers.clone(),
                    color: Some(score_color(score.normalized)),
                    size: 2.0,
                    with_normals: false,
                },
            );
        }

        let (Some(best), Some(table)) = (
            best_candidate(&scores),
            select_table(&candidates, &scores),
        ) else {
            return Ok(None);
        };
        Ok(Some((table, candidates.swap_remove(best))))
    }
}

/// Box spanning the candidate's inliers, axis-aligned in the table frame.
fn table_box(table: &TableModel, candidate: &PlaneCandidate) -> Drawable {
    let local = apply_transform(&candidate.inliers, &table.world_to_table());
    let bounds = local.aabb();
    let center = bounds.center().unwrap_or([0.0; 3]);
    let offset = RigidTransform {
        translation: center,
        ..RigidTransform::identity()
    };
    Drawable::Box {
        transform: offset.compose(&table.table_to_world()),
        size: bounds.extent(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{render_scene, SceneParams};
    use crate::visualize::RecordingVisualizer;
    use approx::assert_abs_diff_eq;
    use tabletop_core::vec3;

    fn recording() -> TabletopSegmenter<RecordingVisualizer> {
        TabletopSegmenter::with_visualizer(SegmenterConfig::default(), RecordingVisualizer::new())
            .unwrap()
    }

    fn assert_tables_close(a: &TableModel, b: &TableModel) {
        for k in 0..3 {
            assert_abs_diff_eq!(a.point[k], b.point[k], epsilon = 1e-6);
            assert_abs_diff_eq!(a.normal[k], b.normal[k], epsilon = 1e-6);
        }
    }

    fn assert_clouds_close(a: &PointCloud, b: &PointCloud) {
        assert_eq!(a.len(), b.len());
        for (p, q) in a.iter_points().zip(b.iter_points()) {
            for k in 0..3 {
                assert_abs_diff_eq!(p[k], q[k], epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let mut config = SegmenterConfig::default();
        config.simplify_leaf_size = 0.0;
        assert!(matches!(
            TabletopSegmenter::new(config),
            Err(SegmentError::Config(_))
        ));
    }

    #[test]
    fn synthetic_scene_end_to_end() {
        let scene = render_scene(&SceneParams::default()).unwrap();
        let mut seg = recording();
        let out = seg.process_frame(&scene.frame, None).unwrap();

        assert!(vec3::dot(out.table.normal, scene.table.normal) > 0.99);
        assert!(!out.cloud.is_empty());
        let params = seg.config().tabletop;
        for p in out.cloud.iter_points() {
            assert!(p[2] >= params.min_height - 1e-4 && p[2] <= params.max_height + 1e-4);
            assert!(vec3::norm(p) <= params.max_radius + 1e-4);
        }
        assert!(out.cloud.normals.is_some());

        let names = seg.visualizer().names();
        for expected in ["simplified_input", "planes/00", "table", "tabletop_points"] {
            assert!(names.contains(&expected), "missing {expected} in {names:?}");
        }
    }

    #[test]
    fn hint_skips_detection() {
        let scene = render_scene(&SceneParams::default()).unwrap();
        let mut seg = recording();
        let cloud = seg.preprocess(&scene.frame).unwrap();
        let out = seg.segment(&cloud, Some(scene.table)).unwrap();

        assert_tables_close(&out.table, &scene.table);
        assert!(!out.cloud.is_empty());
        let names = seg.visualizer().names();
        assert!(!names.contains(&"simplified_input"));
        assert!(!names.iter().any(|n| n.starts_with("planes/")));
    }

    #[test]
    fn result_table_can_be_fed_back() {
        let scene = render_scene(&SceneParams::default()).unwrap();
        let mut seg = TabletopSegmenter::new(SegmenterConfig::default()).unwrap();
        let first = seg.process_frame(&scene.frame, None).unwrap();
        let second = seg.process_frame(&scene.frame, Some(first.table)).unwrap();
        assert_tables_close(&second.table, &first.table);
        assert_clouds_close(&second.cloud, &first.cloud);
    }

    #[test]
    fn hint_is_normalized_and_faces_the_camera() {
        let scene = render_scene(&SceneParams::default()).unwrap();
        let mut seg = recording();
        let cloud = seg.preprocess(&scene.frame).unwrap();
        let scaled = TableModel {
            point: scene.table.point,
            normal: vec3::scale(scene.table.normal, 2.0),
        };
        let out = seg.segment(&cloud, Some(scaled)).unwrap();
        assert_abs_diff_eq!(vec3::norm(out.table.normal), 1.0, epsilon = 1e-6);
        assert_tables_close(&out.table, &scene.table);

        // a hint facing away from the sensor is flipped
        let away = TableModel {
            point: [0.0, 0.0, 1.0],
            normal: [0.0, 0.0, 2.0],
        };
        let out = seg.segment(&PointCloud::new(), Some(away)).unwrap();
        assert_eq!(out.table.normal, [0.0, 0.0, -1.0]);
    }

    #[test]
    fn degenerate_hint_falls_back_to_detection() {
        let scene = render_scene(&SceneParams::default()).unwrap();
        let mut seg = recording();
        let bad = TableModel {
            point: [0.0, 0.0, 1.0],
            normal: [0.0; 3],
        };
        let out = seg.process_frame(&scene.frame, Some(bad)).unwrap();
        assert_abs_diff_eq!(vec3::norm(out.table.normal), 1.0, epsilon = 1e-5);
        assert!(seg.visualizer().names().contains(&"simplified_input"));
    }

    #[test]
    fn empty_frame_reports_no_table() {
        let mut seg = TabletopSegmenter::new(SegmenterConfig::default()).unwrap();
        let frame = OrganizedCloud::no_returns(32, 24);
        match seg.process_frame(&frame, None) {
            Err(SegmentError::NoTableDetected { points }) => assert_eq!(points, 0),
            other => panic!("expected NoTableDetected, got {other:?}"),
        }
        assert_eq!(seg.detect_table(&PointCloud::new()).unwrap(), None);
    }

    #[test]
    fn fuse_draws_and_returns_points_only() {
        let mut seg = recording();
        let view = PointCloud::from_points(&[[0.001, 0.001, 0.011], [0.003, 0.001, 0.011]]);
        let fused = seg.fuse(&[view.clone(), view.clone(), view]).unwrap();
        assert_eq!(fused.len(), 2);
        assert!(fused.normals.is_none());
        assert!(seg.visualizer().get("fused_cloud").is_some());
    }

    #[test]
    fn flippable_planes_use_tight_threshold() {
        // flat 40x40 patch at 2 mm spacing, as a fused cloud would look
        let mut pts = Vec::new();
        for i in 0..40 {
            for j in 0..40 {
                let e = ((i * 7 + j * 13) % 11) as f32 * 1e-5;
                pts.push([i as f32 * 0.002 - 0.04, j as f32 * 0.002, 0.6 + e]);
            }
        }
        let mut seg = recording();
        let table = seg
            .find_flippable_planes(&PointCloud::from_points(&pts))
            .unwrap()
            .expect("plane expected");
        assert_abs_diff_eq!(table.normal[2], -1.0, epsilon = 1e-3);
        assert!(seg.visualizer().names().contains(&"flippable/00"));
        assert!(!seg.visualizer().names().contains(&"table"));
    }
}
