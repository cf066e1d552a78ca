//! Fuses several noisy renderings of the same scene and looks for the table
//! in the fused cloud.

use tabletop::synthetic::{render_scene, SceneParams};
use tabletop::{PointCloud, SegmenterConfig, TabletopSegmenter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut segmenter = TabletopSegmenter::new(SegmenterConfig::default())?;

    let mut views = Vec::new();
    for seed in 0..5 {
        let scene = render_scene(&SceneParams {
            seed,
            noise: 0.0003,
            ..Default::default()
        })
        .ok_or("scene has a degenerate table normal")?;
        let cloud = segmenter.preprocess(&scene.frame)?;
        println!("View {seed}: {} points", cloud.len());
        views.push(cloud);
    }

    let fused: PointCloud = segmenter.fuse(&views)?;
    println!(
        "Fused: {} occupied voxels of {} m",
        fused.len(),
        segmenter.config().fusion.cell_size
    );

    match segmenter.find_flippable_planes(&fused)? {
        Some(table) => println!(
            "Table in fused cloud: point={:?}, normal={:?}",
            table.point, table.normal
        ),
        None => println!("No table in fused cloud"),
    }
    Ok(())
}
