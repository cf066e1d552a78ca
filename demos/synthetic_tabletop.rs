//! Segments a rendered tabletop scene and prints what each stage produced.
//!
//! Usage: `cargo run --example synthetic_tabletop [config.json]`
//! Set `RUST_LOG=debug` to see the per-stage log lines.

use std::path::Path;

use tabletop::synthetic::{render_scene, SceneParams};
use tabletop::visualize::Drawable;
use tabletop::{load_config, RecordingVisualizer, SegmenterConfig, TabletopSegmenter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => load_config(Path::new(&path))?,
        None => SegmenterConfig::default(),
    };

    let scene = render_scene(&SceneParams {
        wall_depth: Some(2.5),
        ..Default::default()
    })
    .ok_or("scene has a degenerate table normal")?;
    println!(
        "Frame: {}x{}, {} returns",
        scene.frame.width(),
        scene.frame.height(),
        scene.frame.count_returns()
    );

    let mut segmenter = TabletopSegmenter::with_visualizer(config, RecordingVisualizer::new())?;
    let result = segmenter.process_frame(&scene.frame, None)?;

    println!(
        "Table: point={:?}, normal={:?} (true normal {:?})",
        result.table.point, result.table.normal, scene.table.normal
    );
    println!("Tabletop: {} points in the table frame", result.cloud.len());
    let bounds = result.cloud.aabb();
    if !bounds.is_empty() {
        println!("  bounds: min={:?}, max={:?}", bounds.min, bounds.max);
    }

    // second frame reuses the table instead of detecting it again
    let again = segmenter.process_frame(&scene.frame, Some(result.table))?;
    println!("With hint: {} points", again.cloud.len());

    println!("Drawn:");
    for (name, item) in &segmenter.visualizer().calls {
        match item {
            Drawable::PointCloud { cloud, color, .. } => {
                println!("  {name:<18} {} points, color {:?}", cloud.len(), color)
            }
            Drawable::Box { size, .. } => println!("  {name:<18} box {size:?}"),
        }
    }
    Ok(())
}
