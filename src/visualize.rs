//! Optional display sink for intermediate results.
//!
//! The segmenter pushes named drawables into a [`Visualizer`] as it runs.
//! Nothing drawn is ever read back into the pipeline.

use tabletop_core::{PointCloud, RigidTransform};

#[derive(Debug, Clone, PartialEq)]
pub enum Drawable {
    PointCloud {
        cloud: PointCloud,
        /// Uniform RGB in `[0, 1]`; `None` leaves the choice to the sink.
        color: Option<[f32; 3]>,
        size: f32,
        /// Draw a short segment along each point's normal.
        with_normals: bool,
    },
    /// Oriented box centered on `transform`'s origin.
    Box {
        transform: RigidTransform,
        size: [f32; 3],
    },
}

pub trait Visualizer {
    /// Draws `item`, replacing anything previously drawn under `name`.
    fn draw(&mut self, name: &str, item: Drawable);

    fn clear(&mut self);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopVisualizer;

impl Visualizer for NoopVisualizer {
    fn draw(&mut self, _name: &str, _item: Drawable) {}

    fn clear(&mut self) {}
}

/// Keeps every draw call in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingVisualizer {
    pub calls: Vec<(String, Drawable)>,
}

impl RecordingVisualizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<&str> {
        self.calls.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Latest drawable recorded under `name`.
    pub fn get(&self, name: &str) -> Option<&Drawable> {
        self.calls
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d)
    }
}

impl Visualizer for RecordingVisualizer {
    fn draw(&mut self, name: &str, item: Drawable) {
        self.calls.push((name.to_owned(), item));
    }

    fn clear(&mut self) {
        self.calls.clear();
    }
}

/// Linear green to red ramp for `t` in `[0, 1]`.
pub fn score_color(t: f32) -> [f32; 3] {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 1.0 };
    [t, 1.0 - t, 0.0]
}
