//! Camera-frame conventions shared by every stage.
//!
//! Frames arrive in the sensor's optical frame: +X right, +Y down, +Z out of
//! the lens into the scene. Surface normals are oriented back toward the
//! sensor, and a table normal always satisfies `dot(n, CAMERA_FORWARD) <= 0`.

/// Optical axis, pointing from the sensor into the scene.
pub const CAMERA_FORWARD: [f32; 3] = [0.0, 0.0, 1.0];

/// Direction from an observed surface back toward the sensor.
pub const TOWARD_CAMERA: [f32; 3] = [0.0, 0.0, -1.0];

/// Sensor position used when ray-casting observations into a fusion grid.
pub const SENSOR_ORIGIN: [f32; 3] = [0.0, 0.0, 0.0];
