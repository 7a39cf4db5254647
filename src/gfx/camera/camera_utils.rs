use cgmath::{Angle, Deg, Matrix4, Vector3};
use winit::event::WindowEvent;

use super::{camera_controller::CameraController, orbit_camera::OrbitCamera};

/// Maps OpenGL clip space depth `[-1, 1]` onto wgpu's `[0, 1]`.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Converts spherical coordinates (polar from +Y, azimuth from +X towards +Z)
/// to a cartesian point around the origin.
pub fn spherical_to_cartesian(polar: Deg<f32>, azimuth: Deg<f32>, radius: f32) -> Vector3<f32> {
    Vector3::new(
        radius * polar.sin() * azimuth.cos(),
        radius * polar.cos(),
        radius * polar.sin() * azimuth.sin(),
    )
}

/// Orbit camera together with the pointer state that drives it.
pub struct CameraManager {
    pub camera: OrbitCamera,
    pub controller: CameraController,
}

impl CameraManager {
    pub fn new(camera: OrbitCamera, controller: CameraController) -> Self {
        Self { camera, controller }
    }

    /// Returns true if the event was consumed.
    pub fn process_event(&mut self, event: &WindowEvent) -> bool {
        self.controller.process_window_event(event)
    }

    /// Applies the pointer drag accumulated since the last update.
    pub fn update(&mut self, dt: f32) {
        self.controller.update_camera(&mut self.camera, dt);
    }

    pub fn get_view_proj_matrix(&self, aspect: f32) -> Matrix4<f32> {
        self.camera.build_view_projection_matrix(aspect)
    }
}
