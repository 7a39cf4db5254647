use cgmath::*;

use super::camera_utils::{spherical_to_cartesian, OPENGL_TO_WGPU_MATRIX};

/// Camera orbiting a focus point on a sphere.
///
/// `polar` is measured from +Y and `azimuth` around Y starting at +X, both in
/// degrees. The eye sits at `distance` from the origin in that direction and
/// looks at `focus` with +Y up.
#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    pub distance: f32,
    pub polar: Deg<f32>,
    pub azimuth: Deg<f32>,
    pub focus: Vector3<f32>,
    pub up: Vector3<f32>,
    pub bounds: OrbitCameraBounds,
    pub fovy: Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl OrbitCamera {
    pub fn new(distance: f32, polar: Deg<f32>, azimuth: Deg<f32>, focus: Vector3<f32>) -> Self {
        let mut camera = Self {
            distance,
            polar,
            azimuth,
            focus,
            up: Vector3::unit_y(),
            bounds: OrbitCameraBounds::default(),
            fovy: Deg(60.0),
            znear: 0.25,
            zfar: 1000.0,
        };
        camera.set_polar(polar);
        camera
    }

    pub fn set_polar(&mut self, polar: Deg<f32>) {
        self.polar = Deg(polar.0.clamp(self.bounds.min_polar.0, self.bounds.max_polar.0));
    }

    /// Orbits by `horizontal` degrees of azimuth and `vertical` degrees of
    /// elevation. Positive `vertical` raises the eye towards the +Y pole.
    pub fn orbit(&mut self, horizontal: f32, vertical: f32) {
        self.azimuth += Deg(horizontal);
        self.set_polar(self.polar - Deg(vertical));
    }

    /// Eye position in world space.
    pub fn eye(&self) -> Vector3<f32> {
        spherical_to_cartesian(self.polar, self.azimuth, self.distance)
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(
            Point3::from_vec(self.eye()),
            Point3::from_vec(self.focus),
            self.up,
        )
    }

    pub fn projection_matrix(&self, aspect: f32) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, aspect, self.znear, self.zfar)
    }

    pub fn build_view_projection_matrix(&self, aspect: f32) -> Matrix4<f32> {
        self.projection_matrix(aspect) * self.view_matrix()
    }
}

/// Inclusive range the polar angle is held in, keeping the eye off the poles
/// where the +Y up vector degenerates.
#[derive(Debug, Clone, Copy)]
pub struct OrbitCameraBounds {
    pub min_polar: Deg<f32>,
    pub max_polar: Deg<f32>,
}

impl Default for OrbitCameraBounds {
    fn default() -> Self {
        Self {
            min_polar: Deg(5.0),
            max_polar: Deg(175.0),
        }
    }
}
