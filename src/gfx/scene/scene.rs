use cgmath::{Deg, Matrix4, Vector3};

use crate::config::ViewerConfig;
use crate::gfx::{
    camera::{CameraController, CameraManager, OrbitCamera, OrbitCameraBounds},
    resources::frame_constants::{convert_matrix4_to_array, point_to_array, FrameConstants},
};

use super::mesh::Bounds;

/// Placement and material of the displayed object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectProperties {
    pub position: Vector3<f32>,
    pub scale: f32,
    /// Current rotation about +Y.
    pub rotation: Deg<f32>,
    /// Degrees per second.
    pub rotation_speed: f32,
    pub color: [f32; 3],
    pub shininess: f32,
}

impl ObjectProperties {
    /// Object to world transform: scale, then rotate about Y, then translate.
    pub fn world_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from_angle_y(self.rotation)
            * Matrix4::from_scale(self.scale)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub position: Vector3<f32>,
    pub color: Vector3<f32>,
}

/// CPU-side state advanced once per frame.
pub struct Scene {
    pub object: ObjectProperties,
    pub light: Light,
    pub camera_manager: CameraManager,
}

impl Scene {
    /// Builds the scene for a mesh with the given bounds. The camera focuses on
    /// the centre of the scaled mesh.
    pub fn new(config: &ViewerConfig, bounds: &Bounds) -> Self {
        let object = ObjectProperties {
            position: config.object.position.into(),
            scale: config.object.scale,
            rotation: Deg(0.0),
            rotation_speed: config.object.rotation_speed,
            color: config.object.color,
            shininess: config.object.shininess,
        };

        let light = Light {
            position: config.light.position.into(),
            color: config.light.color.into(),
        };

        let focus = bounds.center() * object.scale;
        let mut camera = OrbitCamera::new(
            config.camera.distance,
            Deg(config.camera.polar),
            Deg(config.camera.azimuth),
            focus,
        );
        camera.bounds = OrbitCameraBounds {
            min_polar: Deg(config.camera.min_polar),
            max_polar: Deg(config.camera.max_polar),
        };
        camera.set_polar(camera.polar);
        camera.fovy = Deg(config.camera.fovy);
        camera.znear = config.camera.znear;
        camera.zfar = config.camera.zfar;

        let controller = CameraController::new(config.camera.rotate_rate);

        Self {
            object,
            light,
            camera_manager: CameraManager::new(camera, controller),
        }
    }

    /// Advances the simulation by `dt` seconds and returns the constants for
    /// the frame.
    pub fn update(&mut self, dt: f32, aspect: f32) -> FrameConstants {
        self.object.rotation += Deg(self.object.rotation_speed * dt);
        self.camera_manager.update(dt);

        self.frame_constants(aspect)
    }

    /// Constants for the current state without advancing it.
    pub fn frame_constants(&self, aspect: f32) -> FrameConstants {
        let world = self.object.world_matrix();
        let view_proj = self.camera_manager.get_view_proj_matrix(aspect);
        let eye = self.camera_manager.camera.eye();

        FrameConstants {
            world: convert_matrix4_to_array(world),
            world_view_projection: convert_matrix4_to_array(view_proj * world),
            object_color: self.object.color,
            object_shininess: self.object.shininess,
            light_position: point_to_array(self.light.position),
            light_color: point_to_array(self.light.color),
            camera_position: point_to_array(eye),
        }
    }
}
