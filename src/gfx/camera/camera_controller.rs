use cgmath::{Vector2, Zero};
use winit::event::{ElementState, MouseButton, WindowEvent};

use super::orbit_camera::OrbitCamera;

/// Turns left-button pointer drags into orbit camera rotation.
///
/// The previous pointer position follows the current one whenever the left
/// button is up, so motion only accumulates while the button is held.
pub struct CameraController {
    /// Degrees of rotation per pixel of drag per second.
    pub rotate_rate: f32,
    current: Vector2<f32>,
    previous: Vector2<f32>,
    is_mouse_pressed: bool,
}

impl CameraController {
    pub fn new(rotate_rate: f32) -> Self {
        Self {
            rotate_rate,
            current: Vector2::zero(),
            previous: Vector2::zero(),
            is_mouse_pressed: false,
        }
    }

    /// Returns true if the event was consumed.
    pub fn process_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.pointer_moved(position.x as f32, position.y as f32);
                true
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => {
                self.set_mouse_pressed(*state == ElementState::Pressed);
                true
            }
            _ => false,
        }
    }

    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        self.current = Vector2::new(x, y);
        if !self.is_mouse_pressed {
            self.previous = self.current;
        }
    }

    pub fn set_mouse_pressed(&mut self, pressed: bool) {
        self.is_mouse_pressed = pressed;
    }

    pub fn is_mouse_pressed(&self) -> bool {
        self.is_mouse_pressed
    }

    /// Pointer motion since the last call, in pixels.
    pub fn take_delta(&mut self) -> Vector2<f32> {
        let delta = self.current - self.previous;
        self.previous = self.current;
        delta
    }

    /// Rotates `camera` by the pending drag, scaled by the rotate rate and `dt`.
    ///
    /// Dragging right increases the azimuth, dragging down decreases the
    /// polar angle.
    pub fn update_camera(&mut self, camera: &mut OrbitCamera, dt: f32) {
        let delta = self.take_delta();
        let scale = self.rotate_rate * dt;
        camera.orbit(delta.x * scale, delta.y * scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, Vector3};

    #[test]
    fn test_motion_without_button_is_ignored() {
        let mut controller = CameraController::new(7.0);
        controller.pointer_moved(10.0, 10.0);
        controller.pointer_moved(50.0, 30.0);
        assert_eq!(controller.take_delta(), Vector2::zero());
    }

    #[test]
    fn test_drag_accumulates_until_taken() {
        let mut controller = CameraController::new(7.0);
        controller.pointer_moved(10.0, 10.0);
        controller.set_mouse_pressed(true);
        controller.pointer_moved(15.0, 12.0);
        controller.pointer_moved(20.0, 14.0);

        assert_eq!(controller.take_delta(), Vector2::new(10.0, 4.0));
        assert_eq!(controller.take_delta(), Vector2::zero());
    }

    #[test]
    fn test_release_stops_rotation() {
        let mut controller = CameraController::new(7.0);
        controller.set_mouse_pressed(true);
        controller.pointer_moved(5.0, 0.0);
        controller.set_mouse_pressed(false);
        controller.pointer_moved(25.0, 0.0);
        assert_eq!(controller.take_delta(), Vector2::zero());
    }

    #[test]
    fn test_drag_rotates_camera() {
        let mut controller = CameraController::new(2.0);
        let mut camera = OrbitCamera::new(5.0, Deg(60.0), Deg(0.0), Vector3::new(0.0, 0.0, 0.0));

        controller.set_mouse_pressed(true);
        controller.pointer_moved(10.0, 5.0);
        controller.update_camera(&mut camera, 0.5);

        // azimuth += dx * rate * dt, polar -= dy * rate * dt
        assert_eq!(camera.azimuth, Deg(10.0));
        assert_eq!(camera.polar, Deg(55.0));
    }
}
