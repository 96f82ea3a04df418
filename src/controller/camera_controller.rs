use crate::model::Camera;

/// Turns pointer-captured mouse motion into camera yaw and pitch.
#[derive(Debug, Clone)]
pub struct CameraController {
    pub mouse_sensitivity: f32,
}

impl CameraController {
    pub fn new(mouse_sensitivity: f32) -> Self {
        Self { mouse_sensitivity }
    }

    /// Apply mouse look delta to camera
    pub fn apply_look(&self, camera: &mut Camera, dx: f32, dy: f32) {
        camera.yaw += dx * self.mouse_sensitivity;
        let pi_half = std::f32::consts::PI / 2.0;
        camera.pitch = (camera.pitch - dy * self.mouse_sensitivity).clamp(-pi_half, pi_half);
    }
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(0.002)
    }
}
