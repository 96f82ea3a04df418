use glam::{Mat4, Vec3};

/// Slightly less than π/2 so the view never lines up with the up axis.
const PITCH_LIMIT: f32 = 1.5533;

/// What the movement integrator needs from a camera: where it looks and a
/// way to move it.
pub trait CameraRig {
    /// Unit look direction in world space.
    fn world_forward(&self) -> Vec3;
    fn translate(&mut self, delta: Vec3);
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub eye: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub up: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            eye: Vec3::new(0.0, 30.0, 60.0),
            yaw: -std::f32::consts::FRAC_PI_2,
            pitch: 0.0,
            up: Vec3::Y,
            fov_y: 75f32.to_radians(),
            aspect: width as f32 / height.max(1) as f32,
            z_near: 0.1,
            z_far: 1000.0,
        }
    }

    pub fn forward(&self) -> Vec3 {
        let cy = self.yaw;
        let cp = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        Vec3::new(cy.cos() * cp.cos(), cp.sin(), cy.sin() * cp.cos()).normalize()
    }

    pub fn target(&self) -> Vec3 { self.eye + self.forward() }

    pub fn set_aspect(&mut self, width: u32, height: u32) { self.aspect = width as f32 / height.max(1) as f32; }

    pub fn view_proj(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.eye, self.target(), self.up);
        let proj = Mat4::perspective_rh(self.fov_y, self.aspect, self.z_near, self.z_far);
        proj * view
    }

    /// Aim at `target`. A target at the eye leaves the orientation alone.
    pub fn set_look_at(&mut self, target: Vec3) {
        let Some(dir) = (target - self.eye).try_normalize() else {
            return;
        };
        self.yaw = dir.z.atan2(dir.x);
        self.pitch = dir.y.asin().clamp(-1.4, 1.4);
    }
}

impl CameraRig for Camera {
    fn world_forward(&self) -> Vec3 {
        self.forward()
    }

    fn translate(&mut self, delta: Vec3) {
        self.eye += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera_looks_down_negative_z() {
        let cam = Camera::new(800, 600);
        let f = cam.forward();
        assert!((f - Vec3::NEG_Z).length() < 1e-5, "forward was {f:?}");
    }

    #[test]
    fn forward_stays_off_the_up_axis() {
        let mut cam = Camera::new(800, 600);
        cam.pitch = std::f32::consts::FRAC_PI_2;
        let f = cam.forward();
        assert!((f.length() - 1.0).abs() < 1e-5);
        assert!(f.cross(Vec3::Y).length() > 1e-3);
    }

    #[test]
    fn set_look_at_points_forward_at_target() {
        let mut cam = Camera::new(800, 600);
        cam.eye = Vec3::ZERO;
        cam.set_look_at(Vec3::new(10.0, 0.0, 0.0));
        assert!((cam.forward() - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn set_look_at_own_eye_keeps_orientation() {
        let mut cam = Camera::new(800, 600);
        cam.set_look_at(Vec3::ZERO);
        let (yaw, pitch) = (cam.yaw, cam.pitch);
        cam.set_look_at(cam.eye);
        assert_eq!((cam.yaw, cam.pitch), (yaw, pitch));
        assert!(cam.view_proj().is_finite());
    }

    #[test]
    fn translate_moves_eye() {
        let mut cam = Camera::new(800, 600);
        let start = cam.eye;
        cam.translate(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(cam.eye, start + Vec3::new(1.0, 2.0, 3.0));
    }
}
