use glam::Vec3;

use crate::controller::input::InputState;
use crate::model::CameraRig;

#[derive(Debug, Clone, Copy)]
pub struct MovementConfig {
    /// Honor up/down intents.
    pub vertical: bool,
    pub up: Vec3,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self { vertical: true, up: Vec3::Y }
    }
}

/// Camera-relative fly movement: forward follows the look direction, right
/// is perpendicular to it and to `up`, vertical moves along `up`.
#[derive(Debug, Clone, Default)]
pub struct MovementIntegrator {
    pub config: MovementConfig,
}

impl MovementIntegrator {
    pub fn new(config: MovementConfig) -> Self {
        Self { config }
    }

    /// Displacement for one frame, ignoring pointer capture.
    ///
    /// A forward vector of zero length, or one parallel to `up`, has no
    /// usable right vector; the affected steps are dropped for this frame.
    pub fn displacement(&self, dt: f32, input: &InputState, world_forward: Vec3) -> Vec3 {
        let scale = input.speed * dt;
        let moves = &input.moves;
        let mut delta = Vec3::ZERO;

        let forward = world_forward.try_normalize();
        if let Some(forward) = forward {
            let step = forward * scale;
            if moves.forward {
                delta += step;
            }
            if moves.backward {
                delta -= step;
            }
        }

        if moves.left || moves.right {
            match forward.and_then(|f| f.cross(self.config.up).try_normalize()) {
                Some(right) => {
                    let step = right * scale;
                    if moves.right {
                        delta += step;
                    }
                    if moves.left {
                        delta -= step;
                    }
                }
                None => tracing::trace!(?world_forward, "degenerate right vector, lateral step dropped"),
            }
        }

        if self.config.vertical {
            if let Some(up) = self.config.up.try_normalize() {
                let step = up * scale;
                if moves.up {
                    delta += step;
                }
                if moves.down {
                    delta -= step;
                }
            }
        }

        delta
    }

    /// Move the rig for one frame. Does nothing unless the pointer is
    /// captured. Returns the applied displacement.
    pub fn update<R: CameraRig>(&self, dt: f32, input: &InputState, rig: &mut R) -> Vec3 {
        if !input.pointer_locked {
            return Vec3::ZERO;
        }
        let delta = self.displacement(dt, input, rig.world_forward());
        if delta != Vec3::ZERO {
            rig.translate(delta);
        }
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::input::MoveIntent;
    use crate::model::Camera;

    struct FixedRig {
        forward: Vec3,
        pos: Vec3,
    }

    impl CameraRig for FixedRig {
        fn world_forward(&self) -> Vec3 {
            self.forward
        }
        fn translate(&mut self, delta: Vec3) {
            self.pos += delta;
        }
    }

    fn locked_input(speed: f32, held: &[MoveIntent]) -> InputState {
        let mut input = InputState::new(speed);
        input.pointer_locked = true;
        for intent in held {
            input.moves.set(*intent, true);
        }
        input
    }

    fn rig(forward: Vec3) -> FixedRig {
        FixedRig { forward, pos: Vec3::new(1.0, 2.0, 3.0) }
    }

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn no_intents_means_no_motion() {
        let integrator = MovementIntegrator::default();
        let input = locked_input(10.0, &[]);
        for dt in [0.0, 0.016, 1.0, 10.0] {
            let mut r = rig(Vec3::new(0.3, -0.2, -1.0));
            integrator.update(dt, &input, &mut r);
            assert_eq!(r.pos, Vec3::new(1.0, 2.0, 3.0));
        }
    }

    #[test]
    fn forward_uses_normalized_look_direction() {
        let integrator = MovementIntegrator::default();
        let input = locked_input(10.0, &[MoveIntent::Forward]);
        let d = integrator.displacement(0.5, &input, Vec3::new(0.0, 0.0, -4.0));
        assert!(approx(d, Vec3::new(0.0, 0.0, -5.0)));
    }

    #[test]
    fn forward_and_backward_are_opposite() {
        let integrator = MovementIntegrator::default();
        let look = Vec3::new(0.4, 0.3, -0.8);
        let fwd = integrator.displacement(0.02, &locked_input(7.0, &[MoveIntent::Forward]), look);
        let back = integrator.displacement(0.02, &locked_input(7.0, &[MoveIntent::Backward]), look);
        assert!(fwd.length() > 0.0);
        assert_eq!(fwd, -back);
    }

    #[test]
    fn right_is_cross_of_forward_and_up() {
        let integrator = MovementIntegrator::default();
        let input = locked_input(2.0, &[MoveIntent::Right]);
        let d = integrator.displacement(1.0, &input, Vec3::NEG_Z);
        assert!(approx(d, Vec3::new(2.0, 0.0, 0.0)));
        let input = locked_input(2.0, &[MoveIntent::Left]);
        let d = integrator.displacement(1.0, &input, Vec3::NEG_Z);
        assert!(approx(d, Vec3::new(-2.0, 0.0, 0.0)));
    }

    #[test]
    fn strafing_ignores_pitch() {
        let integrator = MovementIntegrator::default();
        let input = locked_input(1.0, &[MoveIntent::Right]);
        let d = integrator.displacement(1.0, &input, Vec3::new(0.0, -0.7, -0.7));
        assert!(approx(d, Vec3::X));
    }

    #[test]
    fn vertical_follows_config() {
        let input = locked_input(3.0, &[MoveIntent::Up]);
        let on = MovementIntegrator::new(MovementConfig { vertical: true, up: Vec3::Y });
        let off = MovementIntegrator::new(MovementConfig { vertical: false, up: Vec3::Y });
        assert!(approx(on.displacement(1.0, &input, Vec3::NEG_Z), Vec3::new(0.0, 3.0, 0.0)));
        assert_eq!(off.displacement(1.0, &input, Vec3::NEG_Z), Vec3::ZERO);

        let input = locked_input(3.0, &[MoveIntent::Down]);
        assert!(approx(on.displacement(1.0, &input, Vec3::NEG_Z), Vec3::new(0.0, -3.0, 0.0)));
    }

    #[test]
    fn displacement_scales_linearly_with_dt() {
        let integrator = MovementIntegrator::default();
        let input = locked_input(6.0, &[MoveIntent::Forward, MoveIntent::Left, MoveIntent::Up]);
        let look = Vec3::new(0.2, 0.1, -0.9);

        let mut once = rig(look);
        integrator.update(0.02, &input, &mut once);

        let mut twice = rig(look);
        integrator.update(0.01, &input, &mut twice);
        integrator.update(0.01, &input, &mut twice);

        assert!(approx(once.pos, twice.pos));
    }

    #[test]
    fn unlocked_input_never_moves() {
        let integrator = MovementIntegrator::default();
        let mut input = locked_input(50.0, &[MoveIntent::Forward, MoveIntent::Right, MoveIntent::Up]);
        input.pointer_locked = false;
        let mut r = rig(Vec3::NEG_Z);
        for _ in 0..120 {
            assert_eq!(integrator.update(1.0 / 60.0, &input, &mut r), Vec3::ZERO);
        }
        assert_eq!(r.pos, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn looking_straight_up_drops_only_the_lateral_step() {
        let integrator = MovementIntegrator::default();
        let input = locked_input(1.0, &[MoveIntent::Forward, MoveIntent::Right]);
        let d = integrator.displacement(1.0, &input, Vec3::Y);
        assert!(d.is_finite());
        assert!(approx(d, Vec3::Y));
    }

    #[test]
    fn zero_forward_produces_no_nan() {
        let integrator = MovementIntegrator::default();
        let input = locked_input(1.0, &[MoveIntent::Forward, MoveIntent::Left]);
        assert_eq!(integrator.displacement(1.0, &input, Vec3::ZERO), Vec3::ZERO);
    }

    #[test]
    fn one_second_forward_at_sixty_hertz() {
        let integrator = MovementIntegrator::default();
        let input = locked_input(10.0, &[MoveIntent::Forward]);
        let mut cam = Camera::new(800, 600);
        cam.eye = Vec3::ZERO;
        let forward = cam.forward();
        for _ in 0..60 {
            integrator.update(1.0 / 60.0, &input, &mut cam);
        }
        assert!((cam.eye - forward * 10.0).length() < 1e-3, "ended at {:?}", cam.eye);
    }
}
