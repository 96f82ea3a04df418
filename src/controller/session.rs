use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::config::Settings;
use crate::controller::audio::{AudioDirector, AudioEngine};
use crate::controller::camera_controller::CameraController;
use crate::controller::input::{EventQueue, InputState};
use crate::controller::movement::{MovementConfig, MovementIntegrator};
use crate::model::{Camera, FrameClock, ParticleAnimator, ParticleCloud, SceneGraph, SceneNode};
use crate::utils::create_water_mesh;

/// What one tick did, for the debug panel and logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub dt: f32,
    pub elapsed: f64,
    pub displacement: Vec3,
}

/// All per-session state, passed explicitly to the frame loop.
pub struct Session {
    pub settings: Settings,
    pub clock: FrameClock,
    pub input: InputState,
    pub camera: Camera,
    pub camera_controller: CameraController,
    pub integrator: MovementIntegrator,
    pub animator: ParticleAnimator,
    pub particles: ParticleCloud,
    pub scene: Rc<RefCell<SceneGraph>>,
    pub audio: AudioDirector,
    pub last_frame: FrameStats,
    events: EventQueue,
}

impl Session {
    pub fn new(settings: Settings, camera: Camera, audio: Box<dyn AudioEngine>) -> Self {
        let mut rng = match settings.particles.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::seed_from_u64(entropy_seed()),
        };
        let p = &settings.particles;
        let particles = ParticleCloud::scatter(p.count, p.extent, p.center, &mut rng);

        let mut scene = SceneGraph::new();
        if settings.water.enabled {
            let w = &settings.water;
            scene.add(
                SceneNode::new("water", create_water_mesh(w.size, w.level, w.color))
                    .with_shadows(false, true)
                    .transparent(),
            );
        }

        tracing::info!(particles = particles.point_count(), "session created");

        Self {
            clock: FrameClock::new(settings.max_frame_delta),
            input: InputState::new(settings.movement.initial_speed),
            camera,
            camera_controller: CameraController::new(settings.movement.look_sensitivity),
            integrator: MovementIntegrator::new(MovementConfig {
                vertical: settings.movement.vertical,
                up: settings.movement.up,
            }),
            animator: ParticleAnimator {
                stride: settings.particles.stride,
                amplitude: settings.particles.amplitude,
                rotation_rate: settings.particles.rotation_rate,
            },
            particles,
            scene: Rc::new(RefCell::new(scene)),
            audio: AudioDirector::new(audio),
            last_frame: FrameStats::default(),
            events: EventQueue::new(),
            settings,
        }
    }

    /// Handle for platform callbacks to push input into.
    pub fn events(&self) -> EventQueue {
        self.events.clone()
    }

    /// One frame: clock, input, look, movement, particles, listener.
    /// `now` is a monotonic timestamp in seconds.
    pub fn tick(&mut self, now: f64) -> FrameStats {
        self.apply_settings();
        let dt = self.clock.tick(now);

        for event in self.events.drain() {
            if let Some(locked) = self.input.process_event(&event) {
                tracing::info!(locked, "pointer capture changed");
                self.audio.on_lock_changed(locked);
            }
        }

        if self.input.pointer_locked {
            let (dx, dy) = self.input.consume_look();
            self.camera_controller.apply_look(&mut self.camera, dx, dy);
        }

        let displacement = self.integrator.update(dt, &self.input, &mut self.camera);

        let elapsed = self.clock.elapsed();
        self.animator.apply(&mut self.particles, elapsed as f32, dt);

        self.audio
            .update_listener(self.camera.eye, self.camera.forward(), self.camera.up);

        self.last_frame = FrameStats { dt, elapsed, displacement };
        self.last_frame
    }

    /// Push panel-edited settings into the live components.
    fn apply_settings(&mut self) {
        let s = &self.settings;
        self.integrator.config.vertical = s.movement.vertical;
        self.integrator.config.up = s.movement.up;
        self.camera_controller.mouse_sensitivity = s.movement.look_sensitivity;
        self.animator.stride = s.particles.stride;
        self.animator.amplitude = s.particles.amplitude;
        self.animator.rotation_rate = s.particles.rotation_rate;
        self.clock.set_max_delta(s.max_frame_delta);

        let mut scene = self.scene.borrow_mut();
        if let Some(id) = scene.find_by_name("water") {
            if let Some(node) = scene.get_mut(id) {
                node.visible = s.water.enabled;
            }
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn entropy_seed() -> u64 {
    (js_sys::Math::random() * u64::MAX as f64) as u64
}

#[cfg(not(target_arch = "wasm32"))]
fn entropy_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x5eed)
}
