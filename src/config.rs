//! Tunable scene settings. The debug panel edits these live.

use glam::Vec3;

use crate::model::StrideMode;

#[derive(Debug, Clone)]
pub struct Settings {
    pub movement: MovementSettings,
    pub particles: ParticleSettings,
    pub lighting: LightingSettings,
    pub water: WaterSettings,
    pub landscape: LandscapeSettings,
    pub audio: AudioSettings,
    /// Upper bound for a single frame step, in seconds.
    pub max_frame_delta: Option<f32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            movement: MovementSettings::default(),
            particles: ParticleSettings::default(),
            lighting: LightingSettings::default(),
            water: WaterSettings::default(),
            landscape: LandscapeSettings::default(),
            audio: AudioSettings::default(),
            max_frame_delta: Some(0.1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MovementSettings {
    /// Speed the input tracker starts with, in world units per second.
    pub initial_speed: f32,
    /// Whether Space/Shift move the camera vertically.
    pub vertical: bool,
    pub look_sensitivity: f32,
    pub up: Vec3,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            initial_speed: 10.0,
            vertical: true,
            look_sensitivity: 0.002,
            up: Vec3::Y,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParticleSettings {
    pub count: usize,
    pub extent: Vec3,
    pub center: Vec3,
    pub amplitude: f32,
    pub rotation_rate: f32,
    pub stride: StrideMode,
    /// Fixed seed for reproducible clouds; random when `None`.
    pub seed: Option<u64>,
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self {
            count: 2000,
            extent: Vec3::new(200.0, 60.0, 200.0),
            center: Vec3::new(0.0, 40.0, 0.0),
            amplitude: 1.0 / 1000.0,
            rotation_rate: 5.0,
            stride: StrideMode::Interleaved,
            seed: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LightingSettings {
    /// Direction towards the sun.
    pub sun_dir: Vec3,
    pub sun_intensity: f32,
    pub ambient: f32,
    pub sky_color: [f32; 3],
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            sun_dir: Vec3::new(0.5, 1.0, 0.3),
            sun_intensity: 0.8,
            ambient: 0.35,
            sky_color: [0.53, 0.78, 0.96],
        }
    }
}

#[derive(Debug, Clone)]
pub struct WaterSettings {
    pub enabled: bool,
    pub level: f32,
    pub size: f32,
    pub color: [f32; 4],
}

impl Default for WaterSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            level: 2.0,
            size: 1000.0,
            color: [0.12, 0.36, 0.62, 0.75],
        }
    }
}

#[derive(Debug, Clone)]
pub struct LandscapeSettings {
    /// Grayscale heightmap, resolved relative to the host (page or cwd).
    pub heightmap_path: String,
    pub size: f32,
    pub max_height: f32,
    /// Heightmaps larger than this per side are sampled down.
    pub max_resolution: u32,
    /// World-space placement of the mesh centre.
    pub offset: Vec3,
}

impl Default for LandscapeSettings {
    fn default() -> Self {
        Self {
            heightmap_path: "assets/heightmap.png".to_string(),
            size: 400.0,
            max_height: 60.0,
            max_resolution: 256,
            offset: Vec3::new(0.0, -5.0, 0.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AudioSettings {
    pub ambient_path: String,
    pub positional_path: String,
    /// World position of the positional source.
    pub emitter: Vec3,
    pub volume: f32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            ambient_path: "assets/audio/ambient.ogg".to_string(),
            positional_path: "assets/audio/waterfall.ogg".to_string(),
            emitter: Vec3::new(40.0, 10.0, -60.0),
            volume: 0.5,
        }
    }
}
