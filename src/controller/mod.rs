// CONTROLLER: Input, session logic, and update loop
pub mod input;
pub mod movement;
pub mod camera_controller;
pub mod audio;
pub mod assets;
pub mod session;
pub mod frame_loop;

pub use input::{EventQueue, InputEvent, InputState, KeyBindings, MoveIntent};
pub use movement::{MovementConfig, MovementIntegrator};
pub use camera_controller::CameraController;
pub use audio::{AudioChannel, AudioDirector, AudioEngine, SilentAudio};
pub use assets::{spawn_landscape, AssetLoader};
pub use session::{FrameStats, Session};
pub use frame_loop::FrameLoopContext;
