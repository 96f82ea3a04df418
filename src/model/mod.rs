// MODEL: Scene state and data
pub mod camera;
pub mod clock;
pub mod particles;
pub mod scene;

pub use camera::{Camera, CameraRig};
pub use clock::FrameClock;
pub use particles::{ParticleAnimator, ParticleCloud, StrideMode};
pub use scene::{NodeId, SceneGraph, SceneNode};
