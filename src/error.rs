use thiserror::Error;

/// Errors raised while setting up or feeding the scene.
///
/// None of these are fatal to a running frame loop: asset and audio
/// failures are logged and dropped by their callers.
#[derive(Debug, Error)]
pub enum Error {
    #[error("DOM error: {0}")]
    Dom(String),

    #[cfg(not(target_arch = "wasm32"))]
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("no suitable GPU adapter found: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to request GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("surface has no supported format")]
    NoSurfaceFormat,

    #[error("failed to read asset {path}: {source}")]
    AssetIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch asset {path}: {reason}")]
    AssetFetch { path: String, reason: String },

    #[error("failed to decode asset: {0}")]
    AssetDecode(#[from] image::ImageError),

    #[error("heightmap must be at least 2x2 pixels, got {width}x{height}")]
    HeightmapTooSmall { width: u32, height: u32 },

    #[error("particle source has {0} floats, expected a multiple of 3")]
    RaggedParticleSource(usize),

    #[error("particle phases: expected {expected}, got {actual}")]
    PhaseCountMismatch { expected: usize, actual: usize },

    #[error("particle phase {value} at index {index} is outside [0, 1)")]
    PhaseOutOfRange { index: usize, value: f32 },
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(target_arch = "wasm32")]
impl From<Error> for wasm_bindgen::JsValue {
    fn from(err: Error) -> Self {
        wasm_bindgen::JsValue::from_str(&err.to_string())
    }
}
