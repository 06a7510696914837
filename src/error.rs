use thiserror::Error;

/// Failure to turn a byte source into an image document.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image decode failed: {0}")]
    Decode(#[from] image::ImageError),
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("No image loaded")]
    NoImage,
    #[error("Nothing to undo")]
    HistoryUnderflow,
    #[error("Mask is {actual:?}, expected {expected:?}")]
    MaskSize {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error(transparent)]
    Ingest(#[from] IngestError),
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Remote service error: {0}")]
    Remote(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Mask encoding failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("Could not start service workers: {0}")]
    Workers(#[from] rayon::ThreadPoolBuildError),
}

impl ServiceError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ServiceError::Unauthorized)
    }
}

#[derive(Error, Debug)]
pub enum GpuError {
    #[error("Could not create window surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("No compatible graphics adapter")]
    NoAdapter,
    #[error("Surface reports no formats")]
    NoSurfaceFormat,
    #[error("Could not open graphics device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: &'static str },
}
