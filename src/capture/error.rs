use std::path::PathBuf;
use thiserror::Error;

/// A specialized `Result` type for frame capture.
pub type CaptureResult<T> = Result<T, CaptureError>;

/// The error type for all frame capture operations.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("No monitor available for capture")]
    NoMonitor,

    #[error("Capture backend failed: {description}")]
    BackendFailed { description: String },

    #[error("Failed to load frame from {path:?}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Capture region {region} lies outside the {width}x{height} frame")]
    RegionOutOfBounds {
        region: String,
        width: u32,
        height: u32,
    },

    #[error("Frame source '{name}' is currently unavailable")]
    Unavailable { name: String },
}
