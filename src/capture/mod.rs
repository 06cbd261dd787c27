// Capture module - screen frame acquisition
// This module abstracts where frames come from (live monitor, saved screenshot,
// in-memory frame) behind a single trait the detection loop can poll.

pub mod error;
pub mod file_impl;
#[cfg(feature = "capture")]
pub mod monitor_impl;
pub mod region;
pub mod types;

// Re-export the main types for easy access
pub use error::{CaptureError, CaptureResult};
pub use file_impl::{ImageFileSource, StaticFrame};
#[cfg(feature = "capture")]
pub use monitor_impl::MonitorCapture;
pub use region::SearchRegion;
pub use types::FrameSource;
