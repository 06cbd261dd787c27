// Frame sources backed by files or in-memory buffers
use super::error::{CaptureError, CaptureResult};
use super::region::SearchRegion;
use super::types::{FrameSource, crop_to_region};
use image::RgbImage;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};

/// Serves a saved screenshot from disk, decoded once at construction.
pub struct ImageFileSource {
    path: PathBuf,
    frame: RgbImage,
    label: String,
}

impl ImageFileSource {
    pub fn open(path: impl AsRef<Path>) -> CaptureResult<Self> {
        let path = path.as_ref().to_path_buf();
        let frame = image::open(&path)
            .map_err(|source| CaptureError::ImageLoad {
                path: path.clone(),
                source,
            })?
            .to_rgb8();
        log::debug!(
            "🖼️ Loaded frame {} ({}x{})",
            path.display(),
            frame.width(),
            frame.height()
        );
        let label = format!("file:{}", path.display());
        Ok(Self { path, frame, label })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSource for ImageFileSource {
    fn capture(&self, region: Option<&SearchRegion>) -> CaptureResult<RgbImage> {
        crop_to_region(self.frame.clone(), region)
    }

    fn dimensions(&self) -> (u32, u32) {
        self.frame.dimensions()
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// In-memory frame that can be swapped or withdrawn at runtime.
///
/// Withdrawing the frame makes `capture` fail with `Unavailable`, which is how
/// tests exercise the loop's capture-failure path.
pub struct StaticFrame {
    frame: RwLock<Option<RgbImage>>,
    dimensions: (u32, u32),
}

impl StaticFrame {
    pub fn new(frame: RgbImage) -> Self {
        let dimensions = frame.dimensions();
        Self {
            frame: RwLock::new(Some(frame)),
            dimensions,
        }
    }

    /// Replace the served frame (dimensions are expected to stay constant).
    pub fn set_frame(&self, frame: RgbImage) {
        *self.frame.write() = Some(frame);
    }

    /// Make subsequent captures fail until a new frame is set.
    pub fn set_unavailable(&self) {
        *self.frame.write() = None;
    }
}

impl FrameSource for StaticFrame {
    fn capture(&self, region: Option<&SearchRegion>) -> CaptureResult<RgbImage> {
        let frame = self
            .frame
            .read()
            .clone()
            .ok_or_else(|| CaptureError::Unavailable {
                name: self.name().to_string(),
            })?;
        crop_to_region(frame, region)
    }

    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    fn name(&self) -> &str {
        "static"
    }
}
