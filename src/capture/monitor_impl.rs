// Live monitor capture using xcap
use super::error::{CaptureError, CaptureResult};
use super::region::SearchRegion;
use super::types::{FrameSource, crop_to_region};
use image::{DynamicImage, RgbImage};
use xcap::Monitor;

/// Captures the primary monitor (or the first one when none is flagged primary).
///
/// Only the monitor id is kept; the handle is looked up again per capture so the
/// source can move to the loop's worker thread on every platform.
pub struct MonitorCapture {
    monitor_id: u32,
    width: u32,
    height: u32,
    label: String,
}

impl MonitorCapture {
    pub fn primary() -> CaptureResult<Self> {
        let monitors = enumerate()?;
        let monitor = monitors
            .iter()
            .find(|m| m.is_primary().unwrap_or(false))
            .or_else(|| monitors.first())
            .ok_or(CaptureError::NoMonitor)?;

        let monitor_id = monitor.id().map_err(backend_error)?;
        let width = monitor.width().map_err(backend_error)?;
        let height = monitor.height().map_err(backend_error)?;
        let label = format!(
            "monitor:{}",
            monitor.name().unwrap_or_else(|_| "unknown".to_string())
        );
        log::info!("🖥️ Capturing {} ({}x{})", label, width, height);

        Ok(Self {
            monitor_id,
            width,
            height,
            label,
        })
    }

    fn monitor(&self) -> CaptureResult<Monitor> {
        enumerate()?
            .into_iter()
            .find(|m| m.id().ok() == Some(self.monitor_id))
            .ok_or_else(|| CaptureError::Unavailable {
                name: self.label.clone(),
            })
    }
}

fn enumerate() -> CaptureResult<Vec<Monitor>> {
    Monitor::all().map_err(|e| CaptureError::BackendFailed {
        description: format!("Failed to enumerate monitors: {e}"),
    })
}

fn backend_error(e: xcap::XCapError) -> CaptureError {
    CaptureError::BackendFailed {
        description: e.to_string(),
    }
}

impl FrameSource for MonitorCapture {
    fn capture(&self, region: Option<&SearchRegion>) -> CaptureResult<RgbImage> {
        let rgba = self.monitor()?.capture_image().map_err(backend_error)?;
        let frame = DynamicImage::ImageRgba8(rgba).to_rgb8();
        crop_to_region(frame, region)
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn name(&self) -> &str {
        &self.label
    }
}
