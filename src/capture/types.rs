// Core capture types and traits
use super::error::CaptureResult;
use super::region::SearchRegion;
use image::RgbImage;

/// Anything that can hand the detection loop a frame.
///
/// Implementations are called from the loop's blocking worker thread, so they
/// must be `Send + Sync`. Frames are always RGB; matching converts to grayscale
/// so the channel order only has to be consistent.
pub trait FrameSource: Send + Sync {
    /// Grab a frame, optionally restricted to `region` (screen coordinates).
    fn capture(&self, region: Option<&SearchRegion>) -> CaptureResult<RgbImage>;

    /// Full frame size in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Short label for log lines.
    fn name(&self) -> &str;
}

/// Crop `frame` to `region`, clipping the region to the frame first.
pub(crate) fn crop_to_region(frame: RgbImage, region: Option<&SearchRegion>) -> CaptureResult<RgbImage> {
    let Some(region) = region else {
        return Ok(frame);
    };
    let (width, height) = frame.dimensions();
    let clipped = region.clone().clip_to_screen(width, height);
    if !clipped.is_valid() || region.x >= width || region.y >= height {
        return Err(super::CaptureError::RegionOutOfBounds {
            region: region.to_string(),
            width,
            height,
        });
    }
    Ok(image::imageops::crop_imm(&frame, clipped.x, clipped.y, clipped.width, clipped.height).to_image())
}
