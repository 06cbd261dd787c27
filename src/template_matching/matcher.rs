/// Template matching implementation
///
/// Zero-mean normalized cross-correlation over grayscale frames, with a
/// best-match lookup for single objects and a thresholded hit list for
/// repeated objects.
use super::error::{DetectionError, DetectionResult};
use super::store::TemplateStore;
use super::types::{MatchHit, MatchOutcome, Template};
use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use imageproc::integral_image::{integral_image, integral_squared_image, sum_image_pixels};
use imageproc::template_matching::{MatchTemplateMethod, match_template};
use std::sync::Arc;

/// Correlation map, one score per window position.
pub type ScoreMap = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Per-pixel variance below which a window (or template) counts as flat.
const MIN_PIXEL_VARIANCE: f64 = 1.0;

/// A window position whose score cleared the threshold.
#[derive(Clone, Debug, PartialEq)]
pub struct RawHit {
    /// Top-left X of the matched window (frame coordinates)
    pub x: u32,
    /// Top-left Y of the matched window (frame coordinates)
    pub y: u32,
    /// Correlation score (-1.0 to 1.0)
    pub score: f32,
}

/// Matches templates from a shared store against frames.
#[derive(Clone)]
pub struct TemplateMatcher {
    store: Arc<TemplateStore>,
}

impl TemplateMatcher {
    pub fn new(store: Arc<TemplateStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<TemplateStore> {
        &self.store
    }

    /// Find the best match of template `name` in `frame`.
    ///
    /// `frame` is in screen coordinates. When the template carries a search
    /// region only that area is scanned and positions are mapped back.
    pub fn try_match(&self, frame: &GrayImage, name: &str) -> DetectionResult<MatchHit> {
        let template = self
            .store
            .get(name)
            .ok_or_else(|| DetectionError::TemplateMissing {
                name: name.to_string(),
            })?;

        let (search, offset) = search_area(frame, template);
        let map = score_map(&search, &template.image);
        let (x, y, score) = best_location(&map);
        let top_left = (x + offset.0, y + offset.1);

        log::debug!(
            "🔍 '{}' best score {:.3} at ({},{}) threshold {:.2}",
            name,
            score,
            top_left.0,
            top_left.1,
            template.threshold
        );

        if map.width() == 0 || score < template.threshold {
            return Err(DetectionError::BelowThreshold {
                name: name.to_string(),
                score,
                threshold: template.threshold,
            });
        }

        Ok(MatchHit {
            template: name.to_string(),
            score,
            top_left,
            position: template.center_at(top_left.0, top_left.1),
        })
    }

    /// Best-effort variant of [`try_match`](Self::try_match) that never fails.
    ///
    /// Missing templates are logged; a sub-threshold score is reported as
    /// `found = false` with the score that was seen.
    pub fn check(&self, frame: &GrayImage, name: &str) -> MatchOutcome {
        match self.try_match(frame, name) {
            Ok(hit) => MatchOutcome::from(&hit),
            Err(e) => {
                if e.is_not_found() {
                    log::debug!("👀 {}", e);
                } else {
                    log::warn!("⚠️ Match check for '{}' failed: {}", name, e);
                }
                MatchOutcome {
                    found: false,
                    score: e.score(),
                    position: None,
                }
            }
        }
    }

    /// Convenience wrapper converting an RGB frame first.
    pub fn check_rgb(&self, frame: &RgbImage, name: &str) -> MatchOutcome {
        let gray = image::DynamicImage::ImageRgb8(frame.clone()).to_luma8();
        self.check(&gray, name)
    }

    /// Every window of template `name` scoring at or above its threshold.
    ///
    /// Hits are in screen coordinates and sorted by score (highest first).
    /// Nothing is dropped here; thinning is left to the caller's NMS.
    pub fn find_all(&self, frame: &GrayImage, name: &str) -> DetectionResult<(Vec<RawHit>, &Template)> {
        let template = self
            .store
            .get(name)
            .ok_or_else(|| DetectionError::TemplateMissing {
                name: name.to_string(),
            })?;

        let (search, offset) = search_area(frame, template);
        let map = score_map(&search, &template.image);
        let mut hits = thresholded_hits(&map, template.threshold);
        for hit in hits.iter_mut() {
            hit.x += offset.0;
            hit.y += offset.1;
        }
        Ok((hits, template))
    }
}

/// Crop `frame` to the template's search region, returning the crop offset.
fn search_area(frame: &GrayImage, template: &Template) -> (GrayImage, (u32, u32)) {
    match &template.search_region {
        Some(region) => {
            let clipped = region.clone().clip_to_screen(frame.width(), frame.height());
            let crop = image::imageops::crop_imm(frame, clipped.x, clipped.y, clipped.width, clipped.height)
                .to_image();
            (crop, (clipped.x, clipped.y))
        }
        None => (frame.clone(), (0, 0)),
    }
}

/// Zero-mean normalized cross-correlation of `template` over `frame`.
///
/// Each score is the correlation coefficient between the template and the
/// window under it, so uniform brightness or contrast changes do not matter
/// and a textured background scores near 0.0 rather than near 1.0.
///
/// Returns an empty map when the template does not fit inside the frame.
/// Flat windows, and every window of a flat template, score 0.0.
pub fn score_map(frame: &GrayImage, template: &GrayImage) -> ScoreMap {
    if template.width() == 0
        || template.height() == 0
        || template.width() > frame.width()
        || template.height() > frame.height()
    {
        log::debug!(
            "⚠️ Skipping template - too large for frame: {}x{} > {}x{}",
            template.width(),
            template.height(),
            frame.width(),
            frame.height()
        );
        return ScoreMap::new(0, 0);
    }

    let (tw, th) = template.dimensions();
    let n = f64::from(tw * th);
    let (t_sum, t_sq_sum) = template.pixels().fold((0.0f64, 0.0f64), |(sum, sq), p| {
        let v = f64::from(p[0]);
        (sum + v, sq + v * v)
    });
    let t_var = t_sq_sum - t_sum * t_sum / n;
    if t_var < n * MIN_PIXEL_VARIANCE {
        log::warn!("⚠️ Template {}x{} is flat; it cannot match anything", tw, th);
        return ScoreMap::new(frame.width() - tw + 1, frame.height() - th + 1);
    }
    let t_mean = t_sum / n;
    let t_norm = t_var.sqrt();

    // Sum of frame * template per window; the window means come from the integral images
    let mut map = match_template(frame, template, MatchTemplateMethod::CrossCorrelation);
    let sums = integral_image::<_, u64>(frame);
    let squares = integral_squared_image::<_, u64>(frame);

    for (x, y, pixel) in map.enumerate_pixels_mut() {
        let (right, bottom) = (x + tw - 1, y + th - 1);
        let w_sum = sum_image_pixels(&sums, x, y, right, bottom)[0] as f64;
        let w_sq_sum = sum_image_pixels(&squares, x, y, right, bottom)[0] as f64;
        let w_var = w_sq_sum - w_sum * w_sum / n;
        if w_var < n * MIN_PIXEL_VARIANCE {
            pixel[0] = 0.0;
            continue;
        }
        let score = (f64::from(pixel[0]) - t_mean * w_sum) / (w_var.sqrt() * t_norm);
        pixel[0] = if score.is_finite() {
            score.clamp(-1.0, 1.0) as f32
        } else {
            0.0
        };
    }
    map
}

/// Global maximum of a score map as (x, y, score). Empty maps give (0, 0, 0.0).
pub fn best_location(map: &ScoreMap) -> (u32, u32, f32) {
    let mut best = (0u32, 0u32, 0.0f32);
    for (x, y, pixel) in map.enumerate_pixels() {
        if pixel[0] > best.2 {
            best = (x, y, pixel[0]);
        }
    }
    best
}

/// Pure threshold decision over a score map for a template of `width`x`height`.
pub fn evaluate_score_map(map: &ScoreMap, width: u32, height: u32, threshold: f32) -> MatchOutcome {
    let (x, y, score) = best_location(map);
    if map.width() == 0 || score < threshold {
        return MatchOutcome {
            found: false,
            score,
            position: None,
        };
    }
    MatchOutcome {
        found: true,
        score,
        position: Some(super::types::Point::new(
            (x + width / 2) as i32,
            (y + height / 2) as i32,
        )),
    }
}

/// Every position in `map` scoring at or above `threshold`, highest first.
pub fn thresholded_hits(map: &ScoreMap, threshold: f32) -> Vec<RawHit> {
    let mut hits: Vec<RawHit> = map
        .enumerate_pixels()
        .filter(|(_, _, pixel)| pixel[0] >= threshold)
        .map(|(x, y, pixel)| RawHit {
            x,
            y,
            score: pixel[0],
        })
        .collect();
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits
}
