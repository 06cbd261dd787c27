//! Multi-template rod detection engine

use super::{
    config::MatchConfig,
    nms::cross_template_nms,
    slots::{SlotAssigner, SlotLayout, SlotStatuses},
};
use crate::capture::FrameSource;
use crate::template_matching::{
    DetectionResult, Point, RodStatus, TemplateGroup, TemplateMatcher, TemplateStore,
};
use image::{GrayImage, RgbImage};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// One candidate object found in a frame. Lives for a single pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub template: String,
    pub kind: Option<RodStatus>,
    pub group: TemplateGroup,
    /// Bounding-box center in screen coordinates
    pub center: Point,
    /// Raw correlation score
    pub score: f32,
    /// Score after the center-distance penalty; ordering key for NMS
    pub quality: f32,
    pub width: u32,
    pub height: u32,
}

impl Detection {
    pub fn priority(&self) -> u8 {
        self.kind.map(RodStatus::priority).unwrap_or(0)
    }
}

/// Everything one detection pass produced.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionPass {
    pub detections: Vec<Detection>,
    pub slots: SlotStatuses,
    pub raw_count: usize,
    pub local_count: usize,
    pub processing_time_ms: u128,
}

/// Confidence scaled down by distance from the frame center.
///
/// A hit at the exact center keeps its score; one in a corner loses
/// `center_weight` of it.
pub fn quality_score(score: f32, center: Point, frame_size: (u32, u32), center_weight: f32) -> f32 {
    let cx = frame_size.0 as f32 / 2.0;
    let cy = frame_size.1 as f32 / 2.0;
    let max_distance = (cx * cx + cy * cy).sqrt().max(1.0);
    let dx = center.x as f32 - cx;
    let dy = center.y as f32 - cy;
    let ratio = ((dx * dx + dy * dy).sqrt() / max_distance).min(1.0);
    score * (1.0 - center_weight.clamp(0.0, 1.0) * ratio)
}

/// Per-template greedy suppression.
///
/// Detections are visited by descending quality; one is kept only if it lies
/// farther than `radius` from every kept detection of the same template.
pub fn local_nms(mut detections: Vec<Detection>, radius: f32) -> Vec<Detection> {
    sort_by_quality(&mut detections);
    let mut kept: Vec<Detection> = Vec::new();
    for det in detections {
        let isolated = kept
            .iter()
            .filter(|k| k.template == det.template)
            .all(|k| k.center.distance(&det.center) > radius);
        if isolated {
            kept.push(det);
        }
    }
    kept
}

/// Keep at most `max` detections of each template, in the order given.
pub fn cap_per_template(detections: Vec<Detection>, max: usize) -> Vec<Detection> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    detections
        .into_iter()
        .filter(|det| {
            let count = seen.entry(det.template.clone()).or_insert(0);
            *count += 1;
            *count <= max
        })
        .collect()
}

/// Quality descending, higher priority first on ties.
pub(crate) fn sort_by_quality(detections: &mut [Detection]) {
    detections.sort_by(|a, b| {
        b.quality
            .partial_cmp(&a.quality)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.priority().cmp(&a.priority()))
    });
}

/// Runs the rod watch-list over frames and maps results onto slots.
pub struct MultiDetector {
    matcher: TemplateMatcher,
    config: MatchConfig,
    watch_list: Vec<String>,
    kinds: HashMap<String, RodStatus>,
    assigner: SlotAssigner,
}

impl MultiDetector {
    /// Build a detector over `store`.
    ///
    /// Every watched template must resolve to a rod kind, either through
    /// `config.rod_kinds` or its name family. Entries that do not are dropped
    /// with a warning.
    pub fn new(store: Arc<TemplateStore>, config: MatchConfig, layout: SlotLayout) -> Self {
        let candidates = if config.watch_list.is_empty() {
            let mut names = store.watch_list();
            names.extend(config.rod_kinds.keys().filter(|name| store.contains(name)).cloned());
            names.sort();
            names.dedup();
            names
        } else {
            config.watch_list.clone()
        };

        let mut watch_list = Vec::with_capacity(candidates.len());
        let mut kinds = HashMap::new();
        for name in candidates {
            let kind = config
                .rod_kinds
                .get(&name)
                .copied()
                .or_else(|| RodStatus::from_template_name(&name));
            match kind {
                Some(kind) if kind != RodStatus::Empty => {
                    kinds.insert(name.clone(), kind);
                    watch_list.push(name);
                }
                _ => log::warn!(
                    "⚠️ Watched template '{}' has no rod kind; map it in rod_kinds to use it",
                    name
                ),
            }
        }
        if watch_list.is_empty() {
            log::warn!("⚠️ No rod templates to watch; every slot will read as empty");
        }
        Self {
            matcher: TemplateMatcher::new(store),
            config,
            watch_list,
            kinds,
            assigner: SlotAssigner::new(layout),
        }
    }

    pub fn matcher(&self) -> &TemplateMatcher {
        &self.matcher
    }

    pub fn watch_list(&self) -> &[String] {
        &self.watch_list
    }

    pub fn assigner(&self) -> &SlotAssigner {
        &self.assigner
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Rod kind a watched template reports
    pub fn kind_of(&self, name: &str) -> Option<RodStatus> {
        self.kinds.get(name).copied()
    }

    /// Every thresholded hit of every watched template, one detection per hit.
    ///
    /// Missing templates are skipped with a log line; the rest still run.
    pub fn detect_raw(&self, frame: &GrayImage) -> Vec<Detection> {
        let frame_size = frame.dimensions();
        let (search, offset) = match &self.config.rod_region {
            Some(region) => {
                let clipped = region.clone().clip_to_screen(frame.width(), frame.height());
                let crop = image::imageops::crop_imm(frame, clipped.x, clipped.y, clipped.width, clipped.height)
                    .to_image();
                (crop, (clipped.x, clipped.y))
            }
            None => (frame.clone(), (0, 0)),
        };

        let mut detections = Vec::new();
        for name in &self.watch_list {
            match self.matcher.find_all(&search, name) {
                Ok((hits, template)) => {
                    let kind = self.kind_of(name);
                    if self.config.debug_enabled && !hits.is_empty() {
                        log::debug!("✅ {} raw hits for template '{}'", hits.len(), name);
                    }
                    for hit in hits {
                        let center = template.center_at(hit.x + offset.0, hit.y + offset.1);
                        detections.push(Detection {
                            template: template.name.clone(),
                            kind,
                            group: TemplateGroup::Rod,
                            center,
                            score: hit.score,
                            quality: quality_score(
                                hit.score,
                                center,
                                frame_size,
                                self.config.nms.center_weight,
                            ),
                            width: template.width(),
                            height: template.height(),
                        });
                    }
                }
                Err(e) => log::warn!("⚠️ Skipping watched template: {}", e),
            }
        }
        detections
    }

    /// Full pass: raw hits, per-template NMS, cross-template NMS, slot assignment.
    ///
    /// The per-template cap applies only after local NMS, so a strong object's
    /// neighbourhood cannot crowd out a weaker object elsewhere.
    pub fn detect(&self, frame: &GrayImage) -> DetectionPass {
        let start_time = std::time::Instant::now();

        let raw = self.detect_raw(frame);
        let raw_count = raw.len();
        let local = cap_per_template(
            local_nms(raw, self.config.nms.local_radius),
            self.config.max_per_template,
        );
        let local_count = local.len();
        let detections = cross_template_nms(local, &self.config.nms);
        let slots = self.assigner.assign(&detections);

        let pass = DetectionPass {
            detections,
            slots,
            raw_count,
            local_count,
            processing_time_ms: start_time.elapsed().as_millis(),
        };

        if self.config.debug_enabled {
            log_detection_pass(&pass);
        }
        pass
    }

    pub fn detect_rgb(&self, frame: &RgbImage) -> DetectionPass {
        self.detect(&to_gray(frame))
    }

    /// Capture one frame and run a pass over it.
    ///
    /// The grayscale frame is returned too so callers can run interface
    /// probes on the same capture.
    pub fn capture_and_detect(&self, source: &dyn FrameSource) -> DetectionResult<(DetectionPass, GrayImage)> {
        let frame = source.capture(None)?;
        let gray = to_gray(&frame);
        let pass = self.detect(&gray);
        Ok((pass, gray))
    }
}

pub(crate) fn to_gray(frame: &RgbImage) -> GrayImage {
    image::DynamicImage::ImageRgb8(frame.clone()).to_luma8()
}

fn log_detection_pass(pass: &DetectionPass) {
    log::debug!("🔍 Detection pass:");
    log::debug!("  Processing time: {}ms", pass.processing_time_ms);
    log::debug!(
        "  Raw hits: {} -> local NMS: {} -> final: {}",
        pass.raw_count,
        pass.local_count,
        pass.detections.len()
    );
    for (i, d) in pass.detections.iter().take(8).enumerate() {
        log::debug!(
            "    {}. {} at {} score={:.3} quality={:.3}",
            i + 1,
            d.template,
            d.center,
            d.score,
            d.quality
        );
    }
    log::debug!("  Slots: {}", pass.slots);
}
