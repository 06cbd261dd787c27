//! Cross-template non-maximum suppression

use super::config::NmsConfig;
use super::detector::{Detection, sort_by_quality};

/// Resolve conflicts between detections of different templates.
///
/// Visits detections by descending quality and compares each one against the
/// accepted set:
/// - same template closer than `same_template_radius`: duplicate, dropped
/// - same group closer than `cross_template_radius`: the better one survives
///   (see [`outranks`]), possibly evicting an accepted detection
/// - different group closer than `cross_template_radius`: dropped only when
///   the accepted one is ahead by more than `quality_gap`, otherwise both stay
///
/// Running it again on its own output changes nothing.
pub fn cross_template_nms(mut detections: Vec<Detection>, config: &NmsConfig) -> Vec<Detection> {
    sort_by_quality(&mut detections);

    let mut accepted: Vec<Detection> = Vec::with_capacity(detections.len());
    'candidates: for det in detections {
        let mut evicted: Vec<usize> = Vec::new();

        for (i, kept) in accepted.iter().enumerate() {
            let distance = kept.center.distance(&det.center);

            if kept.template == det.template && distance < config.same_template_radius {
                log::trace!("🧹 duplicate {} at {}", det.template, det.center);
                continue 'candidates;
            }
            if distance >= config.cross_template_radius {
                continue;
            }

            if kept.group == det.group {
                if outranks(&det, kept, config.quality_gap) {
                    evicted.push(i);
                } else {
                    log::trace!("🧹 {} at {} loses to {}", det.template, det.center, kept.template);
                    continue 'candidates;
                }
            } else if kept.quality - det.quality > config.quality_gap {
                log::trace!("🧹 {} at {} suppressed across groups", det.template, det.center);
                continue 'candidates;
            }
        }

        for i in evicted.into_iter().rev() {
            let old = accepted.remove(i);
            log::trace!("🔁 {} replaces {} near {}", det.template, old.template, old.center);
        }
        accepted.push(det);
    }
    accepted
}

/// Whether `challenger` should replace `incumbent` in a same-group conflict.
///
/// Strictly higher quality always wins. Within `quality_gap` the match is
/// ambiguous and the rod priority table decides (broken > with bait > without).
pub fn outranks(challenger: &Detection, incumbent: &Detection, quality_gap: f32) -> bool {
    if challenger.quality > incumbent.quality {
        return true;
    }
    challenger.priority() > incumbent.priority()
        && incumbent.quality - challenger.quality <= quality_gap
}
