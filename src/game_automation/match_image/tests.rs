//! Tests for rod detection, suppression and slot assignment

use crate::capture::{SearchRegion, StaticFrame};
use crate::game_automation::match_image::{
    Detection, MatchConfig, MultiDetector, NmsConfig, SLOT_COUNT, SlotAssigner, SlotLayout,
    cap_per_template, create_rod_panel_config, cross_template_nms, local_nms, quality_score,
};
use crate::template_matching::{
    DetectionError, Point, RodStatus, Template, TemplateGroup, TemplateStore,
};
use image::{GrayImage, Luma, RgbImage};
use std::collections::HashMap;
use std::sync::Arc;

fn det(template: &str, x: i32, y: i32, quality: f32) -> Detection {
    Detection {
        template: template.to_string(),
        kind: RodStatus::from_template_name(template),
        group: TemplateGroup::from_template_name(template),
        center: Point::new(x, y),
        score: quality,
        quality,
        width: 40,
        height: 40,
    }
}

/// Binary noise patch; distinct seeds barely correlate with each other.
fn noise_patch(seed: u32, width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let v = (x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663) ^ seed.wrapping_mul(83_492_791))
            .wrapping_mul(2_654_435_761);
        Luma([if (v >> 15) & 1 == 1 { 235 } else { 20 }])
    })
}

/// Mid-gray diagonal texture, like a game background.
fn textured(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| Luma([(100 + (7 * x + 11 * y) % 30) as u8]))
}

/// Smooth radial blob: correlation stays high for a few pixels around the true
/// position. `ripple` adds a checkerboard that lowers the best score.
fn blob(ripple: i32) -> GrayImage {
    GrayImage::from_fn(20, 20, |x, y| {
        let dx = x as f64 - 9.5;
        let dy = y as f64 - 9.5;
        let v = 220 - (9.0 * (dx * dx + dy * dy).sqrt()) as i32;
        let v = if (x + y) % 2 == 1 { v + ripple } else { v - ripple };
        Luma([v as u8])
    })
}

fn test_layout() -> SlotLayout {
    SlotLayout {
        positions: [
            Point::new(50, 100),
            Point::new(150, 100),
            Point::new(250, 100),
            Point::new(350, 100),
            Point::new(450, 100),
            Point::new(550, 100),
        ],
        max_distance: 100.0,
    }
}

fn place(frame: &mut GrayImage, patch: &GrayImage, center: Point) {
    let x = center.x - patch.width() as i32 / 2;
    let y = center.y - patch.height() as i32 / 2;
    image::imageops::replace(frame, patch, x as i64, y as i64);
}

// ============================================================
// SUPPRESSION
// ============================================================

#[test]
fn test_same_template_duplicates_collapse() {
    let config = NmsConfig::default();
    let detections = vec![
        det("rod_with_bait", 100, 100, 0.92),
        det("rod_with_bait", 105, 103, 0.90),
    ];

    let once = cross_template_nms(detections.clone(), &config);
    assert_eq!(once.len(), 1);
    assert_eq!(once[0].center, Point::new(100, 100));

    let twice = cross_template_nms(once.clone(), &config);
    assert_eq!(once, twice, "NMS must be idempotent on its own output");

    let local = local_nms(detections, config.local_radius);
    assert_eq!(local.len(), 1);
}

#[test]
fn test_same_group_priority_resolves_ambiguity() {
    let config = NmsConfig::default();
    // with_bait scores a bit higher, but broken outranks it within the gap
    let out = cross_template_nms(
        vec![
            det("rod_with_bait", 200, 100, 0.90),
            det("rod_broken", 230, 100, 0.84),
        ],
        &config,
    );
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].template, "rod_broken");
}

#[test]
fn test_same_group_clear_quality_winner() {
    let config = NmsConfig::default();
    let out = cross_template_nms(
        vec![
            det("rod_without_bait", 200, 100, 0.95),
            det("rod_with_bait", 240, 100, 0.70),
        ],
        &config,
    );
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].template, "rod_without_bait");
}

#[test]
fn test_cross_group_ambiguous_keeps_both() {
    let config = NmsConfig::default();
    let out = cross_template_nms(
        vec![
            det("rod_with_bait", 200, 100, 0.90),
            det("catch_banner", 220, 110, 0.80),
        ],
        &config,
    );
    assert_eq!(out.len(), 2);
    assert_eq!(cross_template_nms(out.clone(), &config), out);
}

#[test]
fn test_cross_group_clear_gap_suppressed() {
    let config = NmsConfig::default();
    let out = cross_template_nms(
        vec![
            det("rod_with_bait", 200, 100, 0.90),
            det("catch_banner", 220, 110, 0.70),
        ],
        &config,
    );
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].template, "rod_with_bait");
}

#[test]
fn test_distant_detections_untouched() {
    let config = NmsConfig::default();
    let out = cross_template_nms(
        vec![
            det("rod_with_bait", 100, 100, 0.90),
            det("rod_broken", 300, 100, 0.75),
            det("rod_with_bait", 500, 100, 0.88),
        ],
        &config,
    );
    assert_eq!(out.len(), 3);
}

#[test]
fn test_local_nms_radius() {
    let kept = local_nms(
        vec![
            det("rod_broken", 100, 100, 0.9),
            det("rod_broken", 170, 100, 0.8), // 70px: suppressed
            det("rod_broken", 190, 100, 0.7), // 90px: kept
            det("rod_with_bait", 110, 100, 0.6), // other template: untouched
        ],
        80.0,
    );
    let centers: Vec<(String, i32)> = kept.iter().map(|d| (d.template.clone(), d.center.x)).collect();
    assert_eq!(
        centers,
        vec![
            ("rod_broken".to_string(), 100),
            ("rod_broken".to_string(), 190),
            ("rod_with_bait".to_string(), 110),
        ]
    );
}

#[test]
fn test_cap_per_template_keeps_order() {
    let capped = cap_per_template(
        vec![
            det("rod_broken", 100, 100, 0.9),
            det("rod_with_bait", 300, 100, 0.9),
            det("rod_broken", 200, 100, 0.8),
            det("rod_broken", 400, 100, 0.7),
        ],
        2,
    );
    let centers: Vec<i32> = capped.iter().map(|d| d.center.x).collect();
    assert_eq!(centers, vec![100, 300, 200]);
}

#[test]
fn test_quality_prefers_center() {
    let size = (1000, 600);
    let centered = quality_score(0.9, Point::new(500, 300), size, 0.1);
    let corner = quality_score(0.9, Point::new(0, 0), size, 0.1);
    assert!((centered - 0.9).abs() < 1e-6);
    assert!((corner - 0.81).abs() < 1e-4);
    assert!(quality_score(0.9, Point::new(400, 300), size, 0.0) == 0.9);
}

// ============================================================
// SLOT ASSIGNMENT
// ============================================================

#[test]
fn test_slot_map_is_total() {
    let assigner = SlotAssigner::new(test_layout());
    let cases = vec![
        vec![],
        vec![det("rod_broken", 52, 98, 0.9)],
        vec![det("rod_with_bait", 900, 900, 0.9)],
        vec![det("chest_open", 150, 100, 0.9), det("rod_without_bait", 550, 110, 0.8)],
    ];
    for detections in cases {
        let statuses = assigner.assign(&detections);
        let ids: Vec<u8> = statuses.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, (1..=SLOT_COUNT as u8).collect::<Vec<_>>());
    }
}

#[test]
fn test_broken_wins_slot_three() {
    let assigner = SlotAssigner::new(test_layout());
    // Both near slot 3 at (250, 100); order must not matter
    let with_bait = det("rod_with_bait", 240, 95, 0.95);
    let broken = det("rod_broken", 262, 104, 0.80);

    let a = assigner.assign(&[with_bait.clone(), broken.clone()]);
    let b = assigner.assign(&[broken, with_bait]);
    assert_eq!(a.get(3), Some(RodStatus::Broken));
    assert_eq!(b.get(3), Some(RodStatus::Broken));
    assert_eq!(a.count(RodStatus::Empty), 5);
}

#[test]
fn test_equal_priority_keeps_first() {
    let assigner = SlotAssigner::new(test_layout());
    let statuses = assigner.assign(&[
        det("rod_without_bait", 150, 100, 0.9),
        det("Rod_Without_Bait", 155, 100, 0.8),
        det("rod_with_bait", 450, 90, 0.8),
    ]);
    assert_eq!(statuses.get(2), Some(RodStatus::WithoutBait));
    assert_eq!(statuses.get(5), Some(RodStatus::WithBait));
    assert_eq!(statuses.get(0), None);
    assert_eq!(statuses.get(7), None);
}

#[test]
fn test_nearest_slot_cutoff() {
    let assigner = SlotAssigner::new(test_layout());
    assert_eq!(assigner.nearest_slot(Point::new(140, 100)).map(|s| s.0), Some(2));
    assert_eq!(assigner.nearest_slot(Point::new(150, 200)).map(|s| s.0), Some(2));
    assert_eq!(assigner.nearest_slot(Point::new(150, 201)), None);
}

// ============================================================
// END-TO-END DETECTOR
// ============================================================

fn detector_store() -> Arc<TemplateStore> {
    let mut store = TemplateStore::new(0.7);
    store.insert(Template::new("rod_with_bait", noise_patch(1, 14, 14), 0.95));
    store.insert(Template::new("rod_broken", noise_patch(2, 14, 14), 0.95));
    store.insert(Template::new("rod_without_bait", noise_patch(3, 14, 14), 0.95));
    Arc::new(store)
}

#[test]
fn test_detector_end_to_end() {
    let store = detector_store();
    let layout = test_layout();
    let mut frame = GrayImage::new(600, 200);
    place(&mut frame, &store.get("rod_with_bait").unwrap().image, Point::new(50, 100));
    place(&mut frame, &store.get("rod_broken").unwrap().image, Point::new(250, 100));
    place(&mut frame, &store.get("rod_without_bait").unwrap().image, Point::new(452, 97));

    let detector = MultiDetector::new(store, MatchConfig::default(), layout);
    assert_eq!(detector.watch_list().len(), 3);

    let pass = detector.detect(&frame);
    assert!(pass.raw_count >= 3);
    assert_eq!(pass.detections.len(), 3);
    assert_eq!(pass.slots.get(1), Some(RodStatus::WithBait));
    assert_eq!(pass.slots.get(2), Some(RodStatus::Empty));
    assert_eq!(pass.slots.get(3), Some(RodStatus::Broken));
    assert_eq!(pass.slots.get(4), Some(RodStatus::Empty));
    assert_eq!(pass.slots.get(5), Some(RodStatus::WithoutBait));
    assert_eq!(pass.slots.get(6), Some(RodStatus::Empty));
}

#[test]
fn test_detector_capture_failure() {
    let detector = MultiDetector::new(detector_store(), MatchConfig::default(), test_layout());
    let source = StaticFrame::new(RgbImage::new(600, 200));
    source.set_unavailable();

    let result = detector.capture_and_detect(&source);
    assert!(matches!(result, Err(DetectionError::CaptureUnavailable { .. })));
}

#[test]
fn test_detector_skips_missing_watched_template() {
    let config = MatchConfig {
        watch_list: vec!["rod_broken".to_string(), "rod_broken_gold".to_string()],
        ..MatchConfig::default()
    };
    let store = detector_store();
    let mut frame = GrayImage::new(600, 200);
    place(&mut frame, &store.get("rod_broken").unwrap().image, Point::new(350, 100));

    let detector = MultiDetector::new(store, config, test_layout());
    assert_eq!(detector.watch_list().len(), 2);
    let pass = detector.detect(&frame);
    assert_eq!(pass.slots.get(4), Some(RodStatus::Broken));
    assert_eq!(pass.slots.count(RodStatus::Empty), 5);
}

#[test]
fn test_detector_blank_frame_is_all_empty() {
    let detector = MultiDetector::new(detector_store(), MatchConfig::default(), test_layout());
    let pass = detector.detect(&GrayImage::new(600, 200));
    assert_eq!(pass.raw_count, 0);
    assert_eq!(pass.slots.count(RodStatus::Empty), SLOT_COUNT);
}

// ============================================================
// TEXTURED BACKGROUNDS
// ============================================================

fn textured_store() -> Arc<TemplateStore> {
    let mut store = TemplateStore::new(0.7);
    store.insert(Template::new("rod_with_bait", noise_patch(1, 30, 30), 0.9));
    store.insert(Template::new("rod_broken", noise_patch(2, 30, 30), 0.9));
    store.insert(Template::new("rod_without_bait", noise_patch(3, 30, 30), 0.9));
    Arc::new(store)
}

#[test]
fn test_textured_background_without_rods_is_all_empty() {
    let detector = MultiDetector::new(textured_store(), MatchConfig::default(), test_layout());
    let pass = detector.detect(&textured(600, 200));
    assert_eq!(pass.raw_count, 0);
    assert!(pass.detections.is_empty());
    assert_eq!(pass.slots.count(RodStatus::Empty), SLOT_COUNT);
}

#[test]
fn test_textured_background_six_rods() {
    let store = textured_store();
    let layout = test_layout();
    let names = [
        "rod_with_bait",
        "rod_broken",
        "rod_without_bait",
        "rod_with_bait",
        "rod_broken",
        "rod_without_bait",
    ];
    let mut frame = textured(600, 200);
    for (name, center) in names.iter().zip(layout.positions.iter()) {
        place(&mut frame, &store.get(name).unwrap().image, *center);
    }

    let detector = MultiDetector::new(store, MatchConfig::default(), layout);
    let pass = detector.detect(&frame);
    assert_eq!(pass.detections.len(), 6);
    assert!(pass.detections.iter().all(|d| d.score > 0.99));

    let expected = [
        RodStatus::WithBait,
        RodStatus::Broken,
        RodStatus::WithoutBait,
        RodStatus::WithBait,
        RodStatus::Broken,
        RodStatus::WithoutBait,
    ];
    for (i, status) in expected.into_iter().enumerate() {
        assert_eq!(pass.slots.get(i as u8 + 1), Some(status), "slot {}", i + 1);
    }
}

#[test]
fn test_cap_applies_after_local_nms() {
    let mut store = TemplateStore::new(0.7);
    store.insert(Template::new("rod_with_bait", blob(0), 0.8));
    let mut frame = textured(600, 200);
    place(&mut frame, &blob(0), Point::new(150, 100));
    place(&mut frame, &blob(10), Point::new(450, 100));

    let config = MatchConfig {
        max_per_template: 3,
        ..MatchConfig::default()
    };
    let detector = MultiDetector::new(Arc::new(store), config, test_layout());

    // The strong copy's neighbourhood alone outscores the weak copy more than `max_per_template` times
    let mut raw = detector.detect_raw(&frame);
    raw.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
    assert!(raw.len() > 6);
    assert!(raw[..3].iter().all(|d| d.center.x < 300));

    let pass = detector.detect(&frame);
    assert_eq!(pass.local_count, 2);
    assert_eq!(pass.slots.get(2), Some(RodStatus::WithBait));
    assert_eq!(pass.slots.get(5), Some(RodStatus::WithBait));
    assert_eq!(pass.slots.count(RodStatus::Empty), 4);
}

#[test]
fn test_rod_panel_preset_limits_search() {
    let store = textured_store();
    let mut frame = textured(600, 200);
    place(&mut frame, &store.get("rod_broken").unwrap().image, Point::new(250, 100));
    // Close enough to slot 5 to claim it, but above the panel
    place(&mut frame, &store.get("rod_with_bait").unwrap().image, Point::new(450, 20));

    let config = create_rod_panel_config(SearchRegion::new(0, 60, 600, 100, "rod_panel"));
    assert_eq!(config.max_per_template, 2 * SLOT_COUNT);
    let detector = MultiDetector::new(store, config, test_layout());
    let pass = detector.detect(&frame);

    assert_eq!(pass.detections.len(), 1);
    assert_eq!(pass.detections[0].center, Point::new(250, 100));
    assert_eq!(pass.slots.get(3), Some(RodStatus::Broken));
    assert_eq!(pass.slots.get(5), Some(RodStatus::Empty));
}

// ============================================================
// ROD KINDS
// ============================================================

#[test]
fn test_rod_kinds_map_classifies_other_names() {
    let mut store = TemplateStore::new(0.7);
    store.insert(Template::new("bobber_red", noise_patch(4, 30, 30), 0.9));
    store.insert(Template::new("rod_with_bait", noise_patch(1, 30, 30), 0.9));
    let mut frame = textured(600, 200);
    place(&mut frame, &store.get("bobber_red").unwrap().image, Point::new(250, 100));
    place(&mut frame, &store.get("rod_with_bait").unwrap().image, Point::new(50, 100));

    let config = MatchConfig {
        rod_kinds: HashMap::from([("bobber_red".to_string(), RodStatus::Broken)]),
        ..MatchConfig::default()
    };
    let detector = MultiDetector::new(Arc::new(store), config, test_layout());
    assert_eq!(
        detector.watch_list().to_vec(),
        vec!["bobber_red".to_string(), "rod_with_bait".to_string()]
    );
    assert_eq!(detector.kind_of("bobber_red"), Some(RodStatus::Broken));

    let pass = detector.detect(&frame);
    assert!(pass.detections.iter().all(|d| d.group == TemplateGroup::Rod));
    assert_eq!(pass.slots.get(1), Some(RodStatus::WithBait));
    assert_eq!(pass.slots.get(3), Some(RodStatus::Broken));
}

#[test]
fn test_watch_entry_without_kind_is_dropped() {
    let config = MatchConfig {
        watch_list: vec!["rod_broken".to_string(), "bobber_red".to_string()],
        ..MatchConfig::default()
    };
    let detector = MultiDetector::new(detector_store(), config, test_layout());
    assert_eq!(detector.watch_list().to_vec(), vec!["rod_broken".to_string()]);
    assert_eq!(detector.kind_of("bobber_red"), None);

    // An explicit kind overrides the name family, and `empty` cannot claim a slot
    let config = MatchConfig {
        watch_list: vec!["rod_broken".to_string(), "rod_with_bait".to_string()],
        rod_kinds: HashMap::from([
            ("rod_broken".to_string(), RodStatus::WithoutBait),
            ("rod_with_bait".to_string(), RodStatus::Empty),
        ]),
        ..MatchConfig::default()
    };
    let detector = MultiDetector::new(detector_store(), config, test_layout());
    assert_eq!(detector.watch_list().to_vec(), vec!["rod_broken".to_string()]);
    assert_eq!(detector.kind_of("rod_broken"), Some(RodStatus::WithoutBait));
}
