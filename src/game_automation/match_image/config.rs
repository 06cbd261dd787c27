//! Configuration for rod detection passes

use crate::capture::SearchRegion;
use crate::template_matching::RodStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Distances and weights used by the two suppression stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NmsConfig {
    /// Per-template NMS: keep a hit only if farther than this from every kept hit
    pub local_radius: f32,
    /// Cross-template NMS: same template closer than this is a duplicate
    pub same_template_radius: f32,
    /// Cross-template NMS: detections closer than this may be the same object
    pub cross_template_radius: f32,
    /// Quality difference that counts as a clear winner
    pub quality_gap: f32,
    /// How much a hit at the frame corner loses against one at the center (0..1)
    pub center_weight: f32,
}

impl Default for NmsConfig {
    fn default() -> Self {
        Self {
            local_radius: 80.0,
            same_template_radius: 15.0,
            cross_template_radius: 80.0,
            quality_gap: 0.15,
            center_weight: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Upper bound on detections kept per template after per-template NMS
    pub max_per_template: usize,
    /// Restrict rod matching to this screen area (template regions are then
    /// relative to it)
    pub rod_region: Option<SearchRegion>,
    /// Explicit rod watch-list; empty means every rod-family template
    pub watch_list: Vec<String>,
    /// Rod kind per template name, for names outside the `rod_*` families.
    /// Takes precedence over the kind implied by the name.
    pub rod_kinds: HashMap<String, RodStatus>,
    pub nms: NmsConfig,
    /// Debug mode flag
    pub debug_enabled: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_per_template: 50,
            rod_region: None,
            watch_list: Vec::new(),
            rod_kinds: HashMap::new(),
            nms: NmsConfig::default(),
            debug_enabled: false,
        }
    }
}

/// Preset for slow machines: search limited to the rod panel, at most two
/// detections per template per slot
pub fn create_rod_panel_config(rod_region: SearchRegion) -> MatchConfig {
    MatchConfig {
        max_per_template: 2 * super::slots::SLOT_COUNT,
        rod_region: Some(rod_region),
        ..MatchConfig::default()
    }
}
