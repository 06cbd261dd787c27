//! Rod detection for the fishing automation
//!
//! A detection pass runs every watched rod template over a frame, thins the
//! hits per template, resolves conflicts across templates and finally maps the
//! survivors onto the six fixed rod slots.

pub mod config;
pub mod detector;
pub mod nms;
pub mod slots;

#[cfg(test)]
mod tests;

// Re-export main types and functions
pub use config::{MatchConfig, NmsConfig, create_rod_panel_config};
pub use detector::{Detection, DetectionPass, MultiDetector, cap_per_template, local_nms, quality_score};
pub use nms::cross_template_nms;
pub use slots::{SLOT_COUNT, SlotAssigner, SlotId, SlotLayout, SlotStatuses};
