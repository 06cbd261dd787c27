/// Template matching module for rod and interface detection in screenshots
///
/// This module provides:
/// - A read-only template store loaded once from a directory of images
/// - Normalized cross-correlation matching with per-template thresholds
/// - Full thresholded hit maps for multi-object detection
/// - A closed error enum separating "nothing found" from "something broken"
pub mod error;
pub mod matcher;
pub mod store;
pub mod types;

pub use error::{DetectionError, DetectionResult};
pub use matcher::TemplateMatcher;
pub use store::{DEFAULT_CONFIDENCE_THRESHOLD, TemplateLoadError, TemplateStore};
pub use types::{MatchHit, MatchOutcome, Point, RodStatus, Template, TemplateGroup};
