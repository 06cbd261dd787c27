// Interface probes: which game windows are visible in a frame
use crate::template_matching::TemplateMatcher;
use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Template names for the interface elements the loop watches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceTemplates {
    pub inventory: Option<String>,
    pub chest: Option<String>,
    pub catch: Option<String>,
}

impl Default for InterfaceTemplates {
    fn default() -> Self {
        Self {
            inventory: Some("inventory_open".to_string()),
            chest: Some("chest_open".to_string()),
            catch: Some("catch_banner".to_string()),
        }
    }
}

/// What the probes saw in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct InterfaceSnapshot {
    pub inventory_open: bool,
    pub chest_open: bool,
    pub catch_visible: bool,
}

pub struct StateProbe {
    templates: InterfaceTemplates,
}

impl StateProbe {
    pub fn new(templates: InterfaceTemplates) -> Self {
        Self { templates }
    }

    pub fn templates(&self) -> &InterfaceTemplates {
        &self.templates
    }

    /// Check every configured interface template once.
    ///
    /// Unconfigured or missing templates read as "not visible".
    pub fn scan(&self, matcher: &TemplateMatcher, frame: &GrayImage) -> InterfaceSnapshot {
        let visible = |name: &Option<String>| {
            name.as_deref()
                .map(|n| matcher.check(frame, n).found)
                .unwrap_or(false)
        };
        let snapshot = InterfaceSnapshot {
            inventory_open: visible(&self.templates.inventory),
            chest_open: visible(&self.templates.chest),
            catch_visible: visible(&self.templates.catch),
        };
        log::trace!("👀 Interface probe: {:?}", snapshot);
        snapshot
    }
}

/// Rising-edge detector so one catch banner counts once.
#[derive(Debug, Default)]
pub struct EdgeTrigger {
    last: bool,
}

impl EdgeTrigger {
    /// True only when `visible` goes from false to true.
    pub fn update(&mut self, visible: bool) -> bool {
        let rising = visible && !self.last;
        self.last = visible;
        rising
    }
}
