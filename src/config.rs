// Bot configuration, stored as JSON
use crate::capture::SearchRegion;
use crate::game_automation::match_image::{MatchConfig, SlotLayout};
use crate::game_automation::probe::InterfaceTemplates;
use crate::template_matching::DEFAULT_CONFIDENCE_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Directory scanned for template images
    pub templates_dir: PathBuf,
    /// Threshold for templates without an entry in `thresholds`
    pub default_threshold: f32,
    /// Per-template confidence thresholds, keyed by template name
    pub thresholds: HashMap<String, f32>,
    /// Capture only this part of the screen; slot positions are then relative to it
    pub capture_region: Option<SearchRegion>,
    pub slots: SlotLayout,
    pub matching: MatchConfig,
    pub interface: InterfaceTemplates,
    /// Detection passes per second
    pub target_hz: f32,
    /// Key name -> hotkey action name
    pub hotkeys: HashMap<String, String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            templates_dir: PathBuf::from("templates"),
            default_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            thresholds: HashMap::new(),
            capture_region: None,
            slots: SlotLayout::default(),
            matching: MatchConfig::default(),
            interface: InterfaceTemplates::default(),
            target_hz: 10.0,
            hotkeys: HashMap::from([
                ("F6".to_string(), "toggle_bot".to_string()),
                ("F7".to_string(), "pause".to_string()),
                ("F8".to_string(), "run_once".to_string()),
                ("F12".to_string(), "shutdown".to_string()),
            ]),
        }
    }
}

impl BotConfig {
    /// Read and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: BotConfig = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        log::info!("⚙️ Loaded config from {}", path.display());
        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file gives the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("⚙️ No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, text).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let in_unit = |v: f32| (0.0..=1.0).contains(&v);

        if !in_unit(self.default_threshold) {
            return Err(ConfigError::Invalid(format!(
                "default_threshold {} must be within 0..=1",
                self.default_threshold
            )));
        }
        if let Some((name, t)) = self.thresholds.iter().find(|(_, t)| !in_unit(**t)) {
            return Err(ConfigError::Invalid(format!(
                "threshold for '{}' ({}) must be within 0..=1",
                name, t
            )));
        }
        if !(self.target_hz.is_finite() && self.target_hz > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "target_hz {} must be positive",
                self.target_hz
            )));
        }
        if self.slots.max_distance <= 0.0 {
            return Err(ConfigError::Invalid("slots.max_distance must be positive".to_string()));
        }

        if self.matching.max_per_template == 0 {
            return Err(ConfigError::Invalid(
                "matching.max_per_template must be at least 1".to_string(),
            ));
        }
        let nms = &self.matching.nms;
        if nms.local_radius <= 0.0 || nms.same_template_radius <= 0.0 || nms.cross_template_radius <= 0.0 {
            return Err(ConfigError::Invalid("NMS radii must be positive".to_string()));
        }
        if !in_unit(nms.quality_gap) || !in_unit(nms.center_weight) {
            return Err(ConfigError::Invalid(
                "quality_gap and center_weight must be within 0..=1".to_string(),
            ));
        }
        if let Some(region) = &self.capture_region {
            if !region.is_valid() {
                return Err(ConfigError::Invalid(format!("capture_region {} is empty", region)));
            }
        }
        Ok(())
    }
}
