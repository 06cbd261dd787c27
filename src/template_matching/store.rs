//! Template loading and lookup

use super::types::{RodStatus, Template, TemplateGroup};
use crate::capture::SearchRegion;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Threshold applied to templates without a configured one.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.7;

#[derive(Debug, Error)]
pub enum TemplateLoadError {
    #[error("Template directory not found: {path:?}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Failed to read template directory {path:?}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No usable template images found in {path:?}")]
    NoTemplates { path: PathBuf },
}

/// Name-keyed template cache. Read-only once loaded, share it behind an `Arc`.
#[derive(Debug)]
pub struct TemplateStore {
    templates: HashMap<String, Template>,
    default_threshold: f32,
}

impl TemplateStore {
    pub fn new(default_threshold: f32) -> Self {
        Self {
            templates: HashMap::new(),
            default_threshold,
        }
    }

    /// Scan `directory` for PNG/JPEG files and load each one as a template.
    ///
    /// Unreadable images are skipped with a warning; the load only fails when the
    /// directory itself is unusable or nothing could be loaded.
    pub fn load_from_directory(
        directory: impl AsRef<Path>,
        thresholds: &HashMap<String, f32>,
        default_threshold: f32,
    ) -> Result<Self, TemplateLoadError> {
        let dir_path = directory.as_ref();
        if !dir_path.is_dir() {
            return Err(TemplateLoadError::DirectoryNotFound {
                path: dir_path.to_path_buf(),
            });
        }

        let entries = std::fs::read_dir(dir_path).map_err(|source| TemplateLoadError::ReadDir {
            path: dir_path.to_path_buf(),
            source,
        })?;

        let mut store = Self::new(default_threshold);
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() || !is_image_file(&path) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let name = SearchRegion::strip_from_filename(stem).to_string();
            let search_region = SearchRegion::parse_from_filename(stem);

            match image::open(&path) {
                Ok(img) => {
                    let gray = img.to_luma8();
                    if gray.width() == 0 || gray.height() == 0 {
                        log::warn!("⚠️ Empty template skipped: {}", path.display());
                        continue;
                    }
                    let threshold = thresholds.get(&name).copied().unwrap_or(default_threshold);
                    let template =
                        Template::new(name, gray, threshold).with_search_region(search_region);
                    log::debug!(
                        "📥 Template '{}' {}x{} threshold={:.2} group={:?}",
                        template.name,
                        template.width(),
                        template.height(),
                        template.threshold,
                        template.group
                    );
                    store.insert(template);
                }
                Err(e) => {
                    log::warn!("⚠️ Failed to load template {}: {}", path.display(), e);
                }
            }
        }

        if store.is_empty() {
            return Err(TemplateLoadError::NoTemplates {
                path: dir_path.to_path_buf(),
            });
        }

        log::info!(
            "✅ Loaded {} templates from {} ({} rod templates)",
            store.len(),
            dir_path.display(),
            store.watch_list().len()
        );
        Ok(store)
    }

    /// Add or replace a template. Later inserts win on name collisions.
    pub fn insert(&mut self, template: Template) {
        if let Some(previous) = self.templates.insert(template.name.clone(), template) {
            log::debug!("♻️ Template '{}' replaced", previous.name);
        }
    }

    /// Lookup by exact (case-sensitive) name
    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Sorted template names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.templates.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn threshold_for(&self, name: &str) -> f32 {
        self.get(name)
            .map(|t| t.threshold)
            .unwrap_or(self.default_threshold)
    }

    pub fn default_threshold(&self) -> f32 {
        self.default_threshold
    }

    /// All rod-family templates, sorted by name for stable processing order.
    pub fn watch_list(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .templates
            .values()
            .filter(|t| t.group == TemplateGroup::Rod)
            .map(|t| t.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Rod templates of one kind (e.g. every "broken" variant)
    pub fn templates_of_kind(&self, kind: RodStatus) -> Vec<&Template> {
        let mut found: Vec<&Template> = self
            .templates
            .values()
            .filter(|t| t.kind == Some(kind))
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
        .unwrap_or(false)
}
