//! Rectangular screen regions used for capture and localized matching

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub name: String,
}

impl SearchRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32, name: impl Into<String>) -> Self {
        Self {
            x,
            y,
            width,
            height,
            name: name.into(),
        }
    }

    /// Parse region from filename format: `template-[x,y,width,height].png`
    ///
    /// Returns `None` when the filename carries no (well-formed) region.
    pub fn parse_from_filename(filename: &str) -> Option<Self> {
        let region_str = Self::extract_region_string(filename)?;
        let parts: Vec<&str> = region_str.split(',').collect();
        if parts.len() != 4 {
            return None;
        }
        let (Ok(x), Ok(y), Ok(width), Ok(height)) = (
            parts[0].trim().parse::<u32>(),
            parts[1].trim().parse::<u32>(),
            parts[2].trim().parse::<u32>(),
            parts[3].trim().parse::<u32>(),
        ) else {
            return None;
        };
        Some(Self::new(
            x,
            y,
            width,
            height,
            format!("parsed_{}_{}_{}_{}", x, y, width, height),
        ))
    }

    /// Strip a trailing `-[x,y,w,h]` block from a file stem, leaving the template name.
    pub fn strip_from_filename(stem: &str) -> &str {
        match stem.find('[') {
            Some(start) if Self::parse_from_filename(stem).is_some() => {
                stem[..start].trim_end_matches(['-', '_', ' '])
            }
            _ => stem,
        }
    }

    /// Extract region string from filename (e.g., "300,1682,50,50")
    fn extract_region_string(filename: &str) -> Option<&str> {
        let start = filename.find('[')?;
        let end = filename.find(']')?;
        (end > start).then(|| &filename[start + 1..end])
    }

    /// Clip region to screen boundaries
    pub fn clip_to_screen(mut self, screen_width: u32, screen_height: u32) -> Self {
        self.x = self.x.min(screen_width.saturating_sub(1));
        self.y = self.y.min(screen_height.saturating_sub(1));
        self.width = self.width.min(screen_width.saturating_sub(self.x));
        self.height = self.height.min(screen_height.saturating_sub(self.y));
        self
    }

    /// Check if this region is valid (non-zero dimensions)
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

impl fmt::Display for SearchRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{},{},{}]", self.x, self.y, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_parse_from_filename() {
        let region = SearchRegion::parse_from_filename("inventory_open-[300,1682,50,50].png").unwrap();

        assert_eq!(region.x, 300);
        assert_eq!(region.y, 1682);
        assert_eq!(region.width, 50);
        assert_eq!(region.height, 50);
    }

    #[test]
    fn test_region_parse_without_block() {
        assert!(SearchRegion::parse_from_filename("rod_broken.png").is_none());
        assert!(SearchRegion::parse_from_filename("rod-[1,2,3].png").is_none());
    }

    #[test]
    fn test_strip_region_from_stem() {
        assert_eq!(SearchRegion::strip_from_filename("chest_open-[0,0,400,300]"), "chest_open");
        assert_eq!(SearchRegion::strip_from_filename("rod_with_bait"), "rod_with_bait");
        // Malformed blocks are part of the name
        assert_eq!(SearchRegion::strip_from_filename("odd[name]"), "odd[name]");
    }

    #[test]
    fn test_region_clips_to_screen_bounds() {
        let region = SearchRegion::new(1000, 2200, 200, 200, "edge").clip_to_screen(1080, 2280);

        assert_eq!(region.x, 1000);
        assert_eq!(region.width, 80);
        assert_eq!(region.y, 2200);
        assert_eq!(region.height, 80);
    }

    #[test]
    fn test_region_display() {
        let region = SearchRegion::new(10, 20, 100, 50, "r");
        assert_eq!(region.to_string(), "[10,20,100,50]");
        assert!(region.is_valid());
        assert!(!SearchRegion::new(10, 20, 0, 50, "flat").is_valid());
    }
}
