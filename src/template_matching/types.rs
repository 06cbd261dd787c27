/// Template matching data types
use crate::capture::SearchRegion;
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Screen coordinate in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Name families of rod templates, checked in order.
const ROD_FAMILIES: &[(&str, RodStatus)] = &[
    ("rod_broken", RodStatus::Broken),
    ("Rod_Broken", RodStatus::Broken),
    ("rod_without_bait", RodStatus::WithoutBait),
    ("Rod_Without_Bait", RodStatus::WithoutBait),
    ("rod_no_bait", RodStatus::WithoutBait),
    ("Rod_No_Bait", RodStatus::WithoutBait),
    ("rod_with_bait", RodStatus::WithBait),
    ("Rod_With_Bait", RodStatus::WithBait),
];

/// Observed state of one rod slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RodStatus {
    #[default]
    Empty,
    WithBait,
    WithoutBait,
    Broken,
}

impl RodStatus {
    /// Resolution priority when two detections compete for one slot.
    pub fn priority(self) -> u8 {
        match self {
            RodStatus::Broken => 3,
            RodStatus::WithBait => 2,
            RodStatus::WithoutBait => 1,
            RodStatus::Empty => 0,
        }
    }

    /// Rod kind implied by a template name family.
    ///
    /// Matching is case-sensitive. Template sets duplicate names in both
    /// spellings ("rod_broken", "Rod_Broken"), so each family lists the
    /// spellings it accepts; anything else needs an explicit kind mapping.
    pub fn from_template_name(name: &str) -> Option<Self> {
        ROD_FAMILIES
            .iter()
            .find(|(family, _)| name.contains(family))
            .map(|(_, kind)| *kind)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RodStatus::Empty => "empty",
            RodStatus::WithBait => "with_bait",
            RodStatus::WithoutBait => "without_bait",
            RodStatus::Broken => "broken",
        }
    }
}

impl fmt::Display for RodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic group used by cross-template suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateGroup {
    /// Any rod slot template (with/without bait, broken)
    Rod,
    /// Inventory, chest and catch banners
    Interface,
    Other,
}

impl TemplateGroup {
    pub fn from_template_name(name: &str) -> Self {
        if RodStatus::from_template_name(name).is_some() {
            return TemplateGroup::Rod;
        }
        let lower = name.to_lowercase();
        if ["inventory", "chest", "catch", "caught", "feed"]
            .iter()
            .any(|k| lower.contains(k))
        {
            TemplateGroup::Interface
        } else {
            TemplateGroup::Other
        }
    }
}

/// A reference image with its matching threshold. Immutable after load.
#[derive(Debug, Clone)]
pub struct Template {
    pub name: String,
    pub image: GrayImage,
    pub threshold: f32,
    pub kind: Option<RodStatus>,
    pub group: TemplateGroup,
    /// Restricts matching to this screen area when set (from `name-[x,y,w,h]`)
    pub search_region: Option<SearchRegion>,
}

impl Template {
    pub fn new(name: impl Into<String>, image: GrayImage, threshold: f32) -> Self {
        let name = name.into();
        Self {
            kind: RodStatus::from_template_name(&name),
            group: TemplateGroup::from_template_name(&name),
            name,
            image,
            threshold,
            search_region: None,
        }
    }

    pub fn with_search_region(mut self, region: Option<SearchRegion>) -> Self {
        self.search_region = region;
        self
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Center of the bounding box when the template's top-left sits at (x, y)
    pub fn center_at(&self, x: u32, y: u32) -> Point {
        Point::new(
            (x + self.width() / 2) as i32,
            (y + self.height() / 2) as i32,
        )
    }
}

/// A successful best-match lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchHit {
    pub template: String,
    pub score: f32,
    /// Top-left of the matched window in screen coordinates
    pub top_left: (u32, u32),
    /// Bounding-box center in screen coordinates
    pub position: Point,
}

/// Best-effort match result that never carries an error.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MatchOutcome {
    pub found: bool,
    pub score: f32,
    pub position: Option<Point>,
}

impl From<&MatchHit> for MatchOutcome {
    fn from(hit: &MatchHit) -> Self {
        Self {
            found: true,
            score: hit.score,
            position: Some(hit.position),
        }
    }
}
