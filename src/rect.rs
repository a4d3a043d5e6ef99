use serde::{Deserialize, Serialize};

/// Stable identity of a rectangle, assigned once by the store and never
/// reused for the lifetime of a diagram.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct RectId(pub u64);

impl std::fmt::Display for RectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which axis Mixed-Flow fills first when packing children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FillStrategy {
    #[default]
    FillColumnsFirst,
    FillRowsFirst,
}

/// Per-rectangle overrides consulted by the layout engine when arranging
/// this rectangle's direct children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutPreferences {
    pub fill_strategy: FillStrategy,
    pub max_rows: Option<u32>,
    pub max_columns: Option<u32>,
}

/// Derived classification by hierarchy position. Never stored; recomputed
/// from `parent` and the child set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RectKind {
    Root,
    Parent,
    Leaf,
    TextLabel,
}

/// The sole entity of the diagram: one box in the containment tree.
///
/// Coordinates are absolute canvas positions in grid units. The layout
/// engine keeps them snapped to `grid_size` multiples; `w` and `h` are
/// always positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rectangle {
    pub id: RectId,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    /// `None` marks a root.
    pub parent: Option<RectId>,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub color: Option<String>,
    /// Text-label leaves can never acquire children.
    #[serde(default)]
    pub is_text_label: bool,
    /// When set, this rectangle's children are exempt from automatic layout.
    #[serde(default)]
    pub is_manual_positioning_enabled: bool,
    /// Dimension-frozen against global size-policy changes. The store keeps
    /// the flag materialized on every descendant (cascade-on-toggle).
    #[serde(default)]
    pub is_locked_as_is: bool,
    #[serde(default)]
    pub layout_preferences: Option<LayoutPreferences>,
    /// External-data overlay in `[0, 1]`; never read by geometry.
    #[serde(default)]
    pub heatmap_value: Option<f32>,
}

impl Rectangle {
    pub fn new(id: RectId, parent: Option<RectId>, w: f32, h: f32) -> Self {
        Self {
            id,
            x: 0.0,
            y: 0.0,
            w,
            h,
            parent,
            label: String::new(),
            color: None,
            is_text_label: false,
            is_manual_positioning_enabled: false,
            is_locked_as_is: false,
            layout_preferences: None,
            heatmap_value: None,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn contains_point(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    /// True when `other` lies fully inside this rectangle.
    pub fn contains_box(&self, other: &Rectangle) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn intersects(&self, other: &Rectangle) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}
