use serde::{Deserialize, Serialize};

use crate::rect::RectKind;

/// Child-arrangement strategy selected per diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayoutAlgorithm {
    #[default]
    Grid,
    Flow,
    MixedFlow,
}

/// Default and minimum extents per rectangle kind, in grid units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SizeDefaults {
    pub root_w: f32,
    pub root_h: f32,
    pub leaf_w: f32,
    pub leaf_h: f32,
    pub text_label_w: f32,
    pub text_label_h: f32,
    /// Hard floor below which no resize or geometry edit can go.
    pub min_w: f32,
    pub min_h: f32,
}

impl Default for SizeDefaults {
    fn default() -> Self {
        Self {
            root_w: 160.0,
            root_h: 120.0,
            leaf_w: 60.0,
            leaf_h: 40.0,
            text_label_w: 80.0,
            text_label_h: 20.0,
            min_w: 20.0,
            min_h: 20.0,
        }
    }
}

impl SizeDefaults {
    pub fn for_kind(&self, kind: RectKind) -> (f32, f32) {
        match kind {
            RectKind::Root => (self.root_w, self.root_h),
            RectKind::TextLabel => (self.text_label_w, self.text_label_h),
            RectKind::Parent | RectKind::Leaf => (self.leaf_w, self.leaf_h),
        }
    }
}

/// The full configuration surface of the core. Passed in as a value at
/// construction; the core never reads global state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Grid step all layout-emitted coordinates are snapped to.
    pub grid_size: f32,
    /// Gap between siblings and between a child and its parent's border.
    pub margin: f32,
    /// Extra top inset reserving room for the parent's own label.
    pub label_margin: f32,
    pub algorithm: LayoutAlgorithm,
    pub sizes: SizeDefaults,
    /// Maximum number of history snapshots kept.
    pub history_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid_size: 10.0,
            margin: 10.0,
            label_margin: 20.0,
            algorithm: LayoutAlgorithm::Grid,
            sizes: SizeDefaults::default(),
            history_limit: 50,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration value the embedding shell hands over as JSON.
    /// Missing keys fall back to defaults.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }
}
