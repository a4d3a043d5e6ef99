//! Pure child-arrangement passes.
//!
//! `arrange` never mutates anything: it maps a parent plus the current
//! child geometry to new placements and the parent's exact-fit extent.
//! Callers apply the result as one atomic update and propagate size
//! changes bottom-up.
//!
//! Numeric policy: margins and cell extents are snapped *up* to the grid
//! step before placement, so every emitted coordinate lands on a grid
//! multiple and fitted boxes never shrink below their content.

mod flow;
mod grid;
mod mixed;

use crate::config::{EngineConfig, LayoutAlgorithm};
use crate::rect::{RectId, Rectangle};

/// One child's target geometry, absolute canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub id: RectId,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

/// Result of arranging one parent's children.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPass {
    pub placements: Vec<Placement>,
    /// Exact-fit extent for the parent itself.
    pub fitted_w: f32,
    pub fitted_h: f32,
}

/// Current geometry of a child as fed into a pass. Sizes are whatever the
/// previous bottom-up pass fitted for the child.
#[derive(Debug, Clone, Copy)]
pub struct ChildBox {
    pub id: RectId,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl ChildBox {
    pub fn of(rect: &Rectangle) -> Self {
        Self {
            id: rect.id,
            x: rect.x,
            y: rect.y,
            w: rect.w,
            h: rect.h,
        }
    }
}

/// Round `value` up to the next multiple of `grid`.
pub fn snap_up(value: f32, grid: f32) -> f32 {
    if grid <= 0.0 {
        return value.max(0.0);
    }
    (value.max(0.0) / grid).ceil() * grid
}

/// Snapped insets shared by every strategy: content starts `margin` in
/// from the left, `label_margin + margin` down from the top.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Frame {
    pub x: f32,
    pub y: f32,
    pub margin: f32,
    pub label_margin: f32,
    pub grid: f32,
}

impl Frame {
    pub(crate) fn of(parent: &Rectangle, config: &EngineConfig) -> Self {
        Self {
            x: parent.x,
            y: parent.y,
            margin: snap_up(config.margin, config.grid_size),
            label_margin: snap_up(config.label_margin, config.grid_size),
            grid: config.grid_size,
        }
    }
}

/// Arrange `children` inside `parent`.
///
/// `exempt` is true when the parent sits under a manual-positioning
/// ancestor; together with the parent's own manual flag it turns the pass
/// into a grow-only fit: children keep their explicit positions but still
/// count toward the parent's bounding box. `depth` is the parent's depth
/// in the tree and only steers the Flow orientation.
pub fn arrange(
    parent: &Rectangle,
    exempt: bool,
    depth: usize,
    children: &[ChildBox],
    config: &EngineConfig,
) -> LayoutPass {
    if children.is_empty() {
        return LayoutPass {
            placements: Vec::new(),
            fitted_w: parent.w,
            fitted_h: parent.h,
        };
    }
    let frame = Frame::of(parent, config);
    if parent.is_manual_positioning_enabled || exempt {
        return fit_around(parent, &frame, children);
    }
    match config.algorithm {
        LayoutAlgorithm::Grid => grid::arrange_grid(&frame, parent, children),
        LayoutAlgorithm::Flow => flow::arrange_flow(&frame, depth, children),
        LayoutAlgorithm::MixedFlow => {
            mixed::arrange_mixed(&frame, parent.layout_preferences, children)
        }
    }
}

/// Grow-only auto-fit for manually positioned subtrees: no placements,
/// the parent just expands to contain whatever is inside it.
fn fit_around(parent: &Rectangle, frame: &Frame, children: &[ChildBox]) -> LayoutPass {
    let mut need_w = 0.0f32;
    let mut need_h = 0.0f32;
    for child in children {
        need_w = need_w.max(child.x + child.w - frame.x + frame.margin);
        need_h = need_h.max(child.y + child.h - frame.y + frame.margin);
    }
    LayoutPass {
        placements: Vec::new(),
        fitted_w: parent.w.max(snap_up(need_w, frame.grid)),
        fitted_h: parent.h.max(snap_up(need_h, frame.grid)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rect::RectId;

    fn boxes(sizes: &[(f32, f32)]) -> Vec<ChildBox> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, &(w, h))| ChildBox {
                id: RectId(i as u64 + 1),
                x: 0.0,
                y: 0.0,
                w,
                h,
            })
            .collect()
    }

    #[test]
    fn snap_up_only_grows() {
        assert_eq!(snap_up(41.0, 10.0), 50.0);
        assert_eq!(snap_up(40.0, 10.0), 40.0);
        assert_eq!(snap_up(0.0, 10.0), 0.0);
        assert_eq!(snap_up(7.0, 0.0), 7.0);
    }

    #[test]
    fn empty_child_set_keeps_parent_extent() {
        let parent = Rectangle::new(RectId(1), None, 120.0, 90.0);
        let pass = arrange(&parent, false, 0, &[], &EngineConfig::default());
        assert!(pass.placements.is_empty());
        assert_eq!((pass.fitted_w, pass.fitted_h), (120.0, 90.0));
    }

    #[test]
    fn manual_parent_grows_but_never_repacks() {
        let mut parent = Rectangle::new(RectId(1), None, 100.0, 100.0);
        parent.is_manual_positioning_enabled = true;
        let mut children = boxes(&[(60.0, 40.0)]);
        children[0].x = 150.0;
        children[0].y = 20.0;
        let pass = arrange(&parent, false, 0, &children, &EngineConfig::default());
        assert!(pass.placements.is_empty());
        // Must cover the child at x=150..210 plus a margin.
        assert!(pass.fitted_w >= 220.0);
        assert!(pass.fitted_h >= 100.0);
        assert_eq!(pass.fitted_w % 10.0, 0.0);
    }

    #[test]
    fn every_strategy_emits_grid_aligned_contained_placements() {
        let parent = Rectangle::new(RectId(99), None, 200.0, 100.0);
        let children = boxes(&[(60.0, 40.0), (60.0, 40.0), (55.0, 35.0), (60.0, 40.0)]);
        for algorithm in [
            LayoutAlgorithm::Grid,
            LayoutAlgorithm::Flow,
            LayoutAlgorithm::MixedFlow,
        ] {
            let config = EngineConfig {
                algorithm,
                ..EngineConfig::default()
            };
            for depth in [0usize, 1] {
                let pass = arrange(&parent, false, depth, &children, &config);
                assert_eq!(pass.placements.len(), children.len());
                for p in &pass.placements {
                    assert_eq!((p.x - parent.x) % config.grid_size, 0.0, "{algorithm:?}");
                    assert_eq!((p.y - parent.y) % config.grid_size, 0.0, "{algorithm:?}");
                    assert!(p.x >= parent.x + config.margin);
                    assert!(p.y >= parent.y + config.label_margin);
                    assert!(p.x + p.w <= parent.x + pass.fitted_w - config.margin + 1e-3);
                    assert!(p.y + p.h <= parent.y + pass.fitted_h - config.margin + 1e-3);
                }
            }
        }
    }
}
