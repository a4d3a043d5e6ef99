//! Grid strategy: row-major placement in uniform cells.
//!
//! The cell stride comes from the largest child extent, snapped to the
//! grid step. The column count is derived from the parent's current width
//! and the parent is then refit to exactly
//! `cols*(cell_w+margin)+margin` by `rows*(cell_h+margin)+label_margin+margin`.

use super::{ChildBox, Frame, LayoutPass, Placement, snap_up};
use crate::rect::Rectangle;

pub(super) fn arrange_grid(frame: &Frame, parent: &Rectangle, children: &[ChildBox]) -> LayoutPass {
    let n = children.len();
    let cell_w = snap_up(
        children.iter().map(|c| c.w).fold(0.0, f32::max),
        frame.grid,
    );
    let cell_h = snap_up(
        children.iter().map(|c| c.h).fold(0.0, f32::max),
        frame.grid,
    );
    let stride_x = cell_w + frame.margin;
    let stride_y = cell_h + frame.margin;

    let mut cols = if stride_x > 0.0 {
        ((parent.w - frame.margin) / stride_x).floor() as usize
    } else {
        n
    };
    cols = cols.clamp(1, n);
    if let Some(max_cols) = parent.layout_preferences.and_then(|p| p.max_columns) {
        cols = cols.min((max_cols as usize).max(1));
    }
    let rows = n.div_ceil(cols);

    let placements = children
        .iter()
        .enumerate()
        .map(|(i, child)| {
            let col = (i % cols) as f32;
            let row = (i / cols) as f32;
            Placement {
                id: child.id,
                x: frame.x + frame.margin + col * stride_x,
                y: frame.y + frame.label_margin + frame.margin + row * stride_y,
                w: child.w,
                h: child.h,
            }
        })
        .collect();

    LayoutPass {
        placements,
        fitted_w: cols as f32 * stride_x + frame.margin,
        fitted_h: rows as f32 * stride_y + frame.label_margin + frame.margin,
    }
}
