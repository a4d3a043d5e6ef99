//! Flow strategy: a single strip whose orientation alternates with depth.
//!
//! Even-depth parents lay their children out left-to-right, odd-depth
//! parents top-to-bottom, which produces the alternating branching shape
//! of an org chart as the tree deepens. Children keep their own extents.

use super::{ChildBox, Frame, LayoutPass, Placement, snap_up};

pub(super) fn arrange_flow(frame: &Frame, depth: usize, children: &[ChildBox]) -> LayoutPass {
    let horizontal = depth.is_multiple_of(2);
    let mut placements = Vec::with_capacity(children.len());
    let mut cursor = frame.margin;
    let mut max_cross = 0.0f32;

    for child in children {
        if horizontal {
            placements.push(Placement {
                id: child.id,
                x: frame.x + cursor,
                y: frame.y + frame.label_margin + frame.margin,
                w: child.w,
                h: child.h,
            });
            cursor += snap_up(child.w, frame.grid) + frame.margin;
            max_cross = max_cross.max(snap_up(child.h, frame.grid));
        } else {
            placements.push(Placement {
                id: child.id,
                x: frame.x + frame.margin,
                y: frame.y + frame.label_margin + cursor,
                w: child.w,
                h: child.h,
            });
            cursor += snap_up(child.h, frame.grid) + frame.margin;
            max_cross = max_cross.max(snap_up(child.w, frame.grid));
        }
    }

    let (fitted_w, fitted_h) = if horizontal {
        (cursor, frame.label_margin + frame.margin + max_cross + frame.margin)
    } else {
        (frame.margin + max_cross + frame.margin, frame.label_margin + cursor)
    };
    LayoutPass {
        placements,
        fitted_w,
        fitted_h,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::rect::{RectId, Rectangle};

    fn children(sizes: &[(f32, f32)]) -> Vec<ChildBox> {
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
    fn even_depth_flows_in_a_row() {
        let parent = Rectangle::new(RectId(0), None, 100.0, 100.0);
        let frame = Frame::of(&parent, &EngineConfig::default());
        let pass = arrange_flow(&frame, 0, &children(&[(60.0, 40.0), (60.0, 30.0)]));
        assert_eq!(pass.placements[0].y, pass.placements[1].y);
        assert_eq!(pass.placements[1].x, pass.placements[0].x + 70.0);
        assert_eq!(pass.fitted_w, 10.0 + 70.0 + 70.0);
        assert_eq!(pass.fitted_h, 20.0 + 10.0 + 40.0 + 10.0);
    }

    #[test]
    fn odd_depth_flows_in_a_column() {
        let parent = Rectangle::new(RectId(0), None, 100.0, 100.0);
        let frame = Frame::of(&parent, &EngineConfig::default());
        let pass = arrange_flow(&frame, 1, &children(&[(60.0, 40.0), (50.0, 40.0)]));
        assert_eq!(pass.placements[0].x, pass.placements[1].x);
        assert_eq!(pass.placements[1].y, pass.placements[0].y + 50.0);
        assert_eq!(pass.fitted_w, 10.0 + 60.0 + 10.0);
        assert_eq!(pass.fitted_h, 20.0 + 10.0 + 50.0 + 50.0);
    }

    #[test]
    fn orientation_depends_only_on_depth_parity() {
        let parent = Rectangle::new(RectId(0), None, 100.0, 100.0);
        let frame = Frame::of(&parent, &EngineConfig::default());
        let kids = children(&[(60.0, 40.0), (60.0, 40.0)]);
        let row = arrange_flow(&frame, 2, &kids);
        let col = arrange_flow(&frame, 3, &kids);
        assert_eq!(row.placements[0].y, row.placements[1].y);
        assert_eq!(col.placements[0].x, col.placements[1].x);
    }
}
