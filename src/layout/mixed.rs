//! Mixed-Flow strategy: bounded search over row/column arrangements.
//!
//! Every feasible column count (filling rows first) and row count
//! (filling columns first) is evaluated with per-column widths and
//! per-row heights taken from the actual children; the arrangement with
//! the least wasted bounding-box area wins. Ties go to the rectangle's
//! explicit fill strategy, then to the arrangement with fewer columns.

use super::{ChildBox, Frame, LayoutPass, Placement, snap_up};
use crate::rect::{FillStrategy, LayoutPreferences};

// Wasted-area differences below this are treated as a tie; snapped cell
// extents make genuinely distinct candidates differ by whole grid cells.
const AREA_EPS: f32 = 0.5;

#[derive(Debug, Clone)]
struct Arrangement {
    strategy: FillStrategy,
    cols: usize,
    rows: usize,
    col_widths: Vec<f32>,
    row_heights: Vec<f32>,
    w: f32,
    h: f32,
    waste: f32,
}

pub(super) fn arrange_mixed(
    frame: &Frame,
    prefs: Option<LayoutPreferences>,
    children: &[ChildBox],
) -> LayoutPass {
    let n = children.len();
    let preferred = prefs.map(|p| p.fill_strategy).unwrap_or_default();
    let max_rows = prefs
        .and_then(|p| p.max_rows)
        .map(|v| (v as usize).max(1))
        .unwrap_or(n);
    let max_cols = prefs
        .and_then(|p| p.max_columns)
        .map(|v| (v as usize).max(1))
        .unwrap_or(n);

    let mut best: Option<Arrangement> = None;
    for cols in 1..=n.min(max_cols) {
        let rows = n.div_ceil(cols);
        if rows > max_rows {
            continue;
        }
        consider(
            &mut best,
            evaluate(frame, FillStrategy::FillRowsFirst, rows, cols, children),
            preferred,
        );
    }
    for rows in 1..=n.min(max_rows) {
        let cols = n.div_ceil(rows);
        if cols > max_cols {
            continue;
        }
        consider(
            &mut best,
            evaluate(frame, FillStrategy::FillColumnsFirst, rows, cols, children),
            preferred,
        );
    }
    // Bounds that cannot hold every child are ignored rather than dropping
    // children from the packing.
    let best = best.unwrap_or_else(|| {
        evaluate(frame, FillStrategy::FillRowsFirst, 1, n, children)
    });

    emit(frame, &best, children)
}

fn consider(best: &mut Option<Arrangement>, candidate: Arrangement, preferred: FillStrategy) {
    let Some(current) = best.as_ref() else {
        *best = Some(candidate);
        return;
    };
    let replace = if candidate.waste < current.waste - AREA_EPS {
        true
    } else if candidate.waste > current.waste + AREA_EPS {
        false
    } else if (candidate.strategy == preferred) != (current.strategy == preferred) {
        candidate.strategy == preferred
    } else {
        candidate.cols < current.cols
    };
    if replace {
        *best = Some(candidate);
    }
}

fn cell_of(strategy: FillStrategy, index: usize, rows: usize, cols: usize) -> (usize, usize) {
    match strategy {
        FillStrategy::FillRowsFirst => (index / cols, index % cols),
        FillStrategy::FillColumnsFirst => (index % rows, index / rows),
    }
}

fn evaluate(
    frame: &Frame,
    strategy: FillStrategy,
    rows: usize,
    cols: usize,
    children: &[ChildBox],
) -> Arrangement {
    let mut col_widths = vec![0.0f32; cols];
    let mut row_heights = vec![0.0f32; rows];
    let mut content_area = 0.0f32;
    for (i, child) in children.iter().enumerate() {
        let (row, col) = cell_of(strategy, i, rows, cols);
        col_widths[col] = col_widths[col].max(snap_up(child.w, frame.grid));
        row_heights[row] = row_heights[row].max(snap_up(child.h, frame.grid));
        content_area += child.w * child.h;
    }
    let w = frame.margin + col_widths.iter().map(|cw| cw + frame.margin).sum::<f32>();
    let h = frame.label_margin
        + frame.margin
        + row_heights.iter().map(|rh| rh + frame.margin).sum::<f32>();
    Arrangement {
        strategy,
        cols,
        rows,
        col_widths,
        row_heights,
        w,
        h,
        waste: w * h - content_area,
    }
}

fn emit(frame: &Frame, arrangement: &Arrangement, children: &[ChildBox]) -> LayoutPass {
    let mut col_x = Vec::with_capacity(arrangement.cols);
    let mut cursor = frame.margin;
    for cw in &arrangement.col_widths {
        col_x.push(cursor);
        cursor += cw + frame.margin;
    }
    let mut row_y = Vec::with_capacity(arrangement.rows);
    let mut cursor = frame.label_margin + frame.margin;
    for rh in &arrangement.row_heights {
        row_y.push(cursor);
        cursor += rh + frame.margin;
    }
    let placements = children
        .iter()
        .enumerate()
        .map(|(i, child)| {
            let (row, col) = cell_of(arrangement.strategy, i, arrangement.rows, arrangement.cols);
            Placement {
                id: child.id,
                x: frame.x + col_x[col],
                y: frame.y + row_y[row],
                w: child.w,
                h: child.h,
            }
        })
        .collect();
    LayoutPass {
        placements,
        fitted_w: arrangement.w,
        fitted_h: arrangement.h,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::rect::{RectId, Rectangle};

    fn frame() -> Frame {
        let parent = Rectangle::new(RectId(0), None, 100.0, 100.0);
        Frame::of(&parent, &EngineConfig::default())
    }

    fn uniform(n: usize, w: f32, h: f32) -> Vec<ChildBox> {
        (0..n)
            .map(|i| ChildBox {
                id: RectId(i as u64 + 1),
                x: 0.0,
                y: 0.0,
                w,
                h,
            })
            .collect()
    }

    #[test]
    fn tall_children_pack_two_by_two() {
        // For 40x100 children a 2x2 block wastes less than one long strip:
        // 110*250 beats 60*470 (1 column) and 210*140 (1 row).
        let pass = arrange_mixed(&frame(), None, &uniform(4, 40.0, 100.0));
        assert_eq!(pass.fitted_w, 10.0 + 50.0 + 50.0);
        assert_eq!(pass.fitted_h, 20.0 + 10.0 + 110.0 + 110.0);
    }

    #[test]
    fn uniform_squares_prefer_the_cheap_axis() {
        // The label margin taxes every extra column, so four 40x40 squares
        // settle into a single column.
        let pass = arrange_mixed(&frame(), None, &uniform(4, 40.0, 40.0));
        assert_eq!(pass.fitted_w, 10.0 + 50.0);
        assert_eq!(pass.fitted_h, 20.0 + 10.0 + 4.0 * 50.0);
    }

    #[test]
    fn tie_breaks_follow_the_fill_preference() {
        // Three children bounded to a 2x2 block: the row-major and
        // column-major arrangements have identical bounding boxes, so the
        // explicit preference decides where the second child lands.
        let kids = uniform(3, 40.0, 40.0);
        let bounded = |strategy| LayoutPreferences {
            fill_strategy: strategy,
            max_rows: Some(2),
            max_columns: Some(2),
        };
        let cols_first = arrange_mixed(
            &frame(),
            Some(bounded(FillStrategy::FillColumnsFirst)),
            &kids,
        );
        let rows_first = arrange_mixed(
            &frame(),
            Some(bounded(FillStrategy::FillRowsFirst)),
            &kids,
        );
        assert_eq!(cols_first.fitted_w, rows_first.fitted_w);
        assert_eq!(cols_first.fitted_h, rows_first.fitted_h);
        // Columns-first: second child goes below the first.
        assert_eq!(cols_first.placements[1].x, cols_first.placements[0].x);
        assert!(cols_first.placements[1].y > cols_first.placements[0].y);
        // Rows-first: second child goes to the right.
        assert_eq!(rows_first.placements[1].y, rows_first.placements[0].y);
        assert!(rows_first.placements[1].x > rows_first.placements[0].x);
    }

    #[test]
    fn max_rows_bound_is_honored() {
        let pass = arrange_mixed(
            &frame(),
            Some(LayoutPreferences {
                max_rows: Some(2),
                ..LayoutPreferences::default()
            }),
            &uniform(6, 40.0, 40.0),
        );
        // At most 2 rows: 3 columns of 2.
        assert_eq!(pass.fitted_h, 20.0 + 10.0 + 50.0 + 50.0);
        assert_eq!(pass.fitted_w, 10.0 + 3.0 * 50.0);
    }

    #[test]
    fn infeasible_bounds_fall_back_to_a_single_row() {
        let pass = arrange_mixed(
            &frame(),
            Some(LayoutPreferences {
                max_rows: Some(1),
                max_columns: Some(1),
                ..LayoutPreferences::default()
            }),
            &uniform(3, 40.0, 40.0),
        );
        assert_eq!(pass.placements.len(), 3);
        assert_eq!(pass.fitted_w, 10.0 + 3.0 * 50.0);
    }

    #[test]
    fn ragged_children_use_per_row_and_per_column_extents() {
        let kids = vec![
            ChildBox { id: RectId(1), x: 0.0, y: 0.0, w: 80.0, h: 20.0 },
            ChildBox { id: RectId(2), x: 0.0, y: 0.0, w: 20.0, h: 20.0 },
            ChildBox { id: RectId(3), x: 0.0, y: 0.0, w: 20.0, h: 60.0 },
            ChildBox { id: RectId(4), x: 0.0, y: 0.0, w: 20.0, h: 20.0 },
        ];
        let pass = arrange_mixed(&frame(), None, &kids);
        assert_eq!(pass.placements.len(), 4);
        // No pair of placements may overlap.
        for a in 0..4 {
            for b in (a + 1)..4 {
                let pa = pass.placements[a];
                let pb = pass.placements[b];
                let separated = pa.x + pa.w <= pb.x
                    || pb.x + pb.w <= pa.x
                    || pa.y + pa.h <= pb.y
                    || pb.y + pb.h <= pa.y;
                assert!(separated, "placements {a} and {b} overlap");
            }
        }
    }
}
