//! Gesture state for the interaction machine.
//!
//! Exactly one gesture is active at a time. A drag never touches the
//! store while the pointer moves: the captured group lives in a virtual
//! position map and per-frame updates cost O(group size). All transitions
//! here are pure over the store; applying a commit is the editor's job.

use std::collections::{BTreeMap, BTreeSet};

use crate::rect::RectId;
use crate::store::RectStore;

/// Transient, gesture-scoped coordinate override for one group member.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualPosition {
    pub x: f32,
    pub y: f32,
    pub initial_x: f32,
    pub initial_y: f32,
}

/// A drag in flight: the captured group and its clamp bounds.
#[derive(Debug, Clone)]
pub struct DragState {
    /// The rectangle the gesture started on.
    pub root: RectId,
    positions: BTreeMap<RectId, VirtualPosition>,
    min_initial_x: f32,
    min_initial_y: f32,
}

impl DragState {
    /// Capture the dragged rectangle plus all of its descendants, so
    /// relative offsets survive without re-running layout per frame.
    pub(crate) fn capture(store: &RectStore, id: RectId) -> Self {
        let mut ids = vec![id];
        ids.extend(store.descendants(id));
        let mut positions = BTreeMap::new();
        let mut min_initial_x = f32::MAX;
        let mut min_initial_y = f32::MAX;
        for rid in ids {
            if let Some(rect) = store.get(rid) {
                min_initial_x = min_initial_x.min(rect.x);
                min_initial_y = min_initial_y.min(rect.y);
                positions.insert(
                    rid,
                    VirtualPosition {
                        x: rect.x,
                        y: rect.y,
                        initial_x: rect.x,
                        initial_y: rect.y,
                    },
                );
            }
        }
        Self {
            root: id,
            positions,
            min_initial_x,
            min_initial_y,
        }
    }

    /// Apply the cumulative delta since gesture start.
    ///
    /// The delta is clamped per axis so the group's most-negative member
    /// stays at zero, and the clamped delta is applied uniformly — members
    /// never clamp independently, which keeps relative offsets exact.
    pub(crate) fn apply_delta(&mut self, dx: f32, dy: f32) -> (f32, f32) {
        let dx = dx.max(-self.min_initial_x);
        let dy = dy.max(-self.min_initial_y);
        for v in self.positions.values_mut() {
            v.x = v.initial_x + dx;
            v.y = v.initial_y + dy;
        }
        (dx, dy)
    }

    pub fn get(&self, id: RectId) -> Option<VirtualPosition> {
        self.positions.get(&id).copied()
    }

    pub(crate) fn members(&self) -> impl Iterator<Item = (RectId, VirtualPosition)> + '_ {
        self.positions.iter().map(|(id, v)| (*id, *v))
    }

    /// Delta currently applied, identical for every member.
    pub(crate) fn applied_delta(&self) -> (f32, f32) {
        self.positions
            .values()
            .next()
            .map(|v| (v.x - v.initial_x, v.y - v.initial_y))
            .unwrap_or((0.0, 0.0))
    }
}

/// A bottom-right-handle resize in flight.
#[derive(Debug, Clone, Copy)]
pub struct ResizeState {
    pub id: RectId,
    pub w: f32,
    pub h: f32,
    min_w: f32,
    min_h: f32,
}

impl ResizeState {
    pub(crate) fn begin(id: RectId, w: f32, h: f32, min_w: f32, min_h: f32) -> Self {
        Self {
            id,
            w,
            h,
            min_w,
            min_h,
        }
    }

    /// Clamp the requested extent per frame; the handle stops at the
    /// content minimum instead of bouncing.
    pub(crate) fn request(&mut self, w: f32, h: f32) {
        self.w = w.max(self.min_w);
        self.h = h.max(self.min_h);
    }
}

/// A reparenting drag in flight.
#[derive(Debug, Clone)]
pub struct HierarchyDragState {
    pub id: RectId,
    /// The dragged subtree can never be its own drop target.
    excluded: BTreeSet<RectId>,
    pub target: Option<RectId>,
    pub valid: bool,
}

impl HierarchyDragState {
    pub(crate) fn capture(store: &RectStore, id: RectId) -> Self {
        let mut excluded: BTreeSet<RectId> = store.descendants(id).into_iter().collect();
        excluded.insert(id);
        Self {
            id,
            excluded,
            target: None,
            valid: false,
        }
    }

    /// Recompute the candidate drop target under the pointer. The deepest
    /// rectangle outside the dragged subtree wins; validity still follows
    /// the hierarchy rules, so the shell can show an invalid candidate.
    pub(crate) fn update_target(&mut self, store: &RectStore, x: f32, y: f32) {
        self.target = store
            .iter()
            .filter(|r| !self.excluded.contains(&r.id) && r.contains_point(x, y))
            .map(|r| (store.depth(r.id), r.id))
            .max()
            .map(|(_, id)| id);
        self.valid = match self.target {
            Some(target) => store.can_reparent(self.id, Some(target)),
            None => false,
        };
    }
}

/// The machine: `idle -> dragging | resizing | hierarchyDragging -> idle`.
#[derive(Debug, Clone, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Dragging(DragState),
    Resizing(ResizeState),
    HierarchyDragging(HierarchyDragState),
}

impl GestureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Non-`None` only while a drag is active.
    pub fn virtual_position(&self, id: RectId) -> Option<VirtualPosition> {
        match self {
            Self::Dragging(drag) => drag.get(id),
            _ => None,
        }
    }
}
