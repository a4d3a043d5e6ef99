//! The editing façade consumed by the UI shell.
//!
//! `EditorCore` owns the store, the gesture state, the history stack and
//! the selection, and exposes the whole mutation/query surface. Every
//! committed mutation re-arranges the affected parent, propagates size
//! changes bottom-up to the root, and marks the history dirty; the actual
//! snapshot is taken by `flush_history` between event turns so per-frame
//! gesture updates are never recorded individually.

use std::mem;

use tracing::{debug, trace};

use crate::config::{EngineConfig, LayoutAlgorithm};
use crate::error::{GestureError, HierarchyViolation, SnapshotError};
use crate::history::History;
use crate::interaction::{
    DragState, GestureState, HierarchyDragState, ResizeState, VirtualPosition,
};
use crate::layout::{self, ChildBox, LayoutPass, snap_up};
use crate::rect::{LayoutPreferences, RectId, RectKind, Rectangle};
use crate::store::{RectStore, RemovalPolicy};

// Fitted sizes are grid multiples, so anything smaller than a grid cell
// of drift means "unchanged" for the upward propagation walk.
const SIZE_EPS: f32 = 0.01;

/// Arrow-key nudge direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NudgeDirection {
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug)]
pub struct EditorCore {
    store: RectStore,
    config: EngineConfig,
    history: History,
    gesture: GestureState,
    selection: Vec<RectId>,
    history_dirty: bool,
}

impl EditorCore {
    pub fn new(config: EngineConfig) -> Self {
        let mut history = History::new(config.history_limit);
        history.push(Vec::new());
        Self {
            store: RectStore::new(),
            config,
            history,
            gesture: GestureState::Idle,
            selection: Vec::new(),
            history_dirty: false,
        }
    }

    // ----- queries ---------------------------------------------------------

    pub fn find_rectangle(&self, id: RectId) -> Option<&Rectangle> {
        self.store.get(id)
    }

    pub fn get_children(&self, id: RectId) -> Vec<&Rectangle> {
        self.store
            .children(id)
            .into_iter()
            .filter_map(|cid| self.store.get(cid))
            .collect()
    }

    pub fn get_descendants(&self, id: RectId) -> Vec<RectId> {
        self.store.descendants(id)
    }

    pub fn can_reparent(&self, child: RectId, new_parent: Option<RectId>) -> bool {
        self.store.can_reparent(child, new_parent)
    }

    pub fn rect_at_point(&self, x: f32, y: f32) -> Option<RectId> {
        self.store.rect_at_point(x, y)
    }

    /// Non-`None` only while a drag is active.
    pub fn get_virtual_position(&self, id: RectId) -> Option<VirtualPosition> {
        self.gesture.virtual_position(id)
    }

    /// Candidate drop target of an active hierarchy drag, with validity.
    pub fn drop_target(&self) -> Option<(RectId, bool)> {
        match &self.gesture {
            GestureState::HierarchyDragging(drag) => drag.target.map(|t| (t, drag.valid)),
            _ => None,
        }
    }

    pub fn selection(&self) -> &[RectId] {
        &self.selection
    }

    pub fn store(&self) -> &RectStore {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ordered deep copy of the tree — the format persistence collaborators
    /// consume.
    pub fn snapshot(&self) -> Vec<Rectangle> {
        self.store.snapshot()
    }

    pub fn can_undo(&mut self) -> bool {
        self.flush_history();
        self.history.can_undo()
    }

    pub fn can_redo(&mut self) -> bool {
        self.flush_history();
        self.history.can_redo()
    }

    // ----- structural mutations --------------------------------------------

    pub fn add_rectangle(
        &mut self,
        parent: Option<RectId>,
        text_label: bool,
    ) -> Result<RectId, HierarchyViolation> {
        let kind = if text_label {
            RectKind::TextLabel
        } else if parent.is_none() {
            RectKind::Root
        } else {
            RectKind::Leaf
        };
        let (w, h) = self.config.sizes.for_kind(kind);
        let id = self.store.add(parent, text_label, w, h)?;
        match parent {
            Some(p) => {
                // Give the newcomer a sane spot inside the parent before the
                // pass runs; manual parents keep it there.
                let (px, py) = {
                    let parent_rect = self.store.get(p).expect("validated by add");
                    (
                        parent_rect.x + self.config.margin,
                        parent_rect.y + self.config.label_margin + self.config.margin,
                    )
                };
                if let Some(rect) = self.store.get_mut(id) {
                    rect.x = snap_up(px, self.config.grid_size);
                    rect.y = snap_up(py, self.config.grid_size);
                }
                self.relayout_from(Some(p));
            }
            None => {
                // New roots line up to the right of the existing ones.
                let max_right = self
                    .store
                    .iter()
                    .filter(|r| r.parent.is_none() && r.id != id)
                    .map(Rectangle::right)
                    .fold(0.0f32, f32::max);
                if let Some(rect) = self.store.get_mut(id) {
                    rect.x = if max_right > 0.0 {
                        snap_up(max_right + self.config.margin, self.config.grid_size)
                    } else {
                        0.0
                    };
                }
            }
        }
        debug!(%id, ?parent, text_label, "add rectangle");
        self.mark_dirty();
        Ok(id)
    }

    pub fn remove_rectangle(
        &mut self,
        id: RectId,
        policy: RemovalPolicy,
    ) -> Result<(), HierarchyViolation> {
        let parent = self
            .store
            .get(id)
            .ok_or(HierarchyViolation::UnknownRect(id))?
            .parent;
        let removed = self.store.remove(id, policy)?;
        self.selection.retain(|sel| self.store.contains(*sel));
        if let Some(p) = parent
            && self.store.contains(p)
        {
            self.relayout_from(Some(p));
        }
        debug!(%id, count = removed.len(), "remove rectangle");
        self.mark_dirty();
        Ok(())
    }

    pub fn set_parent(
        &mut self,
        id: RectId,
        new_parent: Option<RectId>,
    ) -> Result<(), HierarchyViolation> {
        let old_parent = self
            .store
            .get(id)
            .ok_or(HierarchyViolation::UnknownRect(id))?
            .parent;
        self.store.set_parent(id, new_parent)?;
        // Entering a locked subtree locks the moved subtree too.
        if let Some(p) = new_parent
            && self.store.get(p).is_some_and(|r| r.is_locked_as_is)
        {
            self.store.set_locked_as_is(id, true)?;
        }
        if old_parent != new_parent {
            if let Some(p) = old_parent {
                self.relayout_from(Some(p));
            }
            self.relayout_from(new_parent);
        }
        debug!(%id, ?new_parent, "reparent");
        self.mark_dirty();
        Ok(())
    }

    /// Direct geometry edit. Sizes are clamped to the content minimum
    /// instead of failing, and the subtree moves along with the rectangle.
    pub fn update_geometry(
        &mut self,
        id: RectId,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
    ) -> Result<(), HierarchyViolation> {
        if !self.store.contains(id) {
            return Err(HierarchyViolation::UnknownRect(id));
        }
        let (min_w, min_h) = self.min_size_for(id);
        let (dx, dy) = {
            let rect = self.store.get_mut(id).expect("checked above");
            let nx = x.max(0.0);
            let ny = y.max(0.0);
            let delta = (nx - rect.x, ny - rect.y);
            rect.x = nx;
            rect.y = ny;
            rect.w = w.max(min_w);
            rect.h = h.max(min_h);
            delta
        };
        if dx != 0.0 || dy != 0.0 {
            self.translate_descendants(id, dx, dy);
        }
        if self.store.has_children(id) {
            self.arrange_children_of(id);
        }
        let parent = self.store.get(id).and_then(|r| r.parent);
        self.relayout_from(parent);
        self.mark_dirty();
        Ok(())
    }

    // ----- field edits -----------------------------------------------------

    pub fn set_label(&mut self, id: RectId, label: &str) -> Result<(), HierarchyViolation> {
        let rect = self
            .store
            .get_mut(id)
            .ok_or(HierarchyViolation::UnknownRect(id))?;
        rect.label = label.to_string();
        self.mark_dirty();
        Ok(())
    }

    pub fn set_color(
        &mut self,
        id: RectId,
        color: Option<String>,
    ) -> Result<(), HierarchyViolation> {
        let rect = self
            .store
            .get_mut(id)
            .ok_or(HierarchyViolation::UnknownRect(id))?;
        rect.color = color;
        self.mark_dirty();
        Ok(())
    }

    pub fn set_heatmap_value(
        &mut self,
        id: RectId,
        value: Option<f32>,
    ) -> Result<(), HierarchyViolation> {
        let rect = self
            .store
            .get_mut(id)
            .ok_or(HierarchyViolation::UnknownRect(id))?;
        rect.heatmap_value = value.map(|v| v.clamp(0.0, 1.0));
        self.mark_dirty();
        Ok(())
    }

    pub fn set_layout_preferences(
        &mut self,
        id: RectId,
        prefs: Option<LayoutPreferences>,
    ) -> Result<(), HierarchyViolation> {
        let rect = self
            .store
            .get_mut(id)
            .ok_or(HierarchyViolation::UnknownRect(id))?;
        rect.layout_preferences = prefs;
        self.relayout_from(Some(id));
        self.mark_dirty();
        Ok(())
    }

    pub fn toggle_manual_positioning(&mut self, id: RectId) -> Result<bool, HierarchyViolation> {
        let enabled = self.store.toggle_manual_positioning(id)?;
        // Turning manual off folds the children back into automatic
        // layout; turning it on still refits the parent around them.
        self.relayout_from(Some(id));
        debug!(%id, enabled, "toggle manual positioning");
        self.mark_dirty();
        Ok(enabled)
    }

    pub fn set_locked_as_is(&mut self, id: RectId, locked: bool) -> Result<(), HierarchyViolation> {
        self.store.set_locked_as_is(id, locked)?;
        debug!(%id, locked, "lock cascade");
        self.mark_dirty();
        Ok(())
    }

    // ----- layout ----------------------------------------------------------

    /// Explicit re-layout of a parent's subtree, deepest parents first so
    /// fitted child sizes feed their ancestors.
    pub fn run_layout(&mut self, parent_id: RectId) -> Result<(), HierarchyViolation> {
        if !self.store.contains(parent_id) {
            return Err(HierarchyViolation::UnknownRect(parent_id));
        }
        self.layout_subtree(parent_id);
        self.mark_dirty();
        Ok(())
    }

    /// Switch the diagram-wide strategy and re-arrange everything.
    pub fn set_algorithm(&mut self, algorithm: LayoutAlgorithm) {
        self.config.algorithm = algorithm;
        for root in self.store.roots() {
            self.layout_subtree(root);
        }
        debug!(?algorithm, "algorithm changed");
        self.mark_dirty();
    }

    /// Global leaf-size policy change. Locked-as-is rectangles (and, via
    /// the cascaded flag, whole locked subtrees) keep their dimensions.
    pub fn apply_leaf_size_policy(&mut self, leaf_w: f32, leaf_h: f32) {
        let w = leaf_w.max(self.config.sizes.min_w);
        let h = leaf_h.max(self.config.sizes.min_h);
        self.config.sizes.leaf_w = w;
        self.config.sizes.leaf_h = h;
        let leaves: Vec<RectId> = self
            .store
            .iter()
            .filter(|r| !r.is_text_label && !r.is_locked_as_is)
            .map(|r| r.id)
            .filter(|id| self.store.kind_of(*id) == Some(RectKind::Leaf))
            .collect();
        for id in leaves {
            if let Some(rect) = self.store.get_mut(id) {
                rect.w = w;
                rect.h = h;
            }
        }
        for root in self.store.roots() {
            self.layout_subtree(root);
        }
        debug!(w, h, "leaf size policy applied");
        self.mark_dirty();
    }

    // ----- selection -------------------------------------------------------

    pub fn set_selection(&mut self, ids: Vec<RectId>) {
        self.selection = ids
            .into_iter()
            .filter(|id| self.store.contains(*id))
            .collect();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // ----- history ---------------------------------------------------------

    /// Take the pending snapshot, if any. Called by the shell between
    /// event turns; rapid in-gesture updates collapse into the single
    /// committed end state.
    pub fn flush_history(&mut self) {
        if self.history_dirty {
            self.history_dirty = false;
            if self.history.push(self.store.snapshot()) {
                debug!(entries = self.history.len(), "history snapshot recorded");
            }
        }
    }

    /// Record the current tree immediately, bypassing the debounce. Like
    /// the deferred path, duplicates of the top of the stack are skipped.
    pub fn push_state(&mut self) {
        self.history_dirty = false;
        self.history.push(self.store.snapshot());
    }

    /// Step back one snapshot; silently does nothing at the bottom of the
    /// stack. Any in-flight gesture is discarded first.
    pub fn undo(&mut self) {
        self.flush_history();
        self.gesture = GestureState::Idle;
        if let Some(snapshot) = self.history.undo().cloned() {
            self.store.restore(&snapshot);
            self.selection.clear();
            debug!(index = self.history.index(), "undo");
        }
    }

    pub fn redo(&mut self) {
        self.flush_history();
        self.gesture = GestureState::Idle;
        if let Some(snapshot) = self.history.redo().cloned() {
            self.store.restore(&snapshot);
            self.selection.clear();
            debug!(index = self.history.index(), "redo");
        }
    }

    /// Replace the whole tree from an external snapshot (validated) and
    /// restart history from it.
    pub fn load_snapshot(&mut self, records: Vec<Rectangle>) -> Result<(), SnapshotError> {
        self.store.load_snapshot(records)?;
        self.gesture = GestureState::Idle;
        self.selection.clear();
        self.history = History::new(self.config.history_limit);
        self.history.push(self.store.snapshot());
        self.history_dirty = false;
        Ok(())
    }

    // ----- drag gesture ----------------------------------------------------

    pub fn start_drag(&mut self, id: RectId) -> Result<(), GestureError> {
        if !self.gesture.is_idle() {
            return Err(GestureError::Busy);
        }
        if !self.store.contains(id) {
            return Err(GestureError::UnknownRect(id));
        }
        self.gesture = GestureState::Dragging(DragState::capture(&self.store, id));
        trace!(%id, "drag started");
        Ok(())
    }

    /// Per-frame pointer update: O(group size), store untouched.
    pub fn update_virtual_drag_positions(&mut self, dx: f32, dy: f32) {
        if let GestureState::Dragging(drag) = &mut self.gesture {
            let (adx, ady) = drag.apply_delta(dx, dy);
            trace!(adx, ady, "virtual drag update");
        }
    }

    /// Commit the virtual positions into the store as one atomic batch and
    /// record a single history snapshot.
    pub fn commit_drag(&mut self) {
        let mut drag = match mem::take(&mut self.gesture) {
            GestureState::Dragging(drag) => drag,
            other => {
                self.gesture = other;
                return;
            }
        };
        // Snap the uniform delta to the grid so a grid-aligned group stays
        // aligned; re-apply so the group clamp holds after rounding.
        let (dx, dy) = drag.applied_delta();
        let grid = self.config.grid_size;
        let (dx, dy) = if grid > 0.0 {
            ((dx / grid).round() * grid, (dy / grid).round() * grid)
        } else {
            (dx, dy)
        };
        drag.apply_delta(dx, dy);
        for (id, v) in drag.members() {
            if let Some(rect) = self.store.get_mut(id) {
                rect.x = v.x;
                rect.y = v.y;
            }
        }
        let parent = self.store.get(drag.root).and_then(|r| r.parent);
        self.relayout_from(parent);
        debug!(id = %drag.root, "drag committed");
        self.mark_dirty();
    }

    /// Discard the virtual position map without committing.
    pub fn cancel_drag(&mut self) {
        if matches!(self.gesture, GestureState::Dragging(_)) {
            self.gesture = GestureState::Idle;
            trace!("drag cancelled");
        }
    }

    /// Abort whatever gesture is in flight; always safe, nothing has been
    /// written to the store before commit.
    pub fn cancel_gesture(&mut self) {
        self.gesture = GestureState::Idle;
    }

    // ----- resize gesture --------------------------------------------------

    /// Begin a bottom-right-handle resize. Locked rectangles make this a
    /// silent no-op rather than an error.
    pub fn start_resize(&mut self, id: RectId) -> Result<(), GestureError> {
        if !self.gesture.is_idle() {
            return Err(GestureError::Busy);
        }
        let Some(rect) = self.store.get(id) else {
            return Err(GestureError::UnknownRect(id));
        };
        if rect.is_locked_as_is {
            return Ok(());
        }
        let (w, h) = (rect.w, rect.h);
        let (min_w, min_h) = self.min_size_for(id);
        self.selection = vec![id];
        self.gesture = GestureState::Resizing(ResizeState::begin(id, w, h, min_w, min_h));
        trace!(%id, min_w, min_h, "resize started");
        Ok(())
    }

    pub fn update_resize(&mut self, w: f32, h: f32) {
        if let GestureState::Resizing(resize) = &mut self.gesture {
            resize.request(w, h);
        }
    }

    pub fn commit_resize(&mut self) {
        let resize = match mem::take(&mut self.gesture) {
            GestureState::Resizing(resize) => resize,
            other => {
                self.gesture = other;
                return;
            }
        };
        let w = snap_up(resize.w, self.config.grid_size);
        let h = snap_up(resize.h, self.config.grid_size);
        if let Some(rect) = self.store.get_mut(resize.id) {
            rect.w = w;
            rect.h = h;
        } else {
            return;
        }
        // A wider parent may wrap to more columns; children re-arrange
        // under the new bounds, then the change ripples upward.
        if self.store.has_children(resize.id) {
            self.arrange_children_of(resize.id);
        }
        let parent = self.store.get(resize.id).and_then(|r| r.parent);
        self.relayout_from(parent);
        debug!(id = %resize.id, w, h, "resize committed");
        self.mark_dirty();
    }

    // ----- hierarchy drag --------------------------------------------------

    pub fn start_hierarchy_drag(&mut self, id: RectId) -> Result<(), GestureError> {
        if !self.gesture.is_idle() {
            return Err(GestureError::Busy);
        }
        if !self.store.contains(id) {
            return Err(GestureError::UnknownRect(id));
        }
        self.gesture = GestureState::HierarchyDragging(HierarchyDragState::capture(&self.store, id));
        trace!(%id, "hierarchy drag started");
        Ok(())
    }

    pub fn update_hierarchy_drag(&mut self, x: f32, y: f32) {
        // Splitting the borrow: the drop-target scan reads the store.
        if let GestureState::HierarchyDragging(drag) = &mut self.gesture {
            drag.update_target(&self.store, x, y);
        }
    }

    /// Reparent onto a valid drop target; invalid or missing targets end
    /// the gesture with no mutation.
    pub fn commit_hierarchy_drag(&mut self) {
        let drag = match mem::take(&mut self.gesture) {
            GestureState::HierarchyDragging(drag) => drag,
            other => {
                self.gesture = other;
                return;
            }
        };
        if drag.valid
            && let Some(target) = drag.target
        {
            // Validity was checked against the live tree this frame.
            let _ = self.set_parent(drag.id, Some(target));
        } else {
            trace!(id = %drag.id, "drop rejected");
        }
    }

    // ----- keyboard nudge --------------------------------------------------

    /// Arrow-key move: commits directly, no virtual overlay. Only roots
    /// and children of a manual-positioning parent respond; everything
    /// else is a silent no-op. The subtree moves as a group under the same
    /// zero clamp as a drag.
    pub fn nudge(
        &mut self,
        id: RectId,
        direction: NudgeDirection,
        large: bool,
    ) -> Result<(), GestureError> {
        if !self.gesture.is_idle() {
            return Err(GestureError::Busy);
        }
        let Some(rect) = self.store.get(id) else {
            return Err(GestureError::UnknownRect(id));
        };
        let movable = match rect.parent {
            None => true,
            Some(p) => self
                .store
                .get(p)
                .is_some_and(|parent| parent.is_manual_positioning_enabled),
        };
        if !movable {
            return Ok(());
        }
        let step = self.config.grid_size.max(1.0) * if large { 10.0 } else { 1.0 };
        let (dx, dy) = match direction {
            NudgeDirection::Left => (-step, 0.0),
            NudgeDirection::Right => (step, 0.0),
            NudgeDirection::Up => (0.0, -step),
            NudgeDirection::Down => (0.0, step),
        };
        let mut group = DragState::capture(&self.store, id);
        group.apply_delta(dx, dy);
        for (rid, v) in group.members() {
            if let Some(r) = self.store.get_mut(rid) {
                r.x = v.x;
                r.y = v.y;
            }
        }
        let parent = self.store.get(id).and_then(|r| r.parent);
        self.relayout_from(parent);
        self.mark_dirty();
        Ok(())
    }

    // ----- internals -------------------------------------------------------

    fn mark_dirty(&mut self) {
        self.history_dirty = true;
    }

    /// Content minimum a rectangle can shrink to: the configured floor,
    /// raised to the children's bounding box for parents.
    fn min_size_for(&self, id: RectId) -> (f32, f32) {
        let mut min_w = self.config.sizes.min_w;
        let mut min_h = self.config.sizes.min_h;
        if let Some(rect) = self.store.get(id) {
            for cid in self.store.children(id) {
                if let Some(child) = self.store.get(cid) {
                    min_w = min_w.max(child.right() - rect.x + self.config.margin);
                    min_h = min_h.max(child.bottom() - rect.y + self.config.margin);
                }
            }
        }
        (min_w, min_h)
    }

    fn translate_descendants(&mut self, id: RectId, dx: f32, dy: f32) {
        for did in self.store.descendants(id) {
            if let Some(rect) = self.store.get_mut(did) {
                rect.x += dx;
                rect.y += dy;
            }
        }
    }

    /// Run one arrangement pass for `parent_id`'s children and apply it
    /// atomically. Returns true when the parent's fitted size changed.
    fn arrange_children_of(&mut self, parent_id: RectId) -> bool {
        let Some(parent) = self.store.get(parent_id).cloned() else {
            return false;
        };
        let children: Vec<ChildBox> = self
            .store
            .children(parent_id)
            .into_iter()
            .filter_map(|cid| self.store.get(cid).map(ChildBox::of))
            .collect();
        let exempt = self.store.is_layout_exempt(parent_id);
        let depth = self.store.depth(parent_id);
        let pass = layout::arrange(&parent, exempt, depth, &children, &self.config);
        trace!(parent = %parent_id, children = children.len(), "layout pass");
        self.apply_pass(parent_id, &pass)
    }

    fn apply_pass(&mut self, parent_id: RectId, pass: &LayoutPass) -> bool {
        for p in &pass.placements {
            let delta = self.store.get_mut(p.id).map(|rect| {
                let delta = (p.x - rect.x, p.y - rect.y);
                rect.x = p.x;
                rect.y = p.y;
                rect.w = p.w;
                rect.h = p.h;
                delta
            });
            if let Some((dx, dy)) = delta
                && (dx != 0.0 || dy != 0.0)
            {
                self.translate_descendants(p.id, dx, dy);
            }
        }
        let Some(rect) = self.store.get_mut(parent_id) else {
            return false;
        };
        let changed = (rect.w - pass.fitted_w).abs() > SIZE_EPS
            || (rect.h - pass.fitted_h).abs() > SIZE_EPS;
        rect.w = pass.fitted_w;
        rect.h = pass.fitted_h;
        changed
    }

    /// Bottom-up propagation: re-arrange each ancestor while its content
    /// keeps changing size.
    fn relayout_from(&mut self, parent: Option<RectId>) {
        let mut cur = parent;
        while let Some(id) = cur {
            if !self.store.contains(id) {
                break;
            }
            let changed = self.arrange_children_of(id);
            if !changed {
                break;
            }
            cur = self.store.get(id).and_then(|r| r.parent);
        }
    }

    /// Re-arrange a whole subtree, deepest parents first, then let any
    /// size change ripple above `root`.
    fn layout_subtree(&mut self, root: RectId) {
        let mut parents: Vec<RectId> = std::iter::once(root)
            .chain(self.store.descendants(root))
            .filter(|id| self.store.has_children(*id))
            .collect();
        parents.sort_by_key(|id| std::cmp::Reverse(self.store.depth(*id)));
        for id in parents {
            self.arrange_children_of(id);
        }
        let up = self.store.get(root).and_then(|r| r.parent);
        self.relayout_from(up);
    }
}
