//! The authoritative rectangle tree.
//!
//! Rectangles live in a `BTreeMap` keyed by their monotonically assigned
//! id, so iteration order is insertion order and every walk is
//! deterministic. All hierarchy mutations validate first and commit only
//! when the whole write is known to succeed.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{HierarchyViolation, SnapshotError};
use crate::rect::{RectId, RectKind, Rectangle};

/// What happens to the subtree when a rectangle is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalPolicy {
    /// Remove the rectangle and every descendant.
    WithDescendants,
    /// Remove only the rectangle; its direct children become roots.
    ReparentToRoot,
}

#[derive(Debug, Clone, Default)]
pub struct RectStore {
    rects: BTreeMap<RectId, Rectangle>,
    next_id: u64,
}

impl RectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn contains(&self, id: RectId) -> bool {
        self.rects.contains_key(&id)
    }

    pub fn get(&self, id: RectId) -> Option<&Rectangle> {
        self.rects.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: RectId) -> Option<&mut Rectangle> {
        self.rects.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rectangle> {
        self.rects.values()
    }

    /// Direct children in insertion order.
    pub fn children(&self, parent: RectId) -> Vec<RectId> {
        self.rects
            .values()
            .filter(|r| r.parent == Some(parent))
            .map(|r| r.id)
            .collect()
    }

    pub fn roots(&self) -> Vec<RectId> {
        self.rects
            .values()
            .filter(|r| r.parent.is_none())
            .map(|r| r.id)
            .collect()
    }

    pub fn has_children(&self, id: RectId) -> bool {
        self.rects.values().any(|r| r.parent == Some(id))
    }

    /// All descendant ids in preorder.
    pub fn descendants(&self, id: RectId) -> Vec<RectId> {
        let mut out = Vec::new();
        let mut stack = self.children(id);
        stack.reverse();
        while let Some(next) = stack.pop() {
            out.push(next);
            let mut kids = self.children(next);
            kids.reverse();
            stack.extend(kids);
        }
        out
    }

    /// Number of ancestors above `id`; roots are at depth 0.
    pub fn depth(&self, id: RectId) -> usize {
        let mut depth = 0;
        let mut cur = self.rects.get(&id).and_then(|r| r.parent);
        while let Some(parent) = cur {
            depth += 1;
            cur = self.rects.get(&parent).and_then(|r| r.parent);
        }
        depth
    }

    /// True when `maybe_ancestor` appears in `id`'s parent chain.
    pub fn is_ancestor_of(&self, maybe_ancestor: RectId, id: RectId) -> bool {
        let mut cur = self.rects.get(&id).and_then(|r| r.parent);
        while let Some(parent) = cur {
            if parent == maybe_ancestor {
                return true;
            }
            cur = self.rects.get(&parent).and_then(|r| r.parent);
        }
        false
    }

    pub fn kind_of(&self, id: RectId) -> Option<RectKind> {
        let rect = self.rects.get(&id)?;
        Some(if rect.is_text_label {
            RectKind::TextLabel
        } else if rect.parent.is_none() {
            RectKind::Root
        } else if self.has_children(id) {
            RectKind::Parent
        } else {
            RectKind::Leaf
        })
    }

    /// True when some strict ancestor has manual positioning enabled, which
    /// exempts this rectangle's children from automatic layout.
    pub fn is_layout_exempt(&self, id: RectId) -> bool {
        let mut cur = self.rects.get(&id).and_then(|r| r.parent);
        while let Some(parent) = cur {
            match self.rects.get(&parent) {
                Some(p) if p.is_manual_positioning_enabled => return true,
                Some(p) => cur = p.parent,
                None => return false,
            }
        }
        false
    }

    /// Whether the move is structurally legal. Pure, no side effects.
    pub fn can_reparent(&self, child: RectId, new_parent: Option<RectId>) -> bool {
        self.check_reparent(child, new_parent).is_ok()
    }

    fn check_reparent(
        &self,
        child: RectId,
        new_parent: Option<RectId>,
    ) -> Result<(), HierarchyViolation> {
        if !self.contains(child) {
            return Err(HierarchyViolation::UnknownRect(child));
        }
        let Some(target) = new_parent else {
            return Ok(());
        };
        let Some(target_rect) = self.rects.get(&target) else {
            return Err(HierarchyViolation::UnknownRect(target));
        };
        if target == child {
            return Err(HierarchyViolation::SelfParent(child));
        }
        if target_rect.is_text_label {
            return Err(HierarchyViolation::TextLabelParent(target));
        }
        if self.is_ancestor_of(child, target) {
            return Err(HierarchyViolation::Cycle { child, target });
        }
        Ok(())
    }

    /// Insert a new rectangle with the given extent. The caller picks the
    /// extent from its size defaults; position starts at the origin.
    pub fn add(
        &mut self,
        parent: Option<RectId>,
        is_text_label: bool,
        w: f32,
        h: f32,
    ) -> Result<RectId, HierarchyViolation> {
        if let Some(p) = parent {
            let Some(parent_rect) = self.rects.get(&p) else {
                return Err(HierarchyViolation::UnknownRect(p));
            };
            if parent_rect.is_text_label {
                return Err(HierarchyViolation::TextLabelParent(p));
            }
        }
        let id = RectId(self.next_id);
        self.next_id += 1;
        let mut rect = Rectangle::new(id, parent, w, h);
        rect.is_text_label = is_text_label;
        // Locks cascade: a child born under a locked parent is locked too.
        if let Some(p) = parent
            && self.rects.get(&p).is_some_and(|r| r.is_locked_as_is)
        {
            rect.is_locked_as_is = true;
        }
        self.rects.insert(id, rect);
        Ok(id)
    }

    /// Remove `id`, applying `policy` to its subtree. Returns the ids that
    /// were actually removed.
    pub fn remove(
        &mut self,
        id: RectId,
        policy: RemovalPolicy,
    ) -> Result<Vec<RectId>, HierarchyViolation> {
        if !self.contains(id) {
            return Err(HierarchyViolation::UnknownRect(id));
        }
        let removed = match policy {
            RemovalPolicy::WithDescendants => {
                let mut ids = vec![id];
                ids.extend(self.descendants(id));
                for rid in &ids {
                    self.rects.remove(rid);
                }
                ids
            }
            RemovalPolicy::ReparentToRoot => {
                for child in self.children(id) {
                    if let Some(rect) = self.rects.get_mut(&child) {
                        rect.parent = None;
                    }
                }
                self.rects.remove(&id);
                vec![id]
            }
        };
        Ok(removed)
    }

    /// Move `id` under `new_parent` (or to the root level). Validation
    /// failures leave the tree unchanged.
    pub fn set_parent(
        &mut self,
        id: RectId,
        new_parent: Option<RectId>,
    ) -> Result<(), HierarchyViolation> {
        self.check_reparent(id, new_parent)?;
        let rect = self.rects.get_mut(&id).expect("validated above");
        rect.parent = new_parent;
        Ok(())
    }

    /// Set the lock flag on `id` and every descendant in one walk, so read
    /// paths stay O(1).
    pub fn set_locked_as_is(
        &mut self,
        id: RectId,
        locked: bool,
    ) -> Result<(), HierarchyViolation> {
        if !self.contains(id) {
            return Err(HierarchyViolation::UnknownRect(id));
        }
        let mut ids = vec![id];
        ids.extend(self.descendants(id));
        for rid in ids {
            if let Some(rect) = self.rects.get_mut(&rid) {
                rect.is_locked_as_is = locked;
            }
        }
        Ok(())
    }

    /// Flip manual positioning for `id`'s children; returns the new value.
    pub fn toggle_manual_positioning(&mut self, id: RectId) -> Result<bool, HierarchyViolation> {
        let Some(rect) = self.rects.get_mut(&id) else {
            return Err(HierarchyViolation::UnknownRect(id));
        };
        rect.is_manual_positioning_enabled = !rect.is_manual_positioning_enabled;
        Ok(rect.is_manual_positioning_enabled)
    }

    /// Deepest rectangle whose box contains the point; later siblings win
    /// ties at equal depth (they render on top).
    pub fn rect_at_point(&self, x: f32, y: f32) -> Option<RectId> {
        self.rects
            .values()
            .filter(|r| r.contains_point(x, y))
            .map(|r| (self.depth(r.id), r.id))
            .max()
            .map(|(_, id)| id)
    }

    /// Ordered deep copy of every rectangle — the snapshot format consumed
    /// by history and by persistence collaborators.
    pub fn snapshot(&self) -> Vec<Rectangle> {
        self.rects.values().cloned().collect()
    }

    /// Replace the tree with an externally supplied snapshot after
    /// structural validation. On error the live tree is untouched.
    pub fn load_snapshot(&mut self, records: Vec<Rectangle>) -> Result<(), SnapshotError> {
        validate_snapshot(&records)?;
        let max_id = records.iter().map(|r| r.id.0).max().unwrap_or(0);
        self.rects = records.into_iter().map(|r| (r.id, r)).collect();
        self.next_id = self.next_id.max(max_id + 1);
        Ok(())
    }

    /// Replace the tree with a trusted history snapshot. Ids stay
    /// monotonic so redo branches can never collide with new inserts.
    pub(crate) fn restore(&mut self, records: &[Rectangle]) {
        self.rects = records.iter().map(|r| (r.id, r.clone())).collect();
        let max_id = records.iter().map(|r| r.id.0).max().unwrap_or(0);
        self.next_id = self.next_id.max(max_id + 1);
    }
}

fn validate_snapshot(records: &[Rectangle]) -> Result<(), SnapshotError> {
    let mut ids = BTreeSet::new();
    for rect in records {
        if !ids.insert(rect.id) {
            return Err(SnapshotError::DuplicateId(rect.id));
        }
        if rect.w <= 0.0 || rect.h <= 0.0 {
            return Err(SnapshotError::InvalidGeometry {
                id: rect.id,
                w: rect.w,
                h: rect.h,
            });
        }
    }
    let by_id: BTreeMap<RectId, &Rectangle> = records.iter().map(|r| (r.id, r)).collect();
    for rect in records {
        if let Some(parent) = rect.parent {
            let Some(parent_rect) = by_id.get(&parent) else {
                return Err(SnapshotError::DanglingParent {
                    child: rect.id,
                    parent,
                });
            };
            if parent_rect.is_text_label {
                return Err(SnapshotError::TextLabelWithChildren(parent));
            }
        }
        // A chain longer than the record count can only mean a cycle.
        let mut steps = 0usize;
        let mut cur = rect.parent;
        while let Some(parent) = cur {
            steps += 1;
            if steps > records.len() {
                return Err(SnapshotError::CyclicParents(rect.id));
            }
            cur = by_id.get(&parent).and_then(|r| r.parent);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_chain() -> (RectStore, RectId, RectId, RectId) {
        let mut store = RectStore::new();
        let root = store.add(None, false, 160.0, 120.0).unwrap();
        let mid = store.add(Some(root), false, 60.0, 40.0).unwrap();
        let leaf = store.add(Some(mid), false, 60.0, 40.0).unwrap();
        (store, root, mid, leaf)
    }

    #[test]
    fn reparent_into_own_subtree_is_rejected_without_writes() {
        let (mut store, root, _mid, leaf) = store_with_chain();
        let before = store.snapshot();
        assert!(!store.can_reparent(root, Some(leaf)));
        let err = store.set_parent(root, Some(leaf)).unwrap_err();
        assert_eq!(
            err,
            HierarchyViolation::Cycle {
                child: root,
                target: leaf
            }
        );
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn self_parent_is_rejected() {
        let (mut store, root, ..) = store_with_chain();
        assert!(!store.can_reparent(root, Some(root)));
        assert_eq!(
            store.set_parent(root, Some(root)),
            Err(HierarchyViolation::SelfParent(root))
        );
    }

    #[test]
    fn text_labels_never_acquire_children() {
        let mut store = RectStore::new();
        let root = store.add(None, false, 160.0, 120.0).unwrap();
        let label = store.add(Some(root), true, 80.0, 20.0).unwrap();
        assert_eq!(
            store.add(Some(label), false, 60.0, 40.0),
            Err(HierarchyViolation::TextLabelParent(label))
        );
        let leaf = store.add(Some(root), false, 60.0, 40.0).unwrap();
        assert!(!store.can_reparent(leaf, Some(label)));
        assert_eq!(store.kind_of(label), Some(RectKind::TextLabel));
    }

    #[test]
    fn kind_is_derived_from_position() {
        let (store, root, mid, leaf) = store_with_chain();
        assert_eq!(store.kind_of(root), Some(RectKind::Root));
        assert_eq!(store.kind_of(mid), Some(RectKind::Parent));
        assert_eq!(store.kind_of(leaf), Some(RectKind::Leaf));
    }

    #[test]
    fn lock_cascades_down_and_back_up() {
        let (mut store, root, mid, leaf) = store_with_chain();
        store.set_locked_as_is(root, true).unwrap();
        assert!(store.get(mid).unwrap().is_locked_as_is);
        assert!(store.get(leaf).unwrap().is_locked_as_is);
        store.set_locked_as_is(root, false).unwrap();
        assert!(!store.get(mid).unwrap().is_locked_as_is);
        assert!(!store.get(leaf).unwrap().is_locked_as_is);
    }

    #[test]
    fn child_born_under_locked_parent_is_locked() {
        let (mut store, root, mid, _leaf) = store_with_chain();
        store.set_locked_as_is(root, true).unwrap();
        let added = store.add(Some(mid), false, 60.0, 40.0).unwrap();
        assert!(store.get(added).unwrap().is_locked_as_is);
    }

    #[test]
    fn removal_policies() {
        let (mut store, root, mid, leaf) = store_with_chain();
        let mut with_desc = store.clone();
        let removed = with_desc.remove(mid, RemovalPolicy::WithDescendants).unwrap();
        assert_eq!(removed, vec![mid, leaf]);
        assert!(with_desc.contains(root));
        assert!(!with_desc.contains(leaf));

        let removed = store.remove(mid, RemovalPolicy::ReparentToRoot).unwrap();
        assert_eq!(removed, vec![mid]);
        assert_eq!(store.get(leaf).unwrap().parent, None);
        assert_eq!(store.kind_of(leaf), Some(RectKind::Root));
    }

    #[test]
    fn layout_exemption_comes_from_strict_ancestors() {
        let (mut store, root, mid, leaf) = store_with_chain();
        assert!(!store.is_layout_exempt(leaf));
        store.toggle_manual_positioning(root).unwrap();
        // mid's children are packed by mid, but mid itself sits under a
        // manual parent, so both levels below root are exempt.
        assert!(store.is_layout_exempt(mid));
        assert!(store.is_layout_exempt(leaf));
        assert!(!store.is_layout_exempt(root));
    }

    #[test]
    fn rect_at_point_prefers_deepest() {
        let (mut store, root, mid, leaf) = store_with_chain();
        for id in [root, mid, leaf] {
            let rect = store.get_mut(id).unwrap();
            rect.x = 0.0;
            rect.y = 0.0;
        }
        assert_eq!(store.rect_at_point(5.0, 5.0), Some(leaf));
        assert_eq!(store.rect_at_point(150.0, 100.0), Some(root));
        assert_eq!(store.rect_at_point(500.0, 500.0), None);
    }

    #[test]
    fn load_snapshot_rejects_cycles_and_dangling_parents() {
        let mut a = Rectangle::new(RectId(1), Some(RectId(2)), 10.0, 10.0);
        let mut b = Rectangle::new(RectId(2), Some(RectId(1)), 10.0, 10.0);
        let mut store = RectStore::new();
        assert_eq!(
            store.load_snapshot(vec![a.clone(), b.clone()]),
            Err(SnapshotError::CyclicParents(RectId(1)))
        );
        a.parent = None;
        b.parent = Some(RectId(99));
        assert_eq!(
            store.load_snapshot(vec![a.clone(), b.clone()]),
            Err(SnapshotError::DanglingParent {
                child: RectId(2),
                parent: RectId(99)
            })
        );
        b.parent = Some(RectId(1));
        b.w = 0.0;
        assert!(matches!(
            store.load_snapshot(vec![a.clone(), b.clone()]),
            Err(SnapshotError::InvalidGeometry { .. })
        ));
        b.w = 10.0;
        store.load_snapshot(vec![a, b]).unwrap();
        assert_eq!(store.len(), 2);
        // Fresh inserts must not collide with loaded ids.
        let next = store.add(None, false, 10.0, 10.0).unwrap();
        assert!(next > RectId(2));
    }
}
