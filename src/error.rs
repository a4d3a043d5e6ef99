//! Error taxonomy of the editing core.
//!
//! Every operation is validate-then-commit: a returned error means the tree
//! was left untouched. Geometry requests that would go non-positive are
//! clamped rather than rejected, and undo/redo past the stack bounds are
//! silent no-ops, so neither surfaces here.

use thiserror::Error;

use crate::rect::RectId;

/// A structurally invalid hierarchy mutation, rejected before any write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HierarchyViolation {
    #[error("rectangle {0} cannot become its own parent")]
    SelfParent(RectId),

    #[error("reparenting {child} under {target} would create a cycle")]
    Cycle { child: RectId, target: RectId },

    #[error("rectangle {0} is a text label and cannot have children")]
    TextLabelParent(RectId),

    #[error("unknown rectangle {0}")]
    UnknownRect(RectId),
}

/// Structural validation failure while consuming an external snapshot.
/// The live tree is unchanged when any of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SnapshotError {
    #[error("duplicate rectangle id {0}")]
    DuplicateId(RectId),

    #[error("rectangle {child} references missing parent {parent}")]
    DanglingParent { child: RectId, parent: RectId },

    #[error("parent chain of rectangle {0} is cyclic")]
    CyclicParents(RectId),

    #[error("text label {0} has children")]
    TextLabelWithChildren(RectId),

    #[error("rectangle {id} has non-positive size {w}x{h}")]
    InvalidGeometry { id: RectId, w: f32, h: f32 },
}

/// A gesture request the interaction state machine cannot honor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GestureError {
    #[error("another gesture is already active")]
    Busy,

    #[error("unknown rectangle {0}")]
    UnknownRect(RectId),
}
