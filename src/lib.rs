pub mod config;
pub mod editor;
pub mod error;
pub mod history;
pub mod interaction;
pub mod layout;
pub mod rect;
pub mod store;

pub use config::{EngineConfig, LayoutAlgorithm, SizeDefaults};
pub use editor::{EditorCore, NudgeDirection};
pub use error::{GestureError, HierarchyViolation, SnapshotError};
pub use history::{History, Snapshot};
pub use interaction::{GestureState, VirtualPosition};
pub use layout::{ChildBox, LayoutPass, Placement, arrange};
pub use rect::{FillStrategy, LayoutPreferences, RectId, RectKind, Rectangle};
pub use store::{RectStore, RemovalPolicy};
