//! High-level SDK for the vdom reconciler.
//!
//! Wraps tree building, diffing, scheduling and patch application behind a
//! single [`Renderer`] that owns a host tree and the last rendered tree.

pub mod error;
pub mod renderer;

pub use error::{SdkError, SdkResult};
pub use renderer::{RenderSummary, Renderer, Strategy};

// Re-export key types
pub use vdom_types::{ComponentRef, Element, HostId, Key, NodeId, NodeKind, Props, VTree};
pub use vdom_diff::{IndexedPatches, Patch, PatchKind, PatchSet};
pub use vdom_patch::{HostTree, MemoryHost};
pub use vdom_fiber::{
    Completion, ManualClock, ManualFrameHost, Priority, Scheduler, SchedulerConfig, SessionHandle,
    SystemClock, WorkStatus,
};
