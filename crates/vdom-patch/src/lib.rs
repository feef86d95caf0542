//! Patch applier for the vdom reconciler.
//!
//! Replays diff output onto a host tree without discarding reusable host
//! nodes. The host tree itself is external: the applier talks to it only
//! through the [`HostTree`] trait.
//!
//! # Addressing Schemes
//!
//! - [`apply_patches`] -- reference-addressed patches from the key-based diff.
//!   Each patch names its nodes directly, no traversal is needed.
//! - [`apply_indexed`] -- index-addressed patches from the position-based
//!   diff, replayed by walking the host tree in pre-order.
//!
//! Both run in two phases: first every host node that must exist is
//! materialized, then structural placement happens.
//!
//! # Hosts
//!
//! - [`MemoryHost`] -- arena-backed host tree for tests and embedding

pub mod apply;
pub mod error;
pub mod host;
pub mod materialize;
pub mod memory;
pub mod replay;

pub use apply::{apply_patches, ApplyReport};
pub use error::{ApplyError, ApplyResult, HostError, HostResult};
pub use host::HostTree;
pub use materialize::{materialize, mount};
pub use memory::{HostNode, HostNodeKind, MemoryHost};
pub use replay::{apply_indexed, ReplayReport};
