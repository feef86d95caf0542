//! Diff engine for the vdom reconciler.
//!
//! Compares two virtual trees and produces the patches that turn the host
//! tree rendered from the old one into the host tree for the new one. The
//! engine only decides *what* must change; it never touches the host tree.
//!
//! # Strategies
//!
//! - [`diff_keyed`] -- key-based. Correlates siblings by `(kind, key)`, reuses
//!   same-kind nodes for the rest, and emits reference-addressed [`Patch`]es.
//!   This is the default.
//! - [`diff_positional`] -- position-based. Compares children by index and
//!   emits [`IndexedPatches`] addressed by pre-order traversal index. An
//!   insert in the middle of a list misaligns every later sibling; use it
//!   only as a fallback for unkeyed lists.
//!
//! The two strategies are not equivalent and must not be expected to agree.
//!
//! Both leave the children of a new node carrying the [`IGNORE_CHILDREN`]
//! prop untouched.
//!
//! # Key Types
//!
//! - [`Patch`] / [`PatchSet`] -- reference-addressed patches
//! - [`IndexedPatch`] / [`IndexedPatches`] -- index-addressed patches
//! - [`PatchKind`] -- the shared patch vocabulary
//! - [`PropDelta`] -- shallow prop changes carried by `UPDATE`
//! - [`Pairing`] -- how a new node relates to the old tree (used by fibers)

pub mod delta;
pub mod error;
pub mod ignore;
pub mod keyed;
pub mod lis;
pub mod patch;
pub mod positional;

pub use delta::{diff_props, PropDelta};
pub use error::{DiffError, DiffResult};
pub use ignore::{ignores_children, IGNORE_CHILDREN};
pub use keyed::{diff_keyed, diff_nodes, diff_unit, reconcile_children, ChildPlan, Pairing};
pub use patch::{IndexedPatch, IndexedPatches, Patch, PatchKind, PatchSet};
pub use positional::diff_positional;
