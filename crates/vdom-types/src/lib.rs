//! Foundation types for the vdom reconciler.
//!
//! This crate provides the virtual-node model that every other vdom crate
//! builds on: the owned [`Element`] construction tree, the arena-backed
//! [`VTree`] it is flattened into, and the identifiers that link virtual
//! nodes to each other and to the host tree.
//!
//! # Key Types
//!
//! - [`Element`] -- Plain, owned description of a UI subtree (builder API)
//! - [`VTree`] / [`VNode`] -- Arena tree linked by [`NodeId`] indexes
//! - [`NodeKind`] -- Tag, text marker, or component reference
//! - [`Key`] -- Sibling identity token, unique within a child list
//! - [`HostId`] -- Opaque handle to a node in the host tree

pub mod element;
pub mod error;
pub mod id;
pub mod kind;
pub mod tree;

pub use element::Element;
pub use error::{TreeError, TreeResult};
pub use id::{HostId, Key, NodeId};
pub use kind::{ComponentRef, NodeKind, Props, RenderFn, TEXT_VALUE};
pub use tree::{Preorder, VNode, VTree};
