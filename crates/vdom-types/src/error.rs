//! Error types for tree construction.

use crate::id::{HostId, Key, NodeId};

/// Errors that can occur while building or linking a virtual tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// Two siblings carry the same key.
    #[error("duplicate key {key} among children of <{parent}>")]
    DuplicateKey { key: Key, parent: String },

    /// A node already owns a different host node.
    #[error("node {node} is already bound to host {bound}, refusing {requested}")]
    HostAlreadyBound {
        node: NodeId,
        bound: HostId,
        requested: HostId,
    },

    /// A node id does not belong to this tree.
    #[error("node {0} is not part of this tree")]
    UnknownNode(NodeId),

    /// The tree has more nodes than a `NodeId` can address.
    #[error("tree exceeds {0} nodes")]
    TooLarge(usize),
}

/// Convenience alias for tree results.
pub type TreeResult<T> = Result<T, TreeError>;
