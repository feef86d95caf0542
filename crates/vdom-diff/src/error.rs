//! Error types for the diff crate.

use vdom_types::{Key, NodeId, TreeError};

/// Errors that can occur during diff operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    /// Two new siblings share a key. The whole pass is aborted.
    #[error("duplicate key {key} among children of {parent}")]
    DuplicateKey { key: Key, parent: NodeId },

    /// A patch kind name that is not part of the vocabulary.
    #[error("unknown patch kind: {0}")]
    UnknownPatchKind(String),

    /// A pairing referenced a node that does not exist in the old tree.
    #[error("node {0} not found in the old tree")]
    UnknownNode(NodeId),

    /// Tree bookkeeping failed (e.g. a host ref would be rebound).
    #[error("tree error: {0}")]
    Tree(#[from] TreeError),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
