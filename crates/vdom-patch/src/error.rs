//! Error types for host mutation and patch application.

use vdom_types::{HostId, NodeId, TreeError};

/// Errors reported by a host tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// The handle does not name a live host node.
    #[error("host node {0} not found")]
    NodeNotFound(HostId),

    /// `child` is not a child of `parent`.
    #[error("host node {child} is not a child of {parent}")]
    NotAChild { parent: HostId, child: HostId },

    /// Children were requested on a node that cannot have any.
    #[error("host node {0} cannot have children")]
    NotAContainer(HostId),

    /// Inserting `node` under `parent` would make it its own ancestor.
    #[error("inserting {node} under {parent} would create a cycle")]
    Cycle { parent: HostId, node: HostId },
}

/// Convenience alias for host results.
pub type HostResult<T> = Result<T, HostError>;

/// Errors that abort patch application. Mutations already applied stay.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    /// The host rejected a mutation.
    #[error("host error: {0}")]
    Host(#[from] HostError),

    /// A virtual node that should own a host node has none.
    #[error("virtual node {0} has no host node")]
    MissingHostRef(NodeId),

    /// A host node that must be detached or swapped has no parent.
    #[error("host node {0} has no parent")]
    MissingParent(HostId),

    /// Host refs could not be recorded on the virtual tree.
    #[error("tree error: {0}")]
    Tree(#[from] TreeError),
}

/// Convenience alias for apply results.
pub type ApplyResult<T> = Result<T, ApplyError>;
