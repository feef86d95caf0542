//! Opting a subtree out of child reconciliation.
//!
//! A new node carrying the [`IGNORE_CHILDREN`] prop is still diffed itself
//! (kind and props), but its children are left exactly as the host has them.
//! No patch is emitted below it.

use vdom_types::{NodeId, VNode, VTree};

use crate::error::DiffResult;

/// Prop name whose presence, with any value, skips the children diff.
pub const IGNORE_CHILDREN: &str = "ignore";

pub fn ignores_children(node: &VNode) -> bool {
    node.props.contains_key(IGNORE_CHILDREN)
}

/// Carry host refs from the old children of an ignored node onto the new ones.
///
/// Children are paired by position and the walk stops below the first kind
/// mismatch. New nodes without a counterpart stay unbound.
pub(crate) fn forward_ignored(
    old: &VTree,
    old_id: NodeId,
    new: &mut VTree,
    new_id: NodeId,
) -> DiffResult<()> {
    let mut stack = vec![(old_id, new_id)];
    while let Some((old_parent, new_parent)) = stack.pop() {
        let pairs: Vec<(NodeId, NodeId)> = old
            .children(old_parent)
            .iter()
            .copied()
            .zip(new.children(new_parent).iter().copied())
            .collect();
        for (old_child, new_child) in pairs {
            if old[old_child].kind != new[new_child].kind {
                continue;
            }
            new.forward_host(new_child, old[old_child].host())?;
            stack.push((old_child, new_child));
        }
    }
    Ok(())
}
