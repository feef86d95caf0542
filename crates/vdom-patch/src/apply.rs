//! Reference-addressed replay.
//!
//! Patches from the key-based diff name the virtual nodes they concern, and
//! the host node for each is read straight off the trees: old-tree nodes for
//! REMOVE and REPLACE, new-tree nodes (forwarded or freshly materialized)
//! for everything else.

use std::collections::BTreeMap;

use tracing::{debug, trace};
use vdom_diff::{Patch, PatchSet, PropDelta};
use vdom_types::{HostId, NodeId, TreeError, VTree};

use crate::error::{ApplyError, ApplyResult};
use crate::host::HostTree;
use crate::materialize::materialize;

/// Summary of one [`apply_patches`] run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Patches applied.
    pub applied: usize,
    /// Subtrees materialized for INSERT and REPLACE.
    pub materialized: usize,
    /// Nodes repositioned during placement, inserts included.
    pub placed: usize,
    /// New root host node, when the root was inserted or replaced.
    pub root: Option<HostId>,
}

/// Apply key-based patches to `host`.
///
/// Runs in three steps:
///
/// 1. Every INSERT and REPLACE subtree is materialized, binding host refs on
///    `new`.
/// 2. REMOVE, REPLACE and UPDATE are applied in list order.
/// 3. Inserted and moved nodes are placed, per parent, from the last new
///    sibling to the first, each before its next sibling's host node.
///
/// A root INSERT is materialized but not attached; its handle is returned in
/// [`ApplyReport::root`]. The first failure aborts the run and mutations
/// already made are kept.
pub fn apply_patches<H: HostTree + ?Sized>(
    host: &mut H,
    old: &VTree,
    new: &mut VTree,
    patches: &PatchSet,
) -> ApplyResult<ApplyReport> {
    let mut report = ApplyReport::default();

    for patch in patches {
        if let Patch::Insert { new: node } | Patch::Replace { new: node, .. } = patch {
            let handle = materialize(host, new, *node)?;
            report.materialized += 1;
            if *node == new.root() {
                report.root = Some(handle);
            }
        }
    }

    let mut placements: BTreeMap<NodeId, Vec<(usize, NodeId)>> = BTreeMap::new();
    for patch in patches {
        trace!(kind = %patch.kind(), "applying patch");
        match patch {
            Patch::Remove { old: node } => {
                let handle = old_host(old, *node)?;
                let parent = host.parent(handle).ok_or(ApplyError::MissingParent(handle))?;
                host.remove_child(parent, handle)?;
            }
            Patch::Replace { old: from, new: to } => {
                let previous = old_host(old, *from)?;
                let next = new_host(new, *to)?;
                let parent = host
                    .parent(previous)
                    .ok_or(ApplyError::MissingParent(previous))?;
                host.insert_before(parent, next, previous)?;
                host.remove_child(parent, previous)?;
            }
            Patch::Update { new: node, delta, .. } => {
                let handle = new_host(new, *node)?;
                apply_delta(host, handle, delta)?;
            }
            Patch::Insert { new: node } | Patch::Move { new: node, .. } => {
                let vnode = new.get(*node).ok_or(TreeError::UnknownNode(*node))?;
                if let Some(parent) = vnode.parent {
                    placements
                        .entry(parent)
                        .or_default()
                        .push((vnode.sibling_index, *node));
                }
            }
        }
        report.applied += 1;
    }

    for (parent, mut children) in placements {
        let parent_host = new_host(new, parent)?;
        let siblings = new.children(parent);
        children.sort_by_key(|(index, _)| std::cmp::Reverse(*index));
        for (index, child) in children {
            let handle = new_host(new, child)?;
            match siblings.get(index + 1) {
                Some(next) => {
                    let anchor = new_host(new, *next)?;
                    host.insert_before(parent_host, handle, anchor)?;
                }
                None => host.append_child(parent_host, handle)?,
            }
            report.placed += 1;
        }
    }

    debug!(
        applied = report.applied,
        materialized = report.materialized,
        placed = report.placed,
        "patches applied"
    );
    Ok(report)
}

/// Set or erase each prop in `delta` on `node`.
pub(crate) fn apply_delta<H: HostTree + ?Sized>(
    host: &mut H,
    node: HostId,
    delta: &PropDelta,
) -> ApplyResult<()> {
    for (name, value) in delta {
        match value {
            Some(value) => host.set_attribute(node, name, value)?,
            None => host.remove_attribute(node, name)?,
        }
    }
    Ok(())
}

fn old_host(old: &VTree, node: NodeId) -> ApplyResult<HostId> {
    old.get(node)
        .and_then(|n| n.host())
        .ok_or(ApplyError::MissingHostRef(node))
}

fn new_host(new: &VTree, node: NodeId) -> ApplyResult<HostId> {
    new.get(node)
        .and_then(|n| n.host())
        .ok_or(ApplyError::MissingHostRef(node))
}
