//! Key-based diff.
//!
//! Siblings are correlated by `(kind, key)` first. Old siblings that find no
//! keyed partner are bucketed by kind and handed, in order, to new siblings
//! of the same kind that are still unpaired, so homogeneous lists reuse host
//! nodes instead of rebuilding them. Whatever is left over in the buckets is
//! removed.
//!
//! The work is split into per-node units ([`diff_unit`]): a unit diffs one new
//! node against its pairing and returns the pairings of its children. Driving
//! units depth-first ([`diff_keyed`]) or from a fiber scheduler yields the same
//! patch list.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;
use vdom_types::{Key, NodeId, NodeKind, VTree};

use crate::delta::diff_props;
use crate::error::{DiffError, DiffResult};
use crate::ignore::{forward_ignored, ignores_children};
use crate::lis::longest_increasing_subsequence;
use crate::patch::{Patch, PatchSet};

/// How a new node relates to the old tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pairing {
    /// Diffed against `old`. `moved` marks nodes that must be repositioned.
    Matched { old: NodeId, moved: bool },
    /// No old counterpart; the node is inserted with its subtree.
    Fresh,
    /// Inside a subtree that an ancestor's INSERT or REPLACE already builds.
    Covered,
}

/// Result of reconciling one child list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChildPlan {
    /// Every new child, in order, with its pairing.
    pub pairings: Vec<(NodeId, Pairing)>,
    /// Old children nobody claimed, in old order.
    pub removals: Vec<NodeId>,
}

/// Pair the children of `new_parent` with the children of `old_parent`.
pub fn reconcile_children(
    old: &VTree,
    old_parent: NodeId,
    new: &VTree,
    new_parent: NodeId,
) -> DiffResult<ChildPlan> {
    let old_children = old.children(old_parent);
    let new_children = new.children(new_parent);

    let mut pending: HashMap<&Key, usize> = HashMap::new();
    for (pos, &child) in new_children.iter().enumerate() {
        if let Some(key) = &new[child].key {
            if pending.insert(key, pos).is_some() {
                return Err(DiffError::DuplicateKey {
                    key: key.clone(),
                    parent: new_parent,
                });
            }
        }
    }

    let mut slots: Vec<Option<NodeId>> = vec![None; new_children.len()];
    let mut buckets: HashMap<&NodeKind, VecDeque<NodeId>> = HashMap::new();

    for &old_child in old_children {
        let node = &old[old_child];
        let keyed_pos = node
            .key
            .as_ref()
            .and_then(|key| pending.get(key).copied())
            .filter(|&pos| new[new_children[pos]].kind == node.kind);

        match keyed_pos {
            Some(pos) => {
                if let Some(key) = &node.key {
                    pending.remove(key);
                }
                slots[pos] = Some(old_child);
            }
            None => buckets.entry(&node.kind).or_default().push_back(old_child),
        }
    }

    for (pos, &new_child) in new_children.iter().enumerate() {
        if slots[pos].is_some() {
            continue;
        }
        slots[pos] = buckets
            .get_mut(&new[new_child].kind)
            .and_then(VecDeque::pop_front);
    }

    // Matched children on the longest run of increasing old positions stay
    // put; every other matched child moves.
    let matched: Vec<usize> = slots
        .iter()
        .enumerate()
        .filter_map(|(pos, slot)| slot.map(|_| pos))
        .collect();
    let old_positions: Vec<usize> = matched
        .iter()
        .filter_map(|&pos| slots[pos].map(|o| old[o].sibling_index))
        .collect();
    let stable: HashSet<usize> = longest_increasing_subsequence(&old_positions)
        .into_iter()
        .map(|i| matched[i])
        .collect();

    let pairings = new_children
        .iter()
        .zip(&slots)
        .enumerate()
        .map(|(pos, (&child, slot))| {
            let pairing = match slot {
                Some(old_child) => Pairing::Matched {
                    old: *old_child,
                    moved: !stable.contains(&pos),
                },
                None => Pairing::Fresh,
            };
            (child, pairing)
        })
        .collect();

    let claimed: HashSet<NodeId> = slots.iter().flatten().copied().collect();
    let removals = old_children
        .iter()
        .copied()
        .filter(|child| !claimed.contains(child))
        .collect();

    Ok(ChildPlan { pairings, removals })
}

/// Diff one new node against its pairing and return its children's pairings.
///
/// Patches are appended to `sink`. On a kind match the old node's host ref is
/// forwarded onto the new node. Children of a node that ignores its children
/// come back [`Pairing::Covered`].
pub fn diff_unit(
    old: &VTree,
    new: &mut VTree,
    node: NodeId,
    pairing: Pairing,
    sink: &mut PatchSet,
) -> DiffResult<Vec<(NodeId, Pairing)>> {
    let old_id = match pairing {
        Pairing::Covered => return Ok(covered_children(new, node)),
        Pairing::Fresh => {
            sink.push(Patch::Insert { new: node });
            return Ok(covered_children(new, node));
        }
        Pairing::Matched { old, .. } => old,
    };

    let old_node = old.get(old_id).ok_or(DiffError::UnknownNode(old_id))?;
    if old_node.kind != new[node].kind {
        sink.push(Patch::Replace {
            old: old_id,
            new: node,
        });
        return Ok(covered_children(new, node));
    }

    let delta = diff_props(&old_node.props, &new[node].props);
    if !delta.is_empty() {
        sink.push(Patch::Update {
            old: old_id,
            new: node,
            delta,
        });
    }

    if let Pairing::Matched { moved: true, .. } = pairing {
        sink.push(Patch::Move {
            old: old_id,
            new: node,
            from: old_node.sibling_index,
            to: new[node].sibling_index,
        });
    }

    new.forward_host(node, old_node.host())?;

    if ignores_children(&new[node]) {
        forward_ignored(old, old_id, new, node)?;
        return Ok(covered_children(new, node));
    }

    let plan = reconcile_children(old, old_id, new, node)?;
    for removed in plan.removals {
        sink.push(Patch::Remove { old: removed });
    }
    Ok(plan.pairings)
}

fn covered_children(new: &VTree, node: NodeId) -> Vec<(NodeId, Pairing)> {
    new.children(node)
        .iter()
        .map(|&child| (child, Pairing::Covered))
        .collect()
}

/// Diff two optional nodes and everything below them.
///
/// Neither present is a no-op, a missing new node is a REMOVE, a missing old
/// node an INSERT of the whole new subtree.
pub fn diff_nodes(
    old: &VTree,
    old_node: Option<NodeId>,
    new: &mut VTree,
    new_node: Option<NodeId>,
    sink: &mut PatchSet,
) -> DiffResult<()> {
    let new_node = match (old_node, new_node) {
        (None, None) => return Ok(()),
        (Some(old_node), None) => {
            sink.push(Patch::Remove { old: old_node });
            return Ok(());
        }
        (_, Some(new_node)) => new_node,
    };

    let root_pairing = match old_node {
        Some(old_node) => Pairing::Matched {
            old: old_node,
            moved: false,
        },
        None => Pairing::Fresh,
    };

    let mut stack = vec![(new_node, root_pairing)];
    while let Some((node, pairing)) = stack.pop() {
        let children = diff_unit(old, new, node, pairing, sink)?;
        stack.extend(children.into_iter().rev());
    }
    Ok(())
}

/// Key-based diff of two whole trees.
///
/// With no old tree the result is a single INSERT of the new root.
pub fn diff_keyed(old: Option<&VTree>, new: &mut VTree) -> DiffResult<PatchSet> {
    let mut patches = PatchSet::new();
    match old {
        Some(old) => diff_nodes(old, Some(old.root()), new, Some(new.root()), &mut patches)?,
        None => patches.push(Patch::Insert { new: new.root() }),
    }
    debug!(patches = patches.len(), nodes = new.len(), "keyed diff complete");
    Ok(patches)
}
