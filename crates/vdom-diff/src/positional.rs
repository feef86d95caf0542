//! Position-based diff.
//!
//! Children are compared purely by index and patches are addressed by the
//! pre-order traversal index of the old node, which is also the index of its
//! host node when the host tree is walked the same way. Inserting a node in
//! the middle of a list shifts every later sibling onto the wrong partner;
//! this is a known limitation, and [`diff_keyed`](crate::diff_keyed) exists to
//! avoid it.

use tracing::debug;
use vdom_types::{NodeId, VTree};

use crate::delta::diff_props;
use crate::error::DiffResult;
use crate::ignore::{forward_ignored, ignores_children};
use crate::patch::{IndexedPatch, IndexedPatches};

/// Position-based diff of two whole trees.
///
/// Removed and replaced subtrees still consume their traversal indexes, so
/// the numbering always matches the host tree rendered from `old`. New
/// children beyond the end of the old list are recorded as inserts on their
/// parent's index. Nothing below a node that ignores its children is compared.
pub fn diff_positional(old: &VTree, new: &mut VTree) -> DiffResult<IndexedPatches> {
    let sizes = subtree_sizes(old);
    let mut patches = IndexedPatches::new();
    let mut stack: Vec<(NodeId, Option<NodeId>, usize)> = vec![(old.root(), Some(new.root()), 0)];

    while let Some((old_id, new_id, index)) = stack.pop() {
        let Some(new_id) = new_id else {
            patches.push(index, IndexedPatch::Remove);
            continue;
        };

        let old_node = &old[old_id];
        if old_node.kind != new[new_id].kind {
            patches.push(index, IndexedPatch::Replace { node: new_id });
            continue;
        }

        let delta = diff_props(&old_node.props, &new[new_id].props);
        if !delta.is_empty() {
            patches.push(index, IndexedPatch::Update { delta });
        }
        new.forward_host(new_id, old_node.host())?;

        if ignores_children(&new[new_id]) {
            forward_ignored(old, old_id, new, new_id)?;
            continue;
        }

        let old_children = old.children(old_id);
        let new_children = new.children(new_id);

        let mut child_index = index + 1;
        let mut pending = Vec::with_capacity(old_children.len());
        for (pos, &old_child) in old_children.iter().enumerate() {
            pending.push((old_child, new_children.get(pos).copied(), child_index));
            child_index += sizes[old_child.index()];
        }
        for (position, &node) in new_children.iter().enumerate().skip(old_children.len()) {
            patches.push(index, IndexedPatch::Insert { node, position });
        }

        stack.extend(pending.into_iter().rev());
    }

    debug!(patches = patches.len(), "positional diff complete");
    Ok(patches)
}

/// Subtree size of every node, indexed by arena slot.
fn subtree_sizes(tree: &VTree) -> Vec<usize> {
    let mut sizes = vec![1usize; tree.len()];
    // Children always sit after their parent in the arena.
    for (id, node) in tree.nodes().collect::<Vec<_>>().into_iter().rev() {
        let below: usize = node.children.iter().map(|child| sizes[child.index()]).sum();
        sizes[id.index()] += below;
    }
    sizes
}
