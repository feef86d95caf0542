//! Index-addressed replay.
//!
//! The host tree is walked in pre-order with a running counter. Each node's
//! child list is snapshotted before anything below it changes, and a node's
//! own patches run only after its children were visited, so structural
//! mutations never shift the numbering of nodes still to be reached.

use tracing::debug;
use vdom_diff::{IndexedPatch, IndexedPatches};
use vdom_types::{HostId, VTree};

use crate::apply::apply_delta;
use crate::error::{ApplyError, ApplyResult};
use crate::host::HostTree;
use crate::materialize::materialize;

/// Summary of one [`apply_indexed`] run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayReport {
    /// Root host node after the run. Differs from the input root when the
    /// root was replaced.
    pub root: HostId,
    /// Host nodes visited by the walk.
    pub visited: usize,
    pub applied: usize,
}

enum Visit {
    Enter(HostId),
    Exit(HostId, usize),
}

/// Apply position-based patches to the host tree rooted at `root`.
///
/// Indexes the walk never reaches are ignored. New nodes referenced by
/// INSERT and REPLACE are materialized from `new`.
pub fn apply_indexed<H: HostTree + ?Sized>(
    host: &mut H,
    root: HostId,
    new: &mut VTree,
    patches: &IndexedPatches,
) -> ApplyResult<ReplayReport> {
    let mut report = ReplayReport {
        root,
        visited: 0,
        applied: 0,
    };
    let mut stack = vec![Visit::Enter(root)];

    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Enter(node) => {
                let index = report.visited;
                report.visited += 1;
                stack.push(Visit::Exit(node, index));
                let children = host.children(node)?;
                stack.extend(children.into_iter().rev().map(Visit::Enter));
            }
            Visit::Exit(node, index) => {
                if let Some(entry) = patches.get(index) {
                    apply_entry(host, node, new, entry, &mut report)?;
                }
            }
        }
    }

    debug!(
        visited = report.visited,
        applied = report.applied,
        "indexed patches applied"
    );
    Ok(report)
}

fn apply_entry<H: HostTree + ?Sized>(
    host: &mut H,
    node: HostId,
    new: &mut VTree,
    entry: &[IndexedPatch],
    report: &mut ReplayReport,
) -> ApplyResult<()> {
    // Materialize first so placement below always has its host nodes.
    let mut built = Vec::new();
    for patch in entry {
        if let IndexedPatch::Insert { node: id, .. } | IndexedPatch::Replace { node: id } = patch {
            built.push(materialize(host, new, *id)?);
        }
    }
    let mut built = built.into_iter();

    for patch in entry {
        match patch {
            IndexedPatch::Remove => {
                let parent = host.parent(node).ok_or(ApplyError::MissingParent(node))?;
                host.remove_child(parent, node)?;
            }
            IndexedPatch::Replace { node: id } => {
                let next = built.next().ok_or(ApplyError::MissingHostRef(*id))?;
                let parent = host.parent(node).ok_or(ApplyError::MissingParent(node))?;
                host.insert_before(parent, next, node)?;
                host.remove_child(parent, node)?;
                if node == report.root {
                    report.root = next;
                }
            }
            IndexedPatch::Update { delta } => apply_delta(host, node, delta)?,
            IndexedPatch::Insert { node: id, position } => {
                let child = built.next().ok_or(ApplyError::MissingHostRef(*id))?;
                match host.children(node)?.get(*position) {
                    Some(reference) => host.insert_before(node, child, *reference)?,
                    None => host.append_child(node, child)?,
                }
            }
            IndexedPatch::Move { to } => {
                let parent = host.parent(node).ok_or(ApplyError::MissingParent(node))?;
                let siblings: Vec<HostId> = host
                    .children(parent)?
                    .into_iter()
                    .filter(|sibling| *sibling != node)
                    .collect();
                match siblings.get(*to) {
                    Some(reference) => host.insert_before(parent, node, *reference)?,
                    None => host.append_child(parent, node)?,
                }
            }
        }
        report.applied += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materialize::mount;
    use crate::memory::MemoryHost;
    use vdom_diff::diff_positional;
    use vdom_types::Element;

    fn mounted(tree: &mut VTree) -> (MemoryHost, HostId, HostId) {
        let mut host = MemoryHost::new();
        let container = host.create_container("main");
        let root = mount(&mut host, container, tree).unwrap();
        (host, container, root)
    }

    fn items(texts: &[&str]) -> VTree {
        VTree::build(
            Element::new("ul").children(texts.iter().map(|t| Element::new("li").child(*t))),
        )
        .unwrap()
    }

    fn replay(old: &mut VTree, new: &mut VTree) -> (MemoryHost, HostId, ReplayReport) {
        let (mut host, container, root) = mounted(old);
        let patches = diff_positional(old, new).unwrap();
        let report = apply_indexed(&mut host, root, new, &patches).unwrap();
        (host, container, report)
    }

    #[test]
    fn text_updates_in_place() {
        let mut old = items(&["a", "b"]);
        let mut new = items(&["a", "B"]);
        let (host, container, report) = replay(&mut old, &mut new);

        assert_eq!(host.render_children(container), "<ul><li>a</li><li>B</li></ul>");
        assert_eq!(report.applied, 1);
        assert_eq!(report.visited, 5);
        assert_eq!(host.created(), 6);
    }

    #[test]
    fn trailing_children_are_inserted_and_removed() {
        let mut old = items(&["a"]);
        let mut new = items(&["a", "b", "c"]);
        let (host, container, _) = replay(&mut old, &mut new);
        assert_eq!(
            host.render_children(container),
            "<ul><li>a</li><li>b</li><li>c</li></ul>"
        );

        let mut old = items(&["a", "b", "c"]);
        let mut new = items(&["a"]);
        let (host, container, _) = replay(&mut old, &mut new);
        assert_eq!(host.render_children(container), "<ul><li>a</li></ul>");
    }

    #[test]
    fn replaced_root_is_reported() {
        let mut old = items(&["a"]);
        let mut new = VTree::build(Element::new("ol").child(Element::new("li").child("a"))).unwrap();
        let (host, container, report) = replay(&mut old, &mut new);

        assert_eq!(host.render_children(container), "<ol><li>a</li></ol>");
        assert_eq!(Some(report.root), new.host(new.root()));
    }

    #[test]
    fn replace_inside_list_keeps_later_numbering() {
        let mut old = VTree::build(Element::new("div").children([
            Element::new("p").child("one"),
            Element::new("p").child("two"),
        ]))
        .unwrap();
        let mut new = VTree::build(Element::new("div").children([
            Element::new("h1").child("one"),
            Element::new("p").child("TWO"),
        ]))
        .unwrap();
        let (host, container, _) = replay(&mut old, &mut new);
        assert_eq!(
            host.render_children(container),
            "<div><h1>one</h1><p>TWO</p></div>"
        );
    }

    #[test]
    fn middle_insert_rewrites_later_siblings() {
        let mut old = items(&["a", "c"]);
        let mut new = items(&["a", "b", "c"]);
        let (host, container, report) = replay(&mut old, &mut new);

        assert_eq!(
            host.render_children(container),
            "<ul><li>a</li><li>b</li><li>c</li></ul>"
        );
        // "c" was rewritten to "b" and a fresh "c" appended.
        assert_eq!(report.applied, 2);
        assert_eq!(host.created(), 8);
    }

    #[test]
    fn missing_indexes_are_ignored() {
        let mut tree = items(&["a"]);
        let (mut host, container, root) = mounted(&mut tree);
        let mut patches = IndexedPatches::new();
        patches.push(99, IndexedPatch::Remove);

        let report = apply_indexed(&mut host, root, &mut tree, &patches).unwrap();
        assert_eq!(report.applied, 0);
        assert_eq!(host.render_children(container), "<ul><li>a</li></ul>");
    }

    #[test]
    fn move_repositions_among_siblings() {
        let mut tree = items(&["a", "b", "c"]);
        let (mut host, container, root) = mounted(&mut tree);
        let mut patches = IndexedPatches::new();
        // index 1 is the first <li>
        patches.push(1, IndexedPatch::Move { to: 2 });

        apply_indexed(&mut host, root, &mut tree, &patches).unwrap();
        assert_eq!(
            host.render_children(container),
            "<ul><li>b</li><li>c</li><li>a</li></ul>"
        );
    }

    #[test]
    fn remove_without_parent_fails() {
        let mut tree = items(&["a"]);
        let mut host = MemoryHost::new();
        let root_id = tree.root();
        let root = crate::materialize::materialize(&mut host, &mut tree, root_id).unwrap();
        let mut patches = IndexedPatches::new();
        patches.push(0, IndexedPatch::Remove);

        let err = apply_indexed(&mut host, root, &mut tree, &patches).unwrap_err();
        assert_eq!(err, ApplyError::MissingParent(root));
    }
}
