use tracing::debug;
use vdom_types::{HostId, NodeId, TreeError, VTree};

use crate::error::{ApplyError, ApplyResult};
use crate::host::HostTree;

/// Build host nodes for `node` and its whole subtree.
///
/// Every created host node is recorded on its virtual node. The returned
/// root is detached; children are appended in sibling order.
pub fn materialize<H: HostTree + ?Sized>(
    host: &mut H,
    tree: &mut VTree,
    node: NodeId,
) -> ApplyResult<HostId> {
    let mut root = None;
    let mut created = 0usize;
    let mut stack: Vec<(NodeId, Option<HostId>)> = vec![(node, None)];

    while let Some((id, parent)) = stack.pop() {
        let vnode = tree.get(id).ok_or(TreeError::UnknownNode(id))?;
        let handle = host.create_node(vnode)?;
        if !vnode.kind.is_text() {
            for (name, value) in &vnode.props {
                host.set_attribute(handle, name, value)?;
            }
        }
        match parent {
            Some(parent) => host.append_child(parent, handle)?,
            None => root = Some(handle),
        }
        stack.extend(
            vnode
                .children
                .iter()
                .rev()
                .map(|child| (*child, Some(handle))),
        );
        tree.bind_host(id, handle)?;
        created += 1;
    }

    debug!(node = %node, created, "materialized subtree");
    // The stack starts with `node`, so the first iteration always sets it.
    root.ok_or(ApplyError::MissingHostRef(node))
}

/// Materialize the whole tree and append it to `container`.
pub fn mount<H: HostTree + ?Sized>(
    host: &mut H,
    container: HostId,
    tree: &mut VTree,
) -> ApplyResult<HostId> {
    let root = materialize(host, tree, tree.root())?;
    host.append_child(container, root)?;
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryHost;
    use serde_json::json;
    use vdom_types::Element;

    #[test]
    fn mount_builds_every_node() {
        let mut tree = VTree::build(
            Element::new("ul").prop("class", "list").children([
                Element::new("li").key("a").child("A"),
                Element::new("li").key("b").child("B"),
            ]),
        )
        .unwrap();
        let mut host = MemoryHost::new();
        let container = host.create_container("main");

        let root = mount(&mut host, container, &mut tree).unwrap();
        assert_eq!(
            host.render_children(container),
            "<ul class=\"list\"><li>A</li><li>B</li></ul>"
        );
        assert_eq!(tree.host(tree.root()), Some(root));
        assert!(tree.preorder().all(|id| tree.host(id).is_some()));
        // container + five nodes
        assert_eq!(host.created(), 6);
    }

    #[test]
    fn text_props_are_not_set_twice() {
        let mut tree = VTree::build(Element::text("hi")).unwrap();
        let mut host = MemoryHost::new();
        let root_id = tree.root();
        let root = materialize(&mut host, &mut tree, root_id).unwrap();
        assert_eq!(host.render(root), "hi");
        assert_eq!(host.parent(root), None);
    }

    #[test]
    fn subtree_only() {
        let mut tree = VTree::build(
            Element::new("div").children([
                Element::new("input").prop("value", json!("x")),
                Element::new("span"),
            ]),
        )
        .unwrap();
        let input = tree.children(tree.root())[0];
        let mut host = MemoryHost::new();
        let handle = materialize(&mut host, &mut tree, input).unwrap();

        assert_eq!(host.render(handle), "<input value=\"x\"></input>");
        assert_eq!(tree.host(tree.root()), None);
        assert_eq!(host.created(), 1);
    }

    #[test]
    fn unknown_node_is_an_error() {
        let mut tree = VTree::build(Element::new("div")).unwrap();
        let mut host = MemoryHost::new();
        assert_eq!(
            materialize(&mut host, &mut tree, NodeId::new(4)),
            Err(ApplyError::Tree(TreeError::UnknownNode(NodeId::new(4))))
        );
        assert_eq!(host.created(), 0);
    }
}
