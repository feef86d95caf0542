//! Arena-backed virtual tree.
//!
//! [`VTree`] stores every [`VNode`] in a flat table and links them with
//! [`NodeId`] indexes, so back references (`parent`, host refs) never form
//! ownership cycles and the whole tree serializes as plain data.
//!
//! # Invariants
//!
//! - Node ids are assigned in pre-order; the root is always the first slot.
//! - Sibling keys are unique within every child list.
//! - A node's host ref, once bound, is never rebound to a different host node.

use std::collections::HashSet;
use std::ops::Index;

use serde::Serialize;

use crate::element::Element;
use crate::error::{TreeError, TreeResult};
use crate::id::{HostId, Key, NodeId};
use crate::kind::{NodeKind, Props};

/// One node of a [`VTree`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VNode {
    pub kind: NodeKind,
    pub props: Props,
    pub key: Option<Key>,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    /// Position among siblings when the tree was built.
    pub sibling_index: usize,
    host: Option<HostId>,
}

impl VNode {
    /// Host node this virtual node produced or reused, if any.
    pub fn host(&self) -> Option<HostId> {
        self.host
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Text content for text nodes.
    pub fn text(&self) -> Option<&str> {
        if !self.kind.is_text() {
            return None;
        }
        self.props.get(crate::kind::TEXT_VALUE).and_then(|v| v.as_str())
    }
}

/// A virtual tree flattened into an arena.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VTree {
    nodes: Vec<VNode>,
    root: NodeId,
}

impl VTree {
    /// Flatten an element into a tree.
    ///
    /// Components are expanded into a component node whose only child is the
    /// rendered element. Fails without producing a tree if any child list
    /// contains a duplicate key.
    pub fn build(root: Element) -> TreeResult<Self> {
        let mut nodes: Vec<VNode> = Vec::with_capacity(root.count());
        let mut stack: Vec<(Element, Option<NodeId>, usize)> = vec![(root, None, 0)];

        while let Some((mut element, parent, sibling_index)) = stack.pop() {
            if nodes.len() >= u32::MAX as usize {
                return Err(TreeError::TooLarge(u32::MAX as usize));
            }
            let id = NodeId::new(nodes.len() as u32);

            if let NodeKind::Component(component) = &element.kind {
                element.children = vec![component.render(&element.props)];
            }
            check_unique_keys(&element)?;

            let children = std::mem::take(&mut element.children);
            for (index, child) in children.into_iter().enumerate().rev() {
                stack.push((child, Some(id), index));
            }

            if let Some(parent) = parent {
                nodes[parent.index()].children.push(id);
            }
            nodes.push(VNode {
                kind: element.kind,
                props: element.props,
                key: element.key,
                children: Vec::new(),
                parent,
                sibling_index,
                host: None,
            });
        }

        Ok(Self {
            nodes,
            root: NodeId::new(0),
        })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&VNode> {
        self.nodes.get(id.index())
    }

    /// Mutable access to a node. Host refs stay write-once through
    /// [`bind_host`](Self::bind_host).
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut VNode> {
        self.nodes.get_mut(id.index())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self[id].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self[id].parent
    }

    pub fn host(&self, id: NodeId) -> Option<HostId> {
        self[id].host
    }

    /// Record the host node produced for `id`.
    ///
    /// Binding the same host twice is a no-op; binding a different one is an
    /// error, since a virtual node owns at most one host node per lifetime.
    pub fn bind_host(&mut self, id: NodeId, host: HostId) -> TreeResult<()> {
        let node = self
            .nodes
            .get_mut(id.index())
            .ok_or(TreeError::UnknownNode(id))?;
        match node.host {
            Some(bound) if bound != host => Err(TreeError::HostAlreadyBound {
                node: id,
                bound,
                requested: host,
            }),
            _ => {
                node.host = Some(host);
                Ok(())
            }
        }
    }

    /// Carry a reused host ref over from the old tree.
    pub fn forward_host(&mut self, id: NodeId, host: Option<HostId>) -> TreeResult<()> {
        match host {
            Some(host) => self.bind_host(id, host),
            None => Ok(()),
        }
    }

    /// Find the child of `parent` carrying `key`.
    pub fn child_by_key(&self, parent: NodeId, key: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&child| self[child].key.as_ref().is_some_and(|k| k.as_str() == key))
    }

    /// Pre-order walk over the whole tree.
    pub fn preorder(&self) -> Preorder<'_> {
        self.subtree(self.root)
    }

    /// Pre-order walk over the subtree rooted at `id`.
    pub fn subtree(&self, id: NodeId) -> Preorder<'_> {
        Preorder {
            tree: self,
            stack: vec![id],
        }
    }

    /// Number of nodes in the subtree rooted at `id`, including `id`.
    pub fn subtree_size(&self, id: NodeId) -> usize {
        self.subtree(id).count()
    }

    /// All nodes with their ids, in arena order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &VNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId::new(i as u32), node))
    }
}

impl Index<NodeId> for VTree {
    type Output = VNode;

    fn index(&self, id: NodeId) -> &VNode {
        &self.nodes[id.index()]
    }
}

/// Iterative pre-order traversal.
pub struct Preorder<'a> {
    tree: &'a VTree,
    stack: Vec<NodeId>,
}

impl Iterator for Preorder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}

fn check_unique_keys(element: &Element) -> TreeResult<()> {
    let mut seen = HashSet::new();
    for key in element.children.iter().filter_map(|c| c.key.as_ref()) {
        if !seen.insert(key) {
            return Err(TreeError::DuplicateKey {
                key: key.clone(),
                parent: element.kind.name().to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::ComponentRef;

    fn list() -> Element {
        Element::new("div").child(
            Element::new("ul")
                .child(Element::new("li").key("a").child("X"))
                .child(Element::new("li").key("b").child("Y")),
        )
    }

    #[test]
    fn build_assigns_preorder_ids() {
        let tree = VTree::build(list()).unwrap();
        assert_eq!(tree.len(), 6);

        let kinds: Vec<String> = tree.preorder().map(|id| tree[id].kind.to_string()).collect();
        assert_eq!(kinds, ["div", "ul", "li", "#text", "li", "#text"]);

        let arena: Vec<NodeId> = tree.nodes().map(|(id, _)| id).collect();
        let walk: Vec<NodeId> = tree.preorder().collect();
        assert_eq!(arena, walk);
    }

    #[test]
    fn build_links_parents_and_sibling_indexes() {
        let tree = VTree::build(list()).unwrap();
        let ul = tree.children(tree.root())[0];
        let b = tree.child_by_key(ul, "b").unwrap();

        assert_eq!(tree.parent(b), Some(ul));
        assert_eq!(tree[b].sibling_index, 1);
        assert_eq!(tree.parent(tree.root()), None);
        assert_eq!(tree[tree.children(b)[0]].text(), Some("Y"));
    }

    #[test]
    fn duplicate_sibling_keys_are_rejected() {
        let el = Element::new("ul")
            .child(Element::new("li").key("a"))
            .child(Element::new("li").key("a"));
        let err = VTree::build(el).unwrap_err();
        assert_eq!(
            err,
            TreeError::DuplicateKey {
                key: Key::from("a"),
                parent: "ul".into(),
            }
        );
    }

    #[test]
    fn same_key_in_different_lists_is_fine() {
        let el = Element::new("div")
            .child(Element::new("ul").child(Element::new("li").key("a")))
            .child(Element::new("ul").child(Element::new("li").key("a")));
        assert!(VTree::build(el).is_ok());
    }

    #[test]
    fn components_render_a_single_child() {
        fn greeting(props: &Props) -> Element {
            let name = props.get("name").and_then(|v| v.as_str()).unwrap_or("?");
            Element::new("p").child(format!("hello {name}"))
        }

        let mut props = Props::new();
        props.insert("name".into(), "ada".into());
        let el = Element::new("div")
            .child(Element::component(ComponentRef::new("Greeting", greeting), props));

        let tree = VTree::build(el).unwrap();
        let component = tree.children(tree.root())[0];
        assert_eq!(tree[component].kind.name(), "Greeting");
        assert_eq!(tree.children(component).len(), 1);

        let p = tree.children(component)[0];
        assert_eq!(tree[tree.children(p)[0]].text(), Some("hello ada"));
    }

    #[test]
    fn host_binding_is_write_once() {
        let mut tree = VTree::build(list()).unwrap();
        let root = tree.root();

        tree.bind_host(root, HostId::new(1)).unwrap();
        tree.bind_host(root, HostId::new(1)).unwrap();
        assert!(matches!(
            tree.bind_host(root, HostId::new(2)),
            Err(TreeError::HostAlreadyBound { .. })
        ));
        assert_eq!(tree.host(root), Some(HostId::new(1)));

        tree.forward_host(tree.children(root)[0], None).unwrap();
        assert_eq!(tree.host(tree.children(root)[0]), None);
    }

    #[test]
    fn subtree_sizes() {
        let tree = VTree::build(list()).unwrap();
        let ul = tree.children(tree.root())[0];
        assert_eq!(tree.subtree_size(tree.root()), 6);
        assert_eq!(tree.subtree_size(ul), 5);
        assert_eq!(tree.subtree_size(tree.children(ul)[0]), 2);
    }

    #[test]
    fn unknown_node_binding_fails() {
        let mut tree = VTree::build(Element::new("div")).unwrap();
        assert_eq!(
            tree.bind_host(NodeId::new(9), HostId::new(1)),
            Err(TreeError::UnknownNode(NodeId::new(9)))
        );
    }

    #[test]
    fn tree_serializes_as_plain_data() {
        let tree = VTree::build(Element::new("p").child("hi")).unwrap();
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["root"], 0);
        assert_eq!(json["nodes"][1]["parent"], 0);
        assert_eq!(json["nodes"][1]["props"]["value"], "hi");
    }
}
