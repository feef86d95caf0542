//! Fiber links.
//!
//! A side table over a [`VTree`] that turns its depth-first walk into a
//! loop: each node knows its parent, first child and next sibling, so a walk
//! can stop at any node and resume from it later without a stack.

use vdom_diff::Pairing;
use vdom_types::{NodeId, VTree};

/// Links of one node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Fiber {
    pub parent: Option<NodeId>,
    pub child: Option<NodeId>,
    pub sibling: Option<NodeId>,
    /// Old-tree counterpart, known once the parent's children are reconciled.
    pub alternate: Option<Pairing>,
}

/// Fiber links for every node of a tree.
#[derive(Clone, Debug, PartialEq)]
pub struct FiberTree {
    fibers: Vec<Fiber>,
    root: NodeId,
}

impl FiberTree {
    /// Link every node of `tree`.
    pub fn link(tree: &VTree) -> Self {
        let mut fibers = vec![Fiber::default(); tree.len()];
        for (id, node) in tree.nodes() {
            fibers[id.index()].child = node.children.first().copied();
            for pair in node.children.windows(2) {
                fibers[pair[0].index()].sibling = Some(pair[1]);
            }
            for child in &node.children {
                fibers[child.index()].parent = Some(id);
            }
        }
        Self {
            fibers,
            root: tree.root(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.fibers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fibers.is_empty()
    }

    pub fn get(&self, node: NodeId) -> Option<&Fiber> {
        self.fibers.get(node.index())
    }

    pub fn alternate(&self, node: NodeId) -> Option<Pairing> {
        self.get(node).and_then(|fiber| fiber.alternate)
    }

    pub fn set_alternate(&mut self, node: NodeId, pairing: Pairing) {
        if let Some(fiber) = self.fibers.get_mut(node.index()) {
            fiber.alternate = Some(pairing);
        }
    }

    /// The node after `node` in depth-first order, or `None` when the walk
    /// is complete.
    ///
    /// Prefers the first child, then the next sibling, then climbs to the
    /// nearest ancestor that has a sibling. The walk never leaves the root.
    pub fn next(&self, node: NodeId) -> Option<NodeId> {
        let fiber = self.get(node)?;
        if let Some(child) = fiber.child {
            return Some(child);
        }
        let mut current = node;
        loop {
            if current == self.root {
                return None;
            }
            let fiber = self.get(current)?;
            if let Some(sibling) = fiber.sibling {
                return Some(sibling);
            }
            current = fiber.parent?;
        }
    }

    /// Iterate the walk from the root.
    pub fn walk(&self) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(self.root), move |node| self.next(*node))
    }
}
