//! Patch vocabulary shared by both diff strategies.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vdom_types::NodeId;

use crate::delta::PropDelta;
use crate::error::DiffError;

/// The kind of a patch, independent of its addressing scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatchKind {
    /// A new node, with its subtree, has no host counterpart yet.
    Insert,
    /// A host node and its subtree must be detached.
    Remove,
    /// Same slot, incompatible kind: the subtree is rebuilt.
    Replace,
    /// Compatible kind, props changed.
    Update,
    /// Compatible kind, position among siblings changed.
    Move,
}

impl PatchKind {
    pub const ALL: [PatchKind; 5] = [
        PatchKind::Insert,
        PatchKind::Remove,
        PatchKind::Replace,
        PatchKind::Update,
        PatchKind::Move,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Remove => "REMOVE",
            Self::Replace => "REPLACE",
            Self::Update => "UPDATE",
            Self::Move => "MOVE",
        }
    }
}

impl fmt::Display for PatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatchKind {
    type Err = DiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DiffError::UnknownPatchKind(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Reference-addressed patches
// ---------------------------------------------------------------------------

/// A patch addressed by the old/new virtual nodes it concerns.
///
/// `old` ids point into the old tree, `new` ids into the new tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Patch {
    Insert {
        new: NodeId,
    },
    Remove {
        old: NodeId,
    },
    Replace {
        old: NodeId,
        new: NodeId,
    },
    Update {
        old: NodeId,
        new: NodeId,
        delta: PropDelta,
    },
    Move {
        old: NodeId,
        new: NodeId,
        from: usize,
        to: usize,
    },
}

impl Patch {
    pub fn kind(&self) -> PatchKind {
        match self {
            Self::Insert { .. } => PatchKind::Insert,
            Self::Remove { .. } => PatchKind::Remove,
            Self::Replace { .. } => PatchKind::Replace,
            Self::Update { .. } => PatchKind::Update,
            Self::Move { .. } => PatchKind::Move,
        }
    }

    /// The old-tree node this patch concerns, if any.
    pub fn old_node(&self) -> Option<NodeId> {
        match self {
            Self::Insert { .. } => None,
            Self::Remove { old }
            | Self::Replace { old, .. }
            | Self::Update { old, .. }
            | Self::Move { old, .. } => Some(*old),
        }
    }

    /// The new-tree node this patch concerns, if any.
    pub fn new_node(&self) -> Option<NodeId> {
        match self {
            Self::Remove { .. } => None,
            Self::Insert { new }
            | Self::Replace { new, .. }
            | Self::Update { new, .. }
            | Self::Move { new, .. } => Some(*new),
        }
    }
}

/// An ordered list of reference-addressed patches.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchSet {
    patches: Vec<Patch>,
}

impl PatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, patch: Patch) {
        self.patches.push(patch);
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Patch> {
        self.patches.iter()
    }

    pub fn as_slice(&self) -> &[Patch] {
        &self.patches
    }

    pub fn into_vec(self) -> Vec<Patch> {
        self.patches
    }

    /// Number of patches of the given kind.
    pub fn count(&self, kind: PatchKind) -> usize {
        self.patches.iter().filter(|p| p.kind() == kind).count()
    }

    /// Patches concerning the given new-tree node.
    pub fn for_new(&self, node: NodeId) -> impl Iterator<Item = &Patch> {
        self.patches
            .iter()
            .filter(move |p| p.new_node() == Some(node))
    }
}

impl From<Vec<Patch>> for PatchSet {
    fn from(patches: Vec<Patch>) -> Self {
        Self { patches }
    }
}

impl<'a> IntoIterator for &'a PatchSet {
    type Item = &'a Patch;
    type IntoIter = std::slice::Iter<'a, Patch>;

    fn into_iter(self) -> Self::IntoIter {
        self.patches.iter()
    }
}

// ---------------------------------------------------------------------------
// Index-addressed patches
// ---------------------------------------------------------------------------

/// A patch applied to the host node found at a pre-order traversal index.
///
/// `node` ids point into the new tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexedPatch {
    /// Materialize `node` and place it as child `position` of the host node.
    Insert { node: NodeId, position: usize },
    /// Detach the host node from its parent.
    Remove,
    /// Swap the host node for a materialized `node`.
    Replace { node: NodeId },
    /// Apply a prop delta to the host node.
    Update { delta: PropDelta },
    /// Reposition the host node among its siblings.
    Move { to: usize },
}

impl IndexedPatch {
    pub fn kind(&self) -> PatchKind {
        match self {
            Self::Insert { .. } => PatchKind::Insert,
            Self::Remove => PatchKind::Remove,
            Self::Replace { .. } => PatchKind::Replace,
            Self::Update { .. } => PatchKind::Update,
            Self::Move { .. } => PatchKind::Move,
        }
    }
}

/// Index-addressed patches, grouped by traversal index.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexedPatches {
    entries: BTreeMap<usize, Vec<IndexedPatch>>,
}

impl IndexedPatches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, index: usize, patch: IndexedPatch) {
        self.entries.entry(index).or_default().push(patch);
    }

    /// Patches recorded for `index`, in emission order.
    pub fn get(&self, index: usize) -> Option<&[IndexedPatch]> {
        self.entries.get(&index).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of patches across all indexes.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Indexes that carry at least one patch, ascending.
    pub fn indexes(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &IndexedPatch)> {
        self.entries
            .iter()
            .flat_map(|(index, patches)| patches.iter().map(move |p| (*index, p)))
    }

    pub fn count(&self, kind: PatchKind) -> usize {
        self.iter().filter(|(_, p)| p.kind() == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_kind_parses_case_insensitively() {
        assert_eq!("move".parse::<PatchKind>().unwrap(), PatchKind::Move);
        assert_eq!("REPLACE".parse::<PatchKind>().unwrap(), PatchKind::Replace);
    }

    #[test]
    fn unknown_patch_kind_is_an_error() {
        let err = "REORDER".parse::<PatchKind>().unwrap_err();
        assert_eq!(err, DiffError::UnknownPatchKind("REORDER".into()));
    }

    #[test]
    fn patch_accessors() {
        let n = NodeId::new;
        let patch = Patch::Replace { old: n(1), new: n(2) };
        assert_eq!(patch.kind(), PatchKind::Replace);
        assert_eq!(patch.old_node(), Some(n(1)));
        assert_eq!(patch.new_node(), Some(n(2)));
        assert_eq!(Patch::Insert { new: n(3) }.old_node(), None);
        assert_eq!(Patch::Remove { old: n(3) }.new_node(), None);
    }

    #[test]
    fn patch_serializes_with_kind_tag() {
        let json = serde_json::to_value(Patch::Move {
            old: NodeId::new(2),
            new: NodeId::new(4),
            from: 1,
            to: 0,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "MOVE", "old": 2, "new": 4, "from": 1, "to": 0})
        );
    }

    #[test]
    fn unknown_tag_fails_to_deserialize() {
        let result: Result<Patch, _> =
            serde_json::from_value(serde_json::json!({"kind": "REORDER", "old": 1}));
        assert!(result.is_err());
    }

    #[test]
    fn patch_set_counts_by_kind() {
        let n = NodeId::new;
        let set = PatchSet::from(vec![
            Patch::Insert { new: n(1) },
            Patch::Insert { new: n(2) },
            Patch::Remove { old: n(3) },
        ]);
        assert_eq!(set.len(), 3);
        assert_eq!(set.count(PatchKind::Insert), 2);
        assert_eq!(set.count(PatchKind::Move), 0);
        assert_eq!(set.for_new(n(2)).count(), 1);
    }

    #[test]
    fn indexed_patches_group_by_index() {
        let mut patches = IndexedPatches::new();
        patches.push(3, IndexedPatch::Remove);
        patches.push(0, IndexedPatch::Update { delta: PropDelta::new() });
        patches.push(0, IndexedPatch::Insert { node: NodeId::new(5), position: 2 });

        assert_eq!(patches.len(), 3);
        assert_eq!(patches.indexes().collect::<Vec<_>>(), vec![0, 3]);
        assert_eq!(patches.get(0).unwrap()[1].kind(), PatchKind::Insert);
        assert!(patches.get(1).is_none());
        assert_eq!(patches.count(PatchKind::Remove), 1);
    }
}
