//! Resumable diff state.
//!
//! A [`WorkInProgress`] owns both trees, the fiber links, the traversal
//! cursor and the patches collected so far. [`WorkInProgress::run_slice`]
//! consumes it and hands it back when the deadline passes, so suspended
//! work is an ordinary value rather than captured mutable state.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use vdom_diff::{diff_unit, DiffError, DiffResult, Pairing, Patch, PatchSet};
use vdom_types::{HostId, NodeId, VTree};

use crate::clock::Clock;
use crate::link::FiberTree;

/// Identifies one scheduled reconciliation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Outcome of one slice.
#[derive(Debug)]
pub enum Slice {
    /// The deadline passed; resume with the returned state.
    Yielded(WorkInProgress),
    Finished(Completion),
}

/// A finished reconciliation, ready to apply.
#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
    pub session: SessionId,
    pub root: HostId,
    pub patches: PatchSet,
    pub old: Option<VTree>,
    /// The new tree, with host refs forwarded from matched old nodes.
    pub new: VTree,
    /// Diff units processed.
    pub units: usize,
    /// Slices it took, the finishing one included.
    pub slices: usize,
}

/// Suspended key-based diff of `old` against `new`.
#[derive(Debug)]
pub struct WorkInProgress {
    session: SessionId,
    root: HostId,
    old: Option<VTree>,
    new: VTree,
    fibers: FiberTree,
    cursor: Option<NodeId>,
    patches: PatchSet,
    units: usize,
    slices: usize,
}

impl WorkInProgress {
    /// Link `new` and position the cursor at its root.
    ///
    /// With no old tree there is nothing to walk: the only patch is an
    /// INSERT of the new root.
    pub fn new(session: SessionId, root: HostId, old: Option<VTree>, new: VTree) -> Self {
        let mut fibers = FiberTree::link(&new);
        let mut patches = PatchSet::new();
        let cursor = match &old {
            Some(old) => {
                fibers.set_alternate(
                    new.root(),
                    Pairing::Matched {
                        old: old.root(),
                        moved: false,
                    },
                );
                Some(new.root())
            }
            None => {
                patches.push(Patch::Insert { new: new.root() });
                None
            }
        };
        Self {
            session,
            root,
            old,
            new,
            fibers,
            cursor,
            patches,
            units: 0,
            slices: 0,
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn root(&self) -> HostId {
        self.root
    }

    /// Next node to process, `None` once the walk is done.
    pub fn cursor(&self) -> Option<NodeId> {
        self.cursor
    }

    /// Patches collected so far.
    pub fn patches(&self) -> &PatchSet {
        &self.patches
    }

    pub fn units(&self) -> usize {
        self.units
    }

    pub fn is_done(&self) -> bool {
        self.cursor.is_none()
    }

    /// Process units until `deadline` passes or the walk completes.
    ///
    /// At least one unit runs per slice, so every slice makes progress even
    /// when the deadline is already behind. A diff error discards the
    /// session.
    pub fn run_slice(mut self, clock: &dyn Clock, deadline: Duration) -> DiffResult<Slice> {
        self.slices += 1;
        let mut processed = 0usize;
        while let Some(node) = self.cursor {
            if processed > 0 && clock.now() > deadline {
                debug!(
                    session = %self.session,
                    processed,
                    total = self.units,
                    "slice yielded"
                );
                return Ok(Slice::Yielded(self));
            }
            self.step(node)?;
            processed += 1;
        }
        debug!(session = %self.session, processed, total = self.units, "slice finished walk");
        Ok(Slice::Finished(self.finish()))
    }

    /// Run the remaining units with no deadline.
    pub fn run_to_end(self, clock: &dyn Clock) -> DiffResult<Completion> {
        let mut work = self;
        loop {
            match work.run_slice(clock, Duration::MAX)? {
                Slice::Finished(done) => return Ok(done),
                Slice::Yielded(next) => work = next,
            }
        }
    }

    fn step(&mut self, node: NodeId) -> DiffResult<()> {
        let pairing = self
            .fibers
            .alternate(node)
            .ok_or(DiffError::UnknownNode(node))?;
        let children = match &self.old {
            Some(old) => diff_unit(old, &mut self.new, node, pairing, &mut self.patches)?,
            None => return Err(DiffError::UnknownNode(node)),
        };
        for (child, child_pairing) in children {
            self.fibers.set_alternate(child, child_pairing);
        }
        self.cursor = self.fibers.next(node);
        self.units += 1;
        Ok(())
    }

    fn finish(self) -> Completion {
        Completion {
            session: self.session,
            root: self.root,
            patches: self.patches,
            old: self.old,
            new: self.new,
            units: self.units,
            slices: self.slices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use vdom_diff::diff_keyed;
    use vdom_types::Element;

    fn list(keys: &[&str]) -> VTree {
        VTree::build(
            Element::new("ul").children(keys.iter().map(|k| Element::new("li").key(*k).child(*k))),
        )
        .unwrap()
    }

    fn wip(old: &VTree, new: &VTree) -> WorkInProgress {
        WorkInProgress::new(
            SessionId::new(1),
            HostId::new(0),
            Some(old.clone()),
            new.clone(),
        )
    }

    #[test]
    fn one_unit_per_slice_when_deadline_passed() {
        let old = list(&["a", "b", "c"]);
        let new = list(&["c", "b", "a"]);
        let clock = ManualClock::new();
        clock.advance(Duration::from_secs(1));

        let mut work = wip(&old, &new);
        let mut slices = 0;
        let done = loop {
            slices += 1;
            match work.run_slice(&clock, Duration::ZERO).unwrap() {
                Slice::Yielded(next) => {
                    assert_eq!(next.units(), slices);
                    work = next;
                }
                Slice::Finished(done) => break done,
            }
        };
        assert_eq!(done.units, new.len());
        assert_eq!(done.slices, slices);
        assert_eq!(slices, new.len());
    }

    #[test]
    fn sliced_run_matches_synchronous_diff() {
        let old = list(&["a", "b", "c", "d"]);
        let new = list(&["d", "a", "e", "c"]);
        let mut expected_tree = new.clone();
        let expected = diff_keyed(Some(&old), &mut expected_tree).unwrap();

        let clock = ManualClock::with_step(Duration::from_millis(1));
        let mut work = wip(&old, &new);
        let done = loop {
            let deadline = clock.peek() + Duration::from_millis(2);
            match work.run_slice(&clock, deadline).unwrap() {
                Slice::Yielded(next) => work = next,
                Slice::Finished(done) => break done,
            }
        };
        assert_eq!(done.patches, expected);
        assert!(done.slices > 1);
    }

    #[test]
    fn no_old_tree_finishes_immediately() {
        let new = list(&["a"]);
        let work = WorkInProgress::new(SessionId::new(7), HostId::new(0), None, new.clone());
        assert!(work.is_done());

        let done = work.run_to_end(&ManualClock::new()).unwrap();
        assert_eq!(done.units, 0);
        assert_eq!(done.patches.as_slice(), &[Patch::Insert { new: new.root() }]);
        assert_eq!(done.session, SessionId::new(7));
    }

    #[test]
    fn diff_errors_surface_from_the_slice() {
        let old = list(&["a"]);
        let mut new = list(&["a", "b"]);
        let ul = new.root();
        let b = new.children(ul)[1];
        new.get_mut(b).unwrap().key = Some("a".into());

        let err = wip(&old, &new).run_to_end(&ManualClock::new()).unwrap_err();
        assert!(matches!(err, DiffError::DuplicateKey { .. }));
    }
}
