//! Session scheduling.
//!
//! At most one reconciliation is in flight. Scheduling a different root
//! cancels it and discards its partial work; scheduling the same root again
//! leaves it running. Progress is driven entirely by host triggers calling
//! back into a [`SessionHandle`].

use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use vdom_diff::DiffResult;
use vdom_types::{HostId, VTree};

use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::error::SchedulerResult;
use crate::trigger::{FrameHost, TimerToken};
use crate::work::{Completion, SessionId, Slice, WorkInProgress};

/// Which host trigger continues a yielded session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Latency-sensitive: resumes on the next display frame, with a fallback
    /// timer in case frames stall.
    #[default]
    Frame,
    /// Background: resumes when the host reports idle time.
    Idle,
}

/// What a trigger accomplished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkStatus {
    /// A slice ran and more work remains.
    Yielded,
    /// The walk completed and the callback was invoked with the patches.
    Finished,
    /// The diff failed and the callback was invoked with the error.
    Failed,
    /// The session was cancelled or already finished; nothing ran.
    Stale,
}

/// Receives the result of a session. Runs without any scheduler lock held.
pub type CompletionCallback = Box<dyn FnOnce(DiffResult<Completion>) + Send>;

#[derive(Clone, Copy, Debug)]
enum Trigger {
    Frame,
    Idle(Duration),
    Timer,
    Flush,
}

struct Session {
    id: SessionId,
    root: HostId,
    priority: Priority,
    work: Option<WorkInProgress>,
    callback: Option<CompletionCallback>,
    fallback: Option<TimerToken>,
    frame_requested: bool,
}

#[derive(Default)]
struct SchedulerState {
    active: Option<Session>,
    next_session: u64,
}

struct Shared {
    config: SchedulerConfig,
    clock: Arc<dyn Clock>,
    frames: Arc<dyn FrameHost>,
    state: Mutex<SchedulerState>,
}

/// Cooperative, deadline-driven diff scheduler.
///
/// Cheap to clone; clones share the same in-flight session.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.shared.config)
            .field("active_root", &self.active_root())
            .finish()
    }
}

impl Scheduler {
    pub fn new(
        config: SchedulerConfig,
        clock: Arc<dyn Clock>,
        frames: Arc<dyn FrameHost>,
    ) -> SchedulerResult<Self> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                clock,
                frames,
                state: Mutex::new(SchedulerState::default()),
            }),
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    /// Start diffing `old` against `new` for `root`.
    ///
    /// If a session for the same root is in flight it keeps running, this
    /// request is dropped and the existing handle is returned. A session for
    /// any other root is cancelled first. `callback` runs exactly once when
    /// the session finishes or fails, and never if it is cancelled.
    pub fn schedule<F>(
        &self,
        root: HostId,
        old: Option<VTree>,
        new: VTree,
        priority: Priority,
        callback: F,
    ) -> SessionHandle
    where
        F: FnOnce(DiffResult<Completion>) + Send + 'static,
    {
        let mut state = self.shared.state.lock().expect("lock poisoned");
        if let Some(active) = state.active.as_ref().filter(|s| s.root == root) {
            debug!(session = %active.id, root = %root, "root already in flight, request ignored");
            return self.handle(active.id, root);
        }

        let cancelled = state.active.take();
        let id = SessionId::new(state.next_session);
        state.next_session += 1;
        state.active = Some(Session {
            id,
            root,
            priority,
            work: Some(WorkInProgress::new(id, root, old, new)),
            callback: Some(Box::new(callback)),
            fallback: None,
            frame_requested: priority == Priority::Frame,
        });
        drop(state);

        if let Some(cancelled) = cancelled {
            warn!(
                session = %cancelled.id,
                root = %cancelled.root,
                replacement = %id,
                "in-flight reconciliation cancelled"
            );
            self.shared.retire(cancelled);
        }
        info!(session = %id, root = %root, ?priority, "reconciliation scheduled");

        let handle = self.handle(id, root);
        match priority {
            Priority::Frame => {
                self.shared.frames.request_frame(handle.clone());
                self.shared.arm_fallback(&handle);
            }
            Priority::Idle => {
                self.shared
                    .frames
                    .request_idle(handle.clone(), self.shared.config.idle_timeout);
            }
        }
        handle
    }

    /// Cancel the in-flight session if it belongs to `root`.
    pub fn cancel(&self, root: HostId) -> bool {
        let cancelled = {
            let mut state = self.shared.state.lock().expect("lock poisoned");
            match &state.active {
                Some(active) if active.root == root => state.active.take(),
                _ => None,
            }
        };
        match cancelled {
            Some(session) => {
                warn!(session = %session.id, root = %root, "reconciliation cancelled");
                self.shared.retire(session);
                true
            }
            None => false,
        }
    }

    /// Root of the in-flight session.
    pub fn active_root(&self) -> Option<HostId> {
        let state = self.shared.state.lock().expect("lock poisoned");
        state.active.as_ref().map(|s| s.root)
    }

    /// Id and processed unit count of the in-flight session.
    pub fn progress(&self) -> Option<(SessionId, usize)> {
        let state = self.shared.state.lock().expect("lock poisoned");
        let active = state.active.as_ref()?;
        let units = active.work.as_ref().map_or(0, WorkInProgress::units);
        Some((active.id, units))
    }

    /// Run the in-flight session to completion, ignoring deadlines.
    pub fn flush(&self) -> WorkStatus {
        let id = {
            let state = self.shared.state.lock().expect("lock poisoned");
            match &state.active {
                Some(active) => active.id,
                None => return WorkStatus::Stale,
            }
        };
        self.shared.drive(id, Trigger::Flush)
    }

    fn handle(&self, id: SessionId, root: HostId) -> SessionHandle {
        SessionHandle {
            id,
            root,
            shared: Arc::downgrade(&self.shared),
        }
    }
}

impl Shared {
    fn drive(self: &Arc<Self>, id: SessionId, trigger: Trigger) -> WorkStatus {
        let mut state = self.state.lock().expect("lock poisoned");
        let Some(session) = state.active.as_mut().filter(|s| s.id == id) else {
            return WorkStatus::Stale;
        };

        let mut disarm = None;
        match trigger {
            Trigger::Frame => {
                session.frame_requested = false;
                disarm = session.fallback.take();
            }
            Trigger::Timer => session.fallback = None,
            Trigger::Idle(_) | Trigger::Flush => {}
        }

        let deadline = match trigger {
            Trigger::Flush => Duration::MAX,
            Trigger::Idle(remaining) => self
                .clock
                .now()
                .saturating_add(remaining.min(self.config.frame_budget)),
            Trigger::Frame | Trigger::Timer => {
                self.clock.now().saturating_add(self.config.frame_budget)
            }
        };

        let Some(work) = session.work.take() else {
            return WorkStatus::Stale;
        };
        let root = session.root;
        let priority = session.priority;

        let (status, outcome) = match work.run_slice(self.clock.as_ref(), deadline) {
            Ok(Slice::Yielded(work)) => {
                session.work = Some(work);
                (WorkStatus::Yielded, None)
            }
            Ok(Slice::Finished(done)) => (WorkStatus::Finished, Some(Ok(done))),
            Err(err) => (WorkStatus::Failed, Some(Err(err))),
        };

        // Decide follow-up requests while the session is still borrowed.
        let mut request_frame = false;
        let mut arm_timer = false;
        if status == WorkStatus::Yielded && priority == Priority::Frame {
            request_frame = !session.frame_requested;
            session.frame_requested = true;
            arm_timer = session.fallback.is_none();
        }

        let finished = match outcome {
            Some(result) => state.active.take().map(|session| (session, result)),
            None => None,
        };
        drop(state);

        if let Some(token) = disarm {
            self.frames.clear_timer(token);
        }

        let handle = SessionHandle {
            id,
            root,
            shared: Arc::downgrade(self),
        };
        if status == WorkStatus::Yielded {
            match priority {
                Priority::Frame => {
                    if request_frame {
                        self.frames.request_frame(handle.clone());
                    }
                    if arm_timer {
                        self.arm_fallback(&handle);
                    }
                }
                Priority::Idle => self
                    .frames
                    .request_idle(handle, self.config.frame_budget),
            }
        }

        if let Some((mut session, result)) = finished {
            match &result {
                Ok(done) => info!(
                    session = %id,
                    root = %root,
                    patches = done.patches.len(),
                    units = done.units,
                    slices = done.slices,
                    "reconciliation complete"
                ),
                Err(err) => warn!(session = %id, root = %root, error = %err, "reconciliation failed"),
            }
            let callback = session.callback.take();
            self.retire(session);
            if let Some(callback) = callback {
                callback(result);
            }
        }
        status
    }

    /// Arm the fallback timer for `handle`'s session, unless it is gone.
    fn arm_fallback(&self, handle: &SessionHandle) {
        let token = self
            .frames
            .set_timer(handle.clone(), self.config.fallback_delay());
        let kept = {
            let mut state = self.state.lock().expect("lock poisoned");
            match state.active.as_mut().filter(|s| s.id == handle.id) {
                Some(session) if session.fallback.is_none() => {
                    session.fallback = Some(token);
                    true
                }
                _ => false,
            }
        };
        if !kept {
            self.frames.clear_timer(token);
        }
    }

    /// Release host resources still held by a session that left the slot.
    fn retire(&self, mut session: Session) {
        if let Some(token) = session.fallback.take() {
            self.frames.clear_timer(token);
        }
    }
}

/// A reference to one scheduled session, held by host triggers.
///
/// Triggers for a session that is no longer in flight do nothing and report
/// [`WorkStatus::Stale`].
#[derive(Clone)]
pub struct SessionHandle {
    id: SessionId,
    root: HostId,
    shared: Weak<Shared>,
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("root", &self.root)
            .finish()
    }
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn root(&self) -> HostId {
        self.root
    }

    /// True while this session is the one in flight.
    pub fn is_active(&self) -> bool {
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };
        let state = shared.state.lock().expect("lock poisoned");
        state.active.as_ref().is_some_and(|s| s.id == self.id)
    }

    /// Display-frame callback: run one frame budget of work.
    pub fn on_frame(&self) -> WorkStatus {
        self.trigger(Trigger::Frame)
    }

    /// Idle callback: run for `remaining`, capped at one frame budget.
    pub fn on_idle(&self, remaining: Duration) -> WorkStatus {
        self.trigger(Trigger::Idle(remaining))
    }

    /// Fallback timer: behaves like a frame callback.
    pub fn on_timer(&self) -> WorkStatus {
        self.trigger(Trigger::Timer)
    }

    fn trigger(&self, trigger: Trigger) -> WorkStatus {
        match self.shared.upgrade() {
            Some(shared) => shared.drive(self.id, trigger),
            None => WorkStatus::Stale,
        }
    }
}

impl PartialEq for SessionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for SessionHandle {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::SchedulerConfig;
    use crate::trigger::ManualFrameHost;
    use proptest::prelude::*;
    use vdom_diff::{diff_keyed, DiffError, PatchSet};
    use vdom_types::Element;

    type Results = Arc<Mutex<Vec<DiffResult<Completion>>>>;

    struct Rig {
        scheduler: Scheduler,
        frames: Arc<ManualFrameHost>,
        results: Results,
    }

    fn rig(budget: Duration, step: Duration) -> Rig {
        let clock = ManualClock::with_step(step);
        let frames = Arc::new(ManualFrameHost::new());
        let scheduler = Scheduler::new(
            SchedulerConfig::with_frame_budget(budget),
            Arc::new(clock),
            frames.clone(),
        )
        .unwrap();
        Rig {
            scheduler,
            frames,
            results: Arc::default(),
        }
    }

    impl Rig {
        fn schedule(&self, root: u64, old: &VTree, new: &VTree, priority: Priority) -> SessionHandle {
            let results = self.results.clone();
            self.scheduler.schedule(
                HostId::new(root),
                Some(old.clone()),
                new.clone(),
                priority,
                move |result| results.lock().unwrap().push(result),
            )
        }

        fn finished(&self) -> Vec<DiffResult<Completion>> {
            self.results.lock().unwrap().clone()
        }

        /// Fire frames until nothing is queued; returns frames fired.
        fn run_frames(&self) -> usize {
            let mut fired = 0;
            while self.frames.pending_frames() > 0 {
                self.frames.fire_frame();
                fired += 1;
            }
            fired
        }
    }

    fn list(n: usize, reversed: bool) -> VTree {
        let mut keys: Vec<usize> = (0..n).collect();
        if reversed {
            keys.reverse();
        }
        VTree::build(Element::new("ul").children(
            keys.iter()
                .map(|k| Element::new("li").key(k.to_string()).child(format!("item {k}"))),
        ))
        .unwrap()
    }

    fn expected(old: &VTree, new: &VTree) -> PatchSet {
        let mut new = new.clone();
        diff_keyed(Some(old), &mut new).unwrap()
    }

    #[test]
    fn frame_priority_spreads_work_over_frames() {
        let rig = rig(Duration::from_millis(3), Duration::from_millis(1));
        let (old, new) = (list(10, false), list(10, true));
        let handle = rig.schedule(1, &old, &new, Priority::Frame);

        assert!(handle.is_active());
        assert_eq!(rig.frames.pending_frames(), 1);
        assert_eq!(rig.frames.armed_timers(), 1);

        let frames = rig.run_frames();
        assert!(frames > 1);

        let results = rig.finished();
        assert_eq!(results.len(), 1);
        let done = results[0].as_ref().unwrap();
        assert_eq!(done.patches, expected(&old, &new));
        assert_eq!(done.slices, frames);
        assert_eq!(done.root, HostId::new(1));

        assert!(rig.frames.is_quiet());
        assert_eq!(rig.scheduler.active_root(), None);
        assert_eq!(handle.on_frame(), WorkStatus::Stale);
    }

    #[test]
    fn fallback_timer_keeps_work_moving() {
        let rig = rig(Duration::from_millis(2), Duration::from_millis(1));
        let (old, new) = (list(6, false), list(6, true));
        rig.schedule(1, &old, &new, Priority::Frame);
        assert_eq!(rig.frames.timer_delays(), vec![Duration::from_millis(4)]);

        // Frames stall; only the fallback fires.
        assert_eq!(rig.frames.fire_timers(), vec![WorkStatus::Yielded]);
        assert_eq!(rig.frames.pending_frames(), 1);
        assert_eq!(rig.frames.armed_timers(), 1);

        while rig.frames.armed_timers() > 0 {
            rig.frames.fire_timers();
        }
        assert_eq!(rig.finished().len(), 1);
        // The stale frame request is still queued and does nothing.
        assert_eq!(rig.frames.fire_frame(), vec![WorkStatus::Stale]);
    }

    #[test]
    fn frame_callback_disarms_fallback() {
        let rig = rig(Duration::from_millis(2), Duration::from_millis(1));
        let (old, new) = (list(6, false), list(6, true));
        rig.schedule(1, &old, &new, Priority::Frame);

        assert_eq!(rig.frames.fire_frame(), vec![WorkStatus::Yielded]);
        // The first timer was cleared and a fresh one armed with the new frame.
        assert_eq!(rig.frames.armed_timers(), 1);
        assert_eq!(rig.frames.pending_frames(), 1);
    }

    #[test]
    fn idle_priority_budgets_remaining_time() {
        let rig = rig(Duration::from_millis(10), Duration::from_millis(1));
        let (old, new) = (list(10, false), list(10, true));
        rig.schedule(1, &old, &new, Priority::Idle);
        assert_eq!(rig.frames.pending_idle(), 1);
        assert_eq!(rig.frames.pending_frames(), 0);
        assert_eq!(rig.frames.armed_timers(), 0);

        // 2ms of idle time: the read for the deadline plus three units.
        assert_eq!(rig.frames.fire_idle(Duration::from_millis(2)), vec![WorkStatus::Yielded]);
        assert_eq!(rig.scheduler.progress().map(|(_, units)| units), Some(3));
        assert_eq!(rig.frames.idle_timeouts(), vec![Duration::from_millis(10)]);

        // A long idle period is capped at the frame budget.
        rig.frames.fire_idle(Duration::from_secs(5));
        assert_eq!(rig.scheduler.progress().map(|(_, units)| units), Some(14));

        while rig.frames.pending_idle() > 0 {
            rig.frames.fire_idle(Duration::from_secs(5));
        }
        let results = rig.finished();
        assert_eq!(results[0].as_ref().unwrap().patches, expected(&old, &new));
    }

    #[test]
    fn same_root_in_flight_is_a_no_op() {
        let rig = rig(Duration::from_millis(2), Duration::from_millis(1));
        let (old, new) = (list(6, false), list(6, true));
        let first = rig.schedule(1, &old, &new, Priority::Frame);
        let second = rig.schedule(1, &new, &old, Priority::Frame);

        assert_eq!(first, second);
        assert_eq!(rig.frames.pending_frames(), 1);
        rig.run_frames();

        let results = rig.finished();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap().patches, expected(&old, &new));
    }

    #[test]
    fn different_root_cancels_in_flight_work() {
        let rig = rig(Duration::from_millis(2), Duration::from_millis(1));
        let (old, new) = (list(6, false), list(6, true));
        let first = rig.schedule(1, &old, &new, Priority::Frame);
        assert_eq!(rig.frames.fire_frame(), vec![WorkStatus::Yielded]);

        let second = rig.schedule(2, &new, &old, Priority::Frame);
        assert!(!first.is_active());
        assert!(second.is_active());
        assert_eq!(first.on_frame(), WorkStatus::Stale);
        assert_eq!(first.on_timer(), WorkStatus::Stale);
        // Only the replacement's fallback timer is armed.
        assert_eq!(rig.frames.armed_timers(), 1);

        rig.run_frames();
        let results = rig.finished();
        assert_eq!(results.len(), 1);
        let done = results[0].as_ref().unwrap();
        assert_eq!(done.root, HostId::new(2));
        assert_eq!(done.patches, expected(&new, &old));
    }

    #[test]
    fn cancel_discards_the_session() {
        let rig = rig(Duration::from_millis(2), Duration::from_millis(1));
        let (old, new) = (list(3, false), list(3, true));
        let handle = rig.schedule(1, &old, &new, Priority::Frame);

        assert!(!rig.scheduler.cancel(HostId::new(9)));
        assert!(rig.scheduler.cancel(HostId::new(1)));
        assert!(!rig.scheduler.cancel(HostId::new(1)));
        assert_eq!(rig.scheduler.active_root(), None);
        assert_eq!(rig.frames.armed_timers(), 0);
        assert_eq!(handle.on_frame(), WorkStatus::Stale);
        assert!(rig.finished().is_empty());
    }

    #[test]
    fn flush_ignores_deadlines() {
        let rig = rig(Duration::from_millis(1), Duration::from_millis(5));
        let (old, new) = (list(8, false), list(8, true));
        rig.schedule(1, &old, &new, Priority::Frame);

        assert_eq!(rig.scheduler.flush(), WorkStatus::Finished);
        assert_eq!(rig.scheduler.flush(), WorkStatus::Stale);
        let results = rig.finished();
        let done = results[0].as_ref().unwrap();
        assert_eq!(done.slices, 1);
        assert_eq!(done.units, new.len());
        assert_eq!(rig.frames.armed_timers(), 0);
    }

    #[test]
    fn diff_errors_reach_the_callback() {
        let rig = rig(Duration::from_millis(50), Duration::ZERO);
        let old = list(2, false);
        let mut new = list(2, false);
        let second = new.children(new.root())[1];
        new.get_mut(second).unwrap().key = Some("0".into());
        rig.schedule(1, &old, &new, Priority::Frame);

        assert_eq!(rig.frames.fire_frame(), vec![WorkStatus::Failed]);
        let results = rig.finished();
        assert!(matches!(results[0], Err(DiffError::DuplicateKey { .. })));
        assert_eq!(rig.scheduler.active_root(), None);
        assert!(rig.frames.is_quiet());
    }

    #[test]
    fn callbacks_may_schedule_again() {
        let rig = rig(Duration::from_millis(50), Duration::ZERO);
        let (old, new) = (list(2, false), list(2, true));
        let scheduler = rig.scheduler.clone();
        let (again_old, again_new) = (new.clone(), old.clone());
        rig.scheduler.schedule(
            HostId::new(1),
            Some(old),
            new,
            Priority::Frame,
            move |_| {
                scheduler.schedule(HostId::new(1), Some(again_old), again_new, Priority::Idle, |_| {});
            },
        );

        assert_eq!(rig.frames.fire_frame(), vec![WorkStatus::Finished]);
        assert_eq!(rig.scheduler.active_root(), Some(HostId::new(1)));
        assert_eq!(rig.frames.pending_idle(), 1);
    }

    #[test]
    fn first_render_inserts_root() {
        let rig = rig(Duration::from_millis(5), Duration::ZERO);
        let new = list(2, false);
        let results = rig.results.clone();
        rig.scheduler.schedule(HostId::new(1), None, new.clone(), Priority::Frame, move |r| {
            results.lock().unwrap().push(r)
        });
        rig.run_frames();
        let results = rig.finished();
        let done = results[0].as_ref().unwrap();
        assert_eq!(done.patches.len(), 1);
        assert_eq!(done.units, 0);
        assert_eq!(done.old, None);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = Scheduler::new(
            SchedulerConfig::with_frame_budget(Duration::ZERO),
            Arc::new(ManualClock::new()),
            Arc::new(ManualFrameHost::new()),
        );
        assert!(result.is_err());
    }

    fn keyed(keys: &[usize]) -> VTree {
        VTree::build(Element::new("ul").children(keys.iter().map(|k| {
            Element::new("li")
                .key(k.to_string())
                .prop("n", *k as u64)
                .child(Element::new("span").child(format!("{}", k % 3)))
        })))
        .unwrap()
    }

    proptest! {
        #[test]
        fn scheduled_diff_matches_synchronous_diff(
            old_keys in prop::collection::btree_set(0..16usize, 0..10),
            new_keys in prop::collection::btree_set(0..16usize, 0..10)
                .prop_map(|keys| keys.into_iter().collect::<Vec<_>>())
                .prop_shuffle(),
            budget_us in 1u64..400,
            step_us in 1u64..100,
        ) {
            let old_keys: Vec<usize> = old_keys.into_iter().collect();
            let (old, new) = (keyed(&old_keys), keyed(&new_keys));
            let rig = rig(Duration::from_micros(budget_us), Duration::from_micros(step_us));
            rig.schedule(1, &old, &new, Priority::Frame);
            rig.run_frames();

            let results = rig.finished();
            prop_assert_eq!(results.len(), 1);
            let done = results[0].as_ref().unwrap();
            prop_assert_eq!(&done.patches, &expected(&old, &new));
            prop_assert_eq!(done.units, new.len());
        }
    }
}
