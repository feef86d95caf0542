//! Frame-timing triggers.
//!
//! The scheduler never blocks or sleeps. After each slice it asks a
//! [`FrameHost`] to call back later, handing over the [`SessionHandle`] the
//! callback must invoke.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use crate::scheduler::{SessionHandle, WorkStatus};

/// Handle for cancelling an armed timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

impl TimerToken {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// The host's timing callbacks.
pub trait FrameHost: Send + Sync {
    /// Call [`SessionHandle::on_frame`] at the next display frame.
    fn request_frame(&self, session: SessionHandle);

    /// Call [`SessionHandle::on_idle`] when the host is idle, or after
    /// `timeout` at the latest.
    fn request_idle(&self, session: SessionHandle, timeout: Duration);

    /// Call [`SessionHandle::on_timer`] after `delay`.
    fn set_timer(&self, session: SessionHandle, delay: Duration) -> TimerToken;

    /// Disarm a timer. Unknown or fired tokens are ignored.
    fn clear_timer(&self, token: TimerToken);
}

#[derive(Default)]
struct Queue {
    frames: VecDeque<SessionHandle>,
    idle: VecDeque<(SessionHandle, Duration)>,
    timers: BTreeMap<TimerToken, (SessionHandle, Duration)>,
    next_token: u64,
}

/// A [`FrameHost`] that only records requests.
///
/// Tests and the CLI drive it by hand: each `fire_*` call delivers the
/// matching callbacks queued so far. Callbacks run outside the queue lock,
/// so they may enqueue new requests, which wait for the next `fire_*`.
#[derive(Default)]
pub struct ManualFrameHost {
    queue: Mutex<Queue>,
}

impl ManualFrameHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_frames(&self) -> usize {
        self.queue.lock().expect("lock poisoned").frames.len()
    }

    pub fn pending_idle(&self) -> usize {
        self.queue.lock().expect("lock poisoned").idle.len()
    }

    pub fn armed_timers(&self) -> usize {
        self.queue.lock().expect("lock poisoned").timers.len()
    }

    /// Timeouts of the pending idle requests, oldest first.
    pub fn idle_timeouts(&self) -> Vec<Duration> {
        let queue = self.queue.lock().expect("lock poisoned");
        queue.idle.iter().map(|(_, timeout)| *timeout).collect()
    }

    /// Delays of the armed timers, in arming order.
    pub fn timer_delays(&self) -> Vec<Duration> {
        let queue = self.queue.lock().expect("lock poisoned");
        queue.timers.values().map(|(_, delay)| *delay).collect()
    }

    /// True when nothing is queued or armed.
    pub fn is_quiet(&self) -> bool {
        let queue = self.queue.lock().expect("lock poisoned");
        queue.frames.is_empty() && queue.idle.is_empty() && queue.timers.is_empty()
    }

    /// Deliver a display frame to every frame request queued so far.
    pub fn fire_frame(&self) -> Vec<WorkStatus> {
        let due: Vec<SessionHandle> = {
            let mut queue = self.queue.lock().expect("lock poisoned");
            queue.frames.drain(..).collect()
        };
        due.iter().map(SessionHandle::on_frame).collect()
    }

    /// Deliver an idle period of `remaining` to the queued idle requests.
    pub fn fire_idle(&self, remaining: Duration) -> Vec<WorkStatus> {
        let due: Vec<SessionHandle> = {
            let mut queue = self.queue.lock().expect("lock poisoned");
            queue.idle.drain(..).map(|(session, _)| session).collect()
        };
        due.iter().map(|session| session.on_idle(remaining)).collect()
    }

    /// Fire every armed timer, regardless of its delay.
    pub fn fire_timers(&self) -> Vec<WorkStatus> {
        let due: Vec<SessionHandle> = {
            let mut queue = self.queue.lock().expect("lock poisoned");
            std::mem::take(&mut queue.timers)
                .into_values()
                .map(|(session, _)| session)
                .collect()
        };
        due.iter().map(SessionHandle::on_timer).collect()
    }
}

impl FrameHost for ManualFrameHost {
    fn request_frame(&self, session: SessionHandle) {
        self.queue
            .lock()
            .expect("lock poisoned")
            .frames
            .push_back(session);
    }

    fn request_idle(&self, session: SessionHandle, timeout: Duration) {
        self.queue
            .lock()
            .expect("lock poisoned")
            .idle
            .push_back((session, timeout));
    }

    fn set_timer(&self, session: SessionHandle, delay: Duration) -> TimerToken {
        let mut queue = self.queue.lock().expect("lock poisoned");
        let token = TimerToken::new(queue.next_token);
        queue.next_token += 1;
        queue.timers.insert(token, (session, delay));
        token
    }

    fn clear_timer(&self, token: TimerToken) {
        self.queue
            .lock()
            .expect("lock poisoned")
            .timers
            .remove(&token);
    }
}
