//! Cooperative, time-sliced diffing.
//!
//! A key-based diff is split into per-node units. The [`FiberTree`] links the
//! new tree so its depth-first walk can stop between any two units, and the
//! [`Scheduler`] runs as many units as fit in a frame budget before yielding
//! back to the host.
//!
//! # Key Types
//!
//! - [`FiberTree`] -- parent/child/sibling/alternate links over a `VTree`
//! - [`WorkInProgress`] -- resumable diff state, advanced by [`WorkInProgress::run_slice`]
//! - [`Scheduler`] -- owns the in-flight session and talks to a [`FrameHost`]
//! - [`SessionHandle`] -- what frame, idle and timer triggers invoke
//! - [`Clock`] -- time source ([`SystemClock`], [`ManualClock`])
//! - [`SchedulerConfig`] -- frame budget and fallback timing

pub mod clock;
pub mod config;
pub mod error;
pub mod link;
pub mod scheduler;
pub mod trigger;
pub mod work;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SchedulerConfig;
pub use error::{SchedulerError, SchedulerResult};
pub use link::{Fiber, FiberTree};
pub use scheduler::{CompletionCallback, Priority, Scheduler, SessionHandle, WorkStatus};
pub use trigger::{FrameHost, ManualFrameHost, TimerToken};
pub use work::{Completion, SessionId, Slice, WorkInProgress};
