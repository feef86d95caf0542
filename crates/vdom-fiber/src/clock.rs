use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Monotonic time source for deadlines.
///
/// Readings are offsets from a clock-specific origin; only differences
/// between readings of the same clock are meaningful.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

/// Wall-clock time measured from when the clock was created.
#[derive(Clone, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

struct ManualState {
    now: Duration,
    step: Duration,
}

/// Deterministic clock for tests and simulations.
///
/// Time moves only through [`advance`](Self::advance), or by a fixed step
/// after every reading when auto-advance is set. The latter models a fixed
/// cost per unit of work. Clones share the same time.
#[derive(Clone)]
pub struct ManualClock {
    state: Arc<Mutex<ManualState>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::with_step(Duration::ZERO)
    }

    /// A clock that advances by `step` after each reading.
    pub fn with_step(step: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(ManualState {
                now: Duration::ZERO,
                step,
            })),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock().expect("clock mutex poisoned");
        state.now += by;
    }

    pub fn set_step(&self, step: Duration) {
        self.state.lock().expect("clock mutex poisoned").step = step;
    }

    /// Current time without triggering auto-advance.
    pub fn peek(&self) -> Duration {
        self.state.lock().expect("clock mutex poisoned").now
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        let mut state = self.state.lock().expect("clock mutex poisoned");
        let reading = state.now;
        let step = state.step;
        state.now += step;
        reading
    }
}
