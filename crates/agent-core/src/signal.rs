//! Generation-counted wakeup signal.
//!
//! Each `notify` bumps a counter. A waiter remembers the last generation it
//! consumed and waits until the counter moves past it, so a notification
//! sent before the waiter went to sleep is never lost.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Result of a bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// The generation moved past the one the caller had seen.
    Ready(u64),
    /// The timeout elapsed first; carries the current generation.
    TimedOut(u64),
}

impl Wait {
    pub fn generation(self) -> u64 {
        match self {
            Wait::Ready(g) | Wait::TimedOut(g) => g,
        }
    }

    pub fn is_ready(self) -> bool {
        matches!(self, Wait::Ready(_))
    }
}

#[derive(Debug, Default)]
pub struct Signal {
    generation: Mutex<u64>,
    cond: Condvar,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bumps the generation and wakes every waiter. Returns the new generation.
    pub fn notify(&self) -> u64 {
        let mut generation = self.generation.lock();
        *generation += 1;
        self.cond.notify_all();
        *generation
    }

    pub fn generation(&self) -> u64 {
        *self.generation.lock()
    }

    /// Waits until the generation exceeds `seen` or `timeout` elapses.
    pub fn wait_past(&self, seen: u64, timeout: Duration) -> Wait {
        let deadline = Instant::now() + timeout;
        let mut generation = self.generation.lock();
        while *generation <= seen {
            if self.cond.wait_until(&mut generation, deadline).timed_out() {
                return if *generation > seen {
                    Wait::Ready(*generation)
                } else {
                    Wait::TimedOut(*generation)
                };
            }
        }
        Wait::Ready(*generation)
    }
}
