//! Simulated Time
//!
//! The server clock advances one cycle per step during play. While the game
//! clock is halted (before kick-off, after a goal) the cycle number stays the
//! same and only the stoppage counter advances, so every step still has a
//! distinct, ordered time.
//!
//! # Example
//!
//! ```
//! use agent_protocol::SimTime;
//!
//! let t = SimTime::new(0, 0);
//! assert_eq!(t.observe(0), SimTime::new(0, 1));
//! assert_eq!(t.observe(1), SimTime::new(1, 0));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point on the server clock.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SimTime {
    /// Game cycle reported by the server.
    pub cycle: u32,
    /// Stoppage steps elapsed while the cycle number did not advance.
    pub stopped: u32,
}

impl SimTime {
    /// Creates a new SimTime.
    pub fn new(cycle: u32, stopped: u32) -> Self {
        Self { cycle, stopped }
    }

    /// Returns the time that follows `self` when the server next reports
    /// `cycle`.
    pub fn observe(self, cycle: u32) -> Self {
        if cycle == self.cycle {
            Self::new(cycle, self.stopped + 1)
        } else {
            Self::new(cycle, 0)
        }
    }

    /// Returns true if the game clock is halted at this time.
    pub fn is_stoppage(self) -> bool {
        self.stopped > 0
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.cycle, self.stopped)
    }
}
