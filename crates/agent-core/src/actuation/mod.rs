//! Actuation
//!
//! Turns decisions into queued server commands: the gate that enforces the
//! once-per-cycle rules, the queue the transmission thread drains, loss
//! detection against the server's executed counters, and the one-step
//! motion model used for prediction.

pub mod effector;
pub mod prediction;
pub mod queue;

pub use effector::ActionEffector;
pub use prediction::Prediction;
pub use queue::{CommandQueue, QueuedCommand, Reconciliation};
