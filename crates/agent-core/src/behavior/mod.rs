//! Behavior Arbitration
//!
//! Planners propose scored behaviors, the arbiter picks one through the
//! category priority chain, and the executor registry turns the choice
//! into actuation calls.

pub mod active;
pub mod arbiter;
pub mod executor;
pub mod planner;
pub mod planners;

pub use active::{ActiveBehavior, BehaviorCategory, BehaviorKind, SubType};
pub use arbiter::{BehaviorArbiter, LastBehaviors};
pub use executor::{BehaviorExecutor, ExecContext, ExecutorRegistry};
pub use planner::{PlanContext, Planner, PlannerTier};
