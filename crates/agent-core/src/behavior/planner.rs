//! Planner traits and tiers.

use crate::behavior::active::{ActiveBehavior, BehaviorCategory};
use crate::behavior::arbiter::LastBehaviors;
use crate::config::{BehaviorConfig, FormationConfig};
use crate::world::WorldState;

/// Read-only inputs for one planning pass.
pub struct PlanContext<'a> {
    pub world: &'a WorldState,
    /// Proposals from the previous cycle, keyed by kind
    pub last: &'a LastBehaviors,
    pub config: &'a BehaviorConfig,
    pub formation: &'a FormationConfig,
}

/// Produces proposals for one concern (intercepting, shooting, ...).
pub trait Planner: Send {
    fn name(&self) -> &'static str;

    /// Appends zero or more proposals to `out`.
    fn plan(&self, ctx: &PlanContext<'_>, out: &mut Vec<ActiveBehavior>);
}

/// Sibling planners sharing one category.
pub struct PlannerTier {
    pub category: BehaviorCategory,
    planners: Vec<Box<dyn Planner>>,
}

impl PlannerTier {
    pub fn new(category: BehaviorCategory) -> Self {
        Self {
            category,
            planners: Vec::new(),
        }
    }

    pub fn with(mut self, planner: impl Planner + 'static) -> Self {
        self.planners.push(Box::new(planner));
        self
    }

    pub fn planner_names(&self) -> Vec<&'static str> {
        self.planners.iter().map(|p| p.name()).collect()
    }

    /// Runs every planner in registration order. Proposals keep that order
    /// and are stamped with this tier's category.
    pub fn plan(&self, ctx: &PlanContext<'_>, out: &mut Vec<ActiveBehavior>) {
        let start = out.len();
        for planner in &self.planners {
            planner.plan(ctx, out);
        }
        for behavior in &mut out[start..] {
            behavior.category = self.category;
        }
    }
}
