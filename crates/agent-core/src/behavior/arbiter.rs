//! Behavior Arbitration
//!
//! Walks the category chain in priority order and stops at the first tier
//! that proposes anything. That tier's proposals are ranked by evaluation
//! (stable, descending, so equal scores keep planner registration order)
//! and the head of the ranking is this cycle's behavior.
//!
//! Every proposal made this cycle is remembered until the next one, so
//! planners can continue what they started (a dribble spans many cycles).

use std::collections::HashMap;
use tracing::{debug, trace};

use agent_protocol::SimTime;

use crate::behavior::active::{ActiveBehavior, BehaviorCategory, BehaviorKind};
use crate::behavior::planner::{PlanContext, PlannerTier};
use crate::behavior::planners::{
    BlockPlanner, DribblePlanner, GoaliePlanner, HoldPlanner, InterceptPlanner, PenaltyPlanner,
    PositionPlanner, SetplayPlanner, ShootPlanner,
};
use crate::config::{BehaviorConfig, FormationConfig};
use crate::world::WorldState;

/// Proposals from the previous cycle, keyed by kind.
#[derive(Debug, Clone, Default)]
pub struct LastBehaviors {
    time: Option<SimTime>,
    by_kind: HashMap<BehaviorKind, Vec<ActiveBehavior>>,
}

impl LastBehaviors {
    /// Replaces the table with `proposals` made at `time`.
    ///
    /// Within each kind, proposals keep the order they are given in.
    pub fn record(&mut self, time: SimTime, proposals: &[ActiveBehavior]) {
        self.time = Some(time);
        self.by_kind.clear();
        for proposal in proposals {
            self.by_kind
                .entry(proposal.kind)
                .or_default()
                .push(proposal.clone());
        }
    }

    /// Highest-scored proposal of `kind`; the earliest wins ties.
    pub fn best(&self, kind: BehaviorKind) -> Option<&ActiveBehavior> {
        self.all(kind).iter().reduce(|best, candidate| {
            if candidate.evaluation > best.evaluation {
                candidate
            } else {
                best
            }
        })
    }

    pub fn all(&self, kind: BehaviorKind) -> &[ActiveBehavior] {
        self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Time the table was recorded at.
    pub fn time(&self) -> Option<SimTime> {
        self.time
    }

    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty()
    }
}

pub struct BehaviorArbiter {
    tiers: Vec<PlannerTier>,
    last: LastBehaviors,
    ranked: Vec<ActiveBehavior>,
    category: Option<BehaviorCategory>,
}

impl BehaviorArbiter {
    /// Tiers are evaluated in the order given.
    pub fn new(tiers: Vec<PlannerTier>) -> Self {
        Self {
            tiers,
            last: LastBehaviors::default(),
            ranked: Vec::new(),
            category: None,
        }
    }

    /// The standard chain: penalty, set play, attack, goalie/defense,
    /// formation.
    pub fn standard() -> Self {
        Self::new(vec![
            PlannerTier::new(BehaviorCategory::Penalty).with(PenaltyPlanner),
            PlannerTier::new(BehaviorCategory::Setplay).with(SetplayPlanner),
            PlannerTier::new(BehaviorCategory::Attack)
                .with(InterceptPlanner)
                .with(ShootPlanner)
                .with(DribblePlanner)
                .with(HoldPlanner),
            PlannerTier::new(BehaviorCategory::GoalieOrDefense)
                .with(GoaliePlanner)
                .with(BlockPlanner),
            PlannerTier::new(BehaviorCategory::Formation).with(PositionPlanner),
        ])
    }

    /// Picks this cycle's behavior, or `None` when nothing applies.
    pub fn decide(
        &mut self,
        world: &WorldState,
        config: &BehaviorConfig,
        formation: &FormationConfig,
    ) -> Option<ActiveBehavior> {
        let mut produced = Vec::new();
        let mut category = None;

        if world.can_act() {
            let ctx = PlanContext {
                world,
                last: &self.last,
                config,
                formation,
            };
            for tier in &self.tiers {
                tier.plan(&ctx, &mut produced);
                if !produced.is_empty() {
                    category = Some(tier.category);
                    break;
                }
                trace!(cycle = %world.time, category = %tier.category, "Tier proposed nothing");
            }
        }

        produced.retain(|behavior| {
            let keep = !behavior.evaluation.is_nan();
            if !keep {
                debug!(cycle = %world.time, kind = %behavior.kind, "Discarding unscored proposal");
            }
            keep
        });
        produced.sort_by(|a, b| b.evaluation.total_cmp(&a.evaluation));

        self.last.record(world.time, &produced);
        self.category = category.filter(|_| !produced.is_empty());
        self.ranked = produced;

        let chosen = self.ranked.first().cloned();
        if let Some(behavior) = &chosen {
            debug!(
                cycle = %world.time,
                category = %behavior.category,
                kind = %behavior.kind,
                score = behavior.evaluation,
                "Behavior chosen"
            );
        }
        chosen
    }

    /// This cycle's proposals, best first.
    pub fn ranked(&self) -> &[ActiveBehavior] {
        &self.ranked
    }

    /// Category that won this cycle.
    pub fn category(&self) -> Option<BehaviorCategory> {
        self.category
    }

    pub fn last_behaviors(&self) -> &LastBehaviors {
        &self.last
    }
}
