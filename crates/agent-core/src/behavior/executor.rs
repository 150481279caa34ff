//! Behavior Executors
//!
//! Each behavior kind maps to one executor that turns the proposal into
//! calls on the actuation gate. The table is filled once at startup.

use std::collections::HashMap;
use tracing::warn;

use agent_protocol::{normalize_angle, Vector};

use crate::actuation::prediction::{kick_to_velocity, turn_moment_for};
use crate::actuation::ActionEffector;
use crate::behavior::active::{ActiveBehavior, BehaviorKind, SubType};
use crate::config::BehaviorConfig;
use crate::world::WorldState;

/// Turn applied each cycle while looking for a lost ball.
const SEARCH_TURN: f64 = 60.0;

pub struct ExecContext<'a> {
    pub world: &'a WorldState,
    pub effector: &'a ActionEffector,
    pub config: &'a BehaviorConfig,
}

pub trait BehaviorExecutor: Send {
    /// Queues the commands for `behavior`. Returns false if it could not.
    fn execute(&self, behavior: &ActiveBehavior, ctx: &ExecContext<'_>) -> bool;
}

/// Kind-to-executor table.
#[derive(Default)]
pub struct ExecutorRegistry {
    table: HashMap<BehaviorKind, Box<dyn BehaviorExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with an executor for every behavior kind.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(BehaviorKind::PenaltyKick, KickToward);
        registry.register(BehaviorKind::SetplayKick, KickToward);
        registry.register(BehaviorKind::Shoot, KickToward);
        registry.register(BehaviorKind::Dribble, KickToward);
        registry.register(BehaviorKind::SetplayMove, MoveTo);
        registry.register(BehaviorKind::Intercept, GoToPoint);
        registry.register(BehaviorKind::Block, GoToPoint);
        registry.register(BehaviorKind::Position, GoToPoint);
        registry.register(BehaviorKind::Hold, TurnToward);
        registry.register(BehaviorKind::Catch, CatchBall);
        registry
    }

    /// Replaces any executor already registered for `kind`.
    pub fn register(&mut self, kind: BehaviorKind, executor: impl BehaviorExecutor + 'static) {
        self.table.insert(kind, Box::new(executor));
    }

    pub fn is_registered(&self, kind: BehaviorKind) -> bool {
        self.table.contains_key(&kind)
    }

    pub fn execute(&self, behavior: &ActiveBehavior, ctx: &ExecContext<'_>) -> bool {
        match self.table.get(&behavior.kind) {
            Some(executor) => executor.execute(behavior, ctx),
            None => {
                warn!(kind = %behavior.kind, "No executor registered");
                false
            }
        }
    }
}

fn turn_toward(ctx: &ExecContext<'_>, point: Vector) -> Option<bool> {
    let world = ctx.world;
    let angle = normalize_angle((point - world.me.pos).dir() - world.me.body_dir);
    if angle.abs() <= ctx.config.turn_tolerance_deg {
        return None;
    }
    Some(
        ctx.effector
            .set_turn_action(world, turn_moment_for(world, angle)),
    )
}

/// Runs to `target`: turn first if facing too far off, otherwise dash.
/// Once there, faces the ball. Arrived and already facing it queues nothing
/// and fails, so the next candidate gets a turn.
pub struct GoToPoint;

impl BehaviorExecutor for GoToPoint {
    fn execute(&self, behavior: &ActiveBehavior, ctx: &ExecContext<'_>) -> bool {
        let world = ctx.world;
        if behavior.sub_type == Some(SubType::Search) {
            return ctx.effector.set_turn_action(world, SEARCH_TURN);
        }

        if world.me.pos.dist(behavior.target) <= ctx.config.arrival_distance {
            if !world.ball_known() {
                return ctx.effector.set_turn_action(world, SEARCH_TURN);
            }
            return turn_toward(ctx, world.ball.pos).unwrap_or(false);
        }

        if let Some(turned) = turn_toward(ctx, behavior.target) {
            return turned;
        }
        let power = if behavior.power > 0.0 {
            behavior.power
        } else {
            ctx.config.dash_power
        };
        ctx.effector.set_dash_action(world, power, 0.0)
    }
}

/// Kicks the ball so it leaves toward `target` at `kick_speed`.
pub struct KickToward;

impl BehaviorExecutor for KickToward {
    fn execute(&self, behavior: &ActiveBehavior, ctx: &ExecContext<'_>) -> bool {
        let world = ctx.world;
        if !world.is_kickable() {
            return false;
        }
        let dir = (behavior.target - world.ball.pos).dir();
        let (power, direction) = kick_to_velocity(world, Vector::polar(behavior.kick_speed, dir));
        ctx.effector.set_kick_action(world, power, direction)
    }
}

/// Turns the body toward `target`; fails when already facing it.
pub struct TurnToward;

impl BehaviorExecutor for TurnToward {
    fn execute(&self, behavior: &ActiveBehavior, ctx: &ExecContext<'_>) -> bool {
        turn_toward(ctx, behavior.target).unwrap_or(false)
    }
}

pub struct CatchBall;

impl BehaviorExecutor for CatchBall {
    fn execute(&self, _behavior: &ActiveBehavior, ctx: &ExecContext<'_>) -> bool {
        let world = ctx.world;
        ctx.effector
            .set_catch_action(world, world.ball_angle_from_body())
    }
}

pub struct MoveTo;

impl BehaviorExecutor for MoveTo {
    fn execute(&self, behavior: &ActiveBehavior, ctx: &ExecContext<'_>) -> bool {
        ctx.effector.set_move_action(ctx.world, behavior.target)
    }
}
