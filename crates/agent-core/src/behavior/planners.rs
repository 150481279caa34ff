//! Concrete planners.
//!
//! Each planner looks at the world and appends proposals for its own
//! concern. Applicability checks live inside the planner: a planner that
//! has nothing to say simply appends nothing.

use agent_protocol::{PlayMode, Vector};

use crate::behavior::active::{ActiveBehavior, BehaviorKind, SubType};
use crate::behavior::planner::{PlanContext, Planner};
use crate::params::{GOAL_WIDTH, PITCH_HALF_LENGTH, PITCH_HALF_WIDTH};
use crate::world::WorldState;

/// Distance opponents must keep from the ball at a restart.
const RESTART_DISTANCE: f64 = 9.15;
/// Cycles to look ahead when searching for an interception point.
const INTERCEPT_HORIZON: u32 = 30;
/// Aim this far inside each goal post.
const POST_MARGIN: f64 = 1.0;
/// Length of one dribble step.
const DRIBBLE_STEP: f64 = 5.0;

fn is_open_play(world: &WorldState) -> bool {
    matches!(world.play_mode, PlayMode::PlayOn | PlayMode::DropBall)
}

/// Open play where the attack planners have a say. A goalie with a
/// catchable ball leaves it to the goalie tier.
fn attack_applies(world: &WorldState) -> bool {
    is_open_play(world) && !world.is_catchable()
}

/// Ball position after `steps` cycles of free rolling.
fn ball_after(world: &WorldState, steps: u32) -> Vector {
    let decay = world.params().server.ball_decay;
    let travelled = if (1.0 - decay).abs() < f64::EPSILON {
        steps as f64
    } else {
        (1.0 - decay.powi(steps as i32)) / (1.0 - decay)
    };
    world.ball.pos + world.ball.vel * travelled
}

fn clamp_to_pitch(p: Vector) -> Vector {
    Vector::new(
        p.x.clamp(-PITCH_HALF_LENGTH, PITCH_HALF_LENGTH),
        p.y.clamp(-PITCH_HALF_WIDTH, PITCH_HALF_WIDTH),
    )
}

/// Takes the penalty kick or waits for the shoot-out to move on.
pub struct PenaltyPlanner;

impl Planner for PenaltyPlanner {
    fn name(&self) -> &'static str {
        "penalty"
    }

    fn plan(&self, ctx: &PlanContext<'_>, out: &mut Vec<ActiveBehavior>) {
        let world = ctx.world;
        if !world.play_mode.is_penalty() {
            return;
        }
        let ours = matches!(
            world.play_mode,
            PlayMode::PenaltyReady(side) | PlayMode::PenaltyTaken(side) if side == world.side
        );
        if ours && world.is_kickable() && world.can_kick() {
            let post_y = GOAL_WIDTH / 2.0 - POST_MARGIN;
            let y = if world.me.pos.y >= 0.0 { -post_y } else { post_y };
            out.push(
                ActiveBehavior::new(
                    BehaviorKind::PenaltyKick,
                    1.0,
                    Vector::new(PITCH_HALF_LENGTH, y),
                    world.time,
                )
                .with_kick_speed(ctx.config.shoot_kick_speed),
            );
        } else if ours && world.ball_known() {
            out.push(
                ActiveBehavior::new(BehaviorKind::Intercept, 0.8, world.ball.pos, world.time)
                    .with_power(ctx.config.dash_power),
            );
        } else {
            out.push(ActiveBehavior::new(
                BehaviorKind::Position,
                0.1,
                world.me.pos,
                world.time,
            ));
        }
    }
}

/// Dead-ball situations: kick-off placement, own restarts and keeping
/// clear of opponent restarts.
pub struct SetplayPlanner;

impl Planner for SetplayPlanner {
    fn name(&self) -> &'static str {
        "setplay"
    }

    fn plan(&self, ctx: &PlanContext<'_>, out: &mut Vec<ActiveBehavior>) {
        let world = ctx.world;
        if is_open_play(world) || world.play_mode.is_penalty() || world.play_mode == PlayMode::TimeOver
        {
            return;
        }
        let time = world.time;

        if world.can_move() {
            let spot = ctx.formation.kickoff;
            if world.me.pos.dist(spot) > ctx.config.arrival_distance {
                out.push(
                    ActiveBehavior::new(BehaviorKind::SetplayMove, 1.0, spot, time)
                        .with_sub_type(SubType::KickOff),
                );
            } else {
                out.push(ActiveBehavior::new(BehaviorKind::Position, 0.2, spot, time));
            }
            return;
        }

        if world.play_mode.is_set_play_for(world.side) {
            let sub_type = if matches!(world.play_mode, PlayMode::KickOff(_)) {
                SubType::KickOff
            } else {
                SubType::Restart
            };
            if world.is_kickable() {
                let target = clamp_to_pitch(world.ball.pos + Vector::new(20.0, 0.0));
                out.push(
                    ActiveBehavior::new(BehaviorKind::SetplayKick, 0.9, target, time)
                        .with_sub_type(sub_type)
                        .with_kick_speed(ctx.config.setplay_kick_speed),
                );
            } else if world.ball_known() {
                out.push(
                    ActiveBehavior::new(BehaviorKind::Intercept, 0.7, world.ball.pos, time)
                        .with_sub_type(sub_type)
                        .with_power(ctx.config.dash_power),
                );
            }
            return;
        }

        // Opponent restart: hold formation but respect the minimum distance
        let mut target = ctx.formation.home;
        if world.ball_known() {
            let away = target - world.ball.pos;
            if away.length() < RESTART_DISTANCE {
                let dir = if away.length() > f64::EPSILON {
                    away.dir()
                } else {
                    180.0
                };
                target = world.ball.pos + Vector::polar(RESTART_DISTANCE + 1.0, dir);
            }
        }
        out.push(
            ActiveBehavior::new(BehaviorKind::Position, 0.5, clamp_to_pitch(target), time)
                .with_power(ctx.config.dash_power * 0.5),
        );
    }
}

/// Runs to the earliest point where the rolling ball can be reached.
pub struct InterceptPlanner;

impl Planner for InterceptPlanner {
    fn name(&self) -> &'static str {
        "intercept"
    }

    fn plan(&self, ctx: &PlanContext<'_>, out: &mut Vec<ActiveBehavior>) {
        let world = ctx.world;
        if !attack_applies(world) || !world.ball_known() || world.is_kickable() {
            return;
        }
        let distance = world.ball_distance();
        if distance > ctx.config.attack_radius {
            return;
        }

        let params = world.params();
        let speed = params.player.player_speed_max;
        let reach = params.kickable_area();
        let target = (1..=INTERCEPT_HORIZON)
            .map(|step| (step, ball_after(world, step)))
            .find(|(step, ball)| world.me.pos.dist(*ball) - reach <= speed * *step as f64)
            .map(|(_, ball)| ball)
            .unwrap_or_else(|| ball_after(world, INTERCEPT_HORIZON));

        let mut evaluation = 0.6 + 0.3 * (1.0 - distance / ctx.config.attack_radius);
        if ctx.last.best(BehaviorKind::Intercept).is_some() {
            evaluation += ctx.config.hysteresis_bonus;
        }
        out.push(
            ActiveBehavior::new(BehaviorKind::Intercept, evaluation, clamp_to_pitch(target), world.time)
                .with_power(ctx.config.dash_power),
        );
    }
}

/// Shoots at either goal post when close enough.
pub struct ShootPlanner;

impl Planner for ShootPlanner {
    fn name(&self) -> &'static str {
        "shoot"
    }

    fn plan(&self, ctx: &PlanContext<'_>, out: &mut Vec<ActiveBehavior>) {
        let world = ctx.world;
        if !attack_applies(world) || !world.is_kickable() || !world.can_kick() {
            return;
        }
        let goal_distance = world.me.pos.dist(world.opponent_goal());
        if goal_distance > ctx.config.shoot_distance {
            return;
        }
        let post_y = GOAL_WIDTH / 2.0 - POST_MARGIN;
        let near_y = if world.me.pos.y >= 0.0 { post_y } else { -post_y };
        let base = 0.95 - 0.01 * goal_distance;
        for (sub_type, y, bias) in [
            (SubType::FarPost, -near_y, 0.02),
            (SubType::NearPost, near_y, 0.0),
        ] {
            out.push(
                ActiveBehavior::new(
                    BehaviorKind::Shoot,
                    base + bias,
                    Vector::new(PITCH_HALF_LENGTH, y),
                    world.time,
                )
                .with_sub_type(sub_type)
                .with_kick_speed(ctx.config.shoot_kick_speed),
            );
        }
    }
}

/// Pushes the ball toward the opponent goal in short steps.
///
/// Keeps last cycle's dribble target while it is still ahead, so one
/// dribble spans several kick and dash cycles.
pub struct DribblePlanner;

impl Planner for DribblePlanner {
    fn name(&self) -> &'static str {
        "dribble"
    }

    fn plan(&self, ctx: &PlanContext<'_>, out: &mut Vec<ActiveBehavior>) {
        let world = ctx.world;
        if !attack_applies(world) || !world.is_kickable() || !world.can_kick() {
            return;
        }
        let previous = ctx
            .last
            .best(BehaviorKind::Dribble)
            .filter(|last| last.target.x > world.ball.pos.x + 1.0);

        let (target, evaluation, sub_type) = match previous {
            Some(last) => (last.target, 0.6 + ctx.config.hysteresis_bonus, SubType::Careful),
            None => {
                let dir = (world.opponent_goal() - world.me.pos).dir();
                (
                    clamp_to_pitch(world.ball.pos + Vector::polar(DRIBBLE_STEP, dir)),
                    0.6,
                    SubType::Fast,
                )
            }
        };
        out.push(
            ActiveBehavior::new(BehaviorKind::Dribble, evaluation, target, world.time)
                .with_sub_type(sub_type)
                .with_kick_speed(ctx.config.dribble_kick_speed),
        );
    }
}

/// Keeps the ball and turns toward the opponent goal.
pub struct HoldPlanner;

impl Planner for HoldPlanner {
    fn name(&self) -> &'static str {
        "hold"
    }

    fn plan(&self, ctx: &PlanContext<'_>, out: &mut Vec<ActiveBehavior>) {
        let world = ctx.world;
        if !attack_applies(world) || !world.is_kickable() {
            return;
        }
        out.push(ActiveBehavior::new(
            BehaviorKind::Hold,
            0.3,
            world.opponent_goal(),
            world.time,
        ));
    }
}

/// Goalkeeping: catch when possible, otherwise guard the goal mouth.
pub struct GoaliePlanner;

impl Planner for GoaliePlanner {
    fn name(&self) -> &'static str {
        "goalie"
    }

    fn plan(&self, ctx: &PlanContext<'_>, out: &mut Vec<ActiveBehavior>) {
        let world = ctx.world;
        if !world.goalie || !is_open_play(world) || !world.ball_known() {
            return;
        }
        if world.is_catchable() {
            out.push(ActiveBehavior::new(
                BehaviorKind::Catch,
                1.0,
                world.ball.pos,
                world.time,
            ));
            return;
        }
        let goal = world.own_goal();
        let to_ball = world.ball.pos - goal;
        let depth = (to_ball.length() * 0.5).clamp(1.0, 10.0);
        out.push(
            ActiveBehavior::new(
                BehaviorKind::Block,
                if world.ball.pos.x < 0.0 { 0.6 } else { 0.4 },
                goal + Vector::polar(depth, to_ball.dir()),
                world.time,
            )
            .with_power(ctx.config.dash_power),
        );
    }
}

/// Field players drop between the ball and the own goal when the ball is
/// in the own half and out of reach.
pub struct BlockPlanner;

impl Planner for BlockPlanner {
    fn name(&self) -> &'static str {
        "block"
    }

    fn plan(&self, ctx: &PlanContext<'_>, out: &mut Vec<ActiveBehavior>) {
        let world = ctx.world;
        if world.goalie || !is_open_play(world) || !world.ball_known() {
            return;
        }
        if world.ball.pos.x >= 0.0 || world.ball_distance() <= ctx.config.attack_radius {
            return;
        }
        let to_goal = world.own_goal() - world.ball.pos;
        let cover = to_goal.length().min(5.0);
        let target = world.ball.pos + Vector::polar(cover, to_goal.dir());
        out.push(
            ActiveBehavior::new(BehaviorKind::Block, 0.5, target, world.time)
                .with_power(ctx.config.dash_power),
        );
    }
}

/// Home position, shifted with the ball. Always proposes something, so the
/// chain never comes up empty while the agent can act.
pub struct PositionPlanner;

impl Planner for PositionPlanner {
    fn name(&self) -> &'static str {
        "position"
    }

    fn plan(&self, ctx: &PlanContext<'_>, out: &mut Vec<ActiveBehavior>) {
        let world = ctx.world;
        if !world.ball_known() {
            out.push(
                ActiveBehavior::new(BehaviorKind::Position, 0.05, world.me.pos, world.time)
                    .with_sub_type(SubType::Search),
            );
            return;
        }
        let home = ctx.formation.home;
        let target = clamp_to_pitch(Vector::new(home.x + world.ball.pos.x * 0.3, home.y));
        out.push(
            ActiveBehavior::new(BehaviorKind::Position, 0.1, target, world.time)
                .with_power(ctx.config.dash_power * 0.6),
        );
    }
}
