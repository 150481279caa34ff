//! Action Effector
//!
//! The actuation gate. Every `set_*_action` runs the same checks in the
//! same order before anything is queued:
//!
//! 1. a body command was already accepted this cycle (body tags only),
//! 2. the tag was already accepted this cycle (except `say`, `clang`, `ear`),
//! 3. the command is legal in the current world state.
//!
//! Accepted commands are normalized, queued, counted and flagged. A rejected
//! command leaves every piece of state as it was and returns `false`.

use std::sync::Arc;
use tracing::{trace, warn};

use agent_protocol::{
    normalize_angle, ArmTarget, AtomicCommand, AttentionTarget, CommandCounts, CommandTag, SimTime,
    Vector, ViewWidth,
};

use super::prediction::{self, Prediction};
use super::queue::{CommandQueue, Reconciliation};
use crate::world::WorldState;

/// Largest uniform number on a team.
const MAX_UNUM: u8 = 11;

pub struct ActionEffector {
    queue: Arc<CommandQueue>,
}

impl ActionEffector {
    pub fn new(queue: Arc<CommandQueue>) -> Self {
        Self { queue }
    }

    pub fn queue(&self) -> &Arc<CommandQueue> {
        &self.queue
    }

    fn submit(&self, world: &WorldState, tag: CommandTag, build: impl FnOnce() -> Option<AtomicCommand>) -> bool {
        if !self.queue.admits(tag) {
            trace!(cycle = %world.time, %tag, "Rejected: already queued this cycle");
            return false;
        }
        let Some(command) = build() else {
            trace!(cycle = %world.time, %tag, "Rejected: illegal now");
            return false;
        };
        debug_assert_eq!(command.tag(), tag);
        let accepted = self.queue.try_enqueue(command, world.time);
        if accepted {
            trace!(cycle = %world.time, %tag, "Queued");
        }
        accepted
    }

    pub fn set_turn_action(&self, world: &WorldState, moment: f64) -> bool {
        self.submit(world, CommandTag::Turn, || {
            if !world.can_act() || !moment.is_finite() {
                return None;
            }
            let server = &world.params().server;
            Some(AtomicCommand::Turn {
                moment: moment.clamp(server.min_moment, server.max_moment),
            })
        })
    }

    /// Negative power is rewritten as the cheaper forward dash in the
    /// opposite direction; power is capped by the stamina left.
    pub fn set_dash_action(&self, world: &WorldState, power: f64, direction: f64) -> bool {
        self.submit(world, CommandTag::Dash, || {
            if !world.can_act() || !power.is_finite() || !direction.is_finite() {
                return None;
            }
            let server = &world.params().server;
            let mut power = power.clamp(server.min_power, server.max_power);
            let mut direction = normalize_angle(direction);
            if power < 0.0 {
                power = -power;
                direction = normalize_angle(direction + 180.0);
            }
            if server.dash_angle_step > 0.0 {
                direction =
                    normalize_angle((direction / server.dash_angle_step).round() * server.dash_angle_step);
            }
            power = power.min(world.stamina_headroom());
            if power <= f64::EPSILON {
                return None;
            }
            Some(AtomicCommand::Dash { power, direction })
        })
    }

    pub fn set_kick_action(&self, world: &WorldState, power: f64, direction: f64) -> bool {
        self.submit(world, CommandTag::Kick, || {
            if !world.can_act() || !world.can_kick() || !world.is_kickable() {
                return None;
            }
            if !power.is_finite() || !direction.is_finite() {
                return None;
            }
            let server = &world.params().server;
            Some(AtomicCommand::Kick {
                power: power.clamp(0.0, server.max_power),
                direction: normalize_angle(direction),
            })
        })
    }

    pub fn set_tackle_action(&self, world: &WorldState, angle: f64, foul: bool) -> bool {
        self.submit(world, CommandTag::Tackle, || {
            if !world.can_act() || !angle.is_finite() || world.tackle_probability() <= 0.0 {
                return None;
            }
            Some(AtomicCommand::Tackle {
                angle: normalize_angle(angle),
                foul,
            })
        })
    }

    pub fn set_catch_action(&self, world: &WorldState, direction: f64) -> bool {
        self.submit(world, CommandTag::Catch, || {
            if !world.can_act() || !direction.is_finite() || !world.is_catchable() {
                return None;
            }
            Some(AtomicCommand::Catch {
                direction: normalize_angle(direction),
            })
        })
    }

    pub fn set_move_action(&self, world: &WorldState, target: Vector) -> bool {
        self.submit(world, CommandTag::Move, || {
            if !world.can_move() || !target.x.is_finite() || !target.y.is_finite() {
                return None;
            }
            Some(AtomicCommand::Move {
                x: target.x,
                y: target.y,
            })
        })
    }

    /// The angle is clamped so the neck stays within its range.
    pub fn set_turn_neck_action(&self, world: &WorldState, angle: f64) -> bool {
        self.submit(world, CommandTag::TurnNeck, || {
            if !angle.is_finite() {
                return None;
            }
            let server = &world.params().server;
            let head = world.me.head_angle;
            let angle = angle
                .clamp(server.min_neck_moment, server.max_neck_moment)
                .clamp(server.min_neck_angle - head, server.max_neck_angle - head);
            Some(AtomicCommand::TurnNeck { angle })
        })
    }

    pub fn set_say_action(&self, world: &WorldState, message: &str) -> bool {
        self.submit(world, CommandTag::Say, || {
            let legal = !message.is_empty()
                && message.len() <= world.params().server.say_msg_size
                && message
                    .chars()
                    .all(|c| c.is_ascii_graphic() && !matches!(c, '"' | '(' | ')'));
            legal.then(|| AtomicCommand::Say {
                message: message.to_string(),
            })
        })
    }

    pub fn set_change_view_action(&self, world: &WorldState, width: ViewWidth) -> bool {
        self.submit(world, CommandTag::ChangeView, || {
            (width != world.view_width).then_some(AtomicCommand::ChangeView { width })
        })
    }

    /// Points the arm at a field position, or lowers it with `None`. The
    /// server takes the target relative to the body.
    pub fn set_point_to_action(&self, world: &WorldState, target: Option<Vector>) -> bool {
        self.submit(world, CommandTag::PointTo, || match target {
            None => Some(AtomicCommand::PointTo { target: None }),
            Some(p) if p.x.is_finite() && p.y.is_finite() => {
                let rel = p - world.me.pos;
                Some(AtomicCommand::PointTo {
                    target: Some(ArmTarget {
                        distance: rel.length(),
                        direction: normalize_angle(rel.dir() - world.me.body_dir),
                    }),
                })
            }
            Some(_) => None,
        })
    }

    pub fn set_attention_to_action(&self, world: &WorldState, target: AttentionTarget) -> bool {
        self.submit(world, CommandTag::AttentionTo, || {
            let legal = match target {
                AttentionTarget::Off => true,
                AttentionTarget::Teammate(unum) => {
                    (1..=MAX_UNUM).contains(&unum) && unum != world.unum
                }
                AttentionTarget::Opponent(unum) => (1..=MAX_UNUM).contains(&unum),
            };
            legal.then_some(AtomicCommand::AttentionTo { target })
        })
    }

    pub fn set_clang_action(&self, world: &WorldState, min: u32, max: u32) -> bool {
        self.submit(world, CommandTag::Clang, || {
            (min <= max).then_some(AtomicCommand::Clang { min, max })
        })
    }

    pub fn set_ear_action(&self, world: &WorldState, on: bool) -> bool {
        self.submit(world, CommandTag::Ear, || Some(AtomicCommand::Ear { on }))
    }

    pub fn set_synch_see_action(&self, world: &WorldState) -> bool {
        self.submit(world, CommandTag::SynchSee, || Some(AtomicCommand::SynchSee))
    }

    pub fn is_queued(&self, tag: CommandTag) -> bool {
        self.queue.is_queued(tag)
    }

    /// True once any body command was accepted this cycle.
    pub fn is_body_queued(&self) -> bool {
        self.queue.is_mutex_taken()
    }

    pub fn count(&self, tag: CommandTag) -> u64 {
        self.queue.count(tag)
    }

    /// Body command accepted this cycle, if any.
    pub fn mutex_command(&self) -> Option<AtomicCommand> {
        self.queue.mutex_command()
    }

    pub fn reset(&self) {
        self.queue.reset();
    }

    pub fn reset_for_scan(&self) -> bool {
        self.queue.reset_for_scan()
    }

    pub fn drain_queue_for_cycle(&self, time: SimTime) -> Vec<String> {
        self.queue.drain_for_cycle(time).0
    }

    /// Adopts the server's counters wholesale, used on the first body sense.
    pub fn adopt_counts(&self, counts: &CommandCounts) {
        for (tag, count) in counts.iter() {
            self.queue.set_count(tag, count);
        }
    }

    /// Detects lost commands and resynchronizes the issued counters.
    pub fn reconcile(&self, time: SimTime, counts: &CommandCounts) -> Reconciliation {
        let report = self.queue.reconcile(counts);
        for tag in &report.missed {
            warn!(cycle = %time, %tag, "miss {}", tag);
        }
        for (tag, server, local) in &report.unexpected {
            warn!(
                cycle = %time,
                %tag,
                server = *server,
                local = *local,
                "Server executed more commands than issued"
            );
        }
        report
    }

    fn predict(&self, world: &WorldState) -> Prediction {
        prediction::predict(world, self.queue.mutex_command().as_ref())
    }

    pub fn self_pos_with_queued_actions(&self, world: &WorldState) -> Vector {
        self.predict(world).self_pos
    }

    pub fn self_vel_with_queued_actions(&self, world: &WorldState) -> Vector {
        self.predict(world).self_vel
    }

    pub fn self_body_dir_with_queued_actions(&self, world: &WorldState) -> f64 {
        self.predict(world).self_body_dir
    }

    pub fn ball_pos_with_queued_actions(&self, world: &WorldState) -> Vector {
        self.predict(world).ball_pos
    }

    pub fn ball_vel_with_queued_actions(&self, world: &WorldState) -> Vector {
        self.predict(world).ball_vel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::GameParams;
    use agent_protocol::{PlayMode, Side};

    fn setup() -> (ActionEffector, WorldState) {
        let effector = ActionEffector::new(Arc::new(CommandQueue::new()));
        let mut world = WorldState::new(Arc::new(GameParams::default()), Side::Left, 9, false);
        world.play_mode = PlayMode::PlayOn;
        world.time = SimTime::new(1, 0);
        (effector, world)
    }

    #[test]
    fn test_second_body_command_rejected() {
        let (effector, mut world) = setup();
        world.ball.pos = Vector::new(0.6, 0.0);
        world.ball.confidence = 1.0;

        assert!(effector.set_dash_action(&world, 50.0, 0.0));
        let before = effector.queue().entries();
        assert!(!effector.set_kick_action(&world, 50.0, 90.0));
        assert!(!effector.set_turn_action(&world, 30.0));
        assert!(!effector.set_dash_action(&world, 20.0, 0.0));
        assert_eq!(effector.queue().entries(), before);
        assert_eq!(effector.count(CommandTag::Kick), 0);
        assert!(effector.is_body_queued());
    }

    #[test]
    fn test_negative_dash_becomes_forward() {
        let (effector, world) = setup();
        assert!(effector.set_dash_action(&world, -50.0, 0.0));
        assert_eq!(
            effector.mutex_command(),
            Some(AtomicCommand::Dash {
                power: 50.0,
                direction: 180.0
            })
        );
    }

    #[test]
    fn test_dash_direction_quantized_and_power_capped() {
        let (effector, mut world) = setup();
        world.me.stamina = 10.0;
        assert!(effector.set_dash_action(&world, 100.0, 37.4));
        let Some(AtomicCommand::Dash { power, direction }) = effector.mutex_command() else {
            panic!("expected dash");
        };
        assert_eq!(direction, 37.0);
        assert_eq!(power, 60.0);
    }

    #[test]
    fn test_exhausted_dash_rejected() {
        let (effector, mut world) = setup();
        world.me.stamina = -50.0;
        assert!(!effector.set_dash_action(&world, 100.0, 0.0));
        assert!(effector.queue().is_empty());
        assert!(!effector.is_body_queued());
    }

    #[test]
    fn test_kick_needs_ball_and_play_mode() {
        let (effector, mut world) = setup();
        world.ball.confidence = 1.0;
        world.ball.pos = Vector::new(5.0, 0.0);
        assert!(!effector.set_kick_action(&world, 50.0, 0.0));

        world.ball.pos = Vector::new(0.6, 0.0);
        world.play_mode = PlayMode::FreeKick(Side::Right);
        assert!(!effector.set_kick_action(&world, 50.0, 0.0));

        world.play_mode = PlayMode::FreeKick(Side::Left);
        assert!(effector.set_kick_action(&world, 150.0, 0.0));
        assert_eq!(
            effector.mutex_command(),
            Some(AtomicCommand::Kick {
                power: 100.0,
                direction: 0.0
            })
        );
    }

    #[test]
    fn test_move_only_while_clock_halted() {
        let (effector, mut world) = setup();
        assert!(!effector.set_move_action(&world, Vector::new(-10.0, 0.0)));
        world.play_mode = PlayMode::BeforeKickOff;
        assert!(effector.set_move_action(&world, Vector::new(-10.0, 0.0)));
    }

    #[test]
    fn test_catch_only_for_goalie() {
        let (effector, mut world) = setup();
        world.me.pos = Vector::new(-50.0, 0.0);
        world.ball.pos = Vector::new(-49.5, 0.0);
        world.ball.confidence = 1.0;
        assert!(!effector.set_catch_action(&world, 0.0));
        world.goalie = true;
        assert!(effector.set_catch_action(&world, 0.0));
    }

    #[test]
    fn test_turn_neck_respects_range() {
        let (effector, mut world) = setup();
        world.me.head_angle = 80.0;
        assert!(effector.set_turn_neck_action(&world, 30.0));
        assert!(!effector.set_turn_neck_action(&world, -10.0));
        let entries = effector.queue().entries();
        assert_eq!(entries[0].command, AtomicCommand::TurnNeck { angle: 10.0 });
        // Not a body command
        assert!(effector.set_turn_action(&world, 10.0));
    }

    #[test]
    fn test_say_validation_and_repeat() {
        let (effector, world) = setup();
        assert!(effector.set_say_action(&world, "pass"));
        assert!(effector.set_say_action(&world, "shoot"));
        assert!(!effector.set_say_action(&world, "way too long text"));
        assert!(!effector.set_say_action(&world, "a(b"));
        assert_eq!(effector.count(CommandTag::Say), 2);
    }

    #[test]
    fn test_auxiliary_commands() {
        let (effector, world) = setup();
        assert!(!effector.set_change_view_action(&world, ViewWidth::Normal));
        assert!(effector.set_change_view_action(&world, ViewWidth::Wide));
        assert!(!effector.set_attention_to_action(&world, AttentionTarget::Teammate(9)));
        assert!(effector.set_attention_to_action(&world, AttentionTarget::Teammate(5)));
        assert!(!effector.set_clang_action(&world, 9, 7));
        assert!(effector.set_clang_action(&world, 7, 15));
        assert!(effector.set_point_to_action(&world, Some(Vector::new(10.0, 20.0))));
        assert!(effector.set_ear_action(&world, true));
        assert!(effector.set_ear_action(&world, false));
        assert!(effector.set_synch_see_action(&world));
        assert!(!effector.set_synch_see_action(&world));
        assert!(!effector.is_body_queued());
    }

    #[test]
    fn test_point_to_is_relative_to_body() {
        let (effector, mut world) = setup();
        world.me.pos = Vector::new(10.0, 0.0);
        world.me.body_dir = 90.0;
        assert!(effector.set_point_to_action(&world, Some(Vector::new(10.0, -20.0))));
        assert!(!effector.set_point_to_action(&world, None));

        let wires: Vec<_> = effector.queue().entries().into_iter().map(|e| e.wire).collect();
        assert_eq!(wires, vec!["(pointto 20.00 180.00)".to_string()]);

        let (effector, world) = setup();
        assert!(!effector.set_point_to_action(&world, Some(Vector::new(f64::NAN, 0.0))));
        assert!(effector.set_point_to_action(&world, None));
        assert_eq!(effector.queue().entries()[0].wire, "(pointto off)");
    }

    #[test]
    fn test_prediction_follows_queued_dash() {
        let (effector, world) = setup();
        assert_eq!(effector.self_pos_with_queued_actions(&world), Vector::ZERO);
        assert!(effector.set_dash_action(&world, 40.0, 0.0));
        let pos = effector.self_pos_with_queued_actions(&world);
        assert!((pos.x - 0.24).abs() < 1e-9);
        assert!(pos.y.abs() < 1e-9);
        assert_eq!(effector.self_body_dir_with_queued_actions(&world), 0.0);
        assert!((effector.self_vel_with_queued_actions(&world).x - 0.096).abs() < 1e-9);
        assert_eq!(effector.ball_vel_with_queued_actions(&world), Vector::ZERO);
    }

    #[test]
    fn test_tackle_rejected_without_width() {
        let mut params = GameParams::default();
        params.server.tackle_width = 0.0;
        let effector = ActionEffector::new(Arc::new(CommandQueue::new()));
        let mut world = WorldState::new(Arc::new(params), Side::Left, 9, false);
        world.play_mode = PlayMode::PlayOn;
        world.time = SimTime::new(1, 0);
        world.ball.pos = Vector::new(0.8, 0.0);
        world.ball.confidence = 1.0;

        assert!(!effector.set_tackle_action(&world, 0.0, false));
        assert!(effector.queue().is_empty());
        assert!(!effector.is_body_queued());
    }

    #[test]
    fn test_incapacitated_agent_cannot_act() {
        let (effector, mut world) = setup();
        world.me.tackle_expires = 3;
        assert!(!effector.set_dash_action(&world, 50.0, 0.0));
        assert!(!effector.set_turn_action(&world, 10.0));
        assert!(effector.set_turn_neck_action(&world, 10.0));
    }

    #[test]
    fn test_reconcile_reports_miss() {
        let (effector, world) = setup();
        assert!(effector.set_turn_action(&world, 30.0));
        effector.reset();
        let mut counts = CommandCounts::new();
        counts.set(CommandTag::Turn, 0);
        let report = effector.reconcile(world.time, &counts);
        assert!(report.is_missed(CommandTag::Turn));
        assert_eq!(effector.count(CommandTag::Turn), 0);
    }
}
