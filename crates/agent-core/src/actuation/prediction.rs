//! One-step motion model.
//!
//! Reproduces how the server moves the agent and the ball during one cycle
//! given the body command executed in it. Used both to dead-reckon the world
//! model and to answer "where will I be if the queued command runs".

use agent_protocol::{normalize_angle, AtomicCommand, Vector};

use crate::world::WorldState;

/// State at the start of the next cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub self_pos: Vector,
    pub self_vel: Vector,
    pub self_body_dir: f64,
    pub ball_pos: Vector,
    pub ball_vel: Vector,
}

/// Applies `command` (or nothing) to `world` for one cycle.
pub fn predict(world: &WorldState, command: Option<&AtomicCommand>) -> Prediction {
    let params = world.params();
    let me = &world.me;

    let mut self_accel = Vector::ZERO;
    let mut body_dir = me.body_dir;
    let mut ball_accel = Vector::ZERO;
    let mut teleport = None;
    let mut caught = false;

    match command {
        Some(AtomicCommand::Dash { power, direction }) => {
            self_accel = dash_accel(world, *power, *direction);
        }
        Some(AtomicCommand::Turn { moment }) => {
            body_dir = normalize_angle(body_dir + actual_turn(world, *moment));
        }
        Some(AtomicCommand::Kick { power, direction }) if world.is_kickable() => {
            ball_accel = Vector::polar(
                power * kick_rate(world),
                me.body_dir + direction,
            )
            .clamp_length(params.server.ball_accel_max);
        }
        Some(AtomicCommand::Tackle { angle, .. }) if world.tackle_probability() > 0.0 => {
            let server = &params.server;
            let effect = server.max_tackle_power * (1.0 - 0.5 * angle.abs() / 180.0);
            ball_accel = Vector::polar(effect * server.tackle_power_rate, me.body_dir + angle)
                .clamp_length(server.ball_accel_max);
        }
        Some(AtomicCommand::Catch { .. }) if world.is_catchable() => caught = true,
        Some(AtomicCommand::Move { x, y }) => teleport = Some(Vector::new(*x, *y)),
        _ => {}
    }

    let (self_pos, self_vel) = match teleport {
        Some(target) => (target, Vector::ZERO),
        None => {
            let vel = (me.vel + self_accel).clamp_length(params.player.player_speed_max);
            (me.pos + vel, vel * params.player.player_decay)
        }
    };

    let (ball_pos, ball_vel) = if caught {
        (self_pos, Vector::ZERO)
    } else {
        let vel = (world.ball.vel + ball_accel).clamp_length(params.server.ball_speed_max);
        (world.ball.pos + vel, vel * params.server.ball_decay)
    };

    Prediction {
        self_pos,
        self_vel,
        self_body_dir: body_dir,
        ball_pos,
        ball_vel,
    }
}

/// Acceleration produced by `(dash power direction)`.
pub fn dash_accel(world: &WorldState, power: f64, direction: f64) -> Vector {
    let params = world.params();
    let dir = normalize_angle(direction);
    let abs_dir = dir.abs();
    let dir_rate = if abs_dir > 90.0 {
        let back = params.server.back_dash_rate;
        let side = params.server.side_dash_rate;
        back - (back - side) * (1.0 - (abs_dir - 90.0) / 90.0)
    } else {
        let side = params.server.side_dash_rate;
        side + (1.0 - side) * (1.0 - abs_dir / 90.0)
    }
    .clamp(0.0, 1.0);

    let effective =
        (world.me.effort * power * dir_rate * params.player.dash_power_rate).abs();
    let heading = world.me.body_dir + dir + if power < 0.0 { 180.0 } else { 0.0 };
    Vector::polar(effective, heading).clamp_length(params.server.player_accel_max)
}

/// Body rotation produced by `(turn moment)` at the current speed.
pub fn actual_turn(world: &WorldState, moment: f64) -> f64 {
    let speed = world.me.vel.length();
    moment / (1.0 + world.params().player.inertia_moment * speed)
}

/// Moment needed to rotate the body by `angle` degrees, clamped to limits.
pub fn turn_moment_for(world: &WorldState, angle: f64) -> f64 {
    let params = world.params();
    let speed = world.me.vel.length();
    (normalize_angle(angle) * (1.0 + params.player.inertia_moment * speed))
        .clamp(params.server.min_moment, params.server.max_moment)
}

/// Kick power to acceleration ratio for the current ball placement.
pub fn kick_rate(world: &WorldState) -> f64 {
    let params = world.params();
    let dir_diff = world.ball_angle_from_body().abs();
    let dist_ball =
        (world.ball_distance() - params.player.player_size - params.server.ball_size).max(0.0);
    params.server.kick_power_rate
        * (1.0 - 0.25 * dir_diff / 180.0 - 0.25 * dist_ball / params.player.kickable_margin)
}

/// `(power, direction)` of the kick that best brings the ball to `velocity`.
pub fn kick_to_velocity(world: &WorldState, velocity: Vector) -> (f64, f64) {
    let params = world.params();
    let accel = velocity - world.ball.vel;
    let rate = kick_rate(world).max(f64::EPSILON);
    let power = (accel.length() / rate).min(params.server.max_power);
    let direction = normalize_angle(accel.dir() - world.me.body_dir);
    (power, direction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::GameParams;
    use agent_protocol::Side;
    use std::sync::Arc;

    fn world() -> WorldState {
        WorldState::new(Arc::new(GameParams::default()), Side::Left, 9, false)
    }

    #[test]
    fn test_forward_dash_from_rest() {
        let world = world();
        let dash = AtomicCommand::Dash {
            power: 40.0,
            direction: 0.0,
        };
        let next = predict(&world, Some(&dash));
        assert!((next.self_pos.x - 0.24).abs() < 1e-9);
        assert!(next.self_pos.y.abs() < 1e-9);
        assert!((next.self_vel.x - 0.24 * 0.4).abs() < 1e-9);
        assert_eq!(next.self_body_dir, 0.0);
    }

    #[test]
    fn test_backward_dash_rate() {
        let world = world();
        let accel = dash_accel(&world, 100.0, 180.0);
        // back_dash_rate 0.7 * 100 * 0.006
        assert!((accel.x + 0.42).abs() < 1e-9);
        let side = dash_accel(&world, 100.0, 90.0);
        assert!((side.length() - 0.24).abs() < 1e-9);
    }

    #[test]
    fn test_turn_slows_with_speed() {
        let mut world = world();
        assert_eq!(actual_turn(&world, 60.0), 60.0);
        world.me.vel = Vector::new(0.2, 0.0);
        assert!((actual_turn(&world, 60.0) - 30.0).abs() < 1e-9);
        assert!((turn_moment_for(&world, 30.0) - 60.0).abs() < 1e-9);
        assert_eq!(turn_moment_for(&world, 170.0), 180.0);
    }

    #[test]
    fn test_kick_moves_ball() {
        let mut world = world();
        world.ball.pos = Vector::new(0.5, 0.0);
        world.ball.confidence = 1.0;
        let kick = AtomicCommand::Kick {
            power: 100.0,
            direction: 0.0,
        };
        let next = predict(&world, Some(&kick));
        assert!(next.ball_pos.x > 0.5 + 1.5);
        assert!(next.ball_vel.x > 0.0);

        // Out of reach: the kick has no effect
        world.ball.pos = Vector::new(5.0, 0.0);
        let next = predict(&world, Some(&kick));
        assert_eq!(next.ball_pos, Vector::new(5.0, 0.0));
    }

    #[test]
    fn test_kick_to_velocity_round_trip() {
        let mut world = world();
        world.ball.pos = Vector::new(0.5, 0.0);
        world.ball.confidence = 1.0;
        let target = Vector::new(1.0, 1.0);
        let (power, direction) = kick_to_velocity(&world, target);
        let kick = AtomicCommand::Kick { power, direction };
        let next = predict(&world, Some(&kick));
        let vel_after_kick = next.ball_pos - world.ball.pos;
        assert!((vel_after_kick - target).length() < 1e-6);
    }

    #[test]
    fn test_move_teleports() {
        let world = world();
        let next = predict(&world, Some(&AtomicCommand::Move { x: -10.0, y: 5.0 }));
        assert_eq!(next.self_pos, Vector::new(-10.0, 5.0));
        assert_eq!(next.self_vel, Vector::ZERO);
    }
}
