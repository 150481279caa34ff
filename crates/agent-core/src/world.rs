//! World Model
//!
//! Absolute state of the agent and the ball, rebuilt each cycle from the
//! observation snapshot. Self position is dead-reckoned from last cycle's
//! body command when the server executed it; the ball is placed from its
//! relative sighting and otherwise coasts with decaying confidence.
//!
//! Coordinates are in the agent's own frame: the opponent goal is always
//! at `+x`.

use std::sync::Arc;

use agent_protocol::{normalize_angle, AtomicCommand, PlayMode, Side, SimTime, Vector, ViewWidth};

use crate::actuation::prediction;
use crate::observation::Observation;
use crate::params::{
    GameParams, PENALTY_AREA_HALF_WIDTH, PENALTY_AREA_LENGTH, PITCH_HALF_LENGTH,
};

/// Ball confidence multiplier applied every cycle without a sighting.
const BALL_CONFIDENCE_DECAY: f64 = 0.9;
/// Confidence under which the ball position is treated as unknown.
const BALL_CONFIDENCE_MIN: f64 = 0.05;

#[derive(Debug, Clone, PartialEq)]
pub struct SelfState {
    pub pos: Vector,
    pub vel: Vector,
    /// Body direction in degrees
    pub body_dir: f64,
    /// Neck angle relative to the body
    pub head_angle: f64,
    pub stamina: f64,
    pub effort: f64,
    /// Cycles left before the agent recovers from a tackle
    pub tackle_expires: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BallState {
    pub pos: Vector,
    pub vel: Vector,
    /// 1.0 right after a sighting, decays each cycle without one
    pub confidence: f64,
    pub last_seen: Option<SimTime>,
}

#[derive(Debug, Clone)]
pub struct WorldState {
    params: Arc<GameParams>,
    pub time: SimTime,
    pub play_mode: PlayMode,
    pub side: Side,
    pub unum: u8,
    pub goalie: bool,
    pub view_width: ViewWidth,
    pub me: SelfState,
    pub ball: BallState,
}

impl WorldState {
    pub fn new(params: Arc<GameParams>, side: Side, unum: u8, goalie: bool) -> Self {
        let stamina = params.server.stamina_max;
        let effort = params.player.effort_max;
        Self {
            params,
            time: SimTime::default(),
            play_mode: PlayMode::BeforeKickOff,
            side,
            unum,
            goalie,
            view_width: ViewWidth::Normal,
            me: SelfState {
                pos: Vector::ZERO,
                vel: Vector::ZERO,
                body_dir: 0.0,
                head_angle: 0.0,
                stamina,
                effort,
                tackle_expires: 0,
            },
            ball: BallState {
                pos: Vector::ZERO,
                vel: Vector::ZERO,
                confidence: 0.0,
                last_seen: None,
            },
        }
    }

    pub fn params(&self) -> &GameParams {
        &self.params
    }

    pub fn shared_params(&self) -> Arc<GameParams> {
        Arc::clone(&self.params)
    }

    /// Advances the model to the snapshot's time.
    ///
    /// `executed` is last cycle's body command if the server confirmed it;
    /// pass `None` when it was lost or nothing was sent.
    pub fn refresh(&mut self, obs: &Observation, executed: Option<&AtomicCommand>) {
        let previous_mode = self.play_mode;

        let next = prediction::predict(self, executed);
        self.me.pos = next.self_pos;
        self.me.vel = next.self_vel;
        self.me.body_dir = next.self_body_dir;
        self.ball.pos = next.ball_pos;
        self.ball.vel = next.ball_vel;
        self.ball.confidence *= BALL_CONFIDENCE_DECAY;

        self.time = obs.time;
        self.play_mode = obs.play_mode;
        self.side = obs.side;
        self.unum = obs.unum;

        if let Some(body) = obs.body.as_ref().filter(|_| obs.has_body_for_current_time()) {
            if let Some(stamina) = body.stamina {
                self.me.stamina = stamina;
            }
            if let Some(effort) = body.effort {
                self.me.effort = effort;
            }
            if let Some(head_angle) = body.head_angle {
                self.me.head_angle = head_angle;
            }
            if let Some(width) = body.view_width {
                self.view_width = width;
            }
            self.me.tackle_expires = body.tackle_expires.unwrap_or(0);
            if let Some((speed, dir)) = body.speed {
                self.me.vel = Vector::polar(speed, self.face_dir() + dir);
            }
        }

        if self.play_mode != previous_mode
            && matches!(self.play_mode, PlayMode::BeforeKickOff | PlayMode::KickOff(_))
        {
            self.place_ball(Vector::ZERO, Vector::ZERO);
        }

        let sighting = obs
            .sight
            .as_ref()
            .filter(|_| obs.has_sight_for_current_time())
            .and_then(|sight| sight.ball);
        if let Some(ball) = sighting {
            let line = self.face_dir() + ball.direction;
            let pos = self.me.pos + Vector::polar(ball.distance, line);
            let vel = match (ball.dist_change, ball.dir_change) {
                (Some(dist_change), Some(dir_change)) => {
                    let radial = Vector::polar(dist_change, line);
                    let tangential =
                        Vector::polar(dir_change.to_radians() * ball.distance, line + 90.0);
                    self.me.vel + radial + tangential
                }
                _ => self.ball.vel,
            };
            self.place_ball(pos, vel);
            self.ball.last_seen = Some(self.time);
        }
    }

    fn place_ball(&mut self, pos: Vector, vel: Vector) {
        self.ball.pos = pos;
        self.ball.vel = vel;
        self.ball.confidence = 1.0;
    }

    /// Direction the agent is looking in.
    pub fn face_dir(&self) -> f64 {
        normalize_angle(self.me.body_dir + self.me.head_angle)
    }

    pub fn ball_known(&self) -> bool {
        self.ball.confidence > BALL_CONFIDENCE_MIN
    }

    pub fn ball_distance(&self) -> f64 {
        self.me.pos.dist(self.ball.pos)
    }

    /// Ball direction relative to the body.
    pub fn ball_angle_from_body(&self) -> f64 {
        normalize_angle((self.ball.pos - self.me.pos).dir() - self.me.body_dir)
    }

    pub fn is_kickable(&self) -> bool {
        self.ball_known() && self.ball_distance() <= self.params.kickable_area()
    }

    pub fn is_catchable(&self) -> bool {
        self.goalie
            && self.play_mode == PlayMode::PlayOn
            && self.ball_known()
            && in_own_penalty_area(self.ball.pos)
            && self.ball_distance() <= self.params.catchable_area()
    }

    /// Probability that a tackle this cycle touches the ball.
    pub fn tackle_probability(&self) -> f64 {
        if !self.ball_known() || self.me.tackle_expires > 0 {
            return 0.0;
        }
        let server = &self.params.server;
        let rel = (self.ball.pos - self.me.pos).rotate(-self.me.body_dir);
        let reach = if rel.x >= 0.0 {
            server.tackle_dist
        } else {
            server.tackle_back_dist
        };
        let width = server.tackle_width;
        if reach <= 0.0 || width <= 0.0 || width.is_nan() {
            return 0.0;
        }
        if rel.x.abs() > reach || rel.y.abs() > width {
            return 0.0;
        }
        let fail = (rel.x.abs() / reach).powf(server.tackle_exponent)
            + (rel.y.abs() / width).powf(server.tackle_exponent);
        let p = 1.0 - fail;
        if p.is_nan() {
            0.0
        } else {
            p.clamp(0.0, 1.0)
        }
    }

    pub fn can_move(&self) -> bool {
        self.play_mode.allows_move()
    }

    pub fn can_kick(&self) -> bool {
        self.play_mode.allows_kick_for(self.side)
    }

    /// False while recovering from a tackle or after the match ended.
    pub fn can_act(&self) -> bool {
        self.me.tackle_expires == 0 && self.play_mode != PlayMode::TimeOver
    }

    /// Dash power the agent can still afford this cycle.
    pub fn stamina_headroom(&self) -> f64 {
        (self.me.stamina + self.params.player.extra_stamina).max(0.0)
    }

    pub fn opponent_goal(&self) -> Vector {
        Vector::new(PITCH_HALF_LENGTH, 0.0)
    }

    pub fn own_goal(&self) -> Vector {
        Vector::new(-PITCH_HALF_LENGTH, 0.0)
    }
}

pub fn in_own_penalty_area(pos: Vector) -> bool {
    pos.x <= -PITCH_HALF_LENGTH + PENALTY_AREA_LENGTH && pos.y.abs() <= PENALTY_AREA_HALF_WIDTH
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_protocol::{parse_message, InitInfo};

    fn world() -> WorldState {
        WorldState::new(Arc::new(GameParams::default()), Side::Left, 9, false)
    }

    fn observation(messages: &[&str]) -> Observation {
        let mut obs = Observation::new(&InitInfo {
            side: Side::Left,
            unum: 9,
            play_mode: Some(PlayMode::PlayOn),
        });
        for message in messages {
            obs.apply(parse_message(message).unwrap());
        }
        obs
    }

    #[test]
    fn test_refresh_places_seen_ball() {
        let mut world = world();
        let obs = observation(&[
            "(sense_body 3 (stamina 7000 0.9 100000) (speed 0 0) (head_angle 0))",
            "(see 3 ((b) 10 0))",
        ]);
        world.refresh(&obs, None);
        assert_eq!(world.time, SimTime::new(3, 0));
        assert_eq!(world.me.stamina, 7000.0);
        assert!((world.ball.pos.x - 10.0).abs() < 1e-9);
        assert!(world.ball.pos.y.abs() < 1e-9);
        assert_eq!(world.ball.confidence, 1.0);
    }

    #[test]
    fn test_ball_confidence_decays_without_sight() {
        let mut world = world();
        world.refresh(&observation(&["(sense_body 1)", "(see 1 ((b) 5 0))"]), None);
        world.refresh(&observation(&["(sense_body 2)"]), None);
        assert!((world.ball.confidence - BALL_CONFIDENCE_DECAY).abs() < 1e-9);
    }

    #[test]
    fn test_refresh_dead_reckons_executed_dash() {
        let mut world = world();
        world.play_mode = PlayMode::PlayOn;
        let dash = AtomicCommand::Dash {
            power: 40.0,
            direction: 0.0,
        };
        world.refresh(&observation(&["(sense_body 1)"]), Some(&dash));
        assert!((world.me.pos.x - 0.24).abs() < 1e-9);
    }

    #[test]
    fn test_kickable_and_tackle() {
        let mut world = world();
        world.ball.confidence = 1.0;
        world.ball.pos = Vector::new(0.8, 0.0);
        assert!(world.is_kickable());
        assert!(world.tackle_probability() > 0.99);

        world.ball.pos = Vector::new(1.5, 0.0);
        assert!(!world.is_kickable());
        let p = world.tackle_probability();
        assert!(p > 0.0 && p < 1.0);

        // Behind the body with zero back reach
        world.ball.pos = Vector::new(-0.5, 0.0);
        assert_eq!(world.tackle_probability(), 0.0);
    }

    #[test]
    fn test_tackle_needs_positive_width() {
        let mut params = GameParams::default();
        params.server.tackle_width = 0.0;
        let mut world = WorldState::new(Arc::new(params), Side::Left, 9, false);
        world.ball.confidence = 1.0;
        world.ball.pos = Vector::new(0.8, 0.0);
        assert_eq!(world.tackle_probability(), 0.0);

        let mut params = GameParams::default();
        params.server.tackle_width = f64::NAN;
        let mut world = WorldState::new(Arc::new(params), Side::Left, 9, false);
        world.ball.confidence = 1.0;
        world.ball.pos = Vector::new(0.8, 0.0);
        assert_eq!(world.tackle_probability(), 0.0);
    }

    #[test]
    fn test_catchable_requires_goalie_in_area() {
        let mut world = world();
        world.play_mode = PlayMode::PlayOn;
        world.me.pos = Vector::new(-50.0, 0.0);
        world.ball.pos = Vector::new(-49.0, 0.0);
        world.ball.confidence = 1.0;
        assert!(!world.is_catchable());
        world.goalie = true;
        assert!(world.is_catchable());
        world.play_mode = PlayMode::FreeKick(Side::Right);
        assert!(!world.is_catchable());
    }

    #[test]
    fn test_kick_off_resets_ball() {
        let mut world = world();
        world.play_mode = PlayMode::PlayOn;
        world.ball.pos = Vector::new(30.0, 10.0);
        let obs = observation(&["(sense_body 100)", "(hear 100 referee kick_off_r)"]);
        world.refresh(&obs, None);
        assert_eq!(world.ball.pos, Vector::ZERO);
        assert!(world.ball_known());
    }
}
