//! Physical Parameters
//!
//! Server and player-type constants used for legality checks and for
//! reproducing the server's motion model. Defaults match the server's
//! stock configuration and the default heterogeneous player type.
//!
//! These tables are built once at startup and shared by `Arc`; nothing in
//! the crate reads them from global state.

use serde::{Deserialize, Serialize};

/// Half length of the pitch; the opponent goal line is at `+PITCH_HALF_LENGTH`.
pub const PITCH_HALF_LENGTH: f64 = 52.5;
/// Half width of the pitch.
pub const PITCH_HALF_WIDTH: f64 = 34.0;
/// Width of the goal mouth.
pub const GOAL_WIDTH: f64 = 14.02;
/// Penalty area depth measured from the goal line.
pub const PENALTY_AREA_LENGTH: f64 = 16.5;
/// Penalty area half width.
pub const PENALTY_AREA_HALF_WIDTH: f64 = 20.16;

/// Server-wide physics and rule constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerParams {
    pub ball_decay: f64,
    pub ball_size: f64,
    pub ball_speed_max: f64,
    pub ball_accel_max: f64,
    pub kick_power_rate: f64,
    pub max_power: f64,
    pub min_power: f64,
    pub max_moment: f64,
    pub min_moment: f64,
    pub max_neck_moment: f64,
    pub min_neck_moment: f64,
    pub max_neck_angle: f64,
    pub min_neck_angle: f64,
    /// Dash directions are quantized to multiples of this step.
    pub dash_angle_step: f64,
    pub side_dash_rate: f64,
    pub back_dash_rate: f64,
    pub player_accel_max: f64,
    pub stamina_max: f64,
    pub catchable_area_l: f64,
    pub catchable_area_w: f64,
    pub tackle_dist: f64,
    pub tackle_back_dist: f64,
    pub tackle_width: f64,
    pub tackle_exponent: f64,
    pub tackle_power_rate: f64,
    pub max_tackle_power: f64,
    /// Maximum length of a `say` message.
    pub say_msg_size: usize,
}

impl Default for ServerParams {
    fn default() -> Self {
        Self {
            ball_decay: 0.94,
            ball_size: 0.085,
            ball_speed_max: 3.0,
            ball_accel_max: 2.7,
            kick_power_rate: 0.027,
            max_power: 100.0,
            min_power: -100.0,
            max_moment: 180.0,
            min_moment: -180.0,
            max_neck_moment: 180.0,
            min_neck_moment: -180.0,
            max_neck_angle: 90.0,
            min_neck_angle: -90.0,
            dash_angle_step: 1.0,
            side_dash_rate: 0.4,
            back_dash_rate: 0.7,
            player_accel_max: 1.0,
            stamina_max: 8000.0,
            catchable_area_l: 1.2,
            catchable_area_w: 1.0,
            tackle_dist: 2.0,
            tackle_back_dist: 0.0,
            tackle_width: 1.25,
            tackle_exponent: 6.0,
            tackle_power_rate: 0.027,
            max_tackle_power: 100.0,
            say_msg_size: 10,
        }
    }
}

/// Per-player-type body constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerType {
    pub player_decay: f64,
    pub inertia_moment: f64,
    pub dash_power_rate: f64,
    pub player_size: f64,
    pub kickable_margin: f64,
    pub kick_rand: f64,
    pub extra_stamina: f64,
    pub effort_max: f64,
    pub effort_min: f64,
    pub player_speed_max: f64,
}

impl Default for PlayerType {
    fn default() -> Self {
        Self {
            player_decay: 0.4,
            inertia_moment: 5.0,
            dash_power_rate: 0.006,
            player_size: 0.3,
            kickable_margin: 0.7,
            kick_rand: 0.1,
            extra_stamina: 50.0,
            effort_max: 1.0,
            effort_min: 0.6,
            player_speed_max: 1.05,
        }
    }
}

/// Both parameter tables, shared read-only by every component.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameParams {
    pub server: ServerParams,
    pub player: PlayerType,
}

impl GameParams {
    pub fn new(server: ServerParams, player: PlayerType) -> Self {
        Self { server, player }
    }

    /// Distance from the player's center within which the ball is kickable.
    pub fn kickable_area(&self) -> f64 {
        self.player.player_size + self.server.ball_size + self.player.kickable_margin
    }

    /// Distance within which a goalie can reach the ball with `catch`.
    pub fn catchable_area(&self) -> f64 {
        self.server
            .catchable_area_l
            .hypot(self.server.catchable_area_w * 0.5)
    }
}
