//! Scored behavior proposals.

use serde::{Deserialize, Serialize};
use std::fmt;

use agent_protocol::{SimTime, Vector};

/// Behavior categories in priority order. The first category whose tier
/// proposes anything wins the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorCategory {
    Penalty,
    Setplay,
    Attack,
    GoalieOrDefense,
    Formation,
}

impl BehaviorCategory {
    pub const ALL: [BehaviorCategory; 5] = [
        BehaviorCategory::Penalty,
        BehaviorCategory::Setplay,
        BehaviorCategory::Attack,
        BehaviorCategory::GoalieOrDefense,
        BehaviorCategory::Formation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BehaviorCategory::Penalty => "penalty",
            BehaviorCategory::Setplay => "setplay",
            BehaviorCategory::Attack => "attack",
            BehaviorCategory::GoalieOrDefense => "goalie_or_defense",
            BehaviorCategory::Formation => "formation",
        }
    }
}

impl fmt::Display for BehaviorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a proposal asks the agent to do. Each kind has one executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorKind {
    /// Kick at goal from the penalty spot
    PenaltyKick,
    /// Teleport to a position while the clock is halted
    SetplayMove,
    /// Restart play with a kick
    SetplayKick,
    Intercept,
    Shoot,
    Dribble,
    /// Keep the ball and turn toward a target
    Hold,
    Catch,
    /// Stand between the ball and the own goal
    Block,
    /// Run to a formation position
    Position,
}

impl BehaviorKind {
    pub fn name(self) -> &'static str {
        match self {
            BehaviorKind::PenaltyKick => "penalty_kick",
            BehaviorKind::SetplayMove => "setplay_move",
            BehaviorKind::SetplayKick => "setplay_kick",
            BehaviorKind::Intercept => "intercept",
            BehaviorKind::Shoot => "shoot",
            BehaviorKind::Dribble => "dribble",
            BehaviorKind::Hold => "hold",
            BehaviorKind::Catch => "catch",
            BehaviorKind::Block => "block",
            BehaviorKind::Position => "position",
        }
    }
}

impl fmt::Display for BehaviorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Refinement of a kind, e.g. which post a shot aims at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubType {
    NearPost,
    FarPost,
    KickOff,
    Restart,
    Fast,
    Careful,
    /// No ball information: look around
    Search,
}

/// A scored proposal for this cycle's action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveBehavior {
    pub kind: BehaviorKind,
    pub sub_type: Option<SubType>,
    pub category: BehaviorCategory,
    /// Higher is better
    pub evaluation: f64,
    pub target: Vector,
    /// Dash power for movement kinds
    pub power: f64,
    /// Body angle hint in degrees
    pub angle: f64,
    /// Ball speed right after the kick
    pub kick_speed: f64,
    pub time: SimTime,
}

impl ActiveBehavior {
    /// Creates a proposal. The category is stamped by the tier that ran the
    /// planner.
    pub fn new(kind: BehaviorKind, evaluation: f64, target: Vector, time: SimTime) -> Self {
        Self {
            kind,
            sub_type: None,
            category: BehaviorCategory::Formation,
            evaluation,
            target,
            power: 0.0,
            angle: 0.0,
            kick_speed: 0.0,
            time,
        }
    }

    pub fn with_sub_type(mut self, sub_type: SubType) -> Self {
        self.sub_type = Some(sub_type);
        self
    }

    pub fn with_power(mut self, power: f64) -> Self {
        self.power = power;
        self
    }

    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_kick_speed(mut self, kick_speed: f64) -> Self {
        self.kick_speed = kick_speed;
        self
    }
}
