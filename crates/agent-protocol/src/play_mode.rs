//! Play Modes
//!
//! The referee announces the game phase through `(hear T referee MODE)`
//! messages and the initial `(init ...)` reply.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// Field side a team plays on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Server suffix for this side (`l` or `r`).
    pub fn suffix(self) -> &'static str {
        match self {
            Side::Left => "l",
            Side::Right => "r",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for Side {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "l" => Ok(Side::Left),
            "r" => Ok(Side::Right),
            _ => Err(ParseError::UnknownSide(s.to_string())),
        }
    }
}

/// Game phase as announced by the referee.
///
/// Sided variants carry the side named in the referee string. For kicks
/// that side restarts play; for fault modes it is the offending side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayMode {
    BeforeKickOff,
    TimeOver,
    PlayOn,
    DropBall,
    KickOff(Side),
    KickIn(Side),
    FreeKick(Side),
    IndirectFreeKick(Side),
    CornerKick(Side),
    GoalKick(Side),
    GoalieCatchBall(Side),
    GoalScored(Side),
    Offside(Side),
    BackPass(Side),
    FreeKickFault(Side),
    CatchFault(Side),
    FoulCharge(Side),
    FoulPush(Side),
    IllegalDefense(Side),
    PenaltySetup(Side),
    PenaltyReady(Side),
    PenaltyTaken(Side),
    PenaltyMiss(Side),
    PenaltyScore(Side),
}

impl PlayMode {
    /// Side that restarts play in this mode, if any.
    pub fn restart_side(self) -> Option<Side> {
        use PlayMode::*;
        match self {
            KickOff(s) | KickIn(s) | FreeKick(s) | IndirectFreeKick(s) | CornerKick(s)
            | GoalKick(s) | GoalieCatchBall(s) => Some(s),
            GoalScored(s) => Some(s.opposite()),
            Offside(s) | BackPass(s) | FreeKickFault(s) | CatchFault(s) | FoulCharge(s)
            | FoulPush(s) | IllegalDefense(s) => Some(s.opposite()),
            _ => None,
        }
    }

    /// Returns true if `side` has a dead-ball restart in this mode.
    pub fn is_set_play_for(self, side: Side) -> bool {
        self.restart_side() == Some(side)
    }

    /// Returns true for the penalty shoot-out phases.
    pub fn is_penalty(self) -> bool {
        use PlayMode::*;
        matches!(
            self,
            PenaltySetup(_) | PenaltyReady(_) | PenaltyTaken(_) | PenaltyMiss(_) | PenaltyScore(_)
        )
    }

    /// Returns true if players may teleport with `move`.
    pub fn allows_move(self) -> bool {
        matches!(self, PlayMode::BeforeKickOff | PlayMode::GoalScored(_))
    }

    /// Returns true if a player on `side` may kick the ball in this mode.
    pub fn allows_kick_for(self, side: Side) -> bool {
        use PlayMode::*;
        match self {
            BeforeKickOff | TimeOver | GoalScored(_) => false,
            PenaltySetup(_) | PenaltyMiss(_) | PenaltyScore(_) => false,
            PenaltyReady(s) | PenaltyTaken(s) => s == side,
            PlayOn | DropBall => true,
            other => match other.restart_side() {
                Some(restart) => restart == side,
                None => true,
            },
        }
    }
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use PlayMode::*;
        let (name, side) = match *self {
            BeforeKickOff => return f.write_str("before_kick_off"),
            TimeOver => return f.write_str("time_over"),
            PlayOn => return f.write_str("play_on"),
            DropBall => return f.write_str("drop_ball"),
            KickOff(s) => ("kick_off", s),
            KickIn(s) => ("kick_in", s),
            FreeKick(s) => ("free_kick", s),
            IndirectFreeKick(s) => ("indirect_free_kick", s),
            CornerKick(s) => ("corner_kick", s),
            GoalKick(s) => ("goal_kick", s),
            GoalieCatchBall(s) => ("goalie_catch_ball", s),
            GoalScored(s) => ("goal", s),
            Offside(s) => ("offside", s),
            BackPass(s) => ("back_pass", s),
            FreeKickFault(s) => ("free_kick_fault", s),
            CatchFault(s) => ("catch_fault", s),
            FoulCharge(s) => ("foul_charge", s),
            FoulPush(s) => ("foul_push", s),
            IllegalDefense(s) => ("illegal_defense", s),
            PenaltySetup(s) => ("penalty_setup", s),
            PenaltyReady(s) => ("penalty_ready", s),
            PenaltyTaken(s) => ("penalty_taken", s),
            PenaltyMiss(s) => ("penalty_miss", s),
            PenaltyScore(s) => ("penalty_score", s),
        };
        write!(f, "{}_{}", name, side)
    }
}

impl FromStr for PlayMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use PlayMode::*;
        match s {
            "before_kick_off" => return Ok(BeforeKickOff),
            "time_over" => return Ok(TimeOver),
            "play_on" => return Ok(PlayOn),
            "drop_ball" => return Ok(DropBall),
            _ => {}
        }

        // Goal announcements carry the running score: goal_l_2
        if let Some(rest) = s.strip_prefix("goal_") {
            let side_str = rest.split('_').next().unwrap_or_default();
            if let Ok(side) = side_str.parse::<Side>() {
                return Ok(GoalScored(side));
            }
        }

        let (name, side_str) = s
            .rsplit_once('_')
            .ok_or_else(|| ParseError::UnknownPlayMode(s.to_string()))?;
        let side: Side = side_str
            .parse()
            .map_err(|_| ParseError::UnknownPlayMode(s.to_string()))?;

        let mode = match name {
            "kick_off" => KickOff(side),
            "kick_in" => KickIn(side),
            "free_kick" => FreeKick(side),
            "indirect_free_kick" => IndirectFreeKick(side),
            "corner_kick" => CornerKick(side),
            "goal_kick" => GoalKick(side),
            "goalie_catch_ball" => GoalieCatchBall(side),
            "offside" => Offside(side),
            "back_pass" => BackPass(side),
            "free_kick_fault" => FreeKickFault(side),
            "catch_fault" => CatchFault(side),
            "foul_charge" => FoulCharge(side),
            "foul_push" => FoulPush(side),
            "illegal_defense" => IllegalDefense(side),
            "penalty_setup" => PenaltySetup(side),
            "penalty_ready" => PenaltyReady(side),
            "penalty_taken" => PenaltyTaken(side),
            "penalty_miss" => PenaltyMiss(side),
            "penalty_score" => PenaltyScore(side),
            _ => return Err(ParseError::UnknownPlayMode(s.to_string())),
        };
        Ok(mode)
    }
}
