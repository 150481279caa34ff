//! Atomic Commands
//!
//! The smallest instructions the server accepts in one cycle. Each command
//! serializes to a single parenthesized token; several tokens for the same
//! cycle may be concatenated into one datagram.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag identifying the kind of an [`AtomicCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandTag {
    Turn,
    Dash,
    Kick,
    Tackle,
    Catch,
    Move,
    TurnNeck,
    Say,
    ChangeView,
    PointTo,
    AttentionTo,
    Clang,
    Ear,
    SynchSee,
}

impl CommandTag {
    /// Number of distinct tags.
    pub const COUNT: usize = 14;

    /// Every tag, in declaration order.
    pub const ALL: [CommandTag; CommandTag::COUNT] = [
        CommandTag::Turn,
        CommandTag::Dash,
        CommandTag::Kick,
        CommandTag::Tackle,
        CommandTag::Catch,
        CommandTag::Move,
        CommandTag::TurnNeck,
        CommandTag::Say,
        CommandTag::ChangeView,
        CommandTag::PointTo,
        CommandTag::AttentionTo,
        CommandTag::Clang,
        CommandTag::Ear,
        CommandTag::SynchSee,
    ];

    /// Body actions that share the per-cycle mutual-exclusion flag.
    pub fn is_mutex(self) -> bool {
        matches!(
            self,
            CommandTag::Turn
                | CommandTag::Dash
                | CommandTag::Kick
                | CommandTag::Tackle
                | CommandTag::Catch
                | CommandTag::Move
        )
    }

    /// Tags that may be queued more than once in the same cycle.
    pub fn is_repeatable(self) -> bool {
        matches!(self, CommandTag::Say | CommandTag::Clang | CommandTag::Ear)
    }

    /// Dense index for table lookups.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Keyword used on the wire and in the body-sense counters.
    pub fn name(self) -> &'static str {
        match self {
            CommandTag::Turn => "turn",
            CommandTag::Dash => "dash",
            CommandTag::Kick => "kick",
            CommandTag::Tackle => "tackle",
            CommandTag::Catch => "catch",
            CommandTag::Move => "move",
            CommandTag::TurnNeck => "turn_neck",
            CommandTag::Say => "say",
            CommandTag::ChangeView => "change_view",
            CommandTag::PointTo => "pointto",
            CommandTag::AttentionTo => "attentionto",
            CommandTag::Clang => "clang",
            CommandTag::Ear => "ear",
            CommandTag::SynchSee => "synch_see",
        }
    }
}

impl fmt::Display for CommandTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Width of the visual cone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewWidth {
    Narrow,
    Normal,
    Wide,
}

impl ViewWidth {
    pub fn name(self) -> &'static str {
        match self {
            ViewWidth::Narrow => "narrow",
            ViewWidth::Normal => "normal",
            ViewWidth::Wide => "wide",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "narrow" => Some(ViewWidth::Narrow),
            "normal" => Some(ViewWidth::Normal),
            "wide" => Some(ViewWidth::Wide),
            _ => None,
        }
    }
}

/// Player whose voice the agent focuses on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttentionTarget {
    Off,
    Teammate(u8),
    Opponent(u8),
}

/// Point the arm at: distance from the player and direction in degrees,
/// measured from the body direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArmTarget {
    pub distance: f64,
    pub direction: f64,
}

/// A single instruction for the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum AtomicCommand {
    Turn { moment: f64 },
    Dash { power: f64, direction: f64 },
    Kick { power: f64, direction: f64 },
    Tackle { angle: f64, foul: bool },
    Catch { direction: f64 },
    Move { x: f64, y: f64 },
    TurnNeck { angle: f64 },
    Say { message: String },
    ChangeView { width: ViewWidth },
    /// Arm target relative to the body, or `None` to lower the arm.
    PointTo { target: Option<ArmTarget> },
    AttentionTo { target: AttentionTarget },
    Clang { min: u32, max: u32 },
    Ear { on: bool },
    SynchSee,
}

impl AtomicCommand {
    pub fn tag(&self) -> CommandTag {
        match self {
            AtomicCommand::Turn { .. } => CommandTag::Turn,
            AtomicCommand::Dash { .. } => CommandTag::Dash,
            AtomicCommand::Kick { .. } => CommandTag::Kick,
            AtomicCommand::Tackle { .. } => CommandTag::Tackle,
            AtomicCommand::Catch { .. } => CommandTag::Catch,
            AtomicCommand::Move { .. } => CommandTag::Move,
            AtomicCommand::TurnNeck { .. } => CommandTag::TurnNeck,
            AtomicCommand::Say { .. } => CommandTag::Say,
            AtomicCommand::ChangeView { .. } => CommandTag::ChangeView,
            AtomicCommand::PointTo { .. } => CommandTag::PointTo,
            AtomicCommand::AttentionTo { .. } => CommandTag::AttentionTo,
            AtomicCommand::Clang { .. } => CommandTag::Clang,
            AtomicCommand::Ear { .. } => CommandTag::Ear,
            AtomicCommand::SynchSee => CommandTag::SynchSee,
        }
    }

    /// Serializes the command to its wire token.
    pub fn to_wire(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AtomicCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtomicCommand::Turn { moment } => write!(f, "(turn {:.2})", moment),
            AtomicCommand::Dash { power, direction } => {
                write!(f, "(dash {:.2} {:.2})", power, direction)
            }
            AtomicCommand::Kick { power, direction } => {
                write!(f, "(kick {:.2} {:.2})", power, direction)
            }
            AtomicCommand::Tackle { angle, foul } => {
                if *foul {
                    write!(f, "(tackle {:.2} on)", angle)
                } else {
                    write!(f, "(tackle {:.2})", angle)
                }
            }
            AtomicCommand::Catch { direction } => write!(f, "(catch {:.2})", direction),
            AtomicCommand::Move { x, y } => write!(f, "(move {:.2} {:.2})", x, y),
            AtomicCommand::TurnNeck { angle } => write!(f, "(turn_neck {:.2})", angle),
            AtomicCommand::Say { message } => write!(f, "(say \"{}\")", message),
            AtomicCommand::ChangeView { width } => write!(f, "(change_view {})", width.name()),
            AtomicCommand::PointTo { target: Some(p) } => {
                write!(f, "(pointto {:.2} {:.2})", p.distance, p.direction)
            }
            AtomicCommand::PointTo { target: None } => f.write_str("(pointto off)"),
            AtomicCommand::AttentionTo { target } => match target {
                AttentionTarget::Off => f.write_str("(attentionto off)"),
                AttentionTarget::Teammate(unum) => write!(f, "(attentionto our {})", unum),
                AttentionTarget::Opponent(unum) => write!(f, "(attentionto opp {})", unum),
            },
            AtomicCommand::Clang { min, max } => write!(f, "(clang (ver {} {}))", min, max),
            AtomicCommand::Ear { on } => {
                write!(f, "(ear ({}))", if *on { "on" } else { "off" })
            }
            AtomicCommand::SynchSee => f.write_str("(synch_see)"),
        }
    }
}

/// Connection request sent once before any other command.
pub fn init_command(team_name: &str, version: &str, goalie: bool) -> String {
    if goalie {
        format!("(init {} (version {}) (goalie))", team_name, version)
    } else {
        format!("(init {} (version {}))", team_name, version)
    }
}

/// Disconnect notice sent during shutdown.
pub fn bye_command() -> &'static str {
    "(bye)"
}
