//! Sensor Message Decoding
//!
//! Decodes the subset of server messages the control core consumes:
//! connection reply, body sense (including the per-command executed
//! counters), referee and player hearing, and ball sightings.
//!
//! Field-level problems inside an otherwise well-formed message are not
//! errors: the field is left as `None` and the rest of the message is kept.

use serde::{Deserialize, Serialize};

use crate::command::{CommandTag, ViewWidth};
use crate::error::ParseError;
use crate::play_mode::{PlayMode, Side};
use crate::sexpr::Sexp;

/// Executed-command counters echoed by the server in `sense_body`.
///
/// Only tags the server reports have a value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandCounts {
    counts: [Option<u64>; CommandTag::COUNT],
}

impl CommandCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tag: CommandTag) -> Option<u64> {
        self.counts[tag.index()]
    }

    pub fn set(&mut self, tag: CommandTag, count: u64) {
        self.counts[tag.index()] = Some(count);
    }

    /// Iterates over the reported tags.
    pub fn iter(&self) -> impl Iterator<Item = (CommandTag, u64)> + '_ {
        CommandTag::ALL
            .iter()
            .filter_map(|tag| self.get(*tag).map(|count| (*tag, count)))
    }

    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(Option::is_none)
    }
}

/// Reply to the `init` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitInfo {
    pub side: Side,
    pub unum: u8,
    pub play_mode: Option<PlayMode>,
}

/// Proprioceptive report sent at the start of every cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodySense {
    pub cycle: u32,
    pub view_width: Option<ViewWidth>,
    pub stamina: Option<f64>,
    pub effort: Option<f64>,
    /// Speed magnitude and direction relative to the face direction.
    pub speed: Option<(f64, f64)>,
    pub head_angle: Option<f64>,
    pub tackle_expires: Option<u32>,
    pub counts: CommandCounts,
}

/// Who spoke a heard message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HearSender {
    Referee,
    Coach,
    Myself,
    Player { direction: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hearing {
    pub cycle: u32,
    pub sender: HearSender,
    pub message: String,
}

impl Hearing {
    /// Play mode announced by a referee message, if it is one.
    pub fn play_mode(&self) -> Option<PlayMode> {
        if self.sender == HearSender::Referee {
            self.message.parse().ok()
        } else {
            None
        }
    }
}

/// Relative ball observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallSight {
    pub distance: f64,
    /// Direction relative to the face direction.
    pub direction: f64,
    pub dist_change: Option<f64>,
    pub dir_change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sight {
    pub cycle: u32,
    pub ball: Option<BallSight>,
}

/// A decoded server message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SensorMessage {
    Init(InitInfo),
    SenseBody(BodySense),
    Hear(Hearing),
    See(Sight),
    ServerError { reason: String },
    Warning { reason: String },
    Unknown { head: String },
}

/// Decodes one server datagram.
pub fn parse_message(text: &str) -> Result<SensorMessage, ParseError> {
    let sexp = Sexp::parse(text)?;
    let items = sexp.as_list().ok_or(ParseError::MissingField("head"))?;
    let head = items
        .first()
        .and_then(Sexp::as_atom)
        .ok_or(ParseError::MissingField("head"))?;

    match head {
        "init" => parse_init(items).map(SensorMessage::Init),
        "sense_body" => parse_sense_body(&sexp, items).map(SensorMessage::SenseBody),
        "hear" => parse_hear(items).map(SensorMessage::Hear),
        "see" => parse_see(items).map(SensorMessage::See),
        "error" => Ok(SensorMessage::ServerError {
            reason: join_atoms(&items[1..]),
        }),
        "warning" => Ok(SensorMessage::Warning {
            reason: join_atoms(&items[1..]),
        }),
        other => Ok(SensorMessage::Unknown {
            head: other.to_string(),
        }),
    }
}

fn join_atoms(items: &[Sexp]) -> String {
    items
        .iter()
        .filter_map(Sexp::as_atom)
        .collect::<Vec<_>>()
        .join(" ")
}

fn cycle_field(items: &[Sexp]) -> Result<u32, ParseError> {
    let atom = items
        .get(1)
        .and_then(Sexp::as_atom)
        .ok_or(ParseError::MissingField("time"))?;
    atom.parse()
        .map_err(|_| ParseError::InvalidNumber(atom.to_string()))
}

fn parse_init(items: &[Sexp]) -> Result<InitInfo, ParseError> {
    let side: Side = items
        .get(1)
        .and_then(Sexp::as_atom)
        .ok_or(ParseError::MissingField("side"))?
        .parse()?;
    let unum_atom = items
        .get(2)
        .and_then(Sexp::as_atom)
        .ok_or(ParseError::MissingField("unum"))?;
    let unum = unum_atom
        .parse()
        .map_err(|_| ParseError::InvalidNumber(unum_atom.to_string()))?;
    let play_mode = items
        .get(3)
        .and_then(Sexp::as_atom)
        .and_then(|s| s.parse().ok());
    Ok(InitInfo {
        side,
        unum,
        play_mode,
    })
}

fn nth_f64(node: Option<&Sexp>, n: usize) -> Option<f64> {
    node?.as_list()?.get(n)?.as_f64()
}

fn nth_u64(node: Option<&Sexp>, n: usize) -> Option<u64> {
    node?.as_list()?.get(n)?.as_u64()
}

fn parse_sense_body(sexp: &Sexp, items: &[Sexp]) -> Result<BodySense, ParseError> {
    let cycle = cycle_field(items)?;

    let view_width = sexp
        .child("view_mode")
        .and_then(Sexp::as_list)
        .and_then(|list| list.get(2))
        .and_then(Sexp::as_atom)
        .and_then(ViewWidth::from_name);

    let stamina_node = sexp.child("stamina");
    let speed_node = sexp.child("speed");
    let speed = nth_f64(speed_node, 1).zip(nth_f64(speed_node, 2));

    let mut counts = CommandCounts::new();
    for tag in [
        CommandTag::Kick,
        CommandTag::Dash,
        CommandTag::Turn,
        CommandTag::Say,
        CommandTag::TurnNeck,
        CommandTag::Catch,
        CommandTag::Move,
        CommandTag::ChangeView,
    ] {
        if let Some(count) = nth_u64(sexp.child(tag.name()), 1) {
            counts.set(tag, count);
        }
    }

    // Nested counters: (arm ... (count N)), (focus ... (count N)), (tackle ... (count N))
    let nested_count = |key: &str| sexp.child(key).and_then(|n| nth_u64(n.child("count"), 1));
    if let Some(count) = nested_count("arm") {
        counts.set(CommandTag::PointTo, count);
    }
    if let Some(count) = nested_count("focus") {
        counts.set(CommandTag::AttentionTo, count);
    }
    if let Some(count) = nested_count("tackle") {
        counts.set(CommandTag::Tackle, count);
    }
    let tackle_expires = sexp
        .child("tackle")
        .and_then(|n| nth_u64(n.child("expires"), 1))
        .map(|v| v as u32);

    Ok(BodySense {
        cycle,
        view_width,
        stamina: nth_f64(stamina_node, 1),
        effort: nth_f64(stamina_node, 2),
        speed,
        head_angle: nth_f64(sexp.child("head_angle"), 1),
        tackle_expires,
        counts,
    })
}

fn parse_hear(items: &[Sexp]) -> Result<Hearing, ParseError> {
    let cycle = cycle_field(items)?;
    let who = items.get(2).ok_or(ParseError::MissingField("sender"))?;
    let message = items
        .last()
        .and_then(Sexp::as_atom)
        .ok_or(ParseError::MissingField("message"))?
        .to_string();

    let sender = match who.as_atom() {
        Some("referee") => HearSender::Referee,
        Some("self") => HearSender::Myself,
        Some("online_coach_left") | Some("online_coach_right") | Some("coach") => {
            HearSender::Coach
        }
        Some(atom) => match atom.parse::<f64>() {
            Ok(direction) => HearSender::Player { direction },
            Err(_) => return Err(ParseError::MissingField("sender")),
        },
        None => return Err(ParseError::MissingField("sender")),
    };

    Ok(Hearing {
        cycle,
        sender,
        message,
    })
}

fn parse_see(items: &[Sexp]) -> Result<Sight, ParseError> {
    let cycle = cycle_field(items)?;
    let ball = items[2..].iter().find_map(|object| {
        let parts = object.as_list()?;
        let name = parts.first()?.head()?;
        if name != "b" && name != "B" {
            return None;
        }
        Some(BallSight {
            distance: parts.get(1)?.as_f64()?,
            direction: parts.get(2)?.as_f64()?,
            dist_change: parts.get(3).and_then(Sexp::as_f64),
            dir_change: parts.get(4).and_then(Sexp::as_f64),
        })
    });
    Ok(Sight { cycle, ball })
}
