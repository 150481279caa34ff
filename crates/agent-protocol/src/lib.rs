//! Shared protocol types for the soccer-simulator agent.
//!
//! This crate contains pure data structures with no threading or I/O:
//! simulated time, play modes, planar geometry, the atomic command
//! vocabulary with its wire serialization, and a narrow decoder for the
//! sensor messages the control core consumes.

pub mod command;
pub mod error;
pub mod geom;
pub mod play_mode;
pub mod sensor;
pub mod sexpr;
pub mod time;

pub use command::{
    bye_command, init_command, ArmTarget, AtomicCommand, AttentionTarget, CommandTag, ViewWidth,
};
pub use error::ParseError;
pub use geom::{normalize_angle, Vector};
pub use play_mode::{PlayMode, Side};
pub use sensor::{
    parse_message, BallSight, BodySense, CommandCounts, HearSender, Hearing, InitInfo,
    SensorMessage, Sight,
};
pub use sexpr::Sexp;
pub use time::SimTime;
