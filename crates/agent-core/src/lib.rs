//! Control core of a soccer-simulator agent: observation, arbitration,
//! actuation, and the three threads that tie them to the server.

pub mod actuation;
pub mod behavior;
pub mod config;
pub mod error;
pub mod observation;
pub mod params;
pub mod runtime;
pub mod signal;
pub mod trace;
pub mod transport;
pub mod world;

pub use actuation::{ActionEffector, CommandQueue};
pub use behavior::{ActiveBehavior, BehaviorArbiter, BehaviorCategory, BehaviorKind, ExecutorRegistry};
pub use config::AgentConfig;
pub use error::{AgentError, Result};
pub use observation::{Observation, ObservationStore};
pub use params::GameParams;
pub use runtime::AgentRuntime;
pub use trace::DecisionTrace;
pub use transport::{ChannelTransport, LossyTransport, Transport, UdpTransport};
pub use world::WorldState;
