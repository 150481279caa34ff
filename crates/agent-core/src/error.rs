//! Agent error types.
//!
//! Only startup can fail: configuration, socket setup and the connection
//! handshake. Once the runtime is spawned, problems are logged and the loop
//! carries on.

use thiserror::Error;

use crate::config::ConfigError;
use crate::transport::TransportError;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("No init reply from server within {0} ms")]
    HandshakeTimeout(u64),

    #[error("Could not open decision trace: {0}")]
    Trace(std::io::Error),

    #[error("Server rejected init: {0}")]
    Rejected(String),

    #[error("Failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, AgentError>;
