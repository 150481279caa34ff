//! Configuration loading for the agent.
//!
//! All agent settings are loaded from a TOML configuration file. Every
//! section is optional; missing keys fall back to their defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use agent_protocol::Vector;

use crate::params::{GameParams, PlayerType, ServerParams};

/// Complete agent configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Server address and identity
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Thread wait bounds and transmission mode
    #[serde(default)]
    pub timing: TimingConfig,
    /// Server physics constants
    #[serde(default)]
    pub server: ServerParams,
    /// Body constants of the player type in use
    #[serde(default)]
    pub player: PlayerType,
    /// Planner tuning
    #[serde(default)]
    pub behavior: BehaviorConfig,
    /// Positioning
    #[serde(default)]
    pub formation: FormationConfig,
}

impl AgentConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Returns the configuration as a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Physical parameter tables for the world model and actuation gate.
    pub fn game_params(&self) -> GameParams {
        GameParams::new(self.server.clone(), self.player.clone())
    }
}

/// Server connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub team_name: String,
    /// Protocol version announced in `init`
    pub version: String,
    pub goalie: bool,
    /// Receive poll interval; bounds how long shutdown takes to be noticed
    pub recv_timeout_ms: u64,
    /// How long to wait for the `init` reply
    pub handshake_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6000,
            team_name: "Rustaceans".to_string(),
            version: "15".to_string(),
            goalie: false,
            recv_timeout_ms: 50,
            handshake_timeout_ms: 2000,
        }
    }
}

impl ConnectionConfig {
    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

/// Wait bounds for the three runtime threads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Maximum wait for the next body sense
    pub wait_sense_ms: u64,
    /// Maximum wait for a sight of the current cycle; 0 disables the wait
    pub wait_sight_ms: u64,
    /// Maximum wait for hearing of the current cycle; 0 disables the wait
    pub wait_hear_ms: u64,
    /// Maximum wait for the transmission thread to drain the previous cycle
    pub drain_wait_ms: u64,
    /// Send all commands of a cycle in one datagram
    pub batch_commands: bool,
    /// Issue `synch_see` once after connecting
    pub send_synch_see: bool,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            wait_sense_ms: 150,
            wait_sight_ms: 30,
            wait_hear_ms: 0,
            drain_wait_ms: 50,
            batch_commands: true,
            send_synch_see: false,
        }
    }
}

impl TimingConfig {
    pub fn wait_sense(&self) -> Duration {
        Duration::from_millis(self.wait_sense_ms)
    }

    pub fn wait_sight(&self) -> Duration {
        Duration::from_millis(self.wait_sight_ms)
    }

    pub fn wait_hear(&self) -> Duration {
        Duration::from_millis(self.wait_hear_ms)
    }

    pub fn drain_wait(&self) -> Duration {
        Duration::from_millis(self.drain_wait_ms)
    }
}

/// Planner tuning values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Shoot when the opponent goal is closer than this
    pub shoot_distance: f64,
    /// Ball speed for dribble kicks
    pub dribble_kick_speed: f64,
    /// Ball speed for shots
    pub shoot_kick_speed: f64,
    /// Ball speed for dead-ball restarts
    pub setplay_kick_speed: f64,
    /// Dash power used when running to a point
    pub dash_power: f64,
    /// Body angle error tolerated before turning instead of dashing
    pub turn_tolerance_deg: f64,
    /// Distance at which a target point counts as reached
    pub arrival_distance: f64,
    /// Ball distance under which the attack tier engages
    pub attack_radius: f64,
    /// Score bonus for repeating last cycle's behavior
    pub hysteresis_bonus: f64,
    /// Candidates tried after the best one fails to execute
    pub fallback_attempts: usize,
    /// Ball confidence under which the view is widened
    pub low_confidence: f64,
    /// Point the neck toward the ball after the body action
    pub track_ball_with_neck: bool,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            shoot_distance: 20.0,
            dribble_kick_speed: 0.8,
            shoot_kick_speed: 2.7,
            setplay_kick_speed: 1.8,
            dash_power: 100.0,
            turn_tolerance_deg: 10.0,
            arrival_distance: 0.5,
            attack_radius: 10.0,
            hysteresis_bonus: 0.1,
            fallback_attempts: 2,
            low_confidence: 0.5,
            track_ball_with_neck: true,
        }
    }
}

/// Positions the agent returns to when not involved in play.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormationConfig {
    /// Position during open play
    pub home: Vector,
    /// Position taken with `move` before kick-off
    pub kickoff: Vector,
}

impl Default for FormationConfig {
    fn default() -> Self {
        Self {
            home: Vector::new(-10.0, 0.0),
            kickoff: Vector::new(-10.0, 0.0),
        }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_serializes() {
        let config = AgentConfig::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[connection]"));
        assert!(toml.contains("dash_power_rate"));

        let back = AgentConfig::from_str(&toml).unwrap();
        assert_eq!(back.server, config.server);
        assert_eq!(back.connection.port, 6000);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml = r#"
[connection]
team_name = "Gophers"
goalie = true

[player]
inertia_moment = 6.0
"#;
        let config = AgentConfig::from_str(toml).unwrap();
        assert_eq!(config.connection.team_name, "Gophers");
        assert!(config.connection.goalie);
        assert_eq!(config.connection.port, 6000);
        assert_eq!(config.player.inertia_moment, 6.0);
        assert_eq!(config.player.dash_power_rate, 0.006);
        assert_eq!(config.timing.wait_sense_ms, 150);
    }

    #[test]
    fn test_formation_vectors() {
        let toml = r#"
[formation]
home = { x = -20.0, y = 5.0 }
"#;
        let config = AgentConfig::from_str(toml).unwrap();
        assert_eq!(config.formation.home, Vector::new(-20.0, 5.0));
        assert_eq!(config.formation.kickoff, Vector::new(-10.0, 0.0));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[timing]\nbatch_commands = false").unwrap();
        let config = AgentConfig::from_file(file.path()).unwrap();
        assert!(!config.timing.batch_commands);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            AgentConfig::from_str("[connection\nport = 1"),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            AgentConfig::from_file(Path::new("/nonexistent/agent.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
