//! Connection handshake.

use std::time::Instant;
use tracing::{debug, info, warn};

use agent_protocol::{bye_command, init_command, parse_message, InitInfo, SensorMessage};

use crate::config::ConnectionConfig;
use crate::error::{AgentError, Result};
use crate::transport::Transport;

/// Sends `init` and waits for the server to assign a side and number.
pub fn handshake(transport: &dyn Transport, connection: &ConnectionConfig) -> Result<InitInfo> {
    let request = init_command(&connection.team_name, &connection.version, connection.goalie);
    transport.send(&request)?;
    debug!(%request, "Sent init");

    let deadline = Instant::now() + connection.handshake_timeout();
    loop {
        let now = Instant::now();
        if now >= deadline {
            return Err(AgentError::HandshakeTimeout(connection.handshake_timeout_ms));
        }
        let Some(text) = transport.recv(deadline - now)? else {
            continue;
        };
        match parse_message(&text) {
            Ok(SensorMessage::Init(init)) => {
                info!(
                    team = %connection.team_name,
                    side = %init.side,
                    unum = init.unum,
                    "Connected"
                );
                return Ok(init);
            }
            Ok(SensorMessage::ServerError { reason }) => return Err(AgentError::Rejected(reason)),
            Ok(other) => debug!(?other, "Ignoring message before init reply"),
            Err(e) => warn!(error = %e, "Malformed message during handshake"),
        }
    }
}

/// Tells the server the agent is leaving. Failures are only logged.
pub fn farewell(transport: &dyn Transport) {
    if let Err(e) = transport.send(bye_command()) {
        warn!(error = %e, "Failed to send bye");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelTransport;
    use agent_protocol::{PlayMode, Side};
    use std::time::Duration;

    fn connection() -> ConnectionConfig {
        ConnectionConfig {
            team_name: "Crabs".into(),
            handshake_timeout_ms: 500,
            ..Default::default()
        }
    }

    #[test]
    fn test_handshake_reads_init_reply() {
        let (agent, server) = ChannelTransport::pair();
        server.push("(server_param (goal_width 14.02))").unwrap();
        server.push("(init r 4 before_kick_off)").unwrap();
        let init = handshake(&agent, &connection()).unwrap();
        assert_eq!(init.side, Side::Right);
        assert_eq!(init.unum, 4);
        assert_eq!(init.play_mode, Some(PlayMode::BeforeKickOff));
        assert_eq!(
            server.recv_timeout(Duration::from_millis(10)).as_deref(),
            Some("(init Crabs (version 15))")
        );
    }

    #[test]
    fn test_handshake_rejected() {
        let (agent, server) = ChannelTransport::pair();
        server.push("(error no_more_team_or_player_or_goalie)").unwrap();
        assert!(matches!(
            handshake(&agent, &connection()),
            Err(AgentError::Rejected(_))
        ));
    }

    #[test]
    fn test_handshake_times_out() {
        let (agent, _server) = ChannelTransport::pair();
        let mut connection = connection();
        connection.handshake_timeout_ms = 20;
        assert!(matches!(
            handshake(&agent, &connection),
            Err(AgentError::HandshakeTimeout(20))
        ));
    }

    #[test]
    fn test_farewell_sends_bye() {
        let (agent, server) = ChannelTransport::pair();
        farewell(&agent);
        assert_eq!(server.drain(), vec!["(bye)"]);
    }
}
