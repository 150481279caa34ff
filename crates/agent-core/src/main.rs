//! Soccer Simulator Agent
//!
//! Connects one player to a running server and plays until the match ends,
//! the cycle limit is reached, or the server goes away.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use agent_core::runtime::{farewell, handshake};
use agent_core::{
    AgentConfig, AgentError, AgentRuntime, DecisionTrace, LossyTransport, Result, Transport, UdpTransport,
};
use agent_protocol::PlayMode;

/// Command line arguments for the agent
#[derive(Parser, Debug)]
#[command(name = "agent")]
#[command(about = "A soccer simulator player agent")]
struct Args {
    /// TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Server host, overrides the config file
    #[arg(long)]
    host: Option<String>,

    /// Server port, overrides the config file
    #[arg(long)]
    port: Option<u16>,

    /// Team name, overrides the config file
    #[arg(long)]
    team: Option<String>,

    /// Connect as the team's goalie
    #[arg(long)]
    goalie: bool,

    /// Send each command in its own datagram
    #[arg(long)]
    unbatched: bool,

    /// Write one JSON line per decision cycle to this file
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Drop outbound datagrams with this probability (for testing loss handling)
    #[arg(long)]
    simulate_loss: Option<f64>,

    /// Random seed for simulated loss
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Stop after this many decision cycles
    #[arg(long)]
    cycles: Option<u32>,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_default_config: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_thread_names(true)
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Agent failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    if args.print_default_config {
        println!("{}", AgentConfig::default().to_toml()?);
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => AgentConfig::from_file(path)?,
        None => AgentConfig::default(),
    };
    apply_overrides(&mut config, &args);

    let udp = UdpTransport::connect(&config.connection.host, config.connection.port)?;
    let transport: Arc<dyn Transport> = match args.simulate_loss {
        Some(p) if p > 0.0 => {
            info!(probability = p, seed = args.seed, "Simulating outbound loss");
            Arc::new(LossyTransport::new(udp, p, args.seed))
        }
        _ => Arc::new(udp),
    };

    let init = handshake(transport.as_ref(), &config.connection)?;

    let trace = match &args.trace {
        Some(path) => DecisionTrace::new(path).map_err(AgentError::Trace)?,
        None => DecisionTrace::null(),
    };

    let runtime = AgentRuntime::spawn(&config, transport.clone(), &init, trace)?;
    let mut cycles = 0u32;
    runtime.run_until(|obs| {
        cycles += 1;
        obs.play_mode == PlayMode::TimeOver || args.cycles.is_some_and(|limit| cycles >= limit)
    });
    let final_cycle = runtime.store().with(|obs| obs.time);
    runtime.shutdown();

    farewell(transport.as_ref());
    info!(cycles, last = %final_cycle, "Agent finished");
    Ok(())
}

fn apply_overrides(config: &mut AgentConfig, args: &Args) {
    if let Some(host) = &args.host {
        config.connection.host = host.clone();
    }
    if let Some(port) = args.port {
        config.connection.port = port;
    }
    if let Some(team) = &args.team {
        config.connection.team_name = team.clone();
    }
    if args.goalie {
        config.connection.goalie = true;
    }
    if args.unbatched {
        config.timing.batch_commands = false;
    }
}
