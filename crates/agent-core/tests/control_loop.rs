//! End-to-end control loop tests
//!
//! Runs the three runtime threads against an in-process server and checks
//! what reaches the wire, cycle by cycle.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use agent_core::behavior::{
    ActiveBehavior, BehaviorCategory, BehaviorExecutor, BehaviorKind, ExecContext, PlanContext,
    Planner, PlannerTier,
};
use agent_core::transport::ChannelPeer;
use agent_core::{
    AgentConfig, AgentRuntime, BehaviorArbiter, ChannelTransport, DecisionTrace,
    ExecutorRegistry, LossyTransport, Transport,
};
use agent_protocol::{CommandTag, InitInfo, PlayMode, Side};

const REPLY: Duration = Duration::from_secs(2);

/// Proposes a single hold every cycle.
struct AlwaysHold;

impl Planner for AlwaysHold {
    fn name(&self) -> &'static str {
        "always_hold"
    }

    fn plan(&self, ctx: &PlanContext<'_>, out: &mut Vec<ActiveBehavior>) {
        out.push(ActiveBehavior::new(
            BehaviorKind::Hold,
            1.0,
            ctx.world.me.pos,
            ctx.world.time,
        ));
    }
}

/// Gate results observed by the scripted executor: (cycle, command, accepted).
type GateLog = Arc<Mutex<Vec<(u32, &'static str, bool)>>>;

/// Issues a fixed script of commands keyed by cycle.
struct Script {
    log: GateLog,
}

impl BehaviorExecutor for Script {
    fn execute(&self, _behavior: &ActiveBehavior, ctx: &ExecContext<'_>) -> bool {
        let world = ctx.world;
        let cycle = world.time.cycle;
        let mut log = self.log.lock();
        match cycle {
            1 => {
                let dash = ctx.effector.set_dash_action(world, 50.0, 0.0);
                let kick = ctx.effector.set_kick_action(world, 50.0, 90.0);
                log.push((cycle, "dash", dash));
                log.push((cycle, "kick", kick));
                dash
            }
            2 => {
                let turn = ctx.effector.set_turn_action(world, 30.0);
                log.push((cycle, "turn", turn));
                turn
            }
            _ => false,
        }
    }
}

/// Says something before dashing.
struct SayThenDash;

impl BehaviorExecutor for SayThenDash {
    fn execute(&self, _behavior: &ActiveBehavior, ctx: &ExecContext<'_>) -> bool {
        let said = ctx.effector.set_say_action(ctx.world, "hello");
        let dashed = ctx.effector.set_dash_action(ctx.world, 80.0, 0.0);
        said && dashed
    }
}

fn config() -> AgentConfig {
    let mut config = AgentConfig::default();
    config.timing.wait_sight_ms = 0;
    config.timing.wait_hear_ms = 0;
    config.timing.drain_wait_ms = 500;
    config.behavior.track_ball_with_neck = false;
    config.behavior.low_confidence = 0.0;
    config
}

fn init() -> InitInfo {
    InitInfo {
        side: Side::Left,
        unum: 7,
        play_mode: Some(PlayMode::PlayOn),
    }
}

fn sense(cycle: u32, dash: u64, turn: u64) -> String {
    format!(
        "(sense_body {} (view_mode high normal) (stamina 8000 1 130600) (speed 0 0) \
         (head_angle 0) (kick 0) (dash {}) (turn {}) (say 0) (turn_neck 0) (catch 0) \
         (move 0) (change_view 0))",
        cycle, dash, turn
    )
}

fn spawn(
    config: &AgentConfig,
    transport: Arc<dyn Transport>,
    executor: impl BehaviorExecutor + 'static,
    trace: DecisionTrace,
) -> AgentRuntime {
    let arbiter = BehaviorArbiter::new(vec![
        PlannerTier::new(BehaviorCategory::Attack).with(AlwaysHold)
    ]);
    let mut registry = ExecutorRegistry::new();
    registry.register(BehaviorKind::Hold, executor);
    AgentRuntime::spawn_with(config, transport, &init(), arbiter, registry, trace).unwrap()
}

/// Pushes a message and waits for the decision it triggers.
fn push_and_decide(runtime: &AgentRuntime, server: &ChannelPeer, message: &str) {
    let seen = runtime.store().decision_done.generation();
    server.push(message).unwrap();
    let wait = runtime.store().decision_done.wait_past(seen, REPLY);
    assert!(wait.is_ready(), "no decision for {}", message);
}

fn read_trace(path: &std::path::Path) -> Vec<serde_json::Value> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn test_gate_send_and_miss_detection() {
    let dir = tempfile::tempdir().unwrap();
    let trace_path = dir.path().join("trace.jsonl");
    let (agent, server) = ChannelTransport::pair();
    let log = GateLog::default();
    let runtime = spawn(
        &config(),
        Arc::new(agent),
        Script { log: log.clone() },
        DecisionTrace::new(&trace_path).unwrap(),
    );

    // Cycle 1: dash accepted, kick refused, one command on the wire
    server.push(sense(1, 0, 0)).unwrap();
    assert_eq!(server.recv_timeout(REPLY).as_deref(), Some("(dash 50.00 0.00)"));
    assert_eq!(
        *log.lock(),
        vec![(1, "dash", true), (1, "kick", false)]
    );
    assert_eq!(runtime.queue().count(CommandTag::Dash), 1);
    assert_eq!(runtime.queue().count(CommandTag::Kick), 0);

    // Cycle 2: the dash was executed; the turn goes out
    server.push(sense(2, 1, 0)).unwrap();
    assert_eq!(server.recv_timeout(REPLY).as_deref(), Some("(turn 30.00)"));
    assert_eq!(runtime.queue().count(CommandTag::Turn), 1);

    // Cycle 3: the server never saw the turn
    push_and_decide(&runtime, &server, &sense(3, 1, 0));
    assert_eq!(runtime.queue().count(CommandTag::Turn), 0);
    assert_eq!(runtime.queue().count(CommandTag::Dash), 1);

    runtime.shutdown();
    assert!(server.drain().is_empty());

    let records = read_trace(&trace_path);
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["queued"], serde_json::json!(["(dash 50.00 0.00)"]));
    assert_eq!(records[0]["missed"], serde_json::json!([]));
    assert_eq!(records[1]["missed"], serde_json::json!([]));
    assert_eq!(records[2]["missed"], serde_json::json!(["turn"]));
    assert_eq!(records[2]["behavior"], serde_json::Value::Null);
}

#[test]
fn test_body_command_leads_batched_datagram() {
    let (agent, server) = ChannelTransport::pair();
    let runtime = spawn(&config(), Arc::new(agent), SayThenDash, DecisionTrace::null());

    server.push(sense(1, 0, 0)).unwrap();
    assert_eq!(
        server.recv_timeout(REPLY).as_deref(),
        Some("(dash 80.00 0.00)(say \"hello\")")
    );
    runtime.shutdown();
}

#[test]
fn test_unbatched_sends_one_datagram_per_command() {
    let mut config = config();
    config.timing.batch_commands = false;
    let (agent, server) = ChannelTransport::pair();
    let runtime = spawn(&config, Arc::new(agent), SayThenDash, DecisionTrace::null());

    server.push(sense(1, 0, 0)).unwrap();
    assert_eq!(server.recv_timeout(REPLY).as_deref(), Some("(dash 80.00 0.00)"));
    assert_eq!(server.recv_timeout(REPLY).as_deref(), Some("(say \"hello\")"));
    runtime.shutdown();
}

#[test]
fn test_lost_datagram_is_reported_as_miss() {
    let dir = tempfile::tempdir().unwrap();
    let trace_path = dir.path().join("trace.jsonl");
    let (agent, server) = ChannelTransport::pair();
    let runtime = spawn(
        &config(),
        Arc::new(LossyTransport::new(agent, 1.0, 3)),
        SayThenDash,
        DecisionTrace::new(&trace_path).unwrap(),
    );

    push_and_decide(&runtime, &server, &sense(1, 0, 0));
    push_and_decide(&runtime, &server, &sense(2, 0, 0));
    runtime.shutdown();

    assert!(server.drain().is_empty());
    let records = read_trace(&trace_path);
    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["missed"], serde_json::json!(["dash", "say"]));
}

#[test]
fn test_hostile_nesting_does_not_stop_ingestion() {
    let (agent, server) = ChannelTransport::pair();
    let runtime = spawn(&config(), Arc::new(agent), SayThenDash, DecisionTrace::null());

    server.push("(".repeat(200_000)).unwrap();
    server.push(sense(1, 0, 0)).unwrap();
    assert_eq!(
        server.recv_timeout(REPLY).as_deref(),
        Some("(dash 80.00 0.00)(say \"hello\")")
    );
    assert!(!runtime.is_stopped());
    runtime.shutdown();
}

#[test]
fn test_server_disconnect_stops_runtime() {
    let (agent, server) = ChannelTransport::pair();
    let runtime = spawn(&config(), Arc::new(agent), SayThenDash, DecisionTrace::null());

    drop(server);
    runtime.run_until(|_| false);
    assert!(runtime.is_stopped());
    runtime.shutdown();
}
