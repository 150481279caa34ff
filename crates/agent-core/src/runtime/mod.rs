//! Agent Runtime
//!
//! Three OS threads share one observation store and one command queue:
//!
//! - `ingestion` receives datagrams, decodes them and publishes them,
//! - `decision` turns each body sense into queued commands,
//! - `transmission` drains the queue for the decided cycle and sends it.

pub mod decision;
pub mod handshake;
pub mod ingestion;
pub mod transmission;

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{info, warn};

use agent_protocol::InitInfo;

use crate::actuation::{ActionEffector, CommandQueue};
use crate::behavior::{BehaviorArbiter, ExecutorRegistry};
use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::observation::{Observation, ObservationStore};
use crate::trace::DecisionTrace;
use crate::transport::Transport;
use crate::world::WorldState;

pub use decision::{CycleOutcome, DecisionWorker};
pub use handshake::{farewell, handshake};

/// How often `run_until` rechecks the stop flag while no cycle completes.
const RUN_POLL: Duration = Duration::from_millis(200);

pub struct AgentRuntime {
    store: Arc<ObservationStore>,
    queue: Arc<CommandQueue>,
    ingestion: Option<JoinHandle<()>>,
    decision: Option<JoinHandle<()>>,
    transmission: Option<JoinHandle<()>>,
}

impl AgentRuntime {
    /// Starts the threads with the standard planners and executors.
    pub fn spawn(
        config: &AgentConfig,
        transport: Arc<dyn Transport>,
        init: &InitInfo,
        trace: DecisionTrace,
    ) -> Result<Self> {
        Self::spawn_with(
            config,
            transport,
            init,
            BehaviorArbiter::standard(),
            ExecutorRegistry::standard(),
            trace,
        )
    }

    pub fn spawn_with(
        config: &AgentConfig,
        transport: Arc<dyn Transport>,
        init: &InitInfo,
        arbiter: BehaviorArbiter,
        registry: ExecutorRegistry,
        trace: DecisionTrace,
    ) -> Result<Self> {
        let store = Arc::new(ObservationStore::new(init));
        let queue = Arc::new(CommandQueue::new());
        let world = WorldState::new(
            Arc::new(config.game_params()),
            init.side,
            init.unum,
            config.connection.goalie,
        );
        let worker = DecisionWorker::new(
            store.clone(),
            ActionEffector::new(queue.clone()),
            arbiter,
            registry,
            world,
            config,
            trace,
        );

        let mut runtime = Self {
            store: store.clone(),
            queue: queue.clone(),
            ingestion: None,
            decision: None,
            transmission: None,
        };

        let poll = config.connection.recv_timeout();
        let inbound = transport.clone();
        let ingest_store = store.clone();
        runtime.ingestion = Some(spawn_named("ingestion", move || {
            ingestion::run(ingest_store, inbound, poll)
        })?);

        runtime.decision = Some(spawn_named("decision", move || worker.run())?);

        let batch = config.timing.batch_commands;
        runtime.transmission = Some(spawn_named("transmission", move || {
            transmission::run(store, queue, transport, batch)
        })?);

        info!(side = %init.side, unum = init.unum, "Agent runtime started");
        Ok(runtime)
    }

    pub fn store(&self) -> &Arc<ObservationStore> {
        &self.store
    }

    pub fn queue(&self) -> &Arc<CommandQueue> {
        &self.queue
    }

    pub fn is_stopped(&self) -> bool {
        self.store.is_stopped()
    }

    /// Blocks until `done` returns true after a completed cycle, or the
    /// runtime stops on its own.
    pub fn run_until(&self, mut done: impl FnMut(&Observation) -> bool) {
        let mut seen = self.store.decision_done.generation();
        while !self.store.is_stopped() {
            let wait = self.store.decision_done.wait_past(seen, RUN_POLL);
            if !wait.is_ready() {
                continue;
            }
            seen = wait.generation();
            if self.store.with(&mut done) {
                break;
            }
        }
    }

    /// Stops the threads and waits for them in pipeline order.
    pub fn shutdown(mut self) {
        self.stop_and_join();
        info!("Agent runtime stopped");
    }

    fn stop_and_join(&mut self) {
        self.store.stop();
        for (name, handle) in [
            ("ingestion", self.ingestion.take()),
            ("decision", self.decision.take()),
            ("transmission", self.transmission.take()),
        ] {
            if let Some(handle) = handle {
                if handle.join().is_err() {
                    warn!(thread = name, "Thread panicked");
                }
            }
        }
    }
}

impl Drop for AgentRuntime {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

fn spawn_named<F>(name: &'static str, body: F) -> Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(body)
        .map_err(|source| AgentError::Spawn { name, source })
}
