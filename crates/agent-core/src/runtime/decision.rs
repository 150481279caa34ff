//! Decision thread.
//!
//! Each cycle: wait for the previous drain, wait for the body sense, give
//! sight and hearing a bounded chance to arrive, then rebuild the world,
//! arbitrate, execute and hand the queue to transmission.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

use agent_protocol::{normalize_angle, CommandTag, SimTime, ViewWidth};

use crate::actuation::ActionEffector;
use crate::behavior::{
    ActiveBehavior, BehaviorArbiter, BehaviorCategory, ExecContext, ExecutorRegistry,
};
use crate::config::{AgentConfig, BehaviorConfig, FormationConfig, TimingConfig};
use crate::observation::{Observation, ObservationStore};
use crate::signal::Signal;
use crate::trace::{CycleRecord, DecisionTrace};
use crate::world::WorldState;

/// Ball distance under which a narrowed view is restored.
const CLOSE_BALL: f64 = 5.0;
/// Neck corrections smaller than this are not worth a command.
const NECK_TOLERANCE: f64 = 1.0;

/// What one cycle of decision produced.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub time: SimTime,
    pub category: Option<BehaviorCategory>,
    pub behavior: Option<ActiveBehavior>,
    /// Candidates tried, including the one that executed
    pub attempts: usize,
    /// Wire tokens queued this cycle, in send order
    pub queued: Vec<String>,
    pub missed: Vec<CommandTag>,
}

pub struct DecisionWorker {
    store: Arc<ObservationStore>,
    effector: ActionEffector,
    arbiter: BehaviorArbiter,
    registry: ExecutorRegistry,
    world: WorldState,
    timing: TimingConfig,
    behavior: BehaviorConfig,
    formation: FormationConfig,
    trace: DecisionTrace,
    seen_body: u64,
    /// `sent` generation to wait past before starting the next cycle
    pending_sent: Option<u64>,
    counts_adopted: bool,
}

impl DecisionWorker {
    pub fn new(
        store: Arc<ObservationStore>,
        effector: ActionEffector,
        arbiter: BehaviorArbiter,
        registry: ExecutorRegistry,
        world: WorldState,
        config: &AgentConfig,
        trace: DecisionTrace,
    ) -> Self {
        Self {
            store,
            effector,
            arbiter,
            registry,
            world,
            timing: config.timing.clone(),
            behavior: config.behavior.clone(),
            formation: config.formation.clone(),
            trace,
            seen_body: 0,
            pending_sent: None,
            counts_adopted: false,
        }
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn effector(&self) -> &ActionEffector {
        &self.effector
    }

    pub fn arbiter(&self) -> &BehaviorArbiter {
        &self.arbiter
    }

    pub fn trace(&self) -> &DecisionTrace {
        &self.trace
    }

    /// Thread body. Returns when the store is stopped.
    pub fn run(mut self) {
        debug!("Decision thread started");
        while !self.store.is_stopped() {
            self.step();
        }
        if let Err(e) = self.trace.flush() {
            warn!(error = %e, "Failed to flush decision trace");
        }
        debug!("Decision thread stopped");
    }

    /// Runs one cycle if a new body sense arrives in time.
    pub fn step(&mut self) -> Option<CycleOutcome> {
        if let Some(pending) = self.pending_sent.take() {
            let wait = self.store.sent.wait_past(pending, self.timing.drain_wait());
            if !wait.is_ready() {
                warn!("Previous cycle's commands were not sent in time");
            }
        }

        let wait = self
            .store
            .body_arrived
            .wait_past(self.seen_body, self.timing.wait_sense());
        if self.store.is_stopped() {
            return None;
        }
        if !wait.is_ready() {
            warn!(
                waited_ms = self.timing.wait_sense_ms,
                "No body sense arrived"
            );
            return None;
        }
        self.seen_body = wait.generation();

        let wait_sight = self.timing.wait_sight();
        if !wait_sight.is_zero() {
            self.wait_for(
                &self.store.sight_arrived,
                Observation::has_sight_for_current_time,
                wait_sight,
            );
        }
        let wait_hear = self.timing.wait_hear();
        if !wait_hear.is_zero() {
            self.wait_for(
                &self.store.hearing_arrived,
                Observation::has_hearing_for_current_time,
                wait_hear,
            );
        }

        let observation = self.store.snapshot();
        let outcome = self.decide(&observation);

        self.store.set_decided(outcome.time);
        self.store.decision_done.notify();
        self.pending_sent = Some(self.store.sent.generation());
        self.store.ready_to_send.notify();
        Some(outcome)
    }

    /// Waits until `ready` holds for the current cycle or `timeout` passes.
    fn wait_for(&self, signal: &Signal, ready: fn(&Observation) -> bool, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        loop {
            // Read the generation first so an arrival between the check
            // and the wait still wakes us.
            let seen = signal.generation();
            if self.store.with(ready) || self.store.is_stopped() {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                trace!("Perception did not arrive before the deadline");
                return;
            }
            signal.wait_past(seen, deadline - now);
        }
    }

    /// Decides and queues commands for the observation's cycle.
    pub fn decide(&mut self, observation: &Observation) -> CycleOutcome {
        let time = observation.time;
        let previous = self.effector.mutex_command();

        let mut missed = Vec::new();
        if let Some(body) = observation
            .body
            .as_ref()
            .filter(|_| observation.has_body_for_current_time())
        {
            if self.counts_adopted {
                missed = self.effector.reconcile(time, &body.counts).missed;
            } else if !body.counts.is_empty() {
                self.effector.adopt_counts(&body.counts);
                self.counts_adopted = true;
            }
        }
        self.effector.reset();

        let executed = previous.filter(|command| !missed.contains(&command.tag()));
        self.world.refresh(observation, executed.as_ref());

        let chosen = self
            .arbiter
            .decide(&self.world, &self.behavior, &self.formation);
        let (behavior, attempts) = self.execute_ranked();
        if chosen.is_some() && behavior.is_none() {
            debug!(cycle = %time, attempts, "No candidate could be executed");
        }

        self.track_ball();

        let queued: Vec<String> = self
            .effector
            .queue()
            .entries()
            .into_iter()
            .map(|entry| entry.wire)
            .collect();

        let record = CycleRecord {
            time,
            play_mode: self.world.play_mode,
            category: behavior.as_ref().map(|b| b.category),
            behavior: behavior.as_ref().map(|b| b.kind),
            sub_type: behavior.as_ref().and_then(|b| b.sub_type),
            score: behavior.as_ref().map(|b| b.evaluation),
            attempts,
            queued: queued.clone(),
            missed: missed.clone(),
        };
        if let Err(e) = self.trace.record(&record) {
            warn!(error = %e, "Failed to write decision trace");
        }

        CycleOutcome {
            time,
            category: self.arbiter.category(),
            behavior,
            attempts,
            queued,
            missed,
        }
    }

    /// Tries the ranked proposals in order until one executes.
    ///
    /// A failed executor may have queued a body command before giving up;
    /// that command is withdrawn before the next candidate runs.
    fn execute_ranked(&self) -> (Option<ActiveBehavior>, usize) {
        let ctx = ExecContext {
            world: &self.world,
            effector: &self.effector,
            config: &self.behavior,
        };
        let limit = 1 + self.behavior.fallback_attempts;
        let mut attempts = 0;
        for candidate in self.arbiter.ranked().iter().take(limit) {
            attempts += 1;
            if self.registry.execute(candidate, &ctx) {
                return (Some(candidate.clone()), attempts);
            }
            if self.effector.reset_for_scan() {
                trace!(cycle = %self.world.time, kind = %candidate.kind, "Withdrew body command");
            }
        }
        (None, attempts)
    }

    /// Points the neck at the ball and widens the view when it is lost.
    fn track_ball(&self) {
        let world = &self.world;
        if self.behavior.track_ball_with_neck && world.ball_known() {
            let me = self.effector.self_pos_with_queued_actions(world);
            let body_dir = self.effector.self_body_dir_with_queued_actions(world);
            let ball = self.effector.ball_pos_with_queued_actions(world);
            let wanted = normalize_angle((ball - me).dir() - body_dir);
            let neck = normalize_angle(wanted - world.me.head_angle);
            if neck.abs() > NECK_TOLERANCE {
                self.effector.set_turn_neck_action(world, neck);
            }
        }

        if world.ball.confidence < self.behavior.low_confidence {
            self.effector.set_change_view_action(world, ViewWidth::Wide);
        } else if world.view_width == ViewWidth::Wide && world.ball_distance() < CLOSE_BALL {
            self.effector.set_change_view_action(world, ViewWidth::Normal);
        }

        if self.timing.send_synch_see && world.time.cycle <= 1 {
            self.effector.set_synch_see_action(world);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuation::CommandQueue;
    use crate::behavior::{BehaviorExecutor, BehaviorKind, PlanContext, Planner, PlannerTier};
    use agent_protocol::{parse_message, InitInfo, PlayMode, Side, Vector};

    struct Propose(Vec<(BehaviorKind, f64)>);

    impl Planner for Propose {
        fn name(&self) -> &'static str {
            "propose"
        }

        fn plan(&self, ctx: &PlanContext<'_>, out: &mut Vec<ActiveBehavior>) {
            for (kind, score) in &self.0 {
                out.push(ActiveBehavior::new(*kind, *score, Vector::ZERO, ctx.world.time));
            }
        }
    }

    /// Dashes, then reports failure.
    struct DashThenFail;

    impl BehaviorExecutor for DashThenFail {
        fn execute(&self, _behavior: &ActiveBehavior, ctx: &ExecContext<'_>) -> bool {
            ctx.effector.set_dash_action(ctx.world, 60.0, 0.0);
            false
        }
    }

    struct Turn(f64);

    impl BehaviorExecutor for Turn {
        fn execute(&self, _behavior: &ActiveBehavior, ctx: &ExecContext<'_>) -> bool {
            ctx.effector.set_turn_action(ctx.world, self.0)
        }
    }

    fn init() -> InitInfo {
        InitInfo {
            side: Side::Left,
            unum: 7,
            play_mode: Some(PlayMode::PlayOn),
        }
    }

    fn worker(arbiter: BehaviorArbiter, registry: ExecutorRegistry) -> (DecisionWorker, Arc<ObservationStore>) {
        let mut config = AgentConfig::default();
        config.behavior.track_ball_with_neck = false;
        config.behavior.low_confidence = 0.0;
        let store = Arc::new(ObservationStore::new(&init()));
        let effector = ActionEffector::new(Arc::new(CommandQueue::new()));
        let world = WorldState::new(Arc::new(config.game_params()), Side::Left, 7, false);
        let worker = DecisionWorker::new(
            store.clone(),
            effector,
            arbiter,
            registry,
            world,
            &config,
            DecisionTrace::null(),
        );
        (worker, store)
    }

    fn sense(cycle: u32, dash: u64, turn: u64) -> String {
        format!(
            "(sense_body {} (view_mode high normal) (stamina 8000 1 130600) (speed 0 0) \
             (head_angle 0) (kick 0) (dash {}) (turn {}) (say 0) (turn_neck 0) (catch 0) \
             (move 0) (change_view 0))",
            cycle, dash, turn
        )
    }

    fn ingest(store: &ObservationStore, text: &str) {
        store.ingest(parse_message(text).unwrap());
    }

    #[test]
    fn test_falls_back_and_withdraws_failed_body_command() {
        let arbiter = BehaviorArbiter::new(vec![PlannerTier::new(BehaviorCategory::Attack).with(
            Propose(vec![(BehaviorKind::Dribble, 0.9), (BehaviorKind::Hold, 0.5)]),
        )]);
        let mut registry = ExecutorRegistry::new();
        registry.register(BehaviorKind::Dribble, DashThenFail);
        registry.register(BehaviorKind::Hold, Turn(20.0));
        let (mut worker, store) = worker(arbiter, registry);

        ingest(&store, &sense(1, 0, 0));
        let outcome = worker.decide(&store.snapshot());

        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.behavior.map(|b| b.kind), Some(BehaviorKind::Hold));
        assert_eq!(outcome.category, Some(BehaviorCategory::Attack));
        assert_eq!(outcome.queued, vec!["(turn 20.00)"]);
        assert_eq!(worker.effector().count(CommandTag::Dash), 0);
        assert_eq!(worker.effector().count(CommandTag::Turn), 1);
    }

    #[test]
    fn test_fallback_attempts_are_bounded() {
        let arbiter = BehaviorArbiter::new(vec![PlannerTier::new(BehaviorCategory::Attack).with(
            Propose(vec![
                (BehaviorKind::Dribble, 0.9),
                (BehaviorKind::Shoot, 0.8),
                (BehaviorKind::Intercept, 0.7),
                (BehaviorKind::Hold, 0.1),
            ]),
        )]);
        let mut registry = ExecutorRegistry::new();
        registry.register(BehaviorKind::Dribble, DashThenFail);
        registry.register(BehaviorKind::Shoot, DashThenFail);
        registry.register(BehaviorKind::Intercept, DashThenFail);
        registry.register(BehaviorKind::Hold, Turn(20.0));
        let (mut worker, store) = worker(arbiter, registry);

        ingest(&store, &sense(1, 0, 0));
        let outcome = worker.decide(&store.snapshot());

        assert_eq!(outcome.attempts, 3);
        assert!(outcome.behavior.is_none());
        assert!(outcome.queued.is_empty());
    }

    #[test]
    fn test_detects_missed_command_and_resyncs() {
        let arbiter = BehaviorArbiter::new(vec![PlannerTier::new(BehaviorCategory::Attack)
            .with(Propose(vec![(BehaviorKind::Hold, 0.5)]))]);
        let mut registry = ExecutorRegistry::new();
        registry.register(BehaviorKind::Hold, Turn(30.0));
        let (mut worker, store) = worker(arbiter, registry);

        ingest(&store, &sense(1, 0, 4));
        worker.decide(&store.snapshot());
        assert_eq!(worker.effector().count(CommandTag::Turn), 5);

        // The turn never reached the server
        ingest(&store, &sense(2, 0, 4));
        let outcome = worker.decide(&store.snapshot());
        assert_eq!(outcome.missed, vec![CommandTag::Turn]);
        assert_eq!(worker.effector().count(CommandTag::Turn), 5);
        assert_eq!(worker.world().me.body_dir, 0.0);

        ingest(&store, &sense(3, 0, 5));
        let outcome = worker.decide(&store.snapshot());
        assert!(outcome.missed.is_empty());
        assert!(worker.world().me.body_dir.abs() > 0.0);
    }

    #[test]
    fn test_no_proposals_queues_nothing() {
        let (mut worker, store) = worker(BehaviorArbiter::new(Vec::new()), ExecutorRegistry::new());
        ingest(&store, &sense(1, 0, 0));
        let outcome = worker.decide(&store.snapshot());
        assert!(outcome.behavior.is_none());
        assert_eq!(outcome.attempts, 0);
        assert!(outcome.queued.is_empty());
        assert_eq!(worker.trace().record_count(), 1);
    }

    #[test]
    fn test_step_times_out_without_body_sense() {
        let (mut worker, _store) =
            worker(BehaviorArbiter::new(Vec::new()), ExecutorRegistry::new());
        worker.timing.wait_sense_ms = 10;
        assert!(worker.step().is_none());
    }

    #[test]
    fn test_step_signals_transmission() {
        let (mut worker, store) = worker(BehaviorArbiter::new(Vec::new()), ExecutorRegistry::new());
        worker.timing.wait_sight_ms = 0;
        ingest(&store, &sense(3, 0, 0));
        let before = store.ready_to_send.generation();
        let outcome = worker.step().unwrap();
        assert_eq!(outcome.time, SimTime::new(3, 0));
        assert_eq!(store.decided(), Some(SimTime::new(3, 0)));
        assert_eq!(store.ready_to_send.generation(), before + 1);
    }
}
