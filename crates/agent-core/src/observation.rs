//! Observation Store
//!
//! Latest decoded sensor data, written by the ingestion thread and read by
//! the decision thread. One mutex guards the data; the signals announce new
//! body-sense, sight and hearing generations and carry the hand-offs
//! between decision and transmission.
//!
//! Critical sections are short: ingestion locks to apply one message,
//! decision locks to clone a snapshot. Nobody holds the observation lock
//! while waiting on a signal.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace, warn};

use agent_protocol::{BodySense, HearSender, InitInfo, PlayMode, SensorMessage, Side, Sight, SimTime};

use crate::signal::Signal;

/// What a message changed in the observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
    Body,
    Sight,
    Hearing,
    /// Nothing the decision thread waits on changed.
    Ignored,
}

/// Snapshot of everything the agent currently knows from its sensors.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Time of the most recent body sense
    pub time: SimTime,
    pub side: Side,
    pub unum: u8,
    pub play_mode: PlayMode,
    pub body: Option<BodySense>,
    pub body_time: Option<SimTime>,
    pub sight: Option<Sight>,
    pub sight_time: Option<SimTime>,
    pub hearing_time: Option<SimTime>,
    /// `(error ...)` replies received so far
    pub server_errors: u64,
}

impl Observation {
    pub fn new(init: &InitInfo) -> Self {
        Self {
            time: SimTime::default(),
            side: init.side,
            unum: init.unum,
            play_mode: init.play_mode.unwrap_or(PlayMode::BeforeKickOff),
            body: None,
            body_time: None,
            sight: None,
            sight_time: None,
            hearing_time: None,
            server_errors: 0,
        }
    }

    /// True once a body sense for the current time has arrived.
    pub fn has_body_for_current_time(&self) -> bool {
        self.body_time == Some(self.time)
    }

    pub fn has_sight_for_current_time(&self) -> bool {
        self.sight_time == Some(self.time)
    }

    pub fn has_hearing_for_current_time(&self) -> bool {
        self.hearing_time == Some(self.time)
    }

    /// Time label for a perception stamped with `cycle`.
    fn stamp(&self, cycle: u32) -> SimTime {
        if cycle == self.time.cycle {
            self.time
        } else {
            SimTime::new(cycle, 0)
        }
    }

    /// Applies one decoded message.
    pub fn apply(&mut self, message: SensorMessage) -> Update {
        match message {
            SensorMessage::SenseBody(body) => {
                let time = match self.body_time {
                    Some(previous) => previous.observe(body.cycle),
                    None => SimTime::new(body.cycle, 0),
                };
                if self.body_time.is_some_and(|previous| time < previous) {
                    warn!(cycle = body.cycle, last = %self.time, "Body sense went back in time");
                }
                self.time = time;
                self.body_time = Some(time);
                self.body = Some(body);
                Update::Body
            }
            SensorMessage::See(sight) => {
                if sight.cycle < self.time.cycle {
                    debug!(cycle = sight.cycle, now = %self.time, "Dropping stale sight");
                    return Update::Ignored;
                }
                self.sight_time = Some(self.stamp(sight.cycle));
                self.sight = Some(sight);
                Update::Sight
            }
            SensorMessage::Hear(hearing) => {
                if hearing.sender == HearSender::Referee {
                    match hearing.play_mode() {
                        Some(mode) => {
                            if mode != self.play_mode {
                                debug!(from = %self.play_mode, to = %mode, "Play mode changed");
                            }
                            self.play_mode = mode;
                        }
                        None => debug!(message = %hearing.message, "Ignoring referee message"),
                    }
                }
                self.hearing_time = Some(self.stamp(hearing.cycle));
                Update::Hearing
            }
            SensorMessage::Init(init) => {
                warn!(side = %init.side, unum = init.unum, "Unexpected init reply after handshake");
                Update::Ignored
            }
            SensorMessage::ServerError { reason } => {
                self.server_errors += 1;
                warn!(%reason, "Server reported an error");
                Update::Ignored
            }
            SensorMessage::Warning { reason } => {
                warn!(%reason, "Server warning");
                Update::Ignored
            }
            SensorMessage::Unknown { head } => {
                trace!(%head, "Unhandled server message");
                Update::Ignored
            }
        }
    }
}

/// Observation plus the signals that order the three runtime threads.
pub struct ObservationStore {
    observation: Mutex<Observation>,
    /// Time the decision thread last queued commands for
    decided: Mutex<Option<SimTime>>,
    stop: AtomicBool,
    pub body_arrived: Signal,
    pub sight_arrived: Signal,
    pub hearing_arrived: Signal,
    pub decision_done: Signal,
    pub ready_to_send: Signal,
    pub sent: Signal,
}

impl ObservationStore {
    pub fn new(init: &InitInfo) -> Self {
        Self {
            observation: Mutex::new(Observation::new(init)),
            decided: Mutex::new(None),
            stop: AtomicBool::new(false),
            body_arrived: Signal::new(),
            sight_arrived: Signal::new(),
            hearing_arrived: Signal::new(),
            decision_done: Signal::new(),
            ready_to_send: Signal::new(),
            sent: Signal::new(),
        }
    }

    /// Applies a message under the lock, then signals outside it.
    pub fn ingest(&self, message: SensorMessage) -> Update {
        let update = self.observation.lock().apply(message);
        match update {
            Update::Body => {
                self.body_arrived.notify();
            }
            Update::Sight => {
                self.sight_arrived.notify();
            }
            Update::Hearing => {
                self.hearing_arrived.notify();
            }
            Update::Ignored => {}
        }
        update
    }

    pub fn snapshot(&self) -> Observation {
        self.observation.lock().clone()
    }

    /// Reads a single field without cloning the whole observation.
    pub fn with<R>(&self, f: impl FnOnce(&Observation) -> R) -> R {
        f(&self.observation.lock())
    }

    pub fn set_decided(&self, time: SimTime) {
        *self.decided.lock() = Some(time);
    }

    pub fn decided(&self) -> Option<SimTime> {
        *self.decided.lock()
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Sets the stop flag and wakes every waiter.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
        for signal in [
            &self.body_arrived,
            &self.sight_arrived,
            &self.hearing_arrived,
            &self.decision_done,
            &self.ready_to_send,
            &self.sent,
        ] {
            signal.notify();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_protocol::parse_message;

    fn init() -> InitInfo {
        InitInfo {
            side: Side::Left,
            unum: 9,
            play_mode: Some(PlayMode::BeforeKickOff),
        }
    }

    fn body(cycle: u32) -> SensorMessage {
        parse_message(&format!("(sense_body {} (stamina 8000 1 130600) (dash 0))", cycle)).unwrap()
    }

    #[test]
    fn test_body_sense_advances_time() {
        let mut obs = Observation::new(&init());
        assert_eq!(obs.apply(body(0)), Update::Body);
        assert_eq!(obs.time, SimTime::new(0, 0));
        obs.apply(body(0));
        assert_eq!(obs.time, SimTime::new(0, 1));
        obs.apply(body(1));
        assert_eq!(obs.time, SimTime::new(1, 0));
        assert!(obs.has_body_for_current_time());
    }

    #[test]
    fn test_sight_of_current_cycle() {
        let mut obs = Observation::new(&init());
        obs.apply(body(5));
        let sight = parse_message("(see 5 ((b) 3 10))").unwrap();
        assert_eq!(obs.apply(sight), Update::Sight);
        assert!(obs.has_sight_for_current_time());

        let stale = parse_message("(see 4 ((b) 3 10))").unwrap();
        assert_eq!(obs.apply(stale), Update::Ignored);
    }

    #[test]
    fn test_referee_changes_play_mode() {
        let mut obs = Observation::new(&init());
        obs.apply(parse_message("(hear 0 referee kick_off_l)").unwrap());
        assert_eq!(obs.play_mode, PlayMode::KickOff(Side::Left));

        // Unknown referee strings keep the previous mode
        obs.apply(parse_message("(hear 0 referee yellow_card_r_4)").unwrap());
        assert_eq!(obs.play_mode, PlayMode::KickOff(Side::Left));
    }

    #[test]
    fn test_store_signals_updates() {
        let store = ObservationStore::new(&init());
        assert_eq!(store.body_arrived.generation(), 0);
        store.ingest(body(1));
        assert_eq!(store.body_arrived.generation(), 1);
        store.ingest(parse_message("(error unknown_command)").unwrap());
        assert_eq!(store.with(|obs| obs.server_errors), 1);
        assert_eq!(store.body_arrived.generation(), 1);
    }

    #[test]
    fn test_stop_wakes_waiters() {
        let store = ObservationStore::new(&init());
        store.stop();
        assert!(store.is_stopped());
        assert!(store.ready_to_send.generation() > 0);
    }
}
