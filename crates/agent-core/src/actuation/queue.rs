//! Command Queue
//!
//! Commands accepted for the current cycle, plus the bookkeeping the
//! actuation gate needs: per-tag issued counters, per-tag "queued this
//! cycle" flags and the shared body-command flag.
//!
//! A single mutex guards all of it. The decision thread locks it to accept,
//! reset and reconcile; the transmission thread locks it only to drain.

use parking_lot::Mutex;

use agent_protocol::{AtomicCommand, CommandCounts, CommandTag, SimTime};

/// A command waiting for transmission.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedCommand {
    pub command: AtomicCommand,
    /// Cycle the command was accepted for
    pub time: SimTime,
    /// Serialized wire token
    pub wire: String,
}

/// Outcome of comparing issued counters with the server's executed counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Tags whose commands the server never executed
    pub missed: Vec<CommandTag>,
    /// Tags the server reports more executions for than were issued:
    /// `(tag, server_count, local_count)`
    pub unexpected: Vec<(CommandTag, u64, u64)>,
}

impl Reconciliation {
    pub fn is_missed(&self, tag: CommandTag) -> bool {
        self.missed.contains(&tag)
    }
}

#[derive(Debug, Default)]
struct QueueState {
    entries: Vec<QueuedCommand>,
    issued: [u64; CommandTag::COUNT],
    queued: [bool; CommandTag::COUNT],
    mutex_taken: bool,
    /// Body command accepted this cycle; survives the drain for prediction
    mutex_command: Option<AtomicCommand>,
}

impl QueueState {
    fn admits(&self, tag: CommandTag) -> bool {
        if tag.is_mutex() && self.mutex_taken {
            return false;
        }
        tag.is_repeatable() || !self.queued[tag.index()]
    }
}

#[derive(Debug, Default)]
pub struct CommandQueue {
    state: Mutex<QueueState>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if a command of `tag` would pass the body-command and
    /// once-per-cycle gates right now.
    pub fn admits(&self, tag: CommandTag) -> bool {
        self.state.lock().admits(tag)
    }

    /// Accepts `command` for `time` if the gates still admit it.
    ///
    /// Body commands go to the front so they lead the datagram.
    pub fn try_enqueue(&self, command: AtomicCommand, time: SimTime) -> bool {
        let tag = command.tag();
        let mut state = self.state.lock();
        if !state.admits(tag) {
            return false;
        }
        let entry = QueuedCommand {
            wire: command.to_wire(),
            command,
            time,
        };
        if tag.is_mutex() {
            state.mutex_taken = true;
            state.mutex_command = Some(entry.command.clone());
            state.entries.insert(0, entry);
        } else {
            state.entries.push(entry);
        }
        state.issued[tag.index()] += 1;
        state.queued[tag.index()] = true;
        true
    }

    /// Clears entries and per-cycle flags. Issued counters are kept.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.queued = [false; CommandTag::COUNT];
        state.mutex_taken = false;
        state.mutex_command = None;
    }

    /// Withdraws the body command still waiting in the queue.
    ///
    /// Undoes exactly what [`CommandQueue::try_enqueue`] did for it. Other
    /// entries are untouched. Returns false if there was nothing to withdraw,
    /// including when the body command has already been drained.
    pub fn reset_for_scan(&self) -> bool {
        let mut state = self.state.lock();
        let mut withdrawn = Vec::new();
        state.entries.retain(|entry| {
            let tag = entry.command.tag();
            if tag.is_mutex() {
                withdrawn.push(tag);
                false
            } else {
                true
            }
        });
        if withdrawn.is_empty() {
            return false;
        }
        for tag in withdrawn {
            let slot = &mut state.issued[tag.index()];
            *slot = slot.saturating_sub(1);
            state.queued[tag.index()] = false;
        }
        state.mutex_taken = false;
        state.mutex_command = None;
        true
    }

    /// Removes and returns the wire tokens stamped with `time`.
    ///
    /// Entries from other cycles are discarded; their counters stay
    /// incremented so the next reconciliation reports them as missed.
    pub fn drain_for_cycle(&self, time: SimTime) -> (Vec<String>, usize) {
        let mut state = self.state.lock();
        let mut wire = Vec::with_capacity(state.entries.len());
        let mut stale = 0;
        for entry in state.entries.drain(..) {
            if entry.time == time {
                wire.push(entry.wire);
            } else {
                stale += 1;
            }
        }
        (wire, stale)
    }

    /// Compares issued counters with the server's executed counts and
    /// lowers local counters that ran ahead.
    pub fn reconcile(&self, counts: &CommandCounts) -> Reconciliation {
        let mut state = self.state.lock();
        let mut report = Reconciliation::default();
        for (tag, server) in counts.iter() {
            let local = state.issued[tag.index()];
            if server < local {
                report.missed.push(tag);
                state.issued[tag.index()] = server;
            } else if server > local {
                report.unexpected.push((tag, server, local));
            }
        }
        report
    }

    pub fn is_queued(&self, tag: CommandTag) -> bool {
        self.state.lock().queued[tag.index()]
    }

    pub fn count(&self, tag: CommandTag) -> u64 {
        self.state.lock().issued[tag.index()]
    }

    /// Overrides an issued counter, used to adopt the server's counts after
    /// connecting.
    pub fn set_count(&self, tag: CommandTag, count: u64) {
        self.state.lock().issued[tag.index()] = count;
    }

    pub fn is_mutex_taken(&self) -> bool {
        self.state.lock().mutex_taken
    }

    pub fn mutex_command(&self) -> Option<AtomicCommand> {
        self.state.lock().mutex_command.clone()
    }

    pub fn entries(&self) -> Vec<QueuedCommand> {
        self.state.lock().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
