//! Transmission thread: drain the cycle's commands and send them.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::actuation::CommandQueue;
use crate::observation::ObservationStore;
use crate::transport::Transport;

/// How often the thread wakes to check for shutdown.
const POLL: Duration = Duration::from_millis(100);

pub fn run(
    store: Arc<ObservationStore>,
    queue: Arc<CommandQueue>,
    transport: Arc<dyn Transport>,
    batch: bool,
) {
    debug!(batch, "Transmission thread started");
    let mut seen = 0;
    while !store.is_stopped() {
        let wait = store.ready_to_send.wait_past(seen, POLL);
        if !wait.is_ready() {
            continue;
        }
        seen = wait.generation();
        if store.is_stopped() {
            break;
        }

        if let Some(time) = store.decided() {
            let (wire, stale) = queue.drain_for_cycle(time);
            if stale > 0 {
                warn!(cycle = %time, stale, "Discarded commands from an earlier cycle");
            }
            if !wire.is_empty() {
                send(transport.as_ref(), &wire, batch);
                trace!(cycle = %time, count = wire.len(), "Sent commands");
            }
        }
        store.sent.notify();
    }
    debug!("Transmission thread stopped");
}

fn send(transport: &dyn Transport, wire: &[String], batch: bool) {
    if batch {
        if let Err(e) = transport.send(&wire.concat()) {
            warn!(error = %e, "Send failed");
        }
    } else {
        for token in wire {
            if let Err(e) = transport.send(token) {
                warn!(error = %e, %token, "Send failed");
            }
        }
    }
}
