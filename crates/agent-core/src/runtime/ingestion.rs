//! Ingestion thread: receive, decode, publish.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use agent_protocol::parse_message;

use crate::observation::ObservationStore;
use crate::transport::{Transport, TransportError};

pub fn run(store: Arc<ObservationStore>, transport: Arc<dyn Transport>, poll: Duration) {
    debug!("Ingestion thread started");
    while !store.is_stopped() {
        match transport.recv(poll) {
            Ok(Some(text)) => match parse_message(&text) {
                Ok(message) => {
                    store.ingest(message);
                }
                Err(e) => warn!(error = %e, "Malformed server message"),
            },
            Ok(None) => {}
            Err(TransportError::Disconnected) => {
                warn!("Server connection closed");
                store.stop();
                break;
            }
            Err(e) => {
                warn!(error = %e, "Receive failed");
                std::thread::sleep(poll);
            }
        }
    }
    debug!("Ingestion thread stopped");
}
