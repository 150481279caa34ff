//! Decision Trace
//!
//! Append-only JSONL record of what the agent decided each cycle.

use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use agent_protocol::{CommandTag, PlayMode, SimTime};

use crate::behavior::{BehaviorCategory, BehaviorKind, SubType};

/// One cycle of the decision loop.
#[derive(Debug, Clone, Serialize)]
pub struct CycleRecord {
    pub time: SimTime,
    pub play_mode: PlayMode,
    pub category: Option<BehaviorCategory>,
    pub behavior: Option<BehaviorKind>,
    pub sub_type: Option<SubType>,
    pub score: Option<f64>,
    /// Candidates tried before one executed
    pub attempts: usize,
    pub queued: Vec<String>,
    pub missed: Vec<CommandTag>,
}

pub struct DecisionTrace {
    writer: Option<BufWriter<File>>,
    record_count: u64,
}

impl DecisionTrace {
    /// Creates a trace writing to the specified path, truncating it.
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            writer: Some(BufWriter::new(file)),
            record_count: 0,
        })
    }

    /// Creates a trace that discards records (for testing)
    pub fn null() -> Self {
        Self {
            writer: None,
            record_count: 0,
        }
    }

    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    pub fn record(&mut self, record: &CycleRecord) -> std::io::Result<()> {
        self.record_count += 1;
        if let Some(ref mut writer) = self.writer {
            let json = serde_json::to_string(record)?;
            writeln!(writer, "{}", json)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for DecisionTrace {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
