//! Event types for pool activity

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::launcher::JobExit;

/// Lifecycle events emitted by a pool
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PoolEvent {
    /// A job was admitted and launched
    Started { identity: String, pid: Option<u32> },
    /// A job exited on its own
    Finished {
        identity: String,
        exit: JobExit,
        runtime_ms: u64,
    },
    /// A job hit the timeout and was killed; its exit status is discarded
    Killed { identity: String, runtime_ms: u64 },
    /// End of a monitoring pass
    Status { active: usize, capacity: usize },
}

impl PoolEvent {
    /// Job identity, absent for status events
    pub fn identity(&self) -> Option<&str> {
        match self {
            PoolEvent::Started { identity, .. }
            | PoolEvent::Finished { identity, .. }
            | PoolEvent::Killed { identity, .. } => Some(identity),
            PoolEvent::Status { .. } => None,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            PoolEvent::Started { .. } => "Started",
            PoolEvent::Finished { .. } => "Finished",
            PoolEvent::Killed { .. } => "Killed",
            PoolEvent::Status { .. } => "Status",
        }
    }
}

impl fmt::Display for PoolEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolEvent::Started { identity, .. } => write!(f, "Start: {}", identity),
            PoolEvent::Finished { identity, exit, .. } => write!(f, "Finish: {} {}", identity, exit),
            PoolEvent::Killed { identity, .. } => write!(f, "Kill: {}", identity),
            PoolEvent::Status { active, capacity } => write!(f, "{} of {} active", active, capacity),
        }
    }
}

/// Wrapper for JSONL output with timestamp
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventLogEntry {
    /// Timestamp of the event
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    /// The event
    pub event: PoolEvent,
}

impl EventLogEntry {
    /// Create a new log entry with current timestamp
    pub fn new(event: PoolEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}
