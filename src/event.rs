//! Structured events emitted by the session on every transition.
//!
//! Consumers read the event log to drive redraws, audits or replays.
//! Events are the session's voice; notices are what the user sees.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::QueryKey;
use crate::model::{Grade, ItemId};
use crate::session::Phase;

/// A structured event emitted by the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence number. Consumers can detect gaps.
    pub seq: u64,
    /// When this event occurred.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub kind: EventKind,
}

/// Which asynchronous fetch a response belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchKind {
    Item,
    Preview,
}

impl std::fmt::Display for FetchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchKind::Item => write!(f, "item"),
            FetchKind::Preview => write!(f, "preview"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    SessionStarted {
        session_id: Uuid,
        queue_len: usize,
    },
    ItemRequested {
        position: usize,
        item_id: ItemId,
        generation: u64,
    },
    ItemLoaded {
        position: usize,
        item_id: ItemId,
    },
    ItemLoadFailed {
        item_id: ItemId,
        error: String,
    },
    PreviewLoaded {
        item_id: ItemId,
    },
    PreviewFailed {
        item_id: ItemId,
        error: String,
    },
    StaleResponseDiscarded {
        item_id: ItemId,
        kind: FetchKind,
        generation: u64,
    },
    PhaseChanged {
        item_id: ItemId,
        from: Phase,
        to: Phase,
    },
    ReviewSubmitted {
        item_id: ItemId,
        grade: Grade,
        elapsed_ms: u64,
    },
    SubmissionFailed {
        item_id: ItemId,
        error: String,
    },
    CachesInvalidated {
        item_id: ItemId,
        keys: Vec<QueryKey>,
    },
    PositionAdvanced {
        from: usize,
        to: usize,
    },
    SessionCompleted {
        reviewed: u32,
        correct: u32,
    },
    SessionExited {
        position: usize,
    },
}

/// Append-only event log with monotonic sequence numbers.
#[derive(Debug)]
pub struct EventLog {
    events: Vec<Event>,
    next_seq: u64,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            next_seq: 1,
        }
    }

    pub fn record(&mut self, kind: EventKind) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(Event {
            seq,
            timestamp: Utc::now(),
            kind,
        });
        seq
    }

    /// Events with `seq > after`, oldest first.
    pub fn since(&self, after: u64) -> &[Event] {
        let start = self.events.partition_point(|e| e.seq <= after);
        &self.events[start..]
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
