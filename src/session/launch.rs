//! Session entry: the caller's queue and return destination.

use crate::model::{Destination, ItemId};

use super::machine::StudySession;

/// Ordered, non-empty list of item ids. Immutable once the session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewQueue(Vec<ItemId>);

impl ReviewQueue {
    /// `None` for an empty list.
    pub fn new(ids: Vec<ItemId>) -> Option<Self> {
        if ids.is_empty() {
            None
        } else {
            Some(Self(ids))
        }
    }

    /// Parse a comma-separated id list, e.g. from a `queue=` parameter.
    /// Blank segments are skipped.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::new(
            raw.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(ItemId::from)
                .collect(),
        )
    }

    pub fn get(&self, position: usize) -> Option<&ItemId> {
        self.0.get(position)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_last(&self, position: usize) -> bool {
        position + 1 >= self.0.len()
    }
}

/// What the caller hands over when opening a session.
#[derive(Debug, Clone, Default)]
pub struct LaunchRequest {
    pub queue: Option<String>,
    pub return_to: Option<String>,
}

impl LaunchRequest {
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: Some(queue.into()),
            return_to: None,
        }
    }

    pub fn from_ids(ids: &[ItemId]) -> Self {
        let joined = ids.iter().map(ItemId::as_str).collect::<Vec<_>>().join(",");
        Self::new(joined)
    }

    pub fn return_to(mut self, destination: impl Into<String>) -> Self {
        self.return_to = Some(destination.into());
        self
    }
}

/// Result of opening a session.
pub enum Launch<B: crate::client::SchedulerBackend> {
    /// Session running, first item requested.
    Started(Box<StudySession<B>>),
    /// No usable queue; navigate here instead.
    Redirect(Destination),
}

impl<B: crate::client::SchedulerBackend> Launch<B> {
    pub fn into_session(self) -> Option<Box<StudySession<B>>> {
        match self {
            Launch::Started(session) => Some(session),
            Launch::Redirect(_) => None,
        }
    }
}
