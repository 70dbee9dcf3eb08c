//! Cached views that depend on review outcomes.
//!
//! Views such as attempt history or the due list are shared state owned by
//! their readers. The session's only right over them is to mark entries
//! stale after a committed review; the next read refetches.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::ItemId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "view", content = "item_id", rename_all = "snake_case")]
pub enum QueryKey {
    /// Past attempts of one item.
    AttemptHistory(ItemId),
    /// Scheduler state panel of one item.
    CardState(ItemId),
    /// The item's own detail view.
    ItemDetail(ItemId),
    /// Aggregate list of due items.
    DueItems,
    /// Dashboard statistics.
    Stats,
}

impl QueryKey {
    /// Every view a committed review of `id` makes stale.
    pub fn affected_by_review(id: &ItemId) -> Vec<QueryKey> {
        vec![
            QueryKey::AttemptHistory(id.clone()),
            QueryKey::CardState(id.clone()),
            QueryKey::DueItems,
            QueryKey::ItemDetail(id.clone()),
            QueryKey::Stats,
        ]
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryKey::AttemptHistory(id) => write!(f, "attempts/{id}"),
            QueryKey::CardState(id) => write!(f, "card_state/{id}"),
            QueryKey::ItemDetail(id) => write!(f, "node/{id}"),
            QueryKey::DueItems => write!(f, "due_cards"),
            QueryKey::Stats => write!(f, "stats"),
        }
    }
}

/// The narrow capability the session holds over cached views.
pub trait ViewCache: Send + Sync {
    fn invalidate(&self, key: &QueryKey);
}

#[derive(Debug, Clone)]
struct Entry {
    value: serde_json::Value,
    fetched_at: DateTime<Utc>,
    stale: bool,
}

/// In-process view cache keyed by [`QueryKey`].
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: RwLock<HashMap<QueryKey, Entry>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: QueryKey, value: serde_json::Value) {
        let entry = Entry {
            value,
            fetched_at: Utc::now(),
            stale: false,
        };
        self.write().insert(key, entry);
    }

    /// The cached value, unless it is missing or stale.
    pub fn get_fresh(&self, key: &QueryKey) -> Option<serde_json::Value> {
        self.read()
            .get(key)
            .filter(|entry| !entry.stale)
            .map(|entry| entry.value.clone())
    }

    /// `None` when the key was never cached.
    pub fn is_stale(&self, key: &QueryKey) -> Option<bool> {
        self.read().get(key).map(|entry| entry.stale)
    }

    pub fn fetched_at(&self, key: &QueryKey) -> Option<DateTime<Utc>> {
        self.read().get(key).map(|entry| entry.fetched_at)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<QueryKey, Entry>> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<QueryKey, Entry>> {
        self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ViewCache for QueryCache {
    fn invalidate(&self, key: &QueryKey) {
        if let Some(entry) = self.write().get_mut(key) {
            entry.stale = true;
            debug!(key = %key, "view marked stale");
        }
    }
}
