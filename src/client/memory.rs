//! In-memory scheduler backend for tests and offline demo sessions.
//!
//! Holds seeded items and previews, records every accepted review, and can
//! inject latency and failures per operation. Reviews are deduplicated by
//! idempotency key, so a retried commit is applied once.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use super::SchedulerBackend;
use crate::error::{Error, Result};
use crate::model::{Grade, IntervalMap, ItemId, ReviewItem, ReviewSubmission, SchedulerState};

#[derive(Default)]
struct Inner {
    items: HashMap<ItemId, ReviewItem>,
    previews: HashMap<ItemId, IntervalMap>,
    item_delays: HashMap<ItemId, Duration>,
    preview_delays: HashMap<ItemId, Duration>,
    failing_items: HashSet<ItemId>,
    failing_previews: HashSet<ItemId>,
    /// Next N commits are rejected before reaching the scheduler.
    rejected_submits: usize,
    /// Next N commits are applied but report failure (acknowledgement lost).
    lost_acks: usize,
    submit_calls: usize,
    applied: Vec<ReviewSubmission>,
    applied_keys: HashSet<String>,
}

#[derive(Default)]
pub struct InMemoryBackend {
    inner: Mutex<Inner>,
}

/// A fresh `new` item with the given title.
pub fn new_item(id: &str, title: &str) -> ReviewItem {
    ReviewItem {
        id: ItemId::new(id),
        title: title.to_string(),
        body: String::new(),
        node_type: "problem".to_string(),
        scheduler_state: SchedulerState::New,
        current_step: None,
        next_review: None,
        stability: None,
        difficulty: None,
        reps: Some(0),
        lapses: Some(0),
    }
}

/// Preview table from labels in grade order.
pub fn preview(labels: [&str; 4]) -> IntervalMap {
    Grade::ALL
        .into_iter()
        .zip(labels)
        .map(|(grade, label)| (grade, label.to_string()))
        .collect()
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A small seeded deck for offline sessions.
    pub fn demo() -> Self {
        let mut two_sum = new_item(
            "8d2f5a1c-0b3e-4c1a-9f6e-2a7b4c9d0e11",
            "Two Sum in a sorted array",
        );
        two_sum.body = "Given a sorted array and a target, return the indices of two \
                        numbers that add up to the target in O(n)."
            .to_string();

        let mut mvt = new_item(
            "3c9e7b20-5d41-4f8a-a2b6-71e0d4c3f922",
            "Mean value theorem",
        );
        mvt.node_type = "theory".to_string();
        mvt.body = "State the mean value theorem and sketch why it follows from Rolle's theorem."
            .to_string();
        mvt.scheduler_state = SchedulerState::Learning;
        mvt.current_step = Some(1);

        let mut bfs = new_item(
            "f1a04d6e-9c27-4b53-8e1d-c5b2a8f7e333",
            "Shortest path in an unweighted graph",
        );
        bfs.body = "Why does breadth-first search find shortest paths when all edges \
                    have equal weight?"
            .to_string();
        bfs.scheduler_state = SchedulerState::Review;

        Self::new()
            .with_preview(&two_sum.id, preview(["1m", "6m", "10m", "4d"]))
            .with_item(two_sum)
            .with_preview(&mvt.id, preview(["1m", "10m", "1d", "3d"]))
            .with_item(mvt)
            .with_preview(&bfs.id, preview(["10m", "2d", "5d", "12d"]))
            .with_item(bfs)
    }

    pub fn with_item(self, item: ReviewItem) -> Self {
        self.lock().items.insert(item.id.clone(), item);
        self
    }

    pub fn with_preview(self, id: &ItemId, intervals: IntervalMap) -> Self {
        self.lock().previews.insert(id.clone(), intervals);
        self
    }

    pub fn with_item_delay(self, id: &ItemId, delay: Duration) -> Self {
        self.lock().item_delays.insert(id.clone(), delay);
        self
    }

    pub fn with_preview_delay(self, id: &ItemId, delay: Duration) -> Self {
        self.lock().preview_delays.insert(id.clone(), delay);
        self
    }

    pub fn fail_item(self, id: &ItemId) -> Self {
        self.lock().failing_items.insert(id.clone());
        self
    }

    pub fn fail_preview(self, id: &ItemId) -> Self {
        self.lock().failing_previews.insert(id.clone());
        self
    }

    /// Let item fetches for `id` succeed again.
    pub fn heal_item(&self, id: &ItemId) {
        self.lock().failing_items.remove(id);
    }

    /// Reject the next `n` review commits.
    pub fn reject_next_submits(&self, n: usize) {
        self.lock().rejected_submits = n;
    }

    /// Apply the next `n` review commits but report them as failed.
    pub fn lose_next_acks(&self, n: usize) {
        self.lock().lost_acks = n;
    }

    /// Reviews applied to the scheduler, in order.
    pub fn applied(&self) -> Vec<ReviewSubmission> {
        self.lock().applied.clone()
    }

    /// Number of commit calls received, including rejected ones.
    pub fn submit_calls(&self) -> usize {
        self.lock().submit_calls
    }

    pub fn item(&self, id: &ItemId) -> Option<ReviewItem> {
        self.lock().items.get(id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn delay(&self, delay: Option<Duration>) {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl SchedulerBackend for InMemoryBackend {
    async fn fetch_item(&self, id: &ItemId) -> Result<ReviewItem> {
        let delay = self.lock().item_delays.get(id).copied();
        self.delay(delay).await;

        let inner = self.lock();
        if inner.failing_items.contains(id) {
            return Err(Error::Backend(format!("item {id} unavailable")));
        }
        inner
            .items
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn fetch_interval_preview(&self, id: &ItemId) -> Result<IntervalMap> {
        let delay = self.lock().preview_delays.get(id).copied();
        self.delay(delay).await;

        let inner = self.lock();
        if inner.failing_previews.contains(id) {
            return Err(Error::Backend(format!("preview for {id} unavailable")));
        }
        inner
            .previews
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn submit_review(&self, submission: &ReviewSubmission) -> Result<ReviewItem> {
        let mut inner = self.lock();
        inner.submit_calls += 1;

        if inner.rejected_submits > 0 {
            inner.rejected_submits -= 1;
            return Err(Error::Backend("scheduler unavailable".to_string()));
        }

        let key = submission.idempotency_key();
        let id = &submission.item_id;
        if !inner.items.contains_key(id) {
            return Err(Error::NotFound(id.to_string()));
        }

        if inner.applied_keys.insert(key.clone()) {
            let item = inner
                .items
                .get_mut(id)
                .ok_or_else(|| Error::NotFound(id.to_string()))?;
            apply_review(item, submission.grade);
            inner.applied.push(submission.clone());
            debug!(item_id = %id, grade = %submission.grade, "review applied");
        } else {
            debug!(item_id = %id, key, "duplicate review ignored");
        }

        if inner.lost_acks > 0 {
            inner.lost_acks -= 1;
            return Err(Error::Backend("acknowledgement lost".to_string()));
        }

        inner
            .items
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn fetch_due_queue(&self, limit: usize) -> Result<Vec<ItemId>> {
        let now = Utc::now();
        let inner = self.lock();
        let mut due: Vec<&ReviewItem> = inner
            .items
            .values()
            .filter(|item| {
                matches!(
                    item.scheduler_state,
                    SchedulerState::Learning | SchedulerState::Relearning
                ) || item.next_review.is_none_or(|at| at <= now)
            })
            .collect();
        due.sort_by(|a, b| a.next_review.cmp(&b.next_review).then(a.id.cmp(&b.id)));
        Ok(due.into_iter().take(limit).map(|item| item.id.clone()).collect())
    }
}

/// Bookkeeping only: counters and a coarse state move. Interval math stays
/// with the real scheduler.
fn apply_review(item: &mut ReviewItem, grade: Grade) {
    item.reps = Some(item.reps.unwrap_or(0) + 1);
    item.next_review = Some(Utc::now());
    match grade {
        Grade::Again => {
            item.lapses = Some(item.lapses.unwrap_or(0) + 1);
            item.scheduler_state = match item.scheduler_state {
                SchedulerState::Review | SchedulerState::Relearning => SchedulerState::Relearning,
                SchedulerState::New | SchedulerState::Learning => SchedulerState::Learning,
            };
            item.current_step = Some(0);
        }
        Grade::Hard => {
            if item.scheduler_state == SchedulerState::New {
                item.scheduler_state = SchedulerState::Learning;
                item.current_step = Some(0);
            }
        }
        Grade::Good | Grade::Easy => {
            item.scheduler_state = SchedulerState::Review;
            item.current_step = None;
        }
    }
}
