//! Scheduler backend clients.
//!
//! The external scheduler is authoritative for all scheduling state. The
//! session only consumes its item fetch, interval preview and review commit
//! operations, plus the due-queue listing used to build a session.

pub mod http;
pub mod memory;

use std::future::Future;

use crate::error::Result;
use crate::model::{IntervalMap, ItemId, ReviewItem, ReviewSubmission};

pub use http::HttpBackend;
pub use memory::InMemoryBackend;

/// Operations the session needs from the scheduler.
///
/// Futures must be `Send` so fetches can run as spawned tasks.
pub trait SchedulerBackend: Send + Sync + 'static {
    /// Item content plus its current scheduler state. Never served from a cache.
    fn fetch_item(&self, id: &ItemId) -> impl Future<Output = Result<ReviewItem>> + Send;

    /// Display interval for each of the four grades.
    fn fetch_interval_preview(
        &self,
        id: &ItemId,
    ) -> impl Future<Output = Result<IntervalMap>> + Send;

    /// Commit a graded review. Returns the item with its updated scheduler state.
    fn submit_review(
        &self,
        submission: &ReviewSubmission,
    ) -> impl Future<Output = Result<ReviewItem>> + Send;

    /// Ids of items due for review, oldest due first.
    fn fetch_due_queue(&self, limit: usize) -> impl Future<Output = Result<Vec<ItemId>>> + Send;
}
