//! The study-session state machine.
//!
//! Owns the queue, the current position and all per-item state. Item and
//! preview fetches run as spawned tasks and report back over a channel; each
//! request is tagged with the generation it was issued for, and a response
//! is applied only if that generation and item id are still current.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use opentelemetry::KeyValue;
use tokio::sync::mpsc;
use tracing::{Instrument, Span, debug, info, warn};
use uuid::Uuid;

use super::launch::{Launch, LaunchRequest, ReviewQueue};
use super::phase::Phase;
use super::preview::GradePreview;
use super::stats::{Progress, SessionStats};
use crate::cache::{QueryKey, ViewCache};
use crate::client::SchedulerBackend;
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::event::{Event, EventKind, EventLog, FetchKind};
use crate::model::{
    Destination, Grade, IntervalMap, ItemId, Notice, ReviewItem, ReviewPayload, ReviewSubmission,
};
use crate::rating::DifficultyRating;
use crate::telemetry::metrics;
use crate::telemetry::session::{
    record_phase_transition, record_session_outcome, start_review_span, start_session_span,
};
use crate::timer::Timer;

/// A fetch result on its way back to the session.
enum Completion {
    Item {
        generation: u64,
        item_id: ItemId,
        result: Result<ReviewItem>,
    },
    Preview {
        generation: u64,
        item_id: ItemId,
        result: Result<IntervalMap>,
    },
}

/// What applying one fetch result did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
    ItemReady,
    ItemFailed,
    PreviewReady,
    PreviewFailed,
    /// The response belonged to a superseded request and was dropped.
    Discarded(FetchKind),
}

/// Result of a `submit` action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// No grade selected; nothing happened.
    NotReady,
    /// Committed; the next item is loading at `position`.
    Advanced { position: usize },
    /// Committed the last item; the session is over.
    Completed {
        destination: Destination,
        stats: SessionStats,
    },
    /// The scheduler did not acknowledge. All inputs are kept for a retry.
    Failed { error: String },
}

pub struct StudySession<B: SchedulerBackend> {
    id: Uuid,
    backend: Arc<B>,
    cache: Arc<dyn ViewCache>,
    queue: ReviewQueue,
    position: usize,
    destination: Destination,
    phase: Phase,
    /// Bumped on every new item request; tags in-flight fetches.
    generation: u64,

    item: Option<ReviewItem>,
    load_error: Option<String>,
    preview: GradePreview,
    timer: Timer,
    answer: String,
    pending_grade: Option<Grade>,
    difficulty: DifficultyRating,
    error_log: String,
    /// Last submission sent for this item, reused on retry.
    last_attempt: Option<ReviewSubmission>,
    submit_error: Option<String>,

    stats: SessionStats,
    notices: Vec<Notice>,
    events: EventLog,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    in_flight: usize,
    span: Span,
}

impl<B: SchedulerBackend> StudySession<B> {
    /// Open a session for the caller's queue.
    ///
    /// A missing or empty queue redirects to the configured default
    /// destination without starting anything; `return_to` only applies once a
    /// session has run. Otherwise the first item is requested immediately;
    /// this must run inside a tokio runtime.
    pub fn launch(
        backend: Arc<B>,
        cache: Arc<dyn ViewCache>,
        request: LaunchRequest,
        config: &SessionConfig,
    ) -> Launch<B> {
        let Some(queue) = request.queue.as_deref().and_then(ReviewQueue::parse) else {
            let destination = config.default_destination();
            info!(%destination, "no review queue, redirecting");
            return Launch::Redirect(destination);
        };

        let destination = request
            .return_to
            .filter(|path| !path.trim().is_empty())
            .map(Destination::new)
            .unwrap_or_else(|| config.default_destination());

        let id = Uuid::new_v4();
        let span = start_session_span(&id, queue.len());
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let mut session = Self {
            id,
            backend,
            cache,
            queue,
            position: 0,
            destination,
            phase: Phase::Loading,
            generation: 0,
            item: None,
            load_error: None,
            preview: GradePreview::Loading,
            timer: Timer::new(config.timer_tick()),
            answer: String::new(),
            pending_grade: None,
            difficulty: DifficultyRating::DEFAULT,
            error_log: String::new(),
            last_attempt: None,
            submit_error: None,
            stats: SessionStats::default(),
            notices: Vec::new(),
            events: EventLog::new(),
            completions_tx,
            completions_rx,
            in_flight: 0,
            span,
        };

        session.events.record(EventKind::SessionStarted {
            session_id: id,
            queue_len: session.queue.len(),
        });
        session
            .span
            .in_scope(|| info!(queue_len = session.queue.len(), "study session started"));
        session.request_current_item();
        Launch::Started(Box::new(session))
    }

    // -----------------------------------------------------------------------
    // Fetch results
    // -----------------------------------------------------------------------

    /// Wait for the next fetch result and apply it.
    ///
    /// Returns `None` when nothing is in flight.
    pub async fn next_update(&mut self) -> Option<Update> {
        if self.in_flight == 0 {
            return None;
        }
        let completion = self.completions_rx.recv().await?;
        self.in_flight -= 1;
        Some(self.apply(completion))
    }

    /// Apply results until the current item is shown (or failed to load).
    pub async fn wait_until_ready(&mut self) -> Option<Update> {
        while let Some(update) = self.next_update().await {
            if matches!(update, Update::ItemReady | Update::ItemFailed) {
                return Some(update);
            }
        }
        None
    }

    fn apply(&mut self, completion: Completion) -> Update {
        match completion {
            Completion::Item {
                generation,
                item_id,
                result,
            } => {
                if self.is_stale(generation, &item_id) {
                    return self.discard(FetchKind::Item, item_id, generation);
                }
                match result {
                    Ok(item) => self.present(item),
                    Err(e) => {
                        warn!(item_id = %item_id, error = %e, "item fetch failed");
                        self.load_error = Some(e.to_string());
                        self.notices.push(Notice::error("Failed to load item"));
                        self.events.record(EventKind::ItemLoadFailed {
                            item_id,
                            error: e.to_string(),
                        });
                        Update::ItemFailed
                    }
                }
            }
            Completion::Preview {
                generation,
                item_id,
                result,
            } => {
                if self.is_stale(generation, &item_id) {
                    return self.discard(FetchKind::Preview, item_id, generation);
                }
                match result {
                    Ok(intervals) => {
                        self.preview = GradePreview::Ready(intervals);
                        self.events.record(EventKind::PreviewLoaded { item_id });
                        Update::PreviewReady
                    }
                    Err(e) => {
                        warn!(item_id = %item_id, error = %e, "interval preview failed");
                        self.preview = GradePreview::Failed;
                        self.events.record(EventKind::PreviewFailed {
                            item_id,
                            error: e.to_string(),
                        });
                        Update::PreviewFailed
                    }
                }
            }
        }
    }

    /// Loading → Answering: show the item, start timing, ask for previews.
    fn present(&mut self, item: ReviewItem) -> Update {
        if let Err(e) = self.transition(Phase::Answering) {
            warn!(error = %e, "item arrived outside loading");
            return Update::Discarded(FetchKind::Item);
        }
        let item_id = item.id.clone();
        self.item = Some(item);
        self.load_error = None;
        self.reset_inputs();
        self.timer.start();
        self.request_preview(item_id.clone());
        debug!(item_id = %item_id, position = self.position, "item presented");
        self.events.record(EventKind::ItemLoaded {
            position: self.position,
            item_id,
        });
        Update::ItemReady
    }

    fn is_stale(&self, generation: u64, item_id: &ItemId) -> bool {
        self.phase.is_terminal()
            || generation != self.generation
            || self.queue.get(self.position) != Some(item_id)
    }

    fn discard(&mut self, kind: FetchKind, item_id: ItemId, generation: u64) -> Update {
        debug!(item_id = %item_id, %kind, generation, current = self.generation, "discarding stale response");
        metrics::stale_responses_discarded().add(1, &[KeyValue::new("kind", kind.to_string())]);
        self.events.record(EventKind::StaleResponseDiscarded {
            item_id,
            kind,
            generation,
        });
        Update::Discarded(kind)
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    /// Answering → Grading. Freezes the timer; the typed answer is kept.
    pub fn reveal(&mut self) -> Result<()> {
        self.require("reveal", Phase::Answering)?;
        let elapsed = self.timer.freeze();
        self.transition(Phase::Grading)?;
        debug!(elapsed_ms = elapsed.as_millis() as u64, "answer revealed");
        Ok(())
    }

    /// Grading → Answering. Clears the selected grade. The timer stays frozen:
    /// the elapsed time committed is the one captured at the first reveal.
    pub fn back(&mut self) -> Result<()> {
        self.require("back", Phase::Grading)?;
        self.pending_grade = None;
        self.transition(Phase::Answering)
    }

    pub fn select_grade(&mut self, grade: Grade) -> Result<()> {
        self.require("select_grade", Phase::Grading)?;
        self.pending_grade = Some(grade);
        Ok(())
    }

    pub fn set_answer(&mut self, text: impl Into<String>) -> Result<()> {
        self.require("set_answer", Phase::Answering)?;
        self.answer = text.into();
        Ok(())
    }

    pub fn set_error_log(&mut self, text: impl Into<String>) -> Result<()> {
        self.require("set_error_log", Phase::Grading)?;
        self.error_log = text.into();
        Ok(())
    }

    pub fn set_difficulty(&mut self, rating: DifficultyRating) -> Result<()> {
        self.require("set_difficulty", Phase::Grading)?;
        self.difficulty = rating;
        Ok(())
    }

    /// Toggle the `star`-th star (1-indexed) of the difficulty control.
    pub fn click_star(&mut self, star: u8) -> Result<DifficultyRating> {
        self.require("click_star", Phase::Grading)?;
        self.difficulty = self.difficulty.click_star(star)?;
        Ok(self.difficulty)
    }

    /// Re-request the current item after a failed fetch.
    pub fn reload(&mut self) -> Result<()> {
        self.require("reload", Phase::Loading)?;
        if self.load_error.is_none() {
            return Err(Error::InvalidAction {
                action: "reload",
                phase: self.phase,
            });
        }
        self.load_error = None;
        self.request_current_item();
        Ok(())
    }

    /// Commit the graded review of the current item.
    ///
    /// Without a selected grade this is a no-op. On success dependent views
    /// are marked stale before the position moves. On failure nothing is
    /// cleared and the same call can be repeated; an unchanged retry carries
    /// the same idempotency key.
    pub async fn submit(&mut self) -> Result<SubmitOutcome> {
        if self.phase.is_terminal() {
            return Err(Error::SessionEnded);
        }
        let Some(grade) = self.pending_grade.filter(|_| self.phase == Phase::Grading) else {
            return Ok(SubmitOutcome::NotReady);
        };

        let submission = self.build_submission(grade)?;
        self.last_attempt = Some(submission.clone());

        let span = start_review_span(&self.span, submission.item_id.as_str(), grade.value());
        let result = self
            .backend
            .submit_review(&submission)
            .instrument(span.clone())
            .await;

        match result {
            Ok(_) => {
                span.in_scope(|| info!(elapsed_ms = submission.elapsed_ms, "review committed"));
                Ok(self.committed(submission))
            }
            Err(e) => {
                span.in_scope(|| warn!(error = %e, "review submission failed"));
                metrics::reviews_submitted().add(
                    1,
                    &[
                        KeyValue::new("grade", i64::from(grade.value())),
                        KeyValue::new("result", "error"),
                    ],
                );
                let error = e.to_string();
                self.submit_error = Some(error.clone());
                self.notices.push(Notice::error("Failed to save review"));
                self.events.record(EventKind::SubmissionFailed {
                    item_id: submission.item_id,
                    error: error.clone(),
                });
                Ok(SubmitOutcome::Failed { error })
            }
        }
    }

    /// Leave the session. Allowed in any phase; nothing is submitted.
    pub fn exit(&mut self) -> Destination {
        if !self.phase.is_terminal() {
            self.timer.reset();
            if let Err(e) = self.transition(Phase::Exited) {
                warn!(error = %e, "cannot exit");
            }
            record_session_outcome(&self.span, "exited");
            metrics::sessions_finished().add(1, &[KeyValue::new("outcome", "exited")]);
            self.events.record(EventKind::SessionExited {
                position: self.position,
            });
            info!(position = self.position, destination = %self.destination, "session exited");
        }
        self.destination.clone()
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn queue(&self) -> &ReviewQueue {
        &self.queue
    }

    pub fn current_item_id(&self) -> Option<&ItemId> {
        if self.phase.is_terminal() {
            return None;
        }
        self.queue.get(self.position)
    }

    pub fn item(&self) -> Option<&ReviewItem> {
        self.item.as_ref()
    }

    pub fn preview(&self) -> &GradePreview {
        &self.preview
    }

    pub fn elapsed(&self) -> Duration {
        self.timer.elapsed()
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn pending_grade(&self) -> Option<Grade> {
        self.pending_grade
    }

    pub fn difficulty(&self) -> DifficultyRating {
        self.difficulty
    }

    pub fn error_log(&self) -> &str {
        &self.error_log
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn submit_error(&self) -> Option<&str> {
        self.submit_error.as_deref()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn progress(&self) -> Progress {
        Progress {
            current: (self.position + 1).min(self.queue.len()),
            total: self.queue.len(),
        }
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Fetches issued but not yet applied.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Drain pending user-visible notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn events_since(&self, seq: u64) -> &[Event] {
        self.events.since(seq)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn require(&self, action: &'static str, phase: Phase) -> Result<()> {
        if self.phase.is_terminal() {
            return Err(Error::SessionEnded);
        }
        if self.phase != phase {
            return Err(Error::InvalidAction {
                action,
                phase: self.phase,
            });
        }
        Ok(())
    }

    fn transition(&mut self, to: Phase) -> Result<()> {
        let from = self.phase;
        if !from.can_transition_to(to) {
            return Err(Error::InvalidTransition { from, to });
        }
        self.phase = to;
        record_phase_transition(&self.span, &from.to_string(), &to.to_string());
        if let Some(item_id) = self.queue.get(self.position) {
            self.events.record(EventKind::PhaseChanged {
                item_id: item_id.clone(),
                from,
                to,
            });
        }
        Ok(())
    }

    /// Clear everything scoped to one item's inputs.
    fn reset_inputs(&mut self) {
        self.answer.clear();
        self.pending_grade = None;
        self.difficulty = DifficultyRating::DEFAULT;
        self.error_log.clear();
        self.last_attempt = None;
        self.submit_error = None;
    }

    /// Start a fresh request for the item at the current position.
    fn request_current_item(&mut self) {
        let Some(item_id) = self.queue.get(self.position).cloned() else {
            return;
        };
        self.generation += 1;
        self.item = None;
        self.preview = GradePreview::Loading;
        self.timer.reset();
        self.reset_inputs();
        self.events.record(EventKind::ItemRequested {
            position: self.position,
            item_id: item_id.clone(),
            generation: self.generation,
        });

        let backend = Arc::clone(&self.backend);
        let tx = self.completions_tx.clone();
        let generation = self.generation;
        self.in_flight += 1;
        tokio::spawn(
            async move {
                let result = backend.fetch_item(&item_id).await;
                let _ = tx.send(Completion::Item {
                    generation,
                    item_id,
                    result,
                });
            }
            .instrument(self.span.clone()),
        );
    }

    fn request_preview(&mut self, item_id: ItemId) {
        let backend = Arc::clone(&self.backend);
        let tx = self.completions_tx.clone();
        let generation = self.generation;
        self.preview = GradePreview::Loading;
        self.in_flight += 1;
        tokio::spawn(
            async move {
                let result = backend.fetch_interval_preview(&item_id).await;
                let _ = tx.send(Completion::Preview {
                    generation,
                    item_id,
                    result,
                });
            }
            .instrument(self.span.clone()),
        );
    }

    fn build_submission(&self, grade: Grade) -> Result<ReviewSubmission> {
        let item_id = self
            .queue
            .get(self.position)
            .cloned()
            .ok_or(Error::SessionEnded)?;
        let error_log = if grade.is_failure() {
            self.error_log.clone()
        } else {
            String::new()
        };
        let payload = ReviewPayload {
            text: self.answer.clone(),
            error_log,
            user_difficulty_rating: self.difficulty.value(),
            submitted_at: Utc::now(),
        };
        let mut submission =
            ReviewSubmission::new(item_id, grade, self.timer.elapsed_ms(), payload)?;

        if let Some(previous) = &self.last_attempt {
            if previous.same_inputs(&submission) {
                submission.payload.submitted_at = previous.payload.submitted_at;
            }
        }
        Ok(submission)
    }

    fn committed(&mut self, submission: ReviewSubmission) -> SubmitOutcome {
        let ReviewSubmission {
            item_id,
            grade,
            elapsed_ms,
            ..
        } = submission;

        metrics::reviews_submitted().add(
            1,
            &[
                KeyValue::new("grade", i64::from(grade.value())),
                KeyValue::new("result", "ok"),
            ],
        );
        metrics::review_elapsed_ms().record(elapsed_ms as f64, &[]);
        self.events.record(EventKind::ReviewSubmitted {
            item_id: item_id.clone(),
            grade,
            elapsed_ms,
        });
        self.stats.record(grade);

        // Stale before the position moves, so a later read of this item
        // never sees the pre-review state.
        let keys = QueryKey::affected_by_review(&item_id);
        for key in &keys {
            self.cache.invalidate(key);
        }
        self.events
            .record(EventKind::CachesInvalidated { item_id, keys });

        self.notices.push(Notice::success("Attempt recorded"));
        self.last_attempt = None;
        self.submit_error = None;

        if self.queue.is_last(self.position) {
            self.complete()
        } else {
            self.advance()
        }
    }

    fn advance(&mut self) -> SubmitOutcome {
        let from = self.position;
        if let Err(e) = self.transition(Phase::Loading) {
            warn!(error = %e, "cannot advance");
        }
        self.position += 1;
        self.events.record(EventKind::PositionAdvanced {
            from,
            to: self.position,
        });
        self.request_current_item();
        SubmitOutcome::Advanced {
            position: self.position,
        }
    }

    fn complete(&mut self) -> SubmitOutcome {
        self.timer.reset();
        if let Err(e) = self.transition(Phase::Completed) {
            warn!(error = %e, "cannot complete");
        }
        self.notices.push(Notice::success("Session complete!"));
        record_session_outcome(&self.span, "completed");
        metrics::sessions_finished().add(1, &[KeyValue::new("outcome", "completed")]);
        self.events.record(EventKind::SessionCompleted {
            reviewed: self.stats.reviewed,
            correct: self.stats.correct,
        });
        info!(
            reviewed = self.stats.reviewed,
            correct = self.stats.correct,
            destination = %self.destination,
            "session completed"
        );
        SubmitOutcome::Completed {
            destination: self.destination.clone(),
            stats: self.stats,
        }
    }
}
