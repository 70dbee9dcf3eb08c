//! Study-session span helpers.
//!
//! One span per session, with a child span per review commit. Phase
//! transitions are recorded as events on the session span.

use tracing::Span;
use uuid::Uuid;

/// Start the span that covers a whole study session.
///
/// The `session.outcome` field is declared empty and filled when the
/// session completes or is exited.
pub fn start_session_span(session_id: &Uuid, queue_len: usize) -> Span {
    tracing::info_span!(
        "study.session",
        "session.id" = %session_id,
        "session.queue_len" = queue_len,
        "session.outcome" = tracing::field::Empty,
    )
}

/// Start a span for committing one graded review.
pub fn start_review_span(parent: &Span, item_id: &str, grade: u8) -> Span {
    tracing::info_span!(
        parent: parent,
        "review.submit",
        "review.item_id" = item_id,
        "review.grade" = grade,
    )
}

/// Record a phase transition event on the given span.
pub fn record_phase_transition(span: &Span, from: &str, to: &str) {
    span.in_scope(|| {
        tracing::info!(from = from, to = to, "phase_transition");
    });
}

/// Record how the session ended.
pub fn record_session_outcome(span: &Span, outcome: &str) {
    span.record("session.outcome", outcome);
}
