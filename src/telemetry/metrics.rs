//! Metric instrument factories for mastery-session.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"mastery-session"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for mastery-session instruments.
fn meter() -> Meter {
    opentelemetry::global::meter(super::INSTRUMENTATION_SCOPE)
}

/// Counter: review commits.
/// Labels: `grade` (1-4), `result` ("ok" | "error").
pub fn reviews_submitted() -> Counter<u64> {
    meter()
        .u64_counter("mastery.reviews.submitted")
        .with_description("Number of review commits attempted")
        .build()
}

/// Counter: fetch responses dropped because the session had moved on.
/// Labels: `kind` ("item" | "preview").
pub fn stale_responses_discarded() -> Counter<u64> {
    meter()
        .u64_counter("mastery.responses.discarded")
        .with_description("Late fetch responses for superseded items")
        .build()
}

/// Histogram: time spent answering an item before reveal.
pub fn review_elapsed_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("mastery.review.elapsed_ms")
        .with_description("Answering time per committed review")
        .with_unit("ms")
        .build()
}

/// Counter: sessions that ended.
/// Labels: `outcome` ("completed" | "exited").
pub fn sessions_finished() -> Counter<u64> {
    meter()
        .u64_counter("mastery.sessions.finished")
        .with_description("Number of study sessions that ended")
        .build()
}

/// Histogram: scheduler request latency.
/// Labels: `operation`.
pub fn backend_request_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("mastery.backend.duration_ms")
        .with_description("Scheduler backend request duration in milliseconds")
        .with_unit("ms")
        .build()
}
