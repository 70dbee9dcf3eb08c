//! Integration tests for telemetry initialization and span helpers.

use uuid::Uuid;

#[test]
fn telemetry_initializes_without_endpoint() {
    // Note: tracing subscriber can only be set once per process.
    // Using try_init() in the implementation avoids panics if another
    // test already initialized a subscriber.
    let config = mastery_session::telemetry::TelemetryConfig {
        endpoint: None,
        service_name: "mastery-session-test".to_string(),
        log_level: "debug".to_string(),
    };
    // This may return Err if a global subscriber was already set by
    // another test in this process; that is acceptable.
    let _guard = mastery_session::telemetry::init_telemetry(config);
}

#[test]
fn session_span_records_transition_and_outcome() {
    let id = Uuid::new_v4();
    let span = mastery_session::telemetry::session::start_session_span(&id, 3);
    mastery_session::telemetry::session::record_phase_transition(&span, "loading", "answering");
    mastery_session::telemetry::session::record_session_outcome(&span, "completed");
}

#[test]
fn review_span_nests_under_session() {
    let id = Uuid::new_v4();
    let session = mastery_session::telemetry::session::start_session_span(&id, 1);
    let review = mastery_session::telemetry::session::start_review_span(&session, "a", 3);
    review.in_scope(|| tracing::info!("committing"));
}

#[test]
fn metric_instruments_build_without_provider() {
    use opentelemetry::KeyValue;
    use mastery_session::telemetry::metrics;

    metrics::reviews_submitted().add(1, &[KeyValue::new("result", "ok")]);
    metrics::review_elapsed_ms().record(1234.0, &[]);
    metrics::stale_responses_discarded().add(1, &[KeyValue::new("kind", "preview")]);
}

#[test]
fn telemetry_config_follows_app_config() {
    let config = mastery_session::config::Config {
        scheduler_url: "http://localhost:8080".to_string(),
        scheduler_token: None,
        request_timeout: std::time::Duration::from_secs(10),
        otel_endpoint: Some("http://localhost:4317".to_string()),
        log_level: "debug".to_string(),
    };
    let telemetry = mastery_session::telemetry::TelemetryConfig::from_config(&config, "study");
    assert_eq!(telemetry.endpoint.as_deref(), Some("http://localhost:4317"));
    assert_eq!(telemetry.service_name, "study");
    assert_eq!(telemetry.log_level, "debug");
}
