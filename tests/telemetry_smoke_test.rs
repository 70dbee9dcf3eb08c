//! Smoke tests for the full observability stack.
//!
//! These tests need an OTLP collector on localhost:4317 feeding Tempo,
//! Prometheus and Loki on their default ports.
//!
//! Run with:
//! ```sh
//! cargo test --test telemetry_smoke_test -- --ignored --nocapture
//! ```

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use mastery_session::cache::QueryCache;
use mastery_session::client::{InMemoryBackend, SchedulerBackend};
use mastery_session::config::SessionConfig;
use mastery_session::model::Grade;
use mastery_session::session::{LaunchRequest, StudySession};
use mastery_session::telemetry::{TelemetryConfig, TelemetryGuard, init_telemetry};

static TELEMETRY: OnceLock<TelemetryGuard> = OnceLock::new();

fn ensure_telemetry() -> &'static TelemetryGuard {
    TELEMETRY.get_or_init(|| {
        init_telemetry(TelemetryConfig {
            endpoint: Some("http://localhost:4317".to_string()),
            service_name: "mastery-smoke-test".to_string(),
            log_level: "info".to_string(),
        })
        .expect("failed to init telemetry")
    })
}

/// Force-flush all providers and give backends time to ingest.
async fn flush_and_wait(guard: &TelemetryGuard) {
    guard.force_flush();
    tokio::time::sleep(Duration::from_secs(8)).await;
}

/// Run one demo session to completion, generating spans, metrics and logs.
async fn run_demo_session() {
    let backend = Arc::new(InMemoryBackend::demo());
    let queue = backend.fetch_due_queue(10).await.expect("demo due queue");
    let mut session = StudySession::launch(
        backend,
        Arc::new(QueryCache::new()),
        LaunchRequest::from_ids(&queue),
        &SessionConfig::default(),
    )
    .into_session()
    .expect("demo deck is not empty");

    for grade in [Grade::Good, Grade::Again, Grade::Easy] {
        session.wait_until_ready().await;
        session.reveal().unwrap();
        session.select_grade(grade).unwrap();
        session.submit().await.unwrap();
    }
}

#[test]
#[ignore]
fn smoke_traces() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let guard = ensure_telemetry();
        run_demo_session().await;
        flush_and_wait(guard).await;

        let client = reqwest::Client::new();
        let resp = client
            .get("http://localhost:3200/api/search")
            .query(&[("tags", "service.name=mastery-smoke-test"), ("limit", "5")])
            .send()
            .await
            .expect("failed to query Tempo");
        assert!(
            resp.status().is_success(),
            "Tempo query failed: {}",
            resp.status()
        );

        let body: serde_json::Value = resp.json().await.expect("failed to parse Tempo response");
        let traces = body["traces"].as_array();
        assert!(
            traces.is_some_and(|t| !t.is_empty()),
            "expected traces in Tempo, got: {body}"
        );
    });
}

#[test]
#[ignore]
fn smoke_metrics() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let guard = ensure_telemetry();
        run_demo_session().await;
        flush_and_wait(guard).await;

        let client = reqwest::Client::new();
        let resp = client
            .get("http://localhost:9090/api/v1/query")
            .query(&[("query", "mastery_reviews_submitted_total")])
            .send()
            .await
            .expect("failed to query Prometheus");
        assert!(
            resp.status().is_success(),
            "Prometheus query failed: {}",
            resp.status()
        );

        let body: serde_json::Value = resp
            .json()
            .await
            .expect("failed to parse Prometheus response");
        let results = body["data"]["result"].as_array();
        assert!(
            results.is_some_and(|r| !r.is_empty()),
            "expected metric results in Prometheus, got: {body}"
        );
    });
}

#[test]
#[ignore]
fn smoke_logs() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let guard = ensure_telemetry();
        run_demo_session().await;
        flush_and_wait(guard).await;

        let client = reqwest::Client::new();
        let resp = client
            .get("http://localhost:3100/loki/api/v1/query_range")
            .query(&[
                ("query", r#"{service_name="mastery-smoke-test"}"#),
                ("limit", "10"),
            ])
            .send()
            .await
            .expect("failed to query Loki");
        assert!(
            resp.status().is_success(),
            "Loki query failed: {}",
            resp.status()
        );

        let body: serde_json::Value = resp.json().await.expect("failed to parse Loki response");
        let streams = body["data"]["result"].as_array();
        assert!(
            streams.is_some_and(|s| !s.is_empty()),
            "expected log streams in Loki, got: {body}"
        );
    });
}
