//! Integration tests for the HTTP scheduler backend against a local stub.

use std::time::Duration;

use chrono::{TimeZone, Utc};
use mastery_session::client::memory::new_item;
use mastery_session::client::{HttpBackend, SchedulerBackend};
use mastery_session::config::SecretString;
use mastery_session::error::Error;
use mastery_session::model::{Grade, ItemId, ReviewPayload, ReviewSubmission};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// One request as the stub saw it. `head` is lowercased.
struct Captured {
    head: String,
    body: String,
}

impl Captured {
    fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    fn has_header(&self, name: &str, value: &str) -> bool {
        let wanted = format!("{name}: {}", value.to_lowercase());
        self.head.lines().any(|line| line.trim() == wanted)
    }
}

/// Answer exactly one request with `status` and `body`.
async fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut chunk = [0u8; 4096];

        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending headers");
            raw.extend_from_slice(&chunk[..n]);
            if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&raw[..header_end]).to_lowercase();
        let content_length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while raw.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending body");
            raw.extend_from_slice(&chunk[..n]);
        }
        let request_body = String::from_utf8_lossy(&raw[header_end..]).to_string();

        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();

        Captured {
            head,
            body: request_body,
        }
    });

    (base, handle)
}

fn backend(base: &str, token: Option<&str>) -> HttpBackend {
    HttpBackend::new(
        base,
        token.map(|t| SecretString::from(t.to_string())),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn submit_review_posts_payload_with_idempotency_key() {
    let reply = serde_json::to_string(&new_item("a", "Two pointers")).unwrap();
    let (base, server) = serve_once("200 OK", reply).await;

    let payload = ReviewPayload {
        text: "t".to_string(),
        error_log: String::new(),
        user_difficulty_rating: 5,
        submitted_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap()
            + chrono::Duration::milliseconds(208),
    };
    let submission = ReviewSubmission::new(ItemId::new("a"), Grade::Good, 1234, payload.clone())
        .unwrap();
    let key = submission.idempotency_key();
    assert_eq!(key, "a:2026-03-01T09:30:00.208Z");

    let item = backend(&base, Some("s3cret"))
        .submit_review(&submission)
        .await
        .unwrap();
    assert_eq!(item.id, ItemId::new("a"));

    let request = server.await.unwrap();
    assert!(request.request_line().starts_with("post /api/nodes/a/reviews "));
    assert!(request.has_header("idempotency-key", &key));
    assert!(request.has_header("authorization", "Bearer s3cret"));

    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["grade"], 3);
    assert_eq!(body["durationMs"], 1234);
    assert_eq!(body["idempotencyKey"], key.as_str());

    let answer = body["userAnswer"].as_str().expect("userAnswer is a JSON string");
    let sent: ReviewPayload = serde_json::from_str(answer).unwrap();
    assert_eq!(sent, payload);
}

#[tokio::test]
async fn preview_parses_string_keyed_grades() {
    let reply = r#"{"1":"10m","2":"1d","3":"3d","4":"7d"}"#.to_string();
    let (base, server) = serve_once("200 OK", reply).await;

    let intervals = backend(&base, None)
        .fetch_interval_preview(&ItemId::new("a"))
        .await
        .unwrap();
    assert_eq!(intervals.get(&Grade::Again).map(String::as_str), Some("10m"));
    assert_eq!(intervals.get(&Grade::Easy).map(String::as_str), Some("7d"));
    assert_eq!(intervals.len(), 4);

    let request = server.await.unwrap();
    assert!(request.request_line().starts_with("get /api/nodes/a/scheduling "));
    assert!(!request.head.contains("authorization:"));
}

#[tokio::test]
async fn due_queue_passes_limit() {
    let (base, server) = serve_once("200 OK", r#"["b","a"]"#.to_string()).await;

    let ids = backend(&base, None).fetch_due_queue(5).await.unwrap();
    assert_eq!(ids, vec![ItemId::new("b"), ItemId::new("a")]);

    let request = server.await.unwrap();
    assert!(request.request_line().starts_with("get /api/study/due?limit=5 "));
}

#[tokio::test]
async fn missing_item_maps_to_not_found() {
    let (base, _server) = serve_once("404 Not Found", "{}".to_string()).await;

    let err = backend(&base, None)
        .fetch_item(&ItemId::new("gone"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(ref path) if path.ends_with("/nodes/gone/card")));
}

#[tokio::test]
async fn server_error_maps_to_backend_error() {
    let (base, _server) = serve_once("500 Internal Server Error", "\"boom\"".to_string()).await;

    let err = backend(&base, None)
        .fetch_item(&ItemId::new("a"))
        .await
        .unwrap_err();
    match err {
        Error::Backend(message) => {
            assert!(message.contains("fetch_item"), "{message}");
            assert!(message.contains("500"), "{message}");
            assert!(message.contains("boom"), "{message}");
        }
        other => panic!("expected backend error, got {other:?}"),
    }
}
