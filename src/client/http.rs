//! HTTP client for the scheduler backend.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use opentelemetry::KeyValue;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::debug;

use super::SchedulerBackend;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{IntervalMap, ItemId, ReviewItem, ReviewSubmission, interval_map_from_wire};
use crate::telemetry::metrics;

/// Body of the review commit call. The payload travels as a JSON string in
/// `userAnswer`, which is how the backend stores attempt metadata.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReviewRequest<'a> {
    grade: u8,
    duration_ms: u64,
    user_answer: String,
    idempotency_key: &'a str,
}

pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: Option<SecretString>,
}

impl HttpBackend {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.scheduler_url.clone(),
            config.scheduler_token.clone(),
            config.request_timeout,
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{path}", self.base_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    async fn send(&self, operation: &'static str, request: RequestBuilder) -> Result<Response> {
        let start = Instant::now();
        let result = self.authorized(request).send().await;
        metrics::backend_request_duration_ms().record(
            start.elapsed().as_secs_f64() * 1000.0,
            &[KeyValue::new("operation", operation)],
        );

        let response = result?;
        debug!(operation, status = %response.status(), "scheduler responded");
        match response.status() {
            StatusCode::NOT_FOUND => Err(Error::NotFound(response.url().path().to_string())),
            status if status.is_success() => Ok(response),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(Error::Backend(format!("{operation} failed with {status}: {body}")))
            }
        }
    }
}

impl SchedulerBackend for HttpBackend {
    async fn fetch_item(&self, id: &ItemId) -> Result<ReviewItem> {
        let request = self.client.get(self.url(&format!("nodes/{id}/card")));
        Ok(self.send("fetch_item", request).await?.json().await?)
    }

    async fn fetch_interval_preview(&self, id: &ItemId) -> Result<IntervalMap> {
        let request = self.client.get(self.url(&format!("nodes/{id}/scheduling")));
        let wire: BTreeMap<String, String> =
            self.send("fetch_interval_preview", request).await?.json().await?;
        interval_map_from_wire(wire)
    }

    async fn submit_review(&self, submission: &ReviewSubmission) -> Result<ReviewItem> {
        let key = submission.idempotency_key();
        let body = ReviewRequest {
            grade: submission.grade.value(),
            duration_ms: submission.elapsed_ms,
            user_answer: submission.payload.to_json()?,
            idempotency_key: &key,
        };
        let request = self
            .client
            .post(self.url(&format!("nodes/{}/reviews", submission.item_id)))
            .header("Idempotency-Key", &key)
            .json(&body);
        Ok(self.send("submit_review", request).await?.json().await?)
    }

    async fn fetch_due_queue(&self, limit: usize) -> Result<Vec<ItemId>> {
        let request = self
            .client
            .get(self.url("study/due"))
            .query(&[("limit", limit)]);
        Ok(self.send("fetch_due_queue", request).await?.json().await?)
    }
}
