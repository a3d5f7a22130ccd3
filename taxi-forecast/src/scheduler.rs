//! Background jobs: periodic reports and cache sweeping.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::PayloadCache;
use crate::domain::ReportMode;
use crate::report::{DEFAULT_MESSAGE_LIMIT, ReportPipeline, format_report, split_message};

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("webhook returned HTTP {0}")]
    Status(u16),
}

/// Somewhere a finished report is delivered.
#[async_trait]
pub trait ReportSink: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(&self, text: &str) -> Result<(), SinkError>;
}

/// Writes reports to the log.
pub struct LogSink;

#[async_trait]
impl ReportSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, text: &str) -> Result<(), SinkError> {
        info!(target: "taxi_forecast::report", "\n{text}");
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookMessage<'a> {
    text: &'a str,
}

/// Posts reports as `{"text": ...}` to a webhook, one request per message
/// part.
pub struct WebhookSink {
    url: String,
    http: reqwest::Client,
    limit: usize,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            http,
            limit: DEFAULT_MESSAGE_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

#[async_trait]
impl ReportSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn deliver(&self, text: &str) -> Result<(), SinkError> {
        for part in split_message(text, self.limit) {
            let response = self
                .http
                .post(&self.url)
                .json(&WebhookMessage { text: &part })
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(SinkError::Status(response.status().as_u16()));
            }
        }
        Ok(())
    }
}

/// Build a "now" report and hand it to every sink.
pub async fn run_report(pipeline: &ReportPipeline, sinks: &[Arc<dyn ReportSink>]) {
    let report = pipeline.build_report(ReportMode::Now).await;
    let text = format_report(&report);
    for sink in sinks {
        if let Err(e) = sink.deliver(&text).await {
            warn!(sink = sink.name(), error = %e, "report delivery failed");
        }
    }
}

/// Send a "now" report every `interval_hours`. Zero disables the loop.
///
/// The first report goes out one interval after start-up.
pub fn spawn_auto_report(
    pipeline: ReportPipeline,
    interval_hours: u64,
    sinks: Vec<Arc<dyn ReportSink>>,
) -> Option<JoinHandle<()>> {
    if interval_hours == 0 {
        info!("automatic reports disabled");
        return None;
    }
    let period = Duration::from_secs(interval_hours.saturating_mul(60 * 60));
    info!(interval_hours, sinks = sinks.len(), "automatic reports enabled");

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // First tick is immediate, skip it
        loop {
            interval.tick().await;
            run_report(&pipeline, &sinks).await;
        }
    }))
}

/// Periodically drop expired cache entries.
pub fn spawn_cache_sweeper(cache: Arc<PayloadCache>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = cache.sweep().await;
            if removed > 0 {
                debug!(removed, remaining = cache.entry_count(), "cache swept");
            }
        }
    })
}
