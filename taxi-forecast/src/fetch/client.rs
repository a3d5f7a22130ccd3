//! Retrying fetch client.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, error, warn};

use super::error::FetchError;
use super::transport::Transport;

/// One outbound GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
        }
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Retry and timeout policy for [`FetchClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Never less than one.
    pub max_attempts: u32,

    /// Bound on each individual attempt.
    pub timeout: Duration,

    /// Delay after the first failed attempt.
    pub initial_backoff: Duration,

    /// Ceiling for any single delay.
    pub max_backoff: Duration,

    /// Fraction of the delay added as random jitter, in `[0, 1)`.
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            timeout: Duration::from_secs(10),
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
            jitter_factor: 0.1,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max.max(initial);
        self
    }

    pub fn with_jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = factor.clamp(0.0, 0.99);
        self
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    ///
    /// `jitter` is a sample from `[0, 1)`. Because the jitter factor is below
    /// one, the delay never shrinks from one attempt to the next.
    pub fn backoff(&self, attempt: u32, jitter: f64) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let base = self.initial_backoff.saturating_mul(1 << exponent);
        let jittered = base.mul_f64(1.0 + jitter.clamp(0.0, 1.0) * self.jitter_factor);
        jittered.min(self.max_backoff)
    }
}

/// HTTP client with bounded retries.
///
/// Cheap to clone; the transport is shared.
#[derive(Clone)]
pub struct FetchClient {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl FetchClient {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Perform `request`, retrying transient failures.
    ///
    /// Makes at most `max_attempts` calls to the transport. Non-retryable
    /// errors are returned after the attempt that produced them.
    pub async fn fetch(&self, request: &FetchRequest) -> Result<Bytes, FetchError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let outcome =
                match tokio::time::timeout(self.policy.timeout, self.transport.execute(request))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout),
                };

            let err = match outcome {
                Ok(body) => {
                    debug!(url = %request.url, attempt, bytes = body.len(), "fetch succeeded");
                    return Ok(body);
                }
                Err(err) => err,
            };

            if !err.is_retryable() {
                warn!(url = %request.url, attempt, error = %err, "fetch failed, not retrying");
                return Err(err);
            }

            if attempt >= max_attempts {
                error!(
                    url = %request.url,
                    attempts = attempt,
                    error = %err,
                    "fetch failed, retries exhausted"
                );
                return Err(err);
            }

            let delay = self.policy.backoff(attempt, rand::random::<f64>());
            warn!(
                url = %request.url,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "fetch failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport shared by tests across the crate.

    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    /// A single scripted reply.
    #[derive(Debug, Clone)]
    pub enum Reply {
        Body(Bytes),
        Fail(FetchError),
        /// Never answers; exercises the per-attempt timeout.
        Hang,
    }

    impl Reply {
        pub fn json(value: serde_json::Value) -> Self {
            Reply::Body(Bytes::from(value.to_string()))
        }
    }

    /// Transport that answers from per-URL scripts.
    ///
    /// A URL's last reply repeats once its script runs out. Unscripted URLs
    /// fail with a 404.
    #[derive(Default)]
    pub struct ScriptedTransport {
        scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
        calls: Mutex<Vec<(FetchRequest, tokio::time::Instant)>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn script(self, url: &str, replies: impl IntoIterator<Item = Reply>) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .insert(url.to_string(), replies.into_iter().collect());
            self
        }

        pub fn calls(&self) -> Vec<FetchRequest> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(r, _)| r.clone())
                .collect()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn call_times(&self) -> Vec<tokio::time::Instant> {
            self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn execute(&self, request: &FetchRequest) -> Result<Bytes, FetchError> {
            self.calls
                .lock()
                .unwrap()
                .push((request.clone(), tokio::time::Instant::now()));

            let reply = {
                let mut scripts = self.scripts.lock().unwrap();
                match scripts.get_mut(&request.url) {
                    Some(queue) if queue.len() > 1 => queue.pop_front(),
                    Some(queue) => queue.front().cloned(),
                    None => None,
                }
            };

            match reply {
                Some(Reply::Body(body)) => Ok(body),
                Some(Reply::Fail(err)) => Err(err),
                Some(Reply::Hang) => std::future::pending().await,
                None => Err(FetchError::Http { status: 404 }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{Reply, ScriptedTransport};
    use super::*;

    const URL: &str = "http://upstream.test/board";

    fn client(transport: Arc<ScriptedTransport>, attempts: u32) -> FetchClient {
        let policy = RetryPolicy::default()
            .with_max_attempts(attempts)
            .with_timeout(Duration::from_secs(2))
            .with_backoff(Duration::from_millis(100), Duration::from_secs(1));
        FetchClient::new(transport, policy)
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_first_time() {
        let transport =
            Arc::new(ScriptedTransport::new().script(URL, [Reply::Body(Bytes::from("ok"))]));
        let body = client(transport.clone(), 3)
            .fetch(&FetchRequest::get(URL))
            .await
            .unwrap();

        assert_eq!(body, Bytes::from("ok"));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_then_succeeds() {
        let transport = Arc::new(ScriptedTransport::new().script(
            URL,
            [
                Reply::Fail(FetchError::Http { status: 503 }),
                Reply::Fail(FetchError::Network("reset".into())),
                Reply::Body(Bytes::from("ok")),
            ],
        ));
        let body = client(transport.clone(), 3)
            .fetch(&FetchRequest::get(URL))
            .await
            .unwrap();

        assert_eq!(body, Bytes::from("ok"));
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_failure_stops_at_budget() {
        let transport = Arc::new(
            ScriptedTransport::new().script(URL, [Reply::Fail(FetchError::Http { status: 500 })]),
        );
        let err = client(transport.clone(), 4)
            .fetch(&FetchRequest::get(URL))
            .await
            .unwrap_err();

        assert_eq!(err, FetchError::Http { status: 500 });
        assert_eq!(transport.call_count(), 4);

        // Gaps between attempts never shrink.
        let times = transport.call_times();
        let gaps: Vec<Duration> = times.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(gaps.len(), 3);
        assert!(gaps.windows(2).all(|g| g[1] >= g[0]), "{gaps:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn client_error_fails_fast() {
        let transport = Arc::new(
            ScriptedTransport::new().script(URL, [Reply::Fail(FetchError::Http { status: 404 })]),
        );
        let err = client(transport.clone(), 3)
            .fetch(&FetchRequest::get(URL))
            .await
            .unwrap_err();

        assert_eq!(err, FetchError::Http { status: 404 });
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_attempt_times_out_and_retries() {
        let transport = Arc::new(
            ScriptedTransport::new().script(URL, [Reply::Hang, Reply::Body(Bytes::from("ok"))]),
        );
        let started = tokio::time::Instant::now();
        let body = client(transport.clone(), 3)
            .fetch(&FetchRequest::get(URL))
            .await
            .unwrap();

        assert_eq!(body, Bytes::from("ok"));
        assert_eq!(transport.call_count(), 2);
        // One 2s timeout plus one backoff of at most 110ms.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_millis(2200));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_timeouts_report_timeout() {
        let transport = Arc::new(ScriptedTransport::new().script(URL, [Reply::Hang]));
        let err = client(transport.clone(), 2)
            .fetch(&FetchRequest::get(URL))
            .await
            .unwrap_err();

        assert_eq!(err, FetchError::Timeout);
        assert_eq!(transport.call_count(), 2);
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RetryPolicy::default()
            .with_backoff(Duration::from_millis(500), Duration::from_secs(3))
            .with_jitter_factor(0.0);

        assert_eq!(policy.backoff(1, 0.5), Duration::from_millis(500));
        assert_eq!(policy.backoff(2, 0.5), Duration::from_millis(1000));
        assert_eq!(policy.backoff(3, 0.5), Duration::from_millis(2000));
        assert_eq!(policy.backoff(4, 0.5), Duration::from_secs(3));
        assert_eq!(policy.backoff(40, 0.5), Duration::from_secs(3));
    }

    #[test]
    fn max_attempts_is_at_least_one() {
        assert_eq!(RetryPolicy::default().with_max_attempts(0).max_attempts, 1);
    }

    #[test]
    fn request_builder() {
        let req = FetchRequest::get(URL)
            .with_query("Day", "2026-10-14")
            .with_header("Origin", "https://example.test");
        assert_eq!(req.query, vec![("Day".into(), "2026-10-14".into())]);
        assert_eq!(req.headers.len(), 1);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn backoff_is_non_decreasing(
            initial_ms in 1u64..2_000,
            cap_ms in 1u64..20_000,
            factor in 0.0f64..0.99,
            attempt in 1u32..20,
            j1 in 0.0f64..1.0,
            j2 in 0.0f64..1.0,
        ) {
            let policy = RetryPolicy::default()
                .with_backoff(Duration::from_millis(initial_ms), Duration::from_millis(cap_ms))
                .with_jitter_factor(factor);

            let this = policy.backoff(attempt, j1);
            let next = policy.backoff(attempt + 1, j2);
            prop_assert!(next >= this);
            prop_assert!(next <= policy.max_backoff);
        }
    }
}
