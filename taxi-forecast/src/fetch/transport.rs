//! The network seam.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use super::client::FetchRequest;
use super::error::FetchError;

/// Something that can perform one HTTP GET and hand back the body.
///
/// Implementations perform exactly one attempt; retries and timeouts live
/// in [`FetchClient`](super::FetchClient).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &FetchRequest) -> Result<Bytes, FetchError>;
}

/// Configuration for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Hard ceiling on a single request, as a backstop to the client's
    /// per-attempt timeout.
    pub timeout: Duration,

    /// Skip TLS certificate verification. Some public transport endpoints
    /// have served broken chains in the past.
    pub accept_invalid_certs: bool,

    pub user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            accept_invalid_certs: false,
            user_agent: concat!("taxi-forecast/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpTransportConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &HttpTransportConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self { http })
    }

    /// The underlying client, for callers that need more than GET.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &FetchRequest) -> Result<Bytes, FetchError> {
        let mut builder = self.http.get(&request.url).query(&request.query);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().await?)
    }
}
