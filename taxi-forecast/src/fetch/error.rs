//! Fetch error types.

/// Why a single fetch (all attempts included) failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The attempt did not finish within the per-attempt timeout.
    #[error("request timed out")]
    Timeout,

    /// The upstream answered with a non-success status.
    #[error("HTTP status {status}")]
    Http { status: u16 },

    /// Connection-level failure (DNS, TLS, reset, ...).
    #[error("network error: {0}")]
    Network(String),

    /// A response arrived but could not be understood.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Whether another attempt might succeed.
    ///
    /// Timeouts, network failures and 5xx responses are transient. Client
    /// errors and undecodable bodies are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout | FetchError::Network(_) => true,
            FetchError::Http { status } => (500..600).contains(status),
            FetchError::Malformed(_) => false,
        }
    }

    /// Wrap a decode failure.
    pub fn malformed(err: impl std::fmt::Display) -> Self {
        FetchError::Malformed(err.to_string())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = err.status() {
            FetchError::Http {
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            FetchError::Malformed(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(FetchError::Timeout.is_retryable());
        assert!(FetchError::Network("reset".into()).is_retryable());
        assert!(FetchError::Http { status: 500 }.is_retryable());
        assert!(FetchError::Http { status: 503 }.is_retryable());

        assert!(!FetchError::Http { status: 404 }.is_retryable());
        assert!(!FetchError::Http { status: 429 }.is_retryable());
        assert!(!FetchError::Malformed("bad json".into()).is_retryable());
    }

    #[test]
    fn error_display() {
        assert_eq!(FetchError::Timeout.to_string(), "request timed out");
        assert_eq!(
            FetchError::Http { status: 502 }.to_string(),
            "HTTP status 502"
        );
        assert!(
            FetchError::malformed("expected value")
                .to_string()
                .contains("expected value")
        );
    }
}
