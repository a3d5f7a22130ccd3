//! Source-level failure types.

use crate::domain::Upstream;
use crate::fetch::FetchError;

/// Why a source produced no data for a report.
///
/// Every variant means "unavailable"; none of them carries partial data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnavailableReason {
    /// The upstream could not be reached after all retries.
    #[error("{upstream} fetch failed: {error}")]
    Fetch {
        upstream: Upstream,
        error: FetchError,
    },

    /// The upstream answered with something that is not its schema.
    #[error("{upstream} returned a malformed response: {message}")]
    Malformed { upstream: Upstream, message: String },

    /// The upstream needs configuration that is missing.
    #[error("{upstream} is not configured: {message}")]
    NotConfigured { upstream: Upstream, message: String },

    /// Both the live upstream and its fallback failed.
    #[error("live source unavailable ({live}); fallback unavailable ({fallback})")]
    FallbackExhausted {
        live: Box<UnavailableReason>,
        fallback: Box<UnavailableReason>,
    },

    /// The source did not answer before the report deadline.
    #[error("no answer within the report deadline")]
    DeadlineExceeded,

    /// The adapter task died.
    #[error("source task failed: {0}")]
    TaskFailed(String),
}

impl UnavailableReason {
    /// Map a fetch failure at `upstream`.
    pub fn from_fetch(upstream: Upstream, error: FetchError) -> Self {
        match error {
            FetchError::Malformed(message) => UnavailableReason::Malformed { upstream, message },
            error => UnavailableReason::Fetch { upstream, error },
        }
    }
}

/// Why a single upstream record was dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid time {value:?} in {field}")]
    InvalidTime { field: &'static str, value: String },

    #[error("invalid record: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_fetch_maps_to_malformed() {
        let reason =
            UnavailableReason::from_fetch(Upstream::AirportBoard, FetchError::malformed("eof"));
        assert!(matches!(reason, UnavailableReason::Malformed { .. }));

        let reason = UnavailableReason::from_fetch(Upstream::HafasBoard, FetchError::Timeout);
        assert_eq!(reason.to_string(), "hafas-board fetch failed: request timed out");
    }

    #[test]
    fn fallback_exhausted_names_both() {
        let reason = UnavailableReason::FallbackExhausted {
            live: Box::new(UnavailableReason::NotConfigured {
                upstream: Upstream::HafasBoard,
                message: "no access id".into(),
            }),
            fallback: Box::new(UnavailableReason::from_fetch(
                Upstream::GtfsDataset,
                FetchError::Http { status: 503 },
            )),
        };
        let text = reason.to_string();
        assert!(text.contains("hafas-board is not configured"));
        assert!(text.contains("gtfs-dataset fetch failed: HTTP status 503"));
    }
}
