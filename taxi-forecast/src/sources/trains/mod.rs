//! Train arrivals at Gare Centrale.
//!
//! The live HAFAS board is preferred. When it is unavailable the static
//! GTFS timetable is used instead; both are real data. Only when both fail
//! is the train source unavailable.

mod gtfs;
mod hafas;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::{Arrival, ReportWindow, SourceKind};

use super::{SourceAdapter, SourceResult, UnavailableReason};

pub use gtfs::{DEFAULT_GTFS_DATASET_URL, DEFAULT_GTFS_STOP_IDS, GtfsAdapter, GtfsConfig};
pub use hafas::{DEFAULT_HAFAS_API_URL, DEFAULT_HAFAS_STATION_ID, HafasAdapter, HafasConfig};

/// Product categories that count as trains. Buses and trams are ignored.
pub const TRAIN_CATEGORIES: &[&str] = &[
    "ICE", "TGV", "IC", "EC", "RE", "RB", "TER", "IR", "CRE", "CRN",
];

pub fn is_train_category(category: &str) -> bool {
    let category = category.trim();
    TRAIN_CATEGORIES
        .iter()
        .any(|c| c.eq_ignore_ascii_case(category))
}

/// Whether `arrival` is a TGV service ("TGV 2813", or just "TGV").
pub fn is_tgv(arrival: &Arrival) -> bool {
    arrival
        .identifier
        .split_whitespace()
        .next()
        .is_some_and(|category| category.eq_ignore_ascii_case("TGV"))
}

/// The earliest TGV in `result`, when the source answered with one.
pub fn next_tgv(result: &SourceResult) -> Option<Arrival> {
    result.arrivals()?.iter().find(|a| is_tgv(a)).cloned()
}

/// Live-first train source with a static fallback.
pub struct TrainAdapter {
    live: Arc<dyn SourceAdapter>,
    fallback: Arc<dyn SourceAdapter>,
}

impl TrainAdapter {
    pub fn new(live: Arc<dyn SourceAdapter>, fallback: Arc<dyn SourceAdapter>) -> Self {
        Self { live, fallback }
    }
}

#[async_trait]
impl SourceAdapter for TrainAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Train
    }

    async fn fetch(&self, window: &ReportWindow) -> SourceResult {
        let live = match self.live.fetch(window).await {
            available @ SourceResult::Available { .. } => return available,
            SourceResult::Unavailable(reason) => reason,
        };

        warn!(source = %SourceKind::Train, reason = %live, "live trains unavailable, using timetable");

        match self.fallback.fetch(window).await {
            available @ SourceResult::Available { .. } => available,
            SourceResult::Unavailable(fallback) => {
                SourceResult::Unavailable(UnavailableReason::FallbackExhausted {
                    live: Box::new(live),
                    fallback: Box::new(fallback),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use chrono::TimeZone;
    use chrono_tz::Europe::Luxembourg;

    use super::*;
    use crate::domain::Upstream;
    use crate::fetch::FetchError;
    use crate::sources::testing::FixedAdapter;

    fn window() -> ReportWindow {
        let now = Luxembourg.with_ymd_and_hms(2026, 10, 14, 10, 0, 0).unwrap();
        ReportWindow::now(now, chrono::Duration::hours(3))
    }

    fn train(upstream: Upstream) -> Arrival {
        Arrival::new(
            SourceKind::Train,
            upstream,
            Luxembourg.with_ymd_and_hms(2026, 10, 14, 11, 0, 0).unwrap(),
            "IC 113",
            "Liège-Guillemins",
        )
    }

    fn down(upstream: Upstream) -> SourceResult {
        SourceResult::Unavailable(UnavailableReason::from_fetch(upstream, FetchError::Timeout))
    }

    #[test]
    fn train_categories() {
        assert!(is_train_category("TGV"));
        assert!(is_train_category(" re "));
        assert!(!is_train_category("BUS"));
        assert!(!is_train_category(""));
    }

    #[test]
    fn next_tgv_is_the_earliest_tgv() {
        let at = |h, id: &str| {
            Arrival::new(
                SourceKind::Train,
                Upstream::HafasBoard,
                Luxembourg.with_ymd_and_hms(2026, 10, 14, h, 0, 0).unwrap(),
                id,
                "Paris Est",
            )
        };
        let result = crate::sources::admit(
            &window(),
            [at(12, "TGV 2815"), at(10, "RE 4"), at(11, "TGV 2813"), at(12, "IC 113")],
        );

        assert_eq!(
            next_tgv(&result).map(|a| a.identifier),
            Some("TGV 2813".to_string())
        );
        assert_eq!(next_tgv(&SourceResult::available(vec![at(11, "RE 4")])), None);
        assert_eq!(next_tgv(&down(Upstream::HafasBoard)), None);
        assert!(is_tgv(&at(11, "tgv")));
        assert!(!is_tgv(&at(11, "TGVX 1")));
    }

    #[tokio::test]
    async fn live_success_skips_fallback() {
        let live = FixedAdapter::new(
            SourceKind::Train,
            SourceResult::available(vec![train(Upstream::HafasBoard)]),
        );
        let fallback = FixedAdapter::new(SourceKind::Train, down(Upstream::GtfsTimetable));
        let fallback_calls = fallback.calls.clone();

        let adapter = TrainAdapter::new(Arc::new(live), Arc::new(fallback));
        let result = adapter.fetch(&window()).await;

        assert_eq!(result.arrivals().unwrap()[0].upstream, Upstream::HafasBoard);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn live_empty_is_still_live() {
        let live = FixedAdapter::new(SourceKind::Train, SourceResult::available(Vec::new()));
        let fallback = FixedAdapter::new(
            SourceKind::Train,
            SourceResult::available(vec![train(Upstream::GtfsTimetable)]),
        );
        let fallback_calls = fallback.calls.clone();

        let adapter = TrainAdapter::new(Arc::new(live), Arc::new(fallback));
        assert_eq!(adapter.fetch(&window()).await, SourceResult::available(Vec::new()));
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn live_failure_uses_fallback() {
        let live = FixedAdapter::new(SourceKind::Train, down(Upstream::HafasBoard));
        let fallback = FixedAdapter::new(
            SourceKind::Train,
            SourceResult::available(vec![train(Upstream::GtfsTimetable)]),
        );

        let adapter = TrainAdapter::new(Arc::new(live), Arc::new(fallback));
        let result = adapter.fetch(&window()).await;
        assert_eq!(result.arrivals().unwrap()[0].upstream, Upstream::GtfsTimetable);
    }

    #[tokio::test]
    async fn both_failing_is_unavailable() {
        let live = FixedAdapter::new(SourceKind::Train, down(Upstream::HafasBoard));
        let fallback = FixedAdapter::new(SourceKind::Train, down(Upstream::GtfsTimetable));

        let adapter = TrainAdapter::new(Arc::new(live), Arc::new(fallback));
        let result = adapter.fetch(&window()).await;
        assert!(matches!(
            result,
            SourceResult::Unavailable(UnavailableReason::FallbackExhausted { .. })
        ));
    }
}
