//! Demand analysis over a report's arrivals.
//!
//! Everything here is pure: inputs are the source results and the window,
//! and no clock is read.

mod blocks;
mod config;
mod peaks;
mod recommend;

use crate::domain::{Arrival, ReportMode, ReportWindow, SourceKind};
use crate::sources::SourceResult;

pub use blocks::{BLOCK_NAMES, InvalidLayout, TimeBlock, TimeBlockLayout, group_into_blocks};
pub use config::AnalysisConfig;
pub use peaks::{DemandPeak, detect_peak};
pub use recommend::{
    PeakState, PeakTarget, QuietSource, Recommendation, recommend_now, recommend_tomorrow,
};

/// Derived signals for one report.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub flight_peak: Option<DemandPeak>,
    pub train_peak: Option<DemandPeak>,
    /// Peak over both sources together.
    pub combined_peak: Option<DemandPeak>,
    /// Day-ahead reports only.
    pub time_blocks: Option<Vec<TimeBlock>>,
    pub recommendation: Recommendation,
}

fn state<'a>(result: &SourceResult, peak: Option<&'a DemandPeak>) -> PeakState<'a> {
    match (result.is_available(), peak) {
        (false, _) => PeakState::Unavailable,
        (true, None) => PeakState::Quiet(result.next().map(|a| a.timestamp)),
        (true, Some(peak)) => PeakState::Peak(peak),
    }
}

/// Analyze the results of both sources for `window`.
pub fn analyze(
    window: &ReportWindow,
    flights: &SourceResult,
    trains: &SourceResult,
    config: &AnalysisConfig,
) -> Analysis {
    let slot = config.slot();
    let flight_arrivals = flights.arrivals().unwrap_or_default();
    let train_arrivals = trains.arrivals().unwrap_or_default();

    let flight_peak = detect_peak(flight_arrivals, window.start, slot);
    let train_peak = detect_peak(train_arrivals, window.start, slot);

    let mut merged: Vec<Arrival> = flight_arrivals
        .iter()
        .chain(train_arrivals)
        .cloned()
        .collect();
    merged.sort_by_key(|a| a.timestamp);
    let combined_peak = detect_peak(&merged, window.start, slot);

    let (time_blocks, recommendation) = match window.mode {
        ReportMode::Now => (
            None,
            recommend_now(
                state(flights, flight_peak.as_ref()),
                state(trains, train_peak.as_ref()),
                config.lead_threshold(),
            ),
        ),
        ReportMode::Tomorrow => {
            let blocks = group_into_blocks(&merged, &config.blocks);
            let available: Vec<SourceKind> = [(SourceKind::Flight, flights), (SourceKind::Train, trains)]
                .into_iter()
                .filter(|(_, result)| result.is_available())
                .map(|(kind, _)| kind)
                .collect();
            let recommendation = recommend_tomorrow(&blocks, &available);
            (Some(blocks), recommendation)
        }
    };

    Analysis {
        flight_peak,
        train_peak,
        combined_peak,
        time_blocks,
        recommendation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Upstream;
    use crate::fetch::FetchError;
    use crate::sources::UnavailableReason;
    use chrono::{Duration, TimeZone};
    use chrono_tz::Europe::Luxembourg;

    fn arrival(kind: SourceKind, d: u32, h: u32, m: u32) -> Arrival {
        Arrival::new(
            kind,
            Upstream::AirportBoard,
            Luxembourg.with_ymd_and_hms(2026, 10, d, h, m, 0).unwrap(),
            "X",
            "Y",
        )
    }

    fn down() -> SourceResult {
        SourceResult::Unavailable(UnavailableReason::from_fetch(
            Upstream::AirportBoard,
            FetchError::Timeout,
        ))
    }

    #[test]
    fn unavailable_source_has_no_peak() {
        let now = Luxembourg.with_ymd_and_hms(2026, 10, 14, 10, 0, 0).unwrap();
        let window = ReportWindow::now(now, Duration::hours(3));
        let trains = SourceResult::available(vec![
            arrival(SourceKind::Train, 14, 10, 10),
            arrival(SourceKind::Train, 14, 10, 20),
        ]);

        let analysis = analyze(&window, &down(), &trains, &AnalysisConfig::default());

        assert_eq!(analysis.flight_peak, None);
        assert_eq!(analysis.train_peak.as_ref().map(|p| p.count), Some(2));
        assert_eq!(analysis.combined_peak, analysis.train_peak);
        assert!(analysis.time_blocks.is_none());
        assert_eq!(analysis.recommendation.locations(), [SourceKind::Train]);
    }

    #[test]
    fn tomorrow_groups_blocks() {
        let now = Luxembourg.with_ymd_and_hms(2026, 10, 14, 10, 0, 0).unwrap();
        let window = ReportWindow::tomorrow(now);
        let flights = SourceResult::available(vec![arrival(SourceKind::Flight, 15, 7, 0)]);
        let trains = SourceResult::available(vec![
            arrival(SourceKind::Train, 15, 5, 59),
            arrival(SourceKind::Train, 15, 6, 0),
            arrival(SourceKind::Train, 15, 11, 59),
        ]);

        let analysis = analyze(&window, &flights, &trains, &AnalysisConfig::default());
        let blocks = analysis.time_blocks.unwrap();
        let counts: Vec<usize> = blocks.iter().map(TimeBlock::count).collect();
        assert_eq!(counts, [1, 3, 0, 0, 0]);
        assert!(matches!(
            analysis.recommendation,
            Recommendation::Shift { lead: SourceKind::Train, .. }
        ));
    }

    #[test]
    fn both_unavailable_is_insufficient() {
        let now = Luxembourg.with_ymd_and_hms(2026, 10, 14, 10, 0, 0).unwrap();
        for window in [
            ReportWindow::now(now, Duration::hours(3)),
            ReportWindow::tomorrow(now),
        ] {
            let analysis = analyze(&window, &down(), &down(), &AnalysisConfig::default());
            assert!(analysis.recommendation.is_insufficient());
            assert_eq!(analysis.combined_peak, None);
        }
    }
}
