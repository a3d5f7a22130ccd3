//! Reports: what the pipeline hands to formatters and transports.

mod format;
mod pipeline;


use chrono::DateTime;
use chrono_tz::Tz;

use crate::analysis::{AnalysisConfig, DemandPeak, Recommendation, TimeBlock, analyze};
use crate::domain::{Arrival, ReportMode, ReportWindow, SourceKind};
use crate::sources::SourceResult;

pub use format::{
    DEFAULT_MESSAGE_LIMIT, NO_DATA_SENTENCE, UNAVAILABLE_SENTENCE, format_report, split_message,
};
pub use pipeline::ReportPipeline;

/// One source's part of a report.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSection {
    pub kind: SourceKind,
    pub result: SourceResult,
    /// Absent when unavailable or when nothing is due.
    pub peak: Option<DemandPeak>,
}

impl SourceSection {
    pub fn is_available(&self) -> bool {
        self.result.is_available()
    }

    pub fn arrivals(&self) -> &[Arrival] {
        self.result.arrivals().unwrap_or_default()
    }
}

/// A finished report. Built fresh per run and discarded after delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub mode: ReportMode,
    pub generated_at: DateTime<Tz>,
    pub window: ReportWindow,
    pub flights: SourceSection,
    pub trains: SourceSection,
    pub combined_peak: Option<DemandPeak>,
    pub time_blocks: Option<Vec<TimeBlock>>,
    pub recommendation: Recommendation,
    /// First flight after the window, for a look-ahead report whose
    /// available flight source has nothing due.
    pub next_flight: Option<Arrival>,
    /// Same as `next_flight`, for trains.
    pub next_train: Option<Arrival>,
    /// Earliest TGV at Gare Centrale today or tomorrow.
    pub next_tgv: Option<Arrival>,
    /// At least one source was unavailable.
    pub degraded: bool,
}

/// First arrival after a look-ahead window that has none inside it.
fn next_after(window: &ReportWindow, result: &SourceResult) -> Option<Arrival> {
    let empty = result.arrivals().is_some_and(<[Arrival]>::is_empty);
    (window.mode == ReportMode::Now && empty)
        .then(|| result.next().cloned())
        .flatten()
}

impl Report {
    /// Analyze both results and put the report together.
    pub fn assemble(
        window: ReportWindow,
        flights: SourceResult,
        trains: SourceResult,
        config: &AnalysisConfig,
    ) -> Self {
        let analysis = analyze(&window, &flights, &trains, config);
        let degraded = !flights.is_available() || !trains.is_available();
        let next_flight = next_after(&window, &flights);
        let next_train = next_after(&window, &trains);

        Self {
            mode: window.mode,
            generated_at: window.generated_at,
            flights: SourceSection {
                kind: SourceKind::Flight,
                result: flights,
                peak: analysis.flight_peak,
            },
            trains: SourceSection {
                kind: SourceKind::Train,
                result: trains,
                peak: analysis.train_peak,
            },
            window,
            combined_peak: analysis.combined_peak,
            time_blocks: analysis.time_blocks,
            recommendation: analysis.recommendation,
            next_flight,
            next_train,
            next_tgv: None,
            degraded,
        }
    }

    pub fn with_next_tgv(mut self, tgv: Option<Arrival>) -> Self {
        self.next_tgv = tgv;
        self
    }

    /// The next-arrival hint for `kind`, if any.
    pub fn next_of(&self, kind: SourceKind) -> Option<&Arrival> {
        match kind {
            SourceKind::Flight => self.next_flight.as_ref(),
            SourceKind::Train => self.next_train.as_ref(),
        }
    }

    pub fn sections(&self) -> [&SourceSection; 2] {
        [&self.flights, &self.trains]
    }

    pub fn all_unavailable(&self) -> bool {
        self.sections().iter().all(|s| !s.is_available())
    }

    pub fn window_description(&self) -> String {
        self.window.description()
    }

    pub fn total_arrivals(&self) -> usize {
        self.sections().iter().map(|s| s.arrivals().len()).sum()
    }
}
