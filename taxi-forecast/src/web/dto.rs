//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::analysis::{DemandPeak, TimeBlock};
use crate::domain::{Arrival, ReportMode, SourceKind, Upstream};
use crate::report::{Report, SourceSection};

/// Body of `POST /command`.
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub text: String,
}

/// Reply to a command: one or more message parts.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub messages: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// JSON form of a report.
#[derive(Debug, Serialize)]
pub struct ReportDto {
    pub mode: ReportMode,
    pub generated_at: String,
    pub window_start: String,
    pub window_end: String,
    pub degraded: bool,
    pub flights: SectionDto,
    pub trains: SectionDto,
    pub combined_peak: Option<PeakDto>,
    pub time_blocks: Option<Vec<BlockDto>>,
    pub recommendation: String,
    pub next_flight: Option<ArrivalDto>,
    pub next_train: Option<ArrivalDto>,
    pub next_tgv: Option<ArrivalDto>,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SectionDto {
    pub kind: SourceKind,
    pub available: bool,

    /// Why the source is unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    pub arrivals: Vec<ArrivalDto>,
    pub peak: Option<PeakDto>,
}

#[derive(Debug, Serialize)]
pub struct ArrivalDto {
    pub time: String,
    pub scheduled: String,
    pub identifier: String,
    pub origin: String,
    pub delay_minutes: Option<i64>,
    pub upstream: Upstream,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PeakDto {
    pub start: String,
    pub end: String,
    pub count: usize,
    pub dominant: SourceKind,
}

#[derive(Debug, Serialize)]
pub struct BlockDto {
    pub name: String,
    pub start_hour: u32,
    pub end_hour: u32,
    pub flights: usize,
    pub trains: usize,
}

impl ArrivalDto {
    fn from_arrival(a: &Arrival) -> Self {
        Self {
            time: a.timestamp.to_rfc3339(),
            scheduled: a.scheduled.to_rfc3339(),
            identifier: a.identifier.clone(),
            origin: a.origin.clone(),
            delay_minutes: a.delay_minutes(),
            upstream: a.upstream,
            status: a.status.clone(),
        }
    }
}

impl PeakDto {
    fn from_peak(p: &DemandPeak) -> Self {
        Self {
            start: p.slot_start.to_rfc3339(),
            end: p.slot_end().to_rfc3339(),
            count: p.count,
            dominant: p.dominant,
        }
    }
}

impl BlockDto {
    fn from_block(b: &TimeBlock) -> Self {
        Self {
            name: b.name.to_string(),
            start_hour: b.start_hour,
            end_hour: b.end_hour,
            flights: b.count_of(SourceKind::Flight),
            trains: b.count_of(SourceKind::Train),
        }
    }
}

impl SectionDto {
    fn from_section(s: &SourceSection) -> Self {
        Self {
            kind: s.kind,
            available: s.is_available(),
            reason: s.result.reason().map(ToString::to_string),
            arrivals: s.arrivals().iter().map(ArrivalDto::from_arrival).collect(),
            peak: s.peak.as_ref().map(PeakDto::from_peak),
        }
    }
}

impl ReportDto {
    pub fn from_report(report: &Report, text: String) -> Self {
        Self {
            mode: report.mode,
            generated_at: report.generated_at.to_rfc3339(),
            window_start: report.window.start.to_rfc3339(),
            window_end: report.window.end.to_rfc3339(),
            degraded: report.degraded,
            flights: SectionDto::from_section(&report.flights),
            trains: SectionDto::from_section(&report.trains),
            combined_peak: report.combined_peak.as_ref().map(PeakDto::from_peak),
            time_blocks: report
                .time_blocks
                .as_ref()
                .map(|blocks| blocks.iter().map(BlockDto::from_block).collect()),
            recommendation: report.recommendation.to_string(),
            next_flight: report.next_flight.as_ref().map(ArrivalDto::from_arrival),
            next_train: report.next_train.as_ref().map(ArrivalDto::from_arrival),
            next_tgv: report.next_tgv.as_ref().map(ArrivalDto::from_arrival),
            text,
        }
    }
}
