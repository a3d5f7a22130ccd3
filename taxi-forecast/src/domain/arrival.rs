//! Arrival records shared by every source.

use std::fmt;

use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use serde::Serialize;

/// Which kind of transport an arrival belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Flight,
    Train,
}

impl SourceKind {
    /// Where a driver waits for this kind of arrival.
    pub fn location(self) -> &'static str {
        match self {
            SourceKind::Flight => "Airport",
            SourceKind::Train => "Gare Centrale",
        }
    }

    /// Section heading used in reports.
    pub fn heading(self) -> &'static str {
        match self {
            SourceKind::Flight => "Flights",
            SourceKind::Train => "Trains",
        }
    }

    /// Counted noun, e.g. "1 flight" / "3 flights".
    pub fn noun(self, count: usize) -> &'static str {
        match (self, count) {
            (SourceKind::Flight, 1) => "flight",
            (SourceKind::Flight, _) => "flights",
            (SourceKind::Train, 1) => "train",
            (SourceKind::Train, _) => "trains",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            SourceKind::Flight => "✈️",
            SourceKind::Train => "🚆",
        }
    }

    /// The other source.
    pub fn other(self) -> SourceKind {
        match self {
            SourceKind::Flight => SourceKind::Train,
            SourceKind::Train => SourceKind::Flight,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Flight => f.write_str("flights"),
            SourceKind::Train => f.write_str("trains"),
        }
    }
}

/// A concrete upstream API that feeds one of the sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Upstream {
    /// Airport arrivals board.
    AirportBoard,
    /// Live HAFAS arrival board for Gare Centrale.
    HafasBoard,
    /// Dataset listing that points at the current GTFS archive.
    GtfsDataset,
    /// Static GTFS timetable archive.
    GtfsTimetable,
}

impl Upstream {
    pub fn as_str(self) -> &'static str {
        match self {
            Upstream::AirportBoard => "airport-board",
            Upstream::HafasBoard => "hafas-board",
            Upstream::GtfsDataset => "gtfs-dataset",
            Upstream::GtfsTimetable => "gtfs-timetable",
        }
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single flight or train arriving in the city.
///
/// `timestamp` is the expected arrival (scheduled time plus any reported
/// delay) in the configured local timezone. Adapters only hand out arrivals
/// whose timestamp lies inside the report window.
#[derive(Debug, Clone, PartialEq)]
pub struct Arrival {
    pub kind: SourceKind,

    /// Expected arrival time.
    pub timestamp: DateTime<Tz>,

    /// Timetabled arrival time.
    pub scheduled: DateTime<Tz>,

    /// Flight callsign (e.g. "LG8004") or train number (e.g. "TGV 2851").
    pub identifier: String,

    /// Origin airport or station.
    pub origin: String,

    /// Positive when late, negative when early, `None` when not reported.
    pub delay: Option<Duration>,

    /// Which upstream produced this record.
    pub upstream: Upstream,

    /// Raw upstream status code, if any.
    pub status: Option<String>,
}

impl Arrival {
    /// Create an on-schedule arrival.
    pub fn new(
        kind: SourceKind,
        upstream: Upstream,
        scheduled: DateTime<Tz>,
        identifier: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            timestamp: scheduled,
            scheduled,
            identifier: identifier.into(),
            origin: origin.into(),
            delay: None,
            upstream,
            status: None,
        }
    }

    /// Apply a reported delay, moving the expected timestamp accordingly.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.timestamp = self.scheduled + delay;
        self.delay = Some(delay);
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        let status = status.into();
        self.status = (!status.is_empty()).then_some(status);
        self
    }

    /// Delay in whole minutes, when one is reported and non-zero.
    pub fn delay_minutes(&self) -> Option<i64> {
        self.delay.map(|d| d.num_minutes()).filter(|m| *m != 0)
    }
}
