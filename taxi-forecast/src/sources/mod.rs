//! Source adapters.
//!
//! Each adapter turns one or more upstream APIs into a [`SourceResult`]:
//! either the real arrivals inside the report window (possibly none), or a
//! definite [`SourceResult::Unavailable`]. Adapters never invent data and
//! never fall back to anything the cache no longer considers fresh.

mod error;
pub mod flights;
pub mod trains;

use async_trait::async_trait;

use crate::domain::{Arrival, ReportWindow, SourceKind};

pub use error::{RecordError, UnavailableReason};
pub use flights::{FlightAdapter, FlightConfig};
pub use trains::{
    GtfsAdapter, GtfsConfig, HafasAdapter, HafasConfig, TrainAdapter, is_tgv, next_tgv,
};

/// Outcome of asking one source for arrivals.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceResult {
    /// The source answered. No arrivals means "reachable, nothing due".
    Available {
        /// Arrivals inside the window, in time order.
        arrivals: Vec<Arrival>,
        /// First fetched arrival after the window closes.
        next: Option<Arrival>,
    },

    Unavailable(UnavailableReason),
}

impl SourceResult {
    /// Available with exactly `arrivals` and nothing known beyond them.
    pub fn available(arrivals: Vec<Arrival>) -> Self {
        SourceResult::Available {
            arrivals,
            next: None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, SourceResult::Available { .. })
    }

    /// Arrivals if available; `None` if not.
    pub fn arrivals(&self) -> Option<&[Arrival]> {
        match self {
            SourceResult::Available { arrivals, .. } => Some(arrivals),
            SourceResult::Unavailable(_) => None,
        }
    }

    pub fn next(&self) -> Option<&Arrival> {
        match self {
            SourceResult::Available { next, .. } => next.as_ref(),
            SourceResult::Unavailable(_) => None,
        }
    }

    pub fn reason(&self) -> Option<&UnavailableReason> {
        match self {
            SourceResult::Available { .. } => None,
            SourceResult::Unavailable(reason) => Some(reason),
        }
    }
}

/// A provider of arrivals for one source kind.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Fetch arrivals inside `window`.
    async fn fetch(&self, window: &ReportWindow) -> SourceResult;
}

/// Keep only arrivals the window admits, in time order, and remember the
/// earliest one after the window.
pub fn admit(window: &ReportWindow, arrivals: impl IntoIterator<Item = Arrival>) -> SourceResult {
    let mut kept: Vec<Arrival> = arrivals.into_iter().collect();
    kept.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.identifier.cmp(&b.identifier))
    });
    let next = kept
        .iter()
        .find(|a| window.is_after(&a.timestamp))
        .cloned();
    kept.retain(|a| window.admits(&a.timestamp));
    SourceResult::Available {
        arrivals: kept,
        next,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Upstream;
    use chrono::{Duration, TimeZone};
    use chrono_tz::Europe::Luxembourg;

    #[test]
    fn admit_drops_past_and_out_of_window_and_sorts() {
        let now = Luxembourg.with_ymd_and_hms(2026, 10, 14, 10, 0, 0).unwrap();
        let window = ReportWindow::now(now, Duration::hours(3));
        let mk = |h, m, id: &str| {
            Arrival::new(
                SourceKind::Train,
                Upstream::HafasBoard,
                Luxembourg.with_ymd_and_hms(2026, 10, 14, h, m, 0).unwrap(),
                id,
                "Metz",
            )
        };

        let kept = admit(
            &window,
            [mk(12, 0, "b"), mk(9, 30, "past"), mk(14, 0, "late"), mk(10, 30, "a")],
        );
        let ids: Vec<&str> = kept
            .arrivals()
            .unwrap()
            .iter()
            .map(|a| a.identifier.as_str())
            .collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(kept.next().map(|a| a.identifier.as_str()), Some("late"));
    }

    #[test]
    fn next_is_the_first_arrival_after_the_window() {
        let now = Luxembourg.with_ymd_and_hms(2026, 10, 14, 10, 0, 0).unwrap();
        let window = ReportWindow::now(now, Duration::hours(3));
        let mk = |h, m, id: &str| {
            Arrival::new(
                SourceKind::Flight,
                Upstream::AirportBoard,
                Luxembourg.with_ymd_and_hms(2026, 10, 14, h, m, 0).unwrap(),
                id,
                "Porto (OPO)",
            )
        };

        // The window end itself is inside a look-ahead window.
        let result = admit(&window, [mk(18, 0, "later"), mk(13, 0, "edge"), mk(15, 30, "next")]);
        assert_eq!(result.arrivals().map(<[Arrival]>::len), Some(1));
        assert_eq!(result.next().map(|a| a.identifier.as_str()), Some("next"));

        let result = admit(&window, [mk(9, 0, "past")]);
        assert_eq!(result.arrivals().map(<[Arrival]>::len), Some(0));
        assert_eq!(result.next(), None);
    }

    #[test]
    fn empty_available_is_not_unavailable() {
        let empty = SourceResult::available(Vec::new());
        assert!(empty.is_available());
        assert_eq!(empty.arrivals().map(<[Arrival]>::len), Some(0));
        assert!(empty.reason().is_none());
    }
}
