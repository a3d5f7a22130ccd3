//! Positioning and shift recommendations.
//!
//! A recommendation only ever names a location whose source answered.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Duration};
use chrono_tz::Tz;

use crate::domain::SourceKind;

use super::blocks::TimeBlock;
use super::peaks::DemandPeak;

/// What the analyzer knows about one source's peak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PeakState<'a> {
    Unavailable,
    /// Reachable, but nothing due. Carries the first arrival after the
    /// window when the source knows one.
    Quiet(Option<DateTime<Tz>>),
    Peak(&'a DemandPeak),
}

/// An available source with nothing due in the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuietSource {
    pub kind: SourceKind,
    pub next: Option<DateTime<Tz>>,
}

impl fmt::Display for QuietSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.next {
            Some(next) => write!(
                f,
                "first {} at {}",
                self.kind.noun(1),
                next.format("%H:%M")
            ),
            None => write!(f, "no {} due", self.kind),
        }
    }
}

/// A location paired with the peak that justifies going there.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakTarget {
    pub kind: SourceKind,
    pub peak: DemandPeak,
}

impl PeakTarget {
    fn describe(&self) -> String {
        format!(
            "{} ({} {})",
            self.peak.label(),
            self.peak.count,
            self.kind.noun(self.peak.count)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Recommendation {
    /// Nothing to base a recommendation on.
    InsufficientData,

    /// Where to wait in the next few hours.
    Position {
        first: PeakTarget,
        /// Set when the other location peaks clearly later.
        then: Option<PeakTarget>,
        /// An available source with nothing due.
        quiet: Option<QuietSource>,
    },

    /// Nothing due anywhere in the window, but later arrivals are known.
    Later(Vec<QuietSource>),

    /// Which part of tomorrow to work.
    Shift {
        block: String,
        count: usize,
        lead: SourceKind,
        lead_count: usize,
    },
}

impl Recommendation {
    pub fn is_insufficient(&self) -> bool {
        matches!(self, Recommendation::InsufficientData)
    }

    /// Locations this recommendation sends drivers to.
    pub fn locations(&self) -> Vec<SourceKind> {
        match self {
            Recommendation::InsufficientData | Recommendation::Later(_) => Vec::new(),
            Recommendation::Position { first, then, .. } => {
                std::iter::once(first.kind).chain(then.iter().map(|t| t.kind)).collect()
            }
            Recommendation::Shift { lead, .. } => vec![*lead],
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::InsufficientData => {
                f.write_str("Insufficient data for a recommendation.")
            }
            Recommendation::Position {
                first,
                then: Some(then),
                ..
            } => write!(
                f,
                "Start at {} for the {} peak, then move to {} for {}.",
                first.kind.location(),
                first.describe(),
                then.kind.location(),
                then.describe()
            ),
            Recommendation::Position {
                first,
                then: None,
                quiet,
            } => {
                write!(
                    f,
                    "Position at {} for the {} peak.",
                    first.kind.location(),
                    first.describe()
                )?;
                match quiet {
                    Some(QuietSource {
                        kind,
                        next: Some(next),
                    }) => write!(
                        f,
                        " No {kind} due in this window; first {} at {}.",
                        kind.noun(1),
                        next.format("%H:%M")
                    ),
                    Some(QuietSource { kind, next: None }) => {
                        write!(f, " No {kind} due in this window.")
                    }
                    None => Ok(()),
                }
            }
            Recommendation::Later(upcoming) => {
                let hints: Vec<String> = upcoming.iter().map(ToString::to_string).collect();
                write!(f, "No arrivals in this window; {}.", hints.join(", "))
            }
            Recommendation::Shift {
                block,
                count,
                lead,
                lead_count,
            } => write!(
                f,
                "Cover the {block} block: {count} arrivals, busiest at {} ({lead_count} {}).",
                lead.location(),
                lead.noun(*lead_count)
            ),
        }
    }
}

fn target(kind: SourceKind, peak: &DemandPeak) -> PeakTarget {
    PeakTarget {
        kind,
        peak: peak.clone(),
    }
}

/// Recommendation for the look-ahead report.
///
/// If one peak starts more than `lead_threshold` before the other, drivers
/// go there first and then move. Otherwise the larger peak wins (earlier
/// slot, then flights, on a tie).
pub fn recommend_now(
    flights: PeakState<'_>,
    trains: PeakState<'_>,
    lead_threshold: Duration,
) -> Recommendation {
    match (flights, trains) {
        (PeakState::Peak(f), PeakState::Peak(t)) => {
            let (fl, tr) = (target(SourceKind::Flight, f), target(SourceKind::Train, t));
            if f.slot_start + lead_threshold < t.slot_start {
                Recommendation::Position {
                    first: fl,
                    then: Some(tr),
                    quiet: None,
                }
            } else if t.slot_start + lead_threshold < f.slot_start {
                Recommendation::Position {
                    first: tr,
                    then: Some(fl),
                    quiet: None,
                }
            } else {
                let flights_win = match f.count.cmp(&t.count) {
                    Ordering::Greater => true,
                    Ordering::Less => false,
                    Ordering::Equal => f.slot_start <= t.slot_start,
                };
                Recommendation::Position {
                    first: if flights_win { fl } else { tr },
                    then: None,
                    quiet: None,
                }
            }
        }
        (PeakState::Peak(f), other) => single(target(SourceKind::Flight, f), other),
        (other, PeakState::Peak(t)) => single(target(SourceKind::Train, t), other),
        (flights, trains) => {
            let upcoming: Vec<QuietSource> =
                [(SourceKind::Flight, flights), (SourceKind::Train, trains)]
                    .into_iter()
                    .filter_map(|(kind, state)| match state {
                        PeakState::Quiet(next @ Some(_)) => Some(QuietSource { kind, next }),
                        _ => None,
                    })
                    .collect();
            if upcoming.is_empty() {
                Recommendation::InsufficientData
            } else {
                Recommendation::Later(upcoming)
            }
        }
    }
}

fn single(first: PeakTarget, other: PeakState<'_>) -> Recommendation {
    let quiet = match other {
        PeakState::Quiet(next) => Some(QuietSource {
            kind: first.kind.other(),
            next,
        }),
        _ => None,
    };
    Recommendation::Position {
        first,
        then: None,
        quiet,
    }
}

/// Recommendation for the day-ahead report: the block with the most
/// arrivals (earliest on a tie) and the busier location inside it.
///
/// Only kinds listed in `available` are considered.
pub fn recommend_tomorrow(blocks: &[TimeBlock], available: &[SourceKind]) -> Recommendation {
    if available.is_empty() {
        return Recommendation::InsufficientData;
    }

    let count_in = |block: &TimeBlock| -> usize {
        available.iter().map(|kind| block.count_of(*kind)).sum()
    };

    let mut busiest: Option<(&TimeBlock, usize)> = None;
    for block in blocks {
        let count = count_in(block);
        if busiest.is_none_or(|(_, best)| count > best) {
            busiest = Some((block, count));
        }
    }

    let Some((block, count)) = busiest.filter(|(_, count)| *count > 0) else {
        return Recommendation::InsufficientData;
    };

    let earliest_kind = block
        .arrivals
        .iter()
        .filter(|a| available.contains(&a.kind))
        .min_by_key(|a| a.timestamp)
        .map(|a| a.kind);

    let (lead, lead_count) = available
        .iter()
        .map(|kind| (*kind, block.count_of(*kind)))
        .max_by(|(ka, ca), (kb, cb)| {
            ca.cmp(cb).then_with(|| {
                // On equal counts prefer the kind that arrives first.
                match (Some(*ka) == earliest_kind, Some(*kb) == earliest_kind) {
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    _ => Ordering::Equal,
                }
            })
        })
        .unwrap_or((SourceKind::Flight, 0));

    Recommendation::Shift {
        block: block.label(),
        count,
        lead,
        lead_count,
    }
}
