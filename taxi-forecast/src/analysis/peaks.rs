//! Peak-slot detection.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration};
use chrono_tz::Tz;

use crate::domain::{Arrival, SourceKind};

/// The busiest fixed-width slot of a set of arrivals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemandPeak {
    pub slot_start: DateTime<Tz>,
    pub slot: Duration,
    pub count: usize,
    /// The source with the most arrivals in the slot.
    pub dominant: SourceKind,
}

impl DemandPeak {
    pub fn slot_end(&self) -> DateTime<Tz> {
        self.slot_start + self.slot
    }

    /// "10:30–11:00".
    pub fn label(&self) -> String {
        format!(
            "{}–{}",
            self.slot_start.format("%H:%M"),
            self.slot_end().format("%H:%M")
        )
    }
}

#[derive(Default)]
struct Slot<'a> {
    count: usize,
    flights: usize,
    trains: usize,
    earliest: Option<&'a Arrival>,
}

/// Find the slot with the most arrivals.
///
/// Slots are `slot` wide and aligned to `anchor`. The strictly largest
/// count wins; among equal counts the earliest slot wins. Within the slot,
/// the dominant kind is the more frequent one, or the kind of the earliest
/// arrival on a tie. Returns `None` for no arrivals.
pub fn detect_peak(arrivals: &[Arrival], anchor: DateTime<Tz>, slot: Duration) -> Option<DemandPeak> {
    let width = slot.num_seconds().max(1);
    let mut slots: BTreeMap<i64, Slot<'_>> = BTreeMap::new();

    for arrival in arrivals {
        let offset = (arrival.timestamp - anchor).num_seconds();
        let entry = slots.entry(offset.div_euclid(width)).or_default();
        entry.count += 1;
        match arrival.kind {
            SourceKind::Flight => entry.flights += 1,
            SourceKind::Train => entry.trains += 1,
        }
        if entry.earliest.is_none_or(|e| arrival.timestamp < e.timestamp) {
            entry.earliest = Some(arrival);
        }
    }

    let mut best: Option<(i64, &Slot<'_>)> = None;
    for (index, slot) in &slots {
        if best.is_none_or(|(_, b)| slot.count > b.count) {
            best = Some((*index, slot));
        }
    }

    let (index, winner) = best?;
    let dominant = match winner.flights.cmp(&winner.trains) {
        std::cmp::Ordering::Greater => SourceKind::Flight,
        std::cmp::Ordering::Less => SourceKind::Train,
        std::cmp::Ordering::Equal => winner.earliest.map_or(SourceKind::Flight, |a| a.kind),
    };

    Some(DemandPeak {
        slot_start: anchor + Duration::seconds(index * width),
        slot: Duration::seconds(width),
        count: winner.count,
        dominant,
    })
}
