//! Time-block grouping for day-ahead reports.

use crate::domain::{Arrival, SourceKind};

use chrono::Timelike;

/// Names of the five blocks, in day order.
pub const BLOCK_NAMES: [&str; 5] = ["Early Morning", "Morning", "Afternoon", "Evening", "Night"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time block boundaries {0:?}: need four strictly increasing hours in 1..=23")]
pub struct InvalidLayout(pub Vec<u32>);

/// How the day is split into blocks.
///
/// Four interior boundaries split `[0, 24)` into five closed-open hour
/// ranges, so every hour belongs to exactly one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBlockLayout {
    boundaries: [u32; 4],
}

impl Default for TimeBlockLayout {
    fn default() -> Self {
        Self {
            boundaries: [6, 12, 17, 21],
        }
    }
}

impl TimeBlockLayout {
    pub fn new(boundaries: [u32; 4]) -> Result<Self, InvalidLayout> {
        let in_range = boundaries.iter().all(|h| (1..=23).contains(h));
        let increasing = boundaries.windows(2).all(|w| w[0] < w[1]);
        if in_range && increasing {
            Ok(Self { boundaries })
        } else {
            Err(InvalidLayout(boundaries.to_vec()))
        }
    }

    /// Parse a comma-separated list such as `"6,12,17,21"`.
    pub fn parse(s: &str) -> Result<Self, InvalidLayout> {
        let hours: Vec<u32> = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|_| InvalidLayout(Vec::new()))?;
        let boundaries: [u32; 4] = hours
            .clone()
            .try_into()
            .map_err(|_| InvalidLayout(hours))?;
        Self::new(boundaries)
    }

    pub fn boundaries(&self) -> [u32; 4] {
        self.boundaries
    }

    /// `(start_hour, end_hour)` of each block; end is exclusive.
    pub fn ranges(&self) -> [(u32, u32); 5] {
        let [a, b, c, d] = self.boundaries;
        [(0, a), (a, b), (b, c), (c, d), (d, 24)]
    }

    /// Index of the block containing `hour` (0..24).
    pub fn block_index(&self, hour: u32) -> usize {
        self.boundaries.iter().filter(|b| **b <= hour).count()
    }
}

/// A named part of the day and the arrivals that fall in it.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeBlock {
    pub name: &'static str,
    pub start_hour: u32,
    pub end_hour: u32,
    pub arrivals: Vec<Arrival>,
}

impl TimeBlock {
    pub fn count(&self) -> usize {
        self.arrivals.len()
    }

    pub fn count_of(&self, kind: SourceKind) -> usize {
        self.arrivals.iter().filter(|a| a.kind == kind).count()
    }

    /// "Morning (06–12)".
    pub fn label(&self) -> String {
        format!("{} ({:02}–{:02})", self.name, self.start_hour, self.end_hour)
    }
}

/// Assign each arrival to the block containing its local hour.
///
/// Always returns all five blocks, in day order.
pub fn group_into_blocks(arrivals: &[Arrival], layout: &TimeBlockLayout) -> Vec<TimeBlock> {
    let mut blocks: Vec<TimeBlock> = layout
        .ranges()
        .iter()
        .zip(BLOCK_NAMES)
        .map(|(&(start_hour, end_hour), name)| TimeBlock {
            name,
            start_hour,
            end_hour,
            arrivals: Vec::new(),
        })
        .collect();

    for arrival in arrivals {
        let index = layout.block_index(arrival.timestamp.hour());
        blocks[index].arrivals.push(arrival.clone());
    }
    for block in &mut blocks {
        block.arrivals.sort_by_key(|a| a.timestamp);
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Upstream;
    use chrono::TimeZone;
    use chrono_tz::Europe::Luxembourg;

    fn train(h: u32, m: u32) -> Arrival {
        Arrival::new(
            SourceKind::Train,
            Upstream::GtfsTimetable,
            Luxembourg.with_ymd_and_hms(2026, 10, 15, h, m, 0).unwrap(),
            "RE 5112",
            "Trier Hbf",
        )
    }

    #[test]
    fn boundary_hours_are_closed_open() {
        let blocks = group_into_blocks(
            &[train(5, 59), train(6, 0), train(11, 59), train(12, 0)],
            &TimeBlockLayout::default(),
        );
        let counts: Vec<usize> = blocks.iter().map(TimeBlock::count).collect();
        assert_eq!(counts, [1, 2, 1, 0, 0]);
        assert_eq!(blocks[1].label(), "Morning (06–12)");
        assert_eq!(blocks[4].label(), "Night (21–24)");
    }

    #[test]
    fn layout_validation() {
        assert!(TimeBlockLayout::new([6, 12, 17, 21]).is_ok());
        assert!(TimeBlockLayout::new([6, 6, 17, 21]).is_err());
        assert!(TimeBlockLayout::new([0, 6, 17, 21]).is_err());
        assert!(TimeBlockLayout::new([6, 12, 17, 24]).is_err());
    }

    #[test]
    fn layout_parsing() {
        assert_eq!(
            TimeBlockLayout::parse(" 5, 8,12 ,17").unwrap().boundaries(),
            [5, 8, 12, 17]
        );
        assert!(TimeBlockLayout::parse("6,12,17").is_err());
        assert!(TimeBlockLayout::parse("6,12,x,21").is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    prop_compose! {
        fn layout_strategy()(hours in prop::sample::subsequence((1u32..=23).collect::<Vec<_>>(), 4)) -> TimeBlockLayout {
            // Subsequences keep source order, so these are increasing.
            TimeBlockLayout::new([hours[0], hours[1], hours[2], hours[3]]).unwrap()
        }
    }

    proptest! {
        #[test]
        fn blocks_partition_the_day(layout in layout_strategy()) {
            let ranges = layout.ranges();
            for hour in 0..24u32 {
                let containing: Vec<usize> = ranges
                    .iter()
                    .enumerate()
                    .filter(|(_, (start, end))| *start <= hour && hour < *end)
                    .map(|(i, _)| i)
                    .collect();
                prop_assert_eq!(containing.len(), 1, "hour {} in {:?}", hour, containing);
                prop_assert_eq!(containing[0], layout.block_index(hour));
            }
            prop_assert_eq!(ranges[0].0, 0);
            prop_assert_eq!(ranges[4].1, 24);
        }
    }
}
