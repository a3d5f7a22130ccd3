//! Analysis parameters.

use chrono::Duration;

use super::blocks::TimeBlockLayout;

/// Parameters fixed for the duration of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Width of a peak slot (minutes).
    pub slot_minutes: i64,

    /// Length of the "now" report window (hours).
    pub now_window_hours: i64,

    /// How much earlier one peak must start than the other before the
    /// recommendation sends drivers there first (minutes).
    pub lead_threshold_minutes: i64,

    pub blocks: TimeBlockLayout,
}

impl AnalysisConfig {
    pub fn slot(&self) -> Duration {
        Duration::minutes(self.slot_minutes.max(1))
    }

    pub fn now_window(&self) -> Duration {
        Duration::hours(self.now_window_hours.max(1))
    }

    pub fn lead_threshold(&self) -> Duration {
        Duration::minutes(self.lead_threshold_minutes.max(0))
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            slot_minutes: 30,
            now_window_hours: 3,
            lead_threshold_minutes: 60,
            blocks: TimeBlockLayout::default(),
        }
    }
}
