//! Report modes and the time window each one covers.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Timelike};
use chrono_tz::Tz;
use serde::Serialize;

use super::time::start_of_day;

/// Which report is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    /// Arrivals from now until the end of the short look-ahead window.
    Now,
    /// All of tomorrow's arrivals.
    Tomorrow,
}

impl ReportMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportMode::Now => "now",
            ReportMode::Tomorrow => "tomorrow",
        }
    }

    /// Parse a mode name as used in URLs ("now", "tomorrow").
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "now" => Some(ReportMode::Now),
            "tomorrow" => Some(ReportMode::Tomorrow),
            _ => None,
        }
    }
}

impl fmt::Display for ReportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The span of time a report covers, fixed at the moment it was requested.
///
/// A "now" window is `(generated_at, end]`: arrivals must be strictly in the
/// future. A "tomorrow" window is the closed-open day `[start, end)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportWindow {
    pub mode: ReportMode,

    /// The clock reading this window was derived from.
    pub generated_at: DateTime<Tz>,

    /// Start of the window; peak slots are aligned to it.
    pub start: DateTime<Tz>,

    pub end: DateTime<Tz>,
}

impl ReportWindow {
    /// Window for `mode` as seen at `now`.
    pub fn for_mode(mode: ReportMode, now: DateTime<Tz>, now_span: Duration) -> Self {
        match mode {
            ReportMode::Now => Self::now(now, now_span),
            ReportMode::Tomorrow => Self::tomorrow(now),
        }
    }

    /// Look-ahead window starting at `now` (truncated to the minute).
    pub fn now(now: DateTime<Tz>, span: Duration) -> Self {
        let start = now
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(now);
        Self {
            mode: ReportMode::Now,
            generated_at: now,
            start,
            end: start + span,
        }
    }

    /// From `now` until tomorrow's last minute: everything still to come
    /// today and tomorrow.
    pub fn through_tomorrow(now: DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();
        let after = today
            .succ_opt()
            .and_then(|d| d.succ_opt())
            .unwrap_or(today);
        let mut window = Self::now(now, Duration::zero());
        window.end = start_of_day(&tz, after) - Duration::seconds(1);
        window
    }

    /// The whole of the calendar day after `now`.
    pub fn tomorrow(now: DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();
        let tomorrow = today.succ_opt().unwrap_or(today);
        let after = tomorrow.succ_opt().unwrap_or(tomorrow);
        Self {
            mode: ReportMode::Tomorrow,
            generated_at: now,
            start: start_of_day(&tz, tomorrow),
            end: start_of_day(&tz, after),
        }
    }

    /// Whether an arrival at `t` belongs in this report.
    pub fn admits(&self, t: &DateTime<Tz>) -> bool {
        match self.mode {
            ReportMode::Now => *t > self.generated_at && *t <= self.end,
            ReportMode::Tomorrow => *t >= self.start && *t < self.end,
        }
    }

    /// Whether `t` falls after the window closes.
    pub fn is_after(&self, t: &DateTime<Tz>) -> bool {
        match self.mode {
            ReportMode::Now => *t > self.end,
            ReportMode::Tomorrow => *t >= self.end,
        }
    }

    /// Local calendar dates touched by the window, in order.
    pub fn local_dates(&self) -> Vec<NaiveDate> {
        let first = self.start.date_naive();
        // The tomorrow window ends exactly at the next midnight, which is
        // not part of it.
        let last_instant = match self.mode {
            ReportMode::Now => self.end,
            ReportMode::Tomorrow => self.end - Duration::seconds(1),
        };
        let last = last_instant.date_naive().max(first);

        first.iter_days().take_while(|d| *d <= last).collect()
    }

    pub fn span(&self) -> Duration {
        self.end - self.start
    }

    /// Short human description, e.g. "10:07 – 13:07" or "Thursday 15 Oct 2026".
    pub fn description(&self) -> String {
        match self.mode {
            ReportMode::Now => format!(
                "{} – {}",
                self.start.format("%H:%M"),
                self.end.format("%H:%M")
            ),
            ReportMode::Tomorrow => self.start.format("%A %d %b %Y").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Europe::Luxembourg;

    fn at(d: u32, h: u32, m: u32, s: u32) -> DateTime<Tz> {
        Luxembourg.with_ymd_and_hms(2026, 10, d, h, m, s).unwrap()
    }

    #[test]
    fn mode_parse() {
        assert_eq!(ReportMode::parse("now"), Some(ReportMode::Now));
        assert_eq!(ReportMode::parse(" Tomorrow "), Some(ReportMode::Tomorrow));
        assert_eq!(ReportMode::parse("yesterday"), None);
    }

    #[test]
    fn now_window_truncates_to_minute() {
        let window = ReportWindow::now(at(14, 10, 7, 42), Duration::hours(3));
        assert_eq!(window.start, at(14, 10, 7, 0));
        assert_eq!(window.end, at(14, 13, 7, 0));
        assert_eq!(window.description(), "10:07 – 13:07");
    }

    #[test]
    fn now_window_requires_future() {
        let now = at(14, 10, 7, 42);
        let window = ReportWindow::now(now, Duration::hours(3));

        assert!(!window.admits(&at(14, 10, 0, 0)));
        assert!(!window.admits(&now));
        assert!(window.admits(&at(14, 10, 8, 0)));
        assert!(window.admits(&at(14, 13, 7, 0)));
        assert!(!window.admits(&at(14, 13, 8, 0)));
    }

    #[test]
    fn tomorrow_window_is_closed_open_day() {
        let window = ReportWindow::tomorrow(at(14, 22, 30, 0));
        assert_eq!(window.start, at(15, 0, 0, 0));
        assert_eq!(window.end, at(16, 0, 0, 0));

        assert!(window.admits(&at(15, 0, 0, 0)));
        assert!(window.admits(&at(15, 23, 59, 0)));
        assert!(!window.admits(&at(16, 0, 0, 0)));
        assert!(!window.admits(&at(14, 23, 59, 0)));
        assert_eq!(window.description(), "Thursday 15 Oct 2026");
    }

    #[test]
    fn through_tomorrow_covers_rest_of_today_and_tomorrow() {
        let now = at(14, 22, 30, 15);
        let window = ReportWindow::through_tomorrow(now);

        assert!(!window.admits(&at(14, 22, 30, 0)));
        assert!(window.admits(&at(14, 23, 0, 0)));
        assert!(window.admits(&at(15, 23, 59, 0)));
        assert!(!window.admits(&at(16, 0, 0, 0)));
        assert!(window.is_after(&at(16, 0, 0, 0)));
        assert_eq!(
            window.local_dates(),
            vec![
                NaiveDate::from_ymd_opt(2026, 10, 14).unwrap(),
                NaiveDate::from_ymd_opt(2026, 10, 15).unwrap(),
            ]
        );
    }

    #[test]
    fn tomorrow_window_spans_one_date() {
        let window = ReportWindow::tomorrow(at(14, 9, 0, 0));
        assert_eq!(
            window.local_dates(),
            vec![NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()]
        );
    }

    #[test]
    fn late_now_window_crosses_midnight() {
        let window = ReportWindow::now(at(14, 22, 15, 0), Duration::hours(3));
        assert_eq!(
            window.local_dates(),
            vec![
                NaiveDate::from_ymd_opt(2026, 10, 14).unwrap(),
                NaiveDate::from_ymd_opt(2026, 10, 15).unwrap(),
            ]
        );
    }

    #[test]
    fn tomorrow_across_dst_change_is_25_hours() {
        // Clocks go back on 2026-10-25.
        let window = ReportWindow::tomorrow(at(24, 12, 0, 0));
        assert_eq!(window.span(), Duration::hours(25));
    }
}
