//! Local-time helpers.
//!
//! Upstreams report wall-clock times without an offset. These helpers pin
//! them to the configured timezone, resolving DST ambiguity to the earlier
//! instant and rejecting times that fall into a DST gap.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;

/// Naive layouts accepted from upstream APIs, most specific first.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Pin a naive local datetime to `tz`.
///
/// Returns `None` for wall-clock times skipped by a DST transition.
pub fn local_datetime(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&naive).earliest()
}

/// Parse an upstream timestamp into local time.
///
/// Accepts RFC 3339 (with an explicit offset) as well as the naive ISO
/// layouts the airport and HAFAS APIs use.
///
/// # Examples
///
/// ```
/// use chrono::Timelike;
/// use taxi_forecast::domain::parse_local_datetime;
///
/// let tz = chrono_tz::Europe::Luxembourg;
/// let t = parse_local_datetime("2026-10-14T10:25:00", &tz).unwrap();
/// assert_eq!((t.hour(), t.minute()), (10, 25));
///
/// assert!(parse_local_datetime("not a time", &tz).is_none());
/// ```
pub fn parse_local_datetime(s: &str, tz: &Tz) -> Option<DateTime<Tz>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(s) {
        return Some(with_offset.with_timezone(tz));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .and_then(|naive| local_datetime(tz, naive))
}

/// First instant of `date` in `tz`.
///
/// Midnight may be skipped by DST in some zones; the first existing hour
/// is used then.
pub fn start_of_day(tz: &Tz, date: NaiveDate) -> DateTime<Tz> {
    let midnight = date.and_time(NaiveTime::default());
    (0..3)
        .find_map(|h| local_datetime(tz, midnight + Duration::hours(h)))
        .unwrap_or_else(|| tz.from_utc_datetime(&midnight))
}
