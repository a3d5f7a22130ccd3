//! Domain types for the arrivals forecast.
//!
//! Every report run builds these fresh from upstream payloads and throws
//! them away once the report has been formatted. Nothing here outlives a
//! pipeline run.

mod arrival;
mod time;
mod window;

pub use arrival::{Arrival, SourceKind, Upstream};
pub use time::{local_datetime, parse_local_datetime, start_of_day};
pub use window::{ReportMode, ReportWindow};
