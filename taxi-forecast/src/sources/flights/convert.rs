//! Conversion from airport board records to arrivals.

use chrono::Duration;
use chrono_tz::Tz;

use crate::domain::{Arrival, SourceKind, Upstream, parse_local_datetime};
use crate::sources::RecordError;

use super::types::FlightRecord;

/// Landed flights are no longer taxi demand.
const LANDED_CODES: &[&str] = &["AR", "LD"];

/// Cancelled or diverted flights will not arrive.
const CANCELLED_CODES: &[&str] = &["CX", "DL"];

fn non_blank(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Whether a flight with this status should be dropped.
pub fn is_excluded_status(status: &str) -> bool {
    let status = status.trim().to_ascii_uppercase();
    LANDED_CODES.contains(&status.as_str()) || CANCELLED_CODES.contains(&status.as_str())
}

/// "Paris (CDG)" from the first stop, or "Unknown".
///
/// Stops are listed in flight order; `serde_json` keeps document order.
fn origin_of(record: &FlightRecord) -> String {
    record
        .stops
        .as_ref()
        .and_then(|stops| stops.as_object())
        .and_then(|stops| stops.iter().next())
        .map(|(code, city)| match city.as_str().map(str::trim) {
            Some(city) if !city.is_empty() => format!("{city} ({code})"),
            _ => code.clone(),
        })
        .unwrap_or_else(|| "Unknown".to_string())
}

fn identifier_of(record: &FlightRecord) -> String {
    match (
        non_blank(&record.iata_air_code),
        non_blank(&record.flight_num),
    ) {
        (Some(iata), Some(num)) => format!("{iata}{num}"),
        _ => non_blank(&record.airline)
            .unwrap_or("Unknown")
            .to_string(),
    }
}

/// Convert one board record.
///
/// Returns `Ok(None)` for flights that have landed or been cancelled. An
/// unparseable estimate is ignored (the flight is kept on schedule); an
/// unparseable schedule drops the record.
pub fn convert_flight(record: &FlightRecord, tz: &Tz) -> Result<Option<Arrival>, RecordError> {
    let status = non_blank(&record.status_code).map(str::to_ascii_uppercase);
    if status.as_deref().is_some_and(is_excluded_status) {
        return Ok(None);
    }

    let sch = non_blank(&record.sch_date).ok_or(RecordError::MissingField("schDate"))?;
    let scheduled = parse_local_datetime(sch, tz).ok_or_else(|| RecordError::InvalidTime {
        field: "schDate",
        value: sch.to_string(),
    })?;

    let delay: Option<Duration> = non_blank(&record.time_estimated)
        .and_then(|est| parse_local_datetime(est, tz))
        .map(|estimated| estimated - scheduled);

    let mut arrival = Arrival::new(
        SourceKind::Flight,
        Upstream::AirportBoard,
        scheduled,
        identifier_of(record),
        origin_of(record),
    )
    .with_status(status.unwrap_or_default());

    if let Some(delay) = delay {
        arrival = arrival.with_delay(delay);
    }

    Ok(Some(arrival))
}
