//! Airport arrivals board DTOs.
//!
//! The board sends empty strings as often as it omits fields, so
//! everything optional is `Option` and blank values are treated as absent
//! during conversion.

use serde::Deserialize;
use serde_json::Value;

/// Board envelope. Records are kept as raw values so one bad record only
/// drops itself.
#[derive(Debug, Clone, Deserialize)]
pub struct FlightBoard {
    pub flights: Vec<Value>,
}

/// One arrival on the board.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightRecord {
    /// Scheduled arrival, naive local ISO datetime.
    pub sch_date: Option<String>,

    /// Estimated arrival, same format. Blank when not yet estimated.
    pub time_estimated: Option<String>,

    pub iata_air_code: Option<String>,

    pub flight_num: Option<String>,

    pub airline: Option<String>,

    /// Origin airports keyed by IATA code, e.g. `{"CDG": "Paris"}`.
    pub stops: Option<Value>,

    /// Board status, e.g. `ON` (on time), `AR` (arrived), `CX` (cancelled).
    pub status_code: Option<String>,
}
