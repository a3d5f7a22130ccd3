//! Flight arrivals from the airport's public arrivals board.
//!
//! The board is queried per local calendar day. A "now" window that crosses
//! midnight also asks for the following day; only the first day decides
//! whether the source is available.

mod convert;
mod types;

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use chrono_tz::Tz;
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CachedFetcher};
use crate::domain::{Arrival, ReportWindow, SourceKind, Upstream};
use crate::fetch::{FetchError, FetchRequest};

use super::{SourceAdapter, SourceResult, UnavailableReason, admit};

pub use convert::{convert_flight, is_excluded_status};
pub use types::{FlightBoard, FlightRecord};

/// Default airport board endpoint.
pub const DEFAULT_FLIGHT_API_URL: &str =
    "https://luxair-flightdata-1.azurewebsites.net/api/v1/Flights";

const AIRPORT_ORIGIN: &str = "https://www.lux-airport.lu";
const AIRPORT_REFERER: &str = "https://www.lux-airport.lu/en/flights/arrivals/";

/// Configuration for the flights adapter.
#[derive(Debug, Clone)]
pub struct FlightConfig {
    pub base_url: String,

    /// How long a day's board stays cached.
    pub ttl: Duration,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_FLIGHT_API_URL.to_string(),
            ttl: Duration::from_secs(600),
        }
    }
}

impl FlightConfig {
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Decode the board envelope. A body without a `flights` list is malformed.
fn decode_board(body: &[u8]) -> Result<Vec<Value>, FetchError> {
    serde_json::from_slice::<FlightBoard>(body)
        .map(|board| board.flights)
        .map_err(FetchError::malformed)
}

/// Arrivals at the airport.
pub struct FlightAdapter {
    fetcher: CachedFetcher,
    config: FlightConfig,
    tz: Tz,
}

impl FlightAdapter {
    pub fn new(fetcher: CachedFetcher, config: FlightConfig, tz: Tz) -> Self {
        Self {
            fetcher,
            config,
            tz,
        }
    }

    fn request_for(&self, day: NaiveDate) -> FetchRequest {
        FetchRequest::get(&self.config.base_url)
            .with_query("Day", day.format("%Y-%m-%d").to_string())
            .with_query("Sens", "A")
            .with_query("updateMarker", "0")
            .with_header("Origin", AIRPORT_ORIGIN)
            .with_header("Referer", AIRPORT_REFERER)
    }

    async fn fetch_day(
        &self,
        window: &ReportWindow,
        day: NaiveDate,
    ) -> Result<Vec<Value>, FetchError> {
        let key = CacheKey::windowed(Upstream::AirportBoard, window.mode, day);
        let request = self.request_for(day);
        self.fetcher
            .load(key, self.config.ttl, &request, decode_board)
            .await
    }

    fn convert_all(&self, records: Vec<Value>) -> Vec<Arrival> {
        let mut arrivals = Vec::with_capacity(records.len());
        for raw in records {
            let record: FlightRecord = match serde_json::from_value(raw) {
                Ok(record) => record,
                Err(e) => {
                    debug!(error = %e, "dropping undecodable flight record");
                    continue;
                }
            };
            match convert_flight(&record, &self.tz) {
                Ok(Some(arrival)) => arrivals.push(arrival),
                Ok(None) => {}
                Err(e) => debug!(
                    flight = record.flight_num.as_deref().unwrap_or("?"),
                    error = %e,
                    "dropping flight record"
                ),
            }
        }
        arrivals
    }
}

#[async_trait]
impl SourceAdapter for FlightAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Flight
    }

    async fn fetch(&self, window: &ReportWindow) -> SourceResult {
        let days = window.local_dates();
        let results = join_all(days.iter().map(|day| self.fetch_day(window, *day))).await;

        let mut records = Vec::new();
        for (index, (day, result)) in days.iter().zip(results).enumerate() {
            match result {
                Ok(day_records) => records.extend(day_records),
                Err(e) if index == 0 => {
                    warn!(source = %SourceKind::Flight, %day, error = %e, "airport board unavailable");
                    return SourceResult::Unavailable(UnavailableReason::from_fetch(
                        Upstream::AirportBoard,
                        e,
                    ));
                }
                Err(e) => {
                    warn!(%day, error = %e, "airport board for following day unavailable, continuing");
                }
            }
        }

        let result = admit(window, self.convert_all(records));
        info!(
            source = %SourceKind::Flight,
            count = result.arrivals().unwrap_or_default().len(),
            mode = %window.mode,
            "flights fetched"
        );
        result
    }
}
