//! Live arrivals at Gare Centrale from the Mobiliteit HAFAS API.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use chrono_tz::Tz;
use futures::future::join_all;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CachedFetcher};
use crate::domain::{Arrival, ReportWindow, SourceKind, Upstream, local_datetime};
use crate::fetch::{FetchError, FetchRequest};
use crate::sources::{RecordError, SourceAdapter, SourceResult, UnavailableReason, admit};

use super::is_train_category;

/// Default HAFAS REST endpoint.
pub const DEFAULT_HAFAS_API_URL: &str = "https://cdt.hafas.de/opendata/apiserver/arrivalBoard";

/// HAFAS id of Luxembourg, Gare Centrale.
pub const DEFAULT_HAFAS_STATION_ID: &str = "200405060";

/// Longest board HAFAS will return, in minutes.
const MAX_DURATION_MINS: i64 = 1439;

#[derive(Debug, Clone)]
pub struct HafasConfig {
    pub base_url: String,

    /// API key. Without one the live board is reported as not configured.
    pub access_id: Option<String>,

    pub station_id: String,

    pub ttl: Duration,

    /// Request start times are floored to this many minutes so nearby
    /// reports share a cached board.
    pub bucket_mins: u32,
}

impl Default for HafasConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_HAFAS_API_URL.to_string(),
            access_id: None,
            station_id: DEFAULT_HAFAS_STATION_ID.to_string(),
            ttl: Duration::from_secs(600),
            bucket_mins: 5,
        }
    }
}

impl HafasConfig {
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_access_id(mut self, id: impl Into<String>) -> Self {
        self.access_id = Some(id.into());
        self
    }

    pub fn with_station_id(mut self, id: impl Into<String>) -> Self {
        self.station_id = id.into();
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Board envelope. HAFAS omits `Arrival` when nothing is due and reports
/// failures in-band through `errorCode`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArrivalBoard {
    #[serde(default, rename = "Arrival")]
    arrivals: Vec<Value>,
    error_code: Option<String>,
    error_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HafasArrival {
    name: Option<String>,
    date: Option<String>,
    time: Option<String>,
    rt_date: Option<String>,
    rt_time: Option<String>,
    origin: Option<String>,
    #[serde(default)]
    cancelled: bool,
    #[serde(rename = "ProductAtStop")]
    product: Option<Product>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Product {
    name: Option<String>,
    num: Option<String>,
    cat_out: Option<String>,
}

fn decode_board(body: &[u8]) -> Result<Vec<Value>, FetchError> {
    let board: ArrivalBoard = serde_json::from_slice(body).map_err(FetchError::malformed)?;
    if let Some(code) = board.error_code {
        return Err(FetchError::Malformed(format!(
            "{code}: {}",
            board.error_text.unwrap_or_default()
        )));
    }
    Ok(board.arrivals)
}

fn parse_hafas_time(date: &str, time: &str, tz: &Tz) -> Option<DateTime<Tz>> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(time.trim(), "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(time.trim(), "%H:%M"))
        .ok()?;
    local_datetime(tz, NaiveDateTime::new(date, time))
}

/// Convert one board entry. `Ok(None)` for cancelled or non-train services.
fn convert_arrival(raw: Value, tz: &Tz) -> Result<Option<Arrival>, RecordError> {
    let entry: HafasArrival =
        serde_json::from_value(raw).map_err(|e| RecordError::Invalid(e.to_string()))?;

    if entry.cancelled {
        return Ok(None);
    }

    let category = entry
        .product
        .as_ref()
        .and_then(|p| p.cat_out.as_deref())
        .map(|c| c.trim().to_ascii_uppercase())
        .unwrap_or_default();
    if !is_train_category(&category) {
        return Ok(None);
    }

    let date = entry.date.as_deref().ok_or(RecordError::MissingField("date"))?;
    let time = entry.time.as_deref().ok_or(RecordError::MissingField("time"))?;
    let scheduled = parse_hafas_time(date, time, tz).ok_or_else(|| RecordError::InvalidTime {
        field: "time",
        value: format!("{date} {time}"),
    })?;

    let realtime = entry
        .rt_time
        .as_deref()
        .and_then(|t| parse_hafas_time(entry.rt_date.as_deref().unwrap_or(date), t, tz));

    let number = entry
        .product
        .as_ref()
        .and_then(|p| p.num.as_deref())
        .map(str::trim)
        .filter(|n| !n.is_empty());
    let identifier = match number {
        Some(num) => format!("{category} {num}"),
        None => entry
            .product
            .as_ref()
            .and_then(|p| p.name.clone())
            .or(entry.name)
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or(category),
    };

    let origin = entry
        .origin
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    let mut arrival = Arrival::new(
        SourceKind::Train,
        Upstream::HafasBoard,
        scheduled,
        identifier,
        origin,
    );
    if let Some(realtime) = realtime {
        arrival = arrival.with_delay(realtime - scheduled);
    }
    Ok(Some(arrival))
}

/// Live arrival board.
pub struct HafasAdapter {
    fetcher: CachedFetcher,
    config: HafasConfig,
    tz: Tz,
}

impl HafasAdapter {
    pub fn new(fetcher: CachedFetcher, config: HafasConfig, tz: Tz) -> Self {
        Self {
            fetcher,
            config,
            tz,
        }
    }

    /// Boards covering the window: start and length in minutes of each.
    ///
    /// The first start is floored to the bucket. Windows longer than one
    /// board (a 25-hour day, or today plus tomorrow) become consecutive
    /// boards.
    fn board_spans(&self, window: &ReportWindow) -> Vec<(DateTime<Tz>, i64)> {
        let bucket = self.config.bucket_mins.max(1);
        let floored_minute = window.start.minute() - window.start.minute() % bucket;
        let mut start = window
            .start
            .with_minute(floored_minute)
            .unwrap_or(window.start);
        let mut remaining = ((window.end - start).num_minutes() + i64::from(bucket)).max(1);

        let mut spans = Vec::new();
        while remaining > 0 {
            let minutes = remaining.min(MAX_DURATION_MINS);
            spans.push((start, minutes));
            start += chrono::Duration::minutes(minutes);
            remaining -= minutes;
        }
        spans
    }

    async fn fetch_board(
        &self,
        access_id: &str,
        window: &ReportWindow,
        start: &DateTime<Tz>,
        minutes: i64,
    ) -> Result<Vec<Value>, FetchError> {
        let key = CacheKey::bucketed(
            Upstream::HafasBoard,
            window.mode,
            start,
            minutes,
            self.config.bucket_mins,
        );
        let request = self.request_for(access_id, start, minutes);
        self.fetcher
            .load(key, self.config.ttl, &request, decode_board)
            .await
    }

    fn request_for(&self, access_id: &str, start: &DateTime<Tz>, minutes: i64) -> FetchRequest {
        FetchRequest::get(&self.config.base_url)
            .with_query("accessId", access_id)
            .with_query("id", &self.config.station_id)
            .with_query("date", start.format("%Y-%m-%d").to_string())
            .with_query("time", start.format("%H:%M").to_string())
            .with_query("duration", minutes.to_string())
            .with_query("format", "json")
    }
}

#[async_trait]
impl SourceAdapter for HafasAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Train
    }

    async fn fetch(&self, window: &ReportWindow) -> SourceResult {
        let Some(access_id) = self.config.access_id.as_deref().filter(|id| !id.is_empty()) else {
            return SourceResult::Unavailable(UnavailableReason::NotConfigured {
                upstream: Upstream::HafasBoard,
                message: "no HAFAS access id".to_string(),
            });
        };

        let spans = self.board_spans(window);
        let boards = join_all(
            spans
                .iter()
                .map(|(start, minutes)| self.fetch_board(access_id, window, start, *minutes)),
        )
        .await;

        let mut records = Vec::new();
        for board in boards {
            match board {
                Ok(board) => records.extend(board),
                Err(e) => {
                    warn!(upstream = %Upstream::HafasBoard, error = %e, "live train board unavailable");
                    return SourceResult::Unavailable(UnavailableReason::from_fetch(
                        Upstream::HafasBoard,
                        e,
                    ));
                }
            }
        }

        // Consecutive boards may both list a train at their shared minute.
        let mut seen = HashSet::new();
        let mut arrivals = Vec::with_capacity(records.len());
        for raw in records {
            match convert_arrival(raw, &self.tz) {
                Ok(Some(arrival)) => {
                    if seen.insert((arrival.identifier.clone(), arrival.scheduled)) {
                        arrivals.push(arrival);
                    }
                }
                Ok(None) => {}
                Err(e) => debug!(error = %e, "dropping HAFAS arrival"),
            }
        }

        let result = admit(window, arrivals);
        info!(
            upstream = %Upstream::HafasBoard,
            count = result.arrivals().unwrap_or_default().len(),
            mode = %window.mode,
            "live trains fetched"
        );
        result
    }
}
