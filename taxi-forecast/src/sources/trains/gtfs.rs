//! Scheduled arrivals at Gare Centrale from the national GTFS timetable.
//!
//! The archive is located through the open-data portal's dataset API,
//! downloaded, and kept in the payload cache for the feed TTL. Parsing
//! extracts only what the reports need (calls at the Gare Centrale stops on
//! train routes, plus service calendars) and happens on the blocking pool.

use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read, Seek};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Datelike, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::cache::{CacheKey, CachedFetcher};
use crate::domain::{Arrival, ReportWindow, SourceKind, Upstream, local_datetime};
use crate::fetch::{FetchError, FetchRequest};
use crate::sources::{SourceAdapter, SourceResult, UnavailableReason, admit};

use super::is_train_category;

/// Dataset listing for the Luxembourg public transport GTFS feed.
pub const DEFAULT_GTFS_DATASET_URL: &str =
    "https://data.public.lu/api/1/datasets/horaires-et-arrets-des-transport-publics-gtfs/";

/// Stop ids of Luxembourg, Gare Centrale across feed revisions.
pub const DEFAULT_GTFS_STOP_IDS: &[&str] = &["200405035", "000200405060"];

#[derive(Debug, Clone)]
pub struct GtfsConfig {
    pub dataset_url: String,

    pub stop_ids: Vec<String>,

    /// How long a downloaded archive is used before fetching a fresh one.
    pub feed_ttl: Duration,
}

impl Default for GtfsConfig {
    fn default() -> Self {
        Self {
            dataset_url: DEFAULT_GTFS_DATASET_URL.to_string(),
            stop_ids: DEFAULT_GTFS_STOP_IDS.iter().map(|s| s.to_string()).collect(),
            feed_ttl: Duration::from_secs(6 * 60 * 60),
        }
    }
}

impl GtfsConfig {
    pub fn with_dataset_url(mut self, url: impl Into<String>) -> Self {
        self.dataset_url = url.into();
        self
    }

    pub fn with_stop_ids(mut self, ids: Vec<String>) -> Self {
        self.stop_ids = ids;
        self
    }

    pub fn with_feed_ttl(mut self, ttl: Duration) -> Self {
        self.feed_ttl = ttl;
        self
    }
}

/// Errors reading a GTFS archive.
#[derive(Debug, thiserror::Error)]
pub enum GtfsError {
    #[error("invalid archive: {0}")]
    Zip(#[from] ZipError),

    #[error("{0} is missing from the archive")]
    MissingFile(&'static str),

    #[error("failed to read {file}: {source}")]
    Csv {
        file: &'static str,
        #[source]
        source: csv::Error,
    },
}

// ---- dataset listing ----

#[derive(Debug, Deserialize)]
struct Dataset {
    #[serde(default)]
    resources: Vec<Resource>,
}

#[derive(Debug, Deserialize)]
struct Resource {
    #[serde(default)]
    format: String,
    #[serde(default)]
    url: String,
}

/// URL of the first zip resource in the listing.
fn decode_dataset(body: &[u8]) -> Result<String, FetchError> {
    let dataset: Dataset = serde_json::from_slice(body).map_err(FetchError::malformed)?;
    dataset
        .resources
        .into_iter()
        .find(|r| r.format.trim().eq_ignore_ascii_case("zip") && !r.url.trim().is_empty())
        .map(|r| r.url.trim().to_string())
        .ok_or_else(|| FetchError::Malformed("dataset lists no zip resource".to_string()))
}

// ---- feed rows ----

#[derive(Debug, Deserialize)]
struct CalendarRow {
    service_id: String,
    monday: u8,
    tuesday: u8,
    wednesday: u8,
    thursday: u8,
    friday: u8,
    saturday: u8,
    sunday: u8,
    start_date: String,
    end_date: String,
}

#[derive(Debug, Deserialize)]
struct CalendarDateRow {
    service_id: String,
    date: String,
    exception_type: u8,
}

#[derive(Debug, Deserialize)]
struct RouteRow {
    route_id: String,
    #[serde(default)]
    route_short_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TripRow {
    route_id: String,
    service_id: String,
    trip_id: String,
    #[serde(default)]
    trip_short_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StopTimeRow {
    trip_id: String,
    #[serde(default)]
    arrival_time: Option<String>,
    stop_id: String,
    stop_sequence: u32,
}

#[derive(Debug, Deserialize)]
struct StopRow {
    stop_id: String,
    #[serde(default)]
    stop_name: Option<String>,
}

fn parse_gtfs_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y%m%d").ok()
}

/// Seconds after service-day midnight. Hours may exceed 23.
fn parse_gtfs_time(s: &str) -> Option<u32> {
    let mut parts = s.trim().split(':');
    let h: u32 = parts.next()?.parse().ok()?;
    let m: u32 = parts.next()?.parse().ok()?;
    let sec: u32 = parts.next().map_or(Ok(0), str::parse).ok()?;
    (m < 60 && sec < 60).then_some(h * 3600 + m * 60 + sec)
}

// ---- timetable ----

#[derive(Debug, Clone)]
struct ServicePattern {
    weekdays: [bool; 7],
    start: NaiveDate,
    end: NaiveDate,
}

impl ServicePattern {
    fn runs_on(&self, date: NaiveDate) -> bool {
        date >= self.start
            && date <= self.end
            && self.weekdays[date.weekday().num_days_from_monday() as usize]
    }
}

#[derive(Debug, Clone)]
struct StopCall {
    service_id: String,
    identifier: String,
    origin: String,
    arrival_secs: u32,
}

/// The slice of a GTFS feed needed to list arrivals at Gare Centrale.
#[derive(Debug, Default)]
pub struct Timetable {
    patterns: HashMap<String, ServicePattern>,
    /// Per-date overrides: `true` adds the service, `false` removes it.
    exceptions: HashMap<NaiveDate, HashMap<String, bool>>,
    calls: Vec<StopCall>,
}

impl Timetable {
    fn is_active(&self, service_id: &str, date: NaiveDate) -> bool {
        if let Some(added) = self
            .exceptions
            .get(&date)
            .and_then(|services| services.get(service_id))
        {
            return *added;
        }
        self.patterns
            .get(service_id)
            .is_some_and(|p| p.runs_on(date))
    }

    /// Arrivals for trips running on service day `date`. Times past 24:00
    /// land on the following calendar day.
    pub fn arrivals_on(&self, date: NaiveDate, tz: &Tz) -> Vec<Arrival> {
        let midnight = date.and_time(NaiveTime::default());
        self.calls
            .iter()
            .filter(|call| self.is_active(&call.service_id, date))
            .filter_map(|call| {
                let naive = midnight + chrono::Duration::seconds(i64::from(call.arrival_secs));
                let timestamp = local_datetime(tz, naive)?;
                Some(
                    Arrival::new(
                        SourceKind::Train,
                        Upstream::GtfsTimetable,
                        timestamp,
                        call.identifier.clone(),
                        call.origin.clone(),
                    )
                    .with_status("scheduled"),
                )
            })
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.len()
    }
}

/// Stream rows of `file`, skipping rows that do not decode.
fn for_each_row<R, T, F>(
    archive: &mut ZipArchive<R>,
    file: &'static str,
    required: bool,
    mut f: F,
) -> Result<(), GtfsError>
where
    R: Read + Seek,
    T: DeserializeOwned,
    F: FnMut(T),
{
    let entry = match archive.by_name(file) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) if !required => return Ok(()),
        Err(ZipError::FileNotFound) => return Err(GtfsError::MissingFile(file)),
        Err(e) => return Err(e.into()),
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(entry);

    // Header problems make the whole file unusable.
    reader
        .headers()
        .map_err(|source| GtfsError::Csv { file, source })?;

    let mut skipped = 0usize;
    for row in reader.deserialize::<T>() {
        match row {
            Ok(row) => f(row),
            Err(_) => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!(file, skipped, "skipped undecodable GTFS rows");
    }
    Ok(())
}

/// Build a [`Timetable`] from archive bytes.
pub fn parse_timetable(body: Bytes, stop_ids: &[String]) -> Result<Timetable, GtfsError> {
    let mut archive = ZipArchive::new(Cursor::new(body))?;
    let targets: HashSet<&str> = stop_ids.iter().map(String::as_str).collect();
    let mut timetable = Timetable::default();

    for_each_row(&mut archive, "calendar.txt", false, |row: CalendarRow| {
        let (Some(start), Some(end)) = (
            parse_gtfs_date(&row.start_date),
            parse_gtfs_date(&row.end_date),
        ) else {
            return;
        };
        let weekdays = [
            row.monday,
            row.tuesday,
            row.wednesday,
            row.thursday,
            row.friday,
            row.saturday,
            row.sunday,
        ]
        .map(|d| d == 1);
        timetable.patterns.insert(
            row.service_id,
            ServicePattern {
                weekdays,
                start,
                end,
            },
        );
    })?;

    for_each_row(&mut archive, "calendar_dates.txt", false, |row: CalendarDateRow| {
        let Some(date) = parse_gtfs_date(&row.date) else {
            return;
        };
        let added = match row.exception_type {
            1 => true,
            2 => false,
            _ => return,
        };
        timetable
            .exceptions
            .entry(date)
            .or_default()
            .insert(row.service_id, added);
    })?;

    // route_id -> category, train routes only
    let mut routes: HashMap<String, String> = HashMap::new();
    for_each_row(&mut archive, "routes.txt", true, |row: RouteRow| {
        let name = row
            .route_short_name
            .unwrap_or_default()
            .trim()
            .to_ascii_uppercase();
        if is_train_category(&name) {
            routes.insert(row.route_id, name);
        }
    })?;

    struct TripInfo {
        service_id: String,
        identifier: String,
    }
    let mut trips: HashMap<String, TripInfo> = HashMap::new();
    for_each_row(&mut archive, "trips.txt", true, |row: TripRow| {
        let Some(category) = routes.get(&row.route_id) else {
            return;
        };
        let identifier = match row.trip_short_name.as_deref().map(str::trim) {
            Some(num) if !num.is_empty() => format!("{category} {num}"),
            _ => category.clone(),
        };
        trips.insert(
            row.trip_id,
            TripInfo {
                service_id: row.service_id,
                identifier,
            },
        );
    })?;

    // First stop of every train trip, and the calls at the target stops.
    let mut first_stops: HashMap<String, (u32, String)> = HashMap::new();
    let mut target_calls: Vec<(String, String, u32, u32)> = Vec::new();
    for_each_row(&mut archive, "stop_times.txt", true, |row: StopTimeRow| {
        if !trips.contains_key(&row.trip_id) {
            return;
        }
        let first = first_stops
            .entry(row.trip_id.clone())
            .or_insert_with(|| (row.stop_sequence, row.stop_id.clone()));
        if row.stop_sequence < first.0 {
            *first = (row.stop_sequence, row.stop_id.clone());
        }
        if targets.contains(row.stop_id.as_str())
            && let Some(secs) = row.arrival_time.as_deref().and_then(parse_gtfs_time)
        {
            target_calls.push((row.trip_id, row.stop_id, row.stop_sequence, secs));
        }
    })?;

    let wanted: HashSet<&str> = first_stops.values().map(|(_, id)| id.as_str()).collect();
    let mut stop_names: HashMap<String, String> = HashMap::new();
    for_each_row(&mut archive, "stops.txt", false, |row: StopRow| {
        if wanted.contains(row.stop_id.as_str())
            && let Some(name) = row.stop_name.filter(|n| !n.trim().is_empty())
        {
            stop_names.insert(row.stop_id, name.trim().to_string());
        }
    })?;

    for (trip_id, _stop_id, sequence, secs) in target_calls {
        let (Some(trip), Some((first_seq, first_stop))) =
            (trips.get(&trip_id), first_stops.get(&trip_id))
        else {
            continue;
        };
        // Trips starting at Gare Centrale depart from it; they do not arrive.
        if sequence == *first_seq || targets.contains(first_stop.as_str()) {
            continue;
        }
        let origin = stop_names
            .get(first_stop)
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string());
        timetable.calls.push(StopCall {
            service_id: trip.service_id.clone(),
            identifier: trip.identifier.clone(),
            origin,
            arrival_secs: secs,
        });
    }

    Ok(timetable)
}

struct LoadedFeed {
    body: Bytes,
    timetable: Arc<Timetable>,
}

fn same_payload(a: &Bytes, b: &Bytes) -> bool {
    a.len() == b.len() && a.as_ptr() == b.as_ptr()
}

/// Static timetable source.
pub struct GtfsAdapter {
    fetcher: CachedFetcher,
    config: GtfsConfig,
    tz: Tz,
    /// Serializes downloads and holds the timetable parsed from the
    /// currently cached archive.
    loaded: Mutex<Option<LoadedFeed>>,
}

impl GtfsAdapter {
    pub fn new(fetcher: CachedFetcher, config: GtfsConfig, tz: Tz) -> Self {
        Self {
            fetcher,
            config,
            tz,
            loaded: Mutex::new(None),
        }
    }

    async fn download(&self) -> Result<Bytes, UnavailableReason> {
        let listing = FetchRequest::get(&self.config.dataset_url);
        let zip_url = self
            .fetcher
            .load(
                CacheKey::feed(Upstream::GtfsDataset),
                self.config.feed_ttl,
                &listing,
                decode_dataset,
            )
            .await
            .map_err(|e| UnavailableReason::from_fetch(Upstream::GtfsDataset, e))?;

        info!(url = %zip_url, "downloading GTFS archive");
        self.fetcher
            .client()
            .fetch(&FetchRequest::get(zip_url))
            .await
            .map_err(|e| UnavailableReason::from_fetch(Upstream::GtfsTimetable, e))
    }

    async fn parse(&self, body: Bytes) -> Result<Arc<Timetable>, UnavailableReason> {
        let stop_ids = self.config.stop_ids.clone();
        let parsed = tokio::task::spawn_blocking(move || parse_timetable(body, &stop_ids))
            .await
            .map_err(|e| UnavailableReason::TaskFailed(e.to_string()))?;

        match parsed {
            Ok(timetable) => {
                info!(calls = timetable.call_count(), "GTFS timetable parsed");
                Ok(Arc::new(timetable))
            }
            Err(e) => Err(UnavailableReason::Malformed {
                upstream: Upstream::GtfsTimetable,
                message: e.to_string(),
            }),
        }
    }

    /// Timetable for the cached archive, downloading one if none is fresh.
    async fn timetable(&self) -> Result<Arc<Timetable>, UnavailableReason> {
        let mut loaded = self.loaded.lock().await;
        let key = CacheKey::feed(Upstream::GtfsTimetable);

        if let Some(body) = self.fetcher.cached(&key).await {
            if let Some(feed) = loaded.as_ref()
                && same_payload(&feed.body, &body)
            {
                return Ok(feed.timetable.clone());
            }
            let timetable = self.parse(body.clone()).await?;
            *loaded = Some(LoadedFeed {
                body,
                timetable: timetable.clone(),
            });
            return Ok(timetable);
        }

        let body = self.download().await?;
        let timetable = self.parse(body.clone()).await?;
        self.fetcher
            .store(key, body.clone(), self.config.feed_ttl)
            .await;
        *loaded = Some(LoadedFeed {
            body,
            timetable: timetable.clone(),
        });
        Ok(timetable)
    }
}

#[async_trait]
impl SourceAdapter for GtfsAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Train
    }

    async fn fetch(&self, window: &ReportWindow) -> SourceResult {
        let timetable = match self.timetable().await {
            Ok(timetable) => timetable,
            Err(reason) => {
                warn!(upstream = %Upstream::GtfsTimetable, reason = %reason, "timetable unavailable");
                return SourceResult::Unavailable(reason);
            }
        };

        // Trips of the previous service day can arrive after midnight.
        let dates = window.local_dates();
        let service_days = dates
            .first()
            .and_then(|d| d.pred_opt())
            .into_iter()
            .chain(dates.iter().copied());

        let mut arrivals = Vec::new();
        for day in service_days {
            arrivals.extend(timetable.arrivals_on(day, &self.tz));
        }

        let result = admit(window, arrivals);
        info!(
            upstream = %Upstream::GtfsTimetable,
            count = result.arrivals().unwrap_or_default().len(),
            mode = %window.mode,
            "scheduled trains loaded"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use chrono::{TimeZone, Timelike, Weekday};
    use chrono_tz::Europe::Luxembourg;
    use serde_json::json;
    use zip::write::SimpleFileOptions;

    use super::*;
    use crate::cache::{CacheConfig, PayloadCache};
    use crate::fetch::testing::{Reply, ScriptedTransport};
    use crate::fetch::{FetchClient, RetryPolicy};

    const DATASET_URL: &str = "http://portal.test/dataset";
    const ZIP_URL: &str = "http://portal.test/feed.zip";

    const CALENDAR: &str = "\
service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date
WK,1,1,1,1,1,0,0,20260101,20261231
SA,0,0,0,0,0,1,0,20260101,20261231
";

    const CALENDAR_DATES: &str = "\
service_id,date,exception_type
WK,20261015,2
HOL,20261015,1
";

    const ROUTES: &str = "\
route_id,route_short_name,route_type
R1,TGV,2
R2,RE,2
R3,16,3
";

    const TRIPS: &str = "\
route_id,service_id,trip_id,trip_short_name
R1,WK,T1,2851
R2,WK,T2,5112
R3,WK,T3,
R2,SA,T4,5120
R2,HOL,T5,5130
R2,WK,T6,5199
R2,WK,T7,5201
";

    const STOP_TIMES: &str = "\
trip_id,arrival_time,departure_time,stop_id,stop_sequence
T1,10:00:00,10:02:00,PARIS,1
T1,12:05:00,12:05:00,200405035,2
T2,10:30:00,10:30:00,TRIER,1
T2,11:15:00,11:15:00,000200405060,2
T3,11:00:00,11:00:00,KIRCH,1
T3,11:20:00,11:20:00,200405035,2
T4,09:00:00,09:00:00,TRIER,1
T4,09:45:00,09:45:00,200405035,2
T5,14:00:00,14:00:00,TRIER,1
T5,14:45:00,14:45:00,200405035,2
T6,15:00:00,15:00:00,200405035,1
T6,15:40:00,15:40:00,TRIER,2
T7,23:50:00,23:50:00,TRIER,1
T7,24:30:00,24:30:00,200405035,2
";

    const STOPS: &str = "\
stop_id,stop_name
PARIS,Paris Est
TRIER,Trier Hbf
KIRCH,Kirchberg
200405035,\"Luxembourg, Gare Centrale\"
";

    fn stored() -> SimpleFileOptions {
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored)
    }

    fn feed_zip() -> Bytes {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = stored();
        for (name, content) in [
            ("calendar.txt", CALENDAR),
            ("calendar_dates.txt", CALENDAR_DATES),
            ("routes.txt", ROUTES),
            ("trips.txt", TRIPS),
            ("stop_times.txt", STOP_TIMES),
            ("stops.txt", STOPS),
        ] {
            writer.start_file(name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        Bytes::from(writer.finish().unwrap().into_inner())
    }

    fn stop_ids() -> Vec<String> {
        DEFAULT_GTFS_STOP_IDS.iter().map(|s| s.to_string()).collect()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn summary(arrivals: &[Arrival]) -> Vec<(String, u32, u32, u32)> {
        arrivals
            .iter()
            .map(|a| {
                (
                    a.identifier.clone(),
                    a.timestamp.day(),
                    a.timestamp.hour(),
                    a.timestamp.minute(),
                )
            })
            .collect()
    }

    #[test]
    fn gtfs_time_parsing() {
        assert_eq!(parse_gtfs_time("10:05:00"), Some(36_300));
        assert_eq!(parse_gtfs_time("24:30:00"), Some(88_200));
        assert_eq!(parse_gtfs_time("7:05"), Some(25_500));
        assert_eq!(parse_gtfs_time("10:65:00"), None);
        assert_eq!(parse_gtfs_time(""), None);
    }

    #[test]
    fn weekday_pattern_and_exceptions() {
        let timetable = parse_timetable(feed_zip(), &stop_ids()).unwrap();

        // Wednesday: regular weekday service.
        assert!(timetable.is_active("WK", date(14)));
        assert!(!timetable.is_active("SA", date(14)));
        assert!(!timetable.is_active("HOL", date(14)));

        // Thursday the 15th: weekday service removed, holiday service added.
        assert!(!timetable.is_active("WK", date(15)));
        assert!(timetable.is_active("HOL", date(15)));

        assert_eq!(date(17).weekday(), Weekday::Sat);
        assert!(timetable.is_active("SA", date(17)));
    }

    #[test]
    fn arrivals_for_a_weekday() {
        let timetable = parse_timetable(feed_zip(), &stop_ids()).unwrap();
        let mut arrivals = timetable.arrivals_on(date(14), &Luxembourg);
        arrivals.sort_by_key(|a| a.timestamp);

        assert_eq!(
            summary(&arrivals),
            vec![
                ("RE 5112".to_string(), 14, 11, 15),
                ("TGV 2851".to_string(), 14, 12, 5),
                ("RE 5201".to_string(), 15, 0, 30),
            ]
        );
        assert_eq!(arrivals[0].origin, "Trier Hbf");
        assert_eq!(arrivals[1].origin, "Paris Est");
        assert_eq!(arrivals[0].upstream, Upstream::GtfsTimetable);
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("calendar.txt", stored())
            .unwrap();
        writer.write_all(CALENDAR.as_bytes()).unwrap();
        let body = Bytes::from(writer.finish().unwrap().into_inner());

        assert!(matches!(
            parse_timetable(body, &stop_ids()),
            Err(GtfsError::MissingFile("routes.txt"))
        ));
    }

    #[test]
    fn garbage_is_not_an_archive() {
        assert!(matches!(
            parse_timetable(Bytes::from_static(b"not a zip"), &stop_ids()),
            Err(GtfsError::Zip(_))
        ));
    }

    #[test]
    fn dataset_listing_picks_first_zip() {
        let body = json!({ "resources": [
            { "format": "csv", "url": "http://x/a.csv" },
            { "format": "ZIP", "url": "http://x/feed.zip" },
            { "format": "zip", "url": "http://x/other.zip" },
        ]})
        .to_string();
        assert_eq!(decode_dataset(body.as_bytes()).unwrap(), "http://x/feed.zip");

        let body = json!({ "resources": [] }).to_string();
        assert!(matches!(
            decode_dataset(body.as_bytes()),
            Err(FetchError::Malformed(_))
        ));
    }

    fn adapter(transport: Arc<ScriptedTransport>) -> GtfsAdapter {
        let client = FetchClient::new(transport, RetryPolicy::default().with_max_attempts(1));
        let cache = Arc::new(PayloadCache::new(&CacheConfig::default()));
        GtfsAdapter::new(
            CachedFetcher::new(client, cache),
            GtfsConfig::default().with_dataset_url(DATASET_URL),
            Luxembourg,
        )
    }

    fn listing() -> Reply {
        Reply::json(json!({ "resources": [{ "format": "zip", "url": ZIP_URL }] }))
    }

    #[tokio::test]
    async fn tomorrow_includes_rollover_from_today() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .script(DATASET_URL, [listing()])
                .script(ZIP_URL, [Reply::Body(feed_zip())]),
        );
        let adapter = adapter(transport.clone());

        let now = Luxembourg.with_ymd_and_hms(2026, 10, 14, 10, 0, 0).unwrap();
        let result = adapter.fetch(&ReportWindow::tomorrow(now)).await;
        let arrivals = result.arrivals().unwrap();

        assert_eq!(
            summary(arrivals),
            vec![
                ("RE 5201".to_string(), 15, 0, 30),
                ("RE 5130".to_string(), 15, 14, 45),
            ]
        );
    }

    #[tokio::test]
    async fn archive_is_downloaded_once() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .script(DATASET_URL, [listing()])
                .script(ZIP_URL, [Reply::Body(feed_zip())]),
        );
        let adapter = adapter(transport.clone());
        let now = Luxembourg.with_ymd_and_hms(2026, 10, 14, 10, 0, 0).unwrap();
        let window = ReportWindow::now(now, chrono::Duration::hours(3));

        let first = adapter.fetch(&window).await;
        let second = adapter.fetch(&window).await;

        assert_eq!(first, second);
        assert_eq!(summary(first.arrivals().unwrap()).len(), 2);
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn broken_archive_is_unavailable_and_not_cached() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .script(DATASET_URL, [listing()])
                .script(ZIP_URL, [Reply::Body(Bytes::from_static(b"truncated"))]),
        );
        let adapter = adapter(transport.clone());
        let now = Luxembourg.with_ymd_and_hms(2026, 10, 14, 10, 0, 0).unwrap();
        let window = ReportWindow::now(now, chrono::Duration::hours(3));

        let result = adapter.fetch(&window).await;
        assert!(matches!(
            result,
            SourceResult::Unavailable(UnavailableReason::Malformed {
                upstream: Upstream::GtfsTimetable,
                ..
            })
        ));

        adapter.fetch(&window).await;
        // Listing cached, archive fetched again.
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn unreachable_portal_is_unavailable() {
        let transport = Arc::new(ScriptedTransport::new());
        let now = Luxembourg.with_ymd_and_hms(2026, 10, 14, 10, 0, 0).unwrap();
        let result = adapter(transport)
            .fetch(&ReportWindow::now(now, chrono::Duration::hours(3)))
            .await;

        assert!(matches!(
            result,
            SourceResult::Unavailable(UnavailableReason::Fetch {
                upstream: Upstream::GtfsDataset,
                ..
            })
        ));
    }
}
