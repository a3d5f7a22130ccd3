//! Process settings loaded from the environment.
//!
//! Every variable is optional; defaults match the public Luxembourg
//! upstreams. A variable that is set but malformed is a startup error.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;

use crate::analysis::{AnalysisConfig, TimeBlockLayout};
use crate::cache::CacheConfig;
use crate::fetch::{HttpTransportConfig, RetryPolicy};
use crate::report::DEFAULT_MESSAGE_LIMIT;
use crate::sources::{FlightConfig, GtfsConfig, HafasConfig};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{key}: cannot parse {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str, reason: impl ToString) -> Self {
        ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Upstream configuration for both sources.
#[derive(Debug, Clone, Default)]
pub struct SourcesConfig {
    pub flights: FlightConfig,
    pub hafas: HafasConfig,
    pub gtfs: GtfsConfig,
}

/// Everything the process needs to start.
#[derive(Debug, Clone)]
pub struct Settings {
    pub timezone: Tz,
    pub log_level: String,
    pub bind_addr: SocketAddr,

    /// Hours between automatic reports; zero disables them.
    pub report_interval_hours: u64,

    pub cache: CacheConfig,
    pub retry: RetryPolicy,
    pub http: HttpTransportConfig,

    /// How long a report waits for its sources.
    pub pipeline_deadline: Duration,

    pub analysis: AnalysisConfig,
    pub sources: SourcesConfig,

    /// Where automatic reports are posted, besides the log.
    pub webhook_url: Option<String>,

    /// Longest message part sent to a chat transport, in bytes.
    pub message_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Europe::Luxembourg,
            log_level: "info".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            report_interval_hours: 3,
            cache: CacheConfig::default(),
            retry: RetryPolicy::default(),
            http: HttpTransportConfig::default(),
            pipeline_deadline: Duration::from_secs(25),
            analysis: AnalysisConfig::default(),
            sources: SourcesConfig::default(),
            webhook_url: None,
            message_limit: DEFAULT_MESSAGE_LIMIT,
        }
    }
}

/// Reads settings from any key/value lookup.
struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Raw value; blank counts as unset.
    fn raw(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: ToString,
    {
        match self.raw(key) {
            Some(v) => v.parse().map_err(|e: T::Err| ConfigError::invalid(key, &v, e)),
            None => Ok(default),
        }
    }

    fn secs(&self, key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
        self.parsed(key, default.as_secs()).map(Duration::from_secs)
    }

    fn millis(&self, key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
        let default = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
        self.parsed(key, default).map(Duration::from_millis)
    }

    fn flag(&self, key: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.raw(key) {
            None => Ok(default),
            Some(v) => match v.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::invalid(key, &v, "expected a boolean")),
            },
        }
    }
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings from a fixed map of variables.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars { lookup };
        let defaults = Settings::default();

        let timezone = match vars.raw("TIMEZONE") {
            Some(v) => v
                .parse::<Tz>()
                .map_err(|e| ConfigError::invalid("TIMEZONE", &v, e))?,
            None => defaults.timezone,
        };
        let log_level = vars.raw("LOG_LEVEL").unwrap_or(defaults.log_level);
        let bind_addr = vars.parsed("BIND_ADDR", defaults.bind_addr)?;
        let report_interval_hours =
            vars.parsed("REPORT_INTERVAL_HOURS", defaults.report_interval_hours)?;

        let payload_ttl = vars.secs("CACHE_TTL_SECS", defaults.cache.ttl)?;
        let max_entries = vars.parsed("CACHE_MAX_ENTRIES", defaults.cache.max_capacity)?;
        let cache = defaults
            .cache
            .with_ttl(payload_ttl)
            .with_max_capacity(max_entries);

        let fetch_timeout = vars.secs("FETCH_TIMEOUT_SECS", defaults.retry.timeout)?;
        let max_attempts = vars.parsed("FETCH_MAX_ATTEMPTS", defaults.retry.max_attempts)?;
        let initial_backoff = vars.millis("FETCH_BACKOFF_MS", defaults.retry.initial_backoff)?;
        let max_backoff = vars.millis("FETCH_MAX_BACKOFF_MS", defaults.retry.max_backoff)?;
        let retry = defaults
            .retry
            .with_max_attempts(max_attempts)
            .with_timeout(fetch_timeout)
            .with_backoff(initial_backoff, max_backoff);

        // The transport ceiling must never cut an attempt short.
        let transport_timeout = defaults.http.timeout.max(fetch_timeout);
        let accept_invalid_certs = vars.flag("ACCEPT_INVALID_CERTS", false)?;
        let http = defaults
            .http
            .with_timeout(transport_timeout)
            .with_accept_invalid_certs(accept_invalid_certs);

        let pipeline_deadline = vars.secs("PIPELINE_DEADLINE_SECS", defaults.pipeline_deadline)?;
        let message_limit = vars.parsed("MESSAGE_LIMIT", defaults.message_limit)?;
        if message_limit == 0 {
            return Err(ConfigError::invalid("MESSAGE_LIMIT", "0", "must be positive"));
        }

        let blocks = match vars.raw("TIME_BLOCK_BOUNDARIES") {
            Some(v) => TimeBlockLayout::parse(&v)
                .map_err(|e| ConfigError::invalid("TIME_BLOCK_BOUNDARIES", &v, e))?,
            None => TimeBlockLayout::default(),
        };
        let analysis = AnalysisConfig {
            slot_minutes: positive(&vars, "SLOT_MINUTES", defaults.analysis.slot_minutes)?,
            now_window_hours: positive(&vars, "NOW_WINDOW_HOURS", defaults.analysis.now_window_hours)?,
            lead_threshold_minutes: vars.parsed(
                "LEAD_THRESHOLD_MINUTES",
                defaults.analysis.lead_threshold_minutes,
            )?,
            blocks,
        };

        let mut flights = FlightConfig::default().with_ttl(payload_ttl);
        if let Some(url) = vars.raw("FLIGHT_API_URL") {
            flights = flights.with_base_url(url);
        }

        let mut hafas = HafasConfig::default().with_ttl(payload_ttl);
        if let Some(url) = vars.raw("HAFAS_API_URL") {
            hafas = hafas.with_base_url(url);
        }
        if let Some(id) = vars.raw("HAFAS_ACCESS_ID") {
            hafas = hafas.with_access_id(id);
        }
        if let Some(id) = vars.raw("HAFAS_STATION_ID") {
            hafas = hafas.with_station_id(id);
        }

        let mut gtfs = GtfsConfig::default().with_feed_ttl(vars.secs(
            "GTFS_TTL_SECS",
            GtfsConfig::default().feed_ttl,
        )?);
        if let Some(url) = vars.raw("GTFS_DATASET_URL") {
            gtfs = gtfs.with_dataset_url(url);
        }
        if let Some(ids) = vars.raw("GTFS_STOP_IDS") {
            let ids: Vec<String> = ids
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if ids.is_empty() {
                return Err(ConfigError::invalid("GTFS_STOP_IDS", "", "no stop ids"));
            }
            gtfs = gtfs.with_stop_ids(ids);
        }

        Ok(Self {
            timezone,
            log_level,
            bind_addr,
            report_interval_hours,
            cache,
            retry,
            http,
            pipeline_deadline,
            analysis,
            sources: SourcesConfig {
                flights,
                hafas,
                gtfs,
            },
            webhook_url: vars.raw("REPORT_WEBHOOK_URL"),
            message_limit,
        })
    }
}

fn positive<F>(vars: &Vars<F>, key: &'static str, default: i64) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = vars.parsed(key, default)?;
    if value > 0 {
        Ok(value)
    } else {
        Err(ConfigError::invalid(key, &value.to_string(), "must be positive"))
    }
}
