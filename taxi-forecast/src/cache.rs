//! In-memory TTL cache for raw upstream payloads.
//!
//! Entries carry their own TTL and are checked lazily on read against the
//! tokio clock: a hit at age ≤ ttl, a miss at age > ttl. Expired entries are
//! removed by [`TtlCache::sweep`], which the process context runs
//! periodically. moka provides the concurrent map and the capacity bound.
//!
//! Only payloads that decoded successfully are stored, and nothing is ever
//! served past its TTL.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Timelike};
use chrono_tz::Tz;
use moka::Expiry;
use moka::future::Cache as MokaCache;
use tokio::time::Instant;
use tracing::debug;

use crate::domain::{ReportMode, Upstream};
use crate::fetch::{FetchClient, FetchError, FetchRequest};

/// Configuration for the payload cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Default TTL for upstream responses.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,

    /// How often expired entries are swept.
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(600),
            max_capacity: 256,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_max_capacity(mut self, n: u64) -> Self {
        self.max_capacity = n;
        self
    }
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    inserted_at: Instant,
    ttl: Duration,
}

impl<V> Entry<V> {
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) <= self.ttl
    }
}

/// Lets moka drop entries it would otherwise keep until a sweep. The grace
/// period keeps moka's wall clock from beating the lazy check.
struct EntryExpiry;

const EXPIRY_GRACE: Duration = Duration::from_secs(1);

impl<K, V> Expiry<K, Entry<V>> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &K,
        value: &Entry<V>,
        _created_at: std::time::Instant,
    ) -> Option<Duration> {
        Some(value.ttl.saturating_add(EXPIRY_GRACE))
    }

    fn expire_after_update(
        &self,
        _key: &K,
        value: &Entry<V>,
        _updated_at: std::time::Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl.saturating_add(EXPIRY_GRACE))
    }
}

/// Concurrent key → value store with per-entry expiry.
///
/// Reads and writes on distinct keys never block each other; writes to the
/// same key are last-write-wins.
pub struct TtlCache<K, V> {
    inner: MokaCache<K, Entry<V>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(config: &CacheConfig) -> Self {
        let inner = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(EntryExpiry)
            .build();
        Self { inner }
    }

    /// The value for `key`, unless absent or older than its TTL.
    pub async fn get(&self, key: &K) -> Option<V> {
        let entry = self.inner.get(key).await?;
        entry.is_fresh(Instant::now()).then_some(entry.value)
    }

    /// Store `value` under `key` for `ttl`.
    pub async fn set(&self, key: K, value: V, ttl: Duration) {
        let entry = Entry {
            value,
            inserted_at: Instant::now(),
            ttl,
        };
        self.inner.insert(key, entry).await;
    }

    /// Remove every expired entry. Returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<Arc<K>> = self
            .inner
            .iter()
            .filter(|(_, entry)| !entry.is_fresh(now))
            .map(|(key, _)| key)
            .collect();

        for key in &expired {
            self.inner.invalidate(key.as_ref()).await;
        }
        self.inner.run_pending_tasks().await;
        expired.len()
    }

    /// Number of stored entries, fresh or not.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Drop every entry. Returns how many were stored.
    pub async fn invalidate_all(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        let count = self.inner.entry_count();
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
        count
    }
}

/// Cache key for upstream payloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub upstream: Upstream,

    /// Mode and window, e.g. `now:2026-10-14`, or `feed` for archives.
    pub scope: String,
}

impl CacheKey {
    /// Key for a per-day board request.
    pub fn windowed(upstream: Upstream, mode: ReportMode, day: NaiveDate) -> Self {
        Self {
            upstream,
            scope: format!("{}:{}", mode.as_str(), day.format("%Y-%m-%d")),
        }
    }

    /// Key for a time-anchored board request, bucketed in `bucket_mins`
    /// steps so nearby requests share an entry.
    pub fn bucketed(
        upstream: Upstream,
        mode: ReportMode,
        start: &DateTime<Tz>,
        span_mins: i64,
        bucket_mins: u32,
    ) -> Self {
        let bucket = (start.hour() * 60 + start.minute()) / bucket_mins.max(1);
        Self {
            upstream,
            scope: format!(
                "{}:{}:{}:{}",
                mode.as_str(),
                start.format("%Y-%m-%d"),
                bucket,
                span_mins
            ),
        }
    }

    /// Key for a whole-feed download.
    pub fn feed(upstream: Upstream) -> Self {
        Self {
            upstream,
            scope: "feed".to_string(),
        }
    }
}

/// Raw upstream bodies.
pub type PayloadCache = TtlCache<CacheKey, Bytes>;

/// Fetch client fronted by the payload cache.
#[derive(Clone)]
pub struct CachedFetcher {
    client: FetchClient,
    cache: Arc<PayloadCache>,
}

impl CachedFetcher {
    pub fn new(client: FetchClient, cache: Arc<PayloadCache>) -> Self {
        Self { client, cache }
    }

    /// Decode a cached payload for `key`, or fetch, decode and cache it.
    ///
    /// The body is only cached once `decode` accepts it. A cached body that
    /// no longer decodes is treated as a miss.
    pub async fn load<T, F>(
        &self,
        key: CacheKey,
        ttl: Duration,
        request: &FetchRequest,
        decode: F,
    ) -> Result<T, FetchError>
    where
        F: Fn(&[u8]) -> Result<T, FetchError>,
    {
        if let Some(body) = self.cache.get(&key).await {
            match decode(&body) {
                Ok(value) => {
                    debug!(upstream = %key.upstream, scope = %key.scope, "cache hit");
                    return Ok(value);
                }
                Err(e) => {
                    debug!(upstream = %key.upstream, error = %e, "cached payload rejected")
                }
            }
        } else {
            debug!(upstream = %key.upstream, scope = %key.scope, "cache miss");
        }

        let body = self.client.fetch(request).await?;
        let value = decode(&body)?;
        self.cache.set(key, body, ttl).await;
        Ok(value)
    }

    /// Raw cached body, if fresh.
    pub async fn cached(&self, key: &CacheKey) -> Option<Bytes> {
        self.cache.get(key).await
    }

    /// Store an already-validated body.
    pub async fn store(&self, key: CacheKey, body: Bytes, ttl: Duration) {
        self.cache.set(key, body, ttl).await;
    }

    /// Access the client for requests that bypass the cache.
    pub fn client(&self) -> &FetchClient {
        &self.client
    }
}
