//! Bounded caches for feed responses.
//!
//! Entries carry their insertion time and freshness is judged per read
//! against a max age, rather than with a cache-wide TTL: an entry that is
//! too stale to serve directly must remain readable, because the fallback
//! path in `client` reuses stale trips when the feed omits a route.
//!
//! Reads take the current instant explicitly, which keeps the age
//! arithmetic deterministic under test.

use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use moka::future::Cache as MokaCache;

use crate::domain::{NextTripsResult, RouteNo, RouteSummary, RouteTrips, StopNo};

/// Key for per-direction trip groups: (stop, route, direction name).
pub(crate) type DirectionKey = (StopNo, RouteNo, String);

/// Key for whole next-trips results.
pub(crate) type ResultKey = (StopNo, RouteNo);

/// Default capacity of the route summary cache.
const DEFAULT_ROUTE_CACHE_SIZE: u64 = 100;

/// Default capacity of each trip cache.
const DEFAULT_TRIP_CACHE_SIZE: u64 = 100;

/// Default freshness window for route summaries (1 day).
const DEFAULT_ROUTE_SUMMARY_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Default freshness window for next-trips results (5 minutes).
const DEFAULT_TRIP_MAX_AGE: Duration = Duration::from_secs(5 * 60);

/// Configuration for a client's caches.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached route summaries.
    pub route_cache_size: u64,

    /// Maximum number of entries in each trip cache.
    pub trip_cache_size: u64,

    /// How long a cached route summary may satisfy a read.
    pub route_summary_max_age: Duration,

    /// How long a cached next-trips result may satisfy a read before the
    /// feed is queried again. Zero makes every later read query the feed.
    pub trip_max_age: Duration,
}

impl CacheConfig {
    /// Create a config with the default sizes and ages.
    pub fn new() -> Self {
        Self {
            route_cache_size: DEFAULT_ROUTE_CACHE_SIZE,
            trip_cache_size: DEFAULT_TRIP_CACHE_SIZE,
            route_summary_max_age: DEFAULT_ROUTE_SUMMARY_MAX_AGE,
            trip_max_age: DEFAULT_TRIP_MAX_AGE,
        }
    }

    /// Set the route summary cache capacity.
    pub fn with_route_cache_size(mut self, entries: u64) -> Self {
        self.route_cache_size = entries;
        self
    }

    /// Set the trip cache capacity.
    pub fn with_trip_cache_size(mut self, entries: u64) -> Self {
        self.trip_cache_size = entries;
        self
    }

    /// Set the route summary freshness window.
    pub fn with_route_summary_max_age(mut self, max_age: Duration) -> Self {
        self.route_summary_max_age = max_age;
        self
    }

    /// Set the next-trips freshness window.
    pub fn with_trip_max_age(mut self, max_age: Duration) -> Self {
        self.trip_max_age = max_age;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Hit and miss counts, summed over a client's caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// A cached payload and when it was stored.
#[derive(Debug, Clone)]
struct Entry<T> {
    payload: T,
    stored_at: Instant,
}

/// Bounded cache whose entries know their insertion time.
pub(crate) struct TimedCache<K, V> {
    inner: MokaCache<K, Entry<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> TimedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(max_capacity: u64) -> Self {
        Self {
            inner: MokaCache::builder().max_capacity(max_capacity).build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up an entry of any age. Returns a clone of the payload and the
    /// entry's age.
    ///
    /// Counts a hit whenever the entry exists: the fallback path wants
    /// stale data.
    pub(crate) async fn get_any(&self, key: &K, now: Instant) -> Option<(V, Duration)> {
        match self.inner.get(key).await {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                let age = now.saturating_duration_since(entry.stored_at);
                Some((entry.payload, age))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Look up an entry no older than `max_age`. A staler entry counts as
    /// a miss and stays in place until the next insert overwrites it.
    pub(crate) async fn get_fresh(
        &self,
        key: &K,
        now: Instant,
        max_age: Duration,
    ) -> Option<(V, Duration)> {
        match self.inner.get(key).await {
            Some(entry) => {
                let age = now.saturating_duration_since(entry.stored_at);
                if age <= max_age {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    Some((entry.payload, age))
                } else {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    None
                }
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a payload, replacing any previous entry under the key.
    pub(crate) async fn insert(&self, key: K, payload: V, now: Instant) {
        self.inner
            .insert(
                key,
                Entry {
                    payload,
                    stored_at: now,
                },
            )
            .await;
    }

    pub(crate) fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    pub(crate) fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}

/// The three caches a client owns.
pub(crate) struct Caches {
    /// Route summaries by stop.
    pub(crate) summaries: TimedCache<StopNo, RouteSummary>,

    /// Per-direction trip groups, the fallback source.
    pub(crate) groups: TimedCache<DirectionKey, RouteTrips>,

    /// Last full result per stop and route, the cache-first source.
    pub(crate) results: TimedCache<ResultKey, NextTripsResult>,
}

impl Caches {
    pub(crate) fn new(config: &CacheConfig) -> Self {
        Self {
            summaries: TimedCache::new(config.route_cache_size),
            groups: TimedCache::new(config.trip_cache_size),
            results: TimedCache::new(config.trip_cache_size),
        }
    }

    /// Hit and miss counts summed over all three caches.
    pub(crate) fn stats(&self) -> CacheStats {
        let summaries = self.summaries.stats();
        let groups = self.groups.stats();
        let results = self.results.stats();
        CacheStats {
            hits: summaries.hits + groups.hits + results.hits,
            misses: summaries.misses + groups.misses + results.misses,
        }
    }

    pub(crate) fn clear(&self) {
        self.summaries.invalidate_all();
        self.groups.invalidate_all();
        self.results.invalidate_all();
    }
}
