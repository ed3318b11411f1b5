//! Explicit bar cache with fixed-duration expiry.
//!
//! Key = ticker + date range. Callers construct the cache and hand it to
//! `CachedProvider`; nothing is cached in process-global state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::provider::{DataError, DataProvider};
use crate::clock::{Clock, SystemClock};
use crate::domain::Bar;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub ticker: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CacheKey {
    pub fn new(ticker: &str, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            ticker: ticker.to_ascii_uppercase(),
            start,
            end,
        }
    }
}

pub trait BarCache: Send + Sync {
    /// Cached bars for `key`, or `None` when absent or expired.
    fn get(&self, key: &CacheKey) -> Option<Vec<Bar>>;

    fn put(&self, key: CacheKey, bars: Vec<Bar>);
}

struct Entry {
    bars: Vec<Bar>,
    stored_at: DateTime<Utc>,
}

/// In-process cache. Expired entries are evicted on lookup.
pub struct MemoryCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<CacheKey, Entry>>,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BarCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<Vec<Bar>> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let expired = match entries.get(key) {
            None => return None,
            Some(entry) => self.clock.now() - entry.stored_at >= self.ttl,
        };
        if expired {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|e| e.bars.clone())
    }

    fn put(&self, key: CacheKey, bars: Vec<Bar>) {
        let stored_at = self.clock.now();
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, Entry { bars, stored_at });
    }
}

/// Read-through wrapper: serve from the cache, otherwise fetch and store.
/// Failures are not cached.
pub struct CachedProvider<P, C> {
    inner: P,
    cache: C,
}

impl<P: DataProvider, C: BarCache> CachedProvider<P, C> {
    pub fn new(inner: P, cache: C) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }
}

impl<P: DataProvider, C: BarCache> DataProvider for CachedProvider<P, C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<Bar>, DataError> {
        let key = CacheKey::new(symbol, start, end);
        if let Some(bars) = self.cache.get(&key) {
            debug!(symbol, "bar cache hit");
            return Ok(bars);
        }
        debug!(symbol, provider = self.inner.name(), "bar cache miss");
        let bars = self.inner.fetch(symbol, start, end)?;
        self.cache.put(key, bars.clone());
        Ok(bars)
    }
}
