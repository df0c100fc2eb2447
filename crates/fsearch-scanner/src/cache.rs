//! Result cache contract and its in-memory backend.
//!
//! This module provides three layers:
//!
//! - [`ResultCache`]: the byte-level `put`/`get` contract a backend fulfils.
//!   `put` reports rejection with `false` and never fails.
//! - [`MemoryResultCache`]: a `moka` backend with a time-to-live, a capacity
//!   bound, and a per-entry size ceiling.
//! - [`ScanCache`]: the typed adapter the orchestrator talks to. It
//!   serializes results with `serde_json` and keeps three namespaces:
//!   complete results, interrupted results, and the token → key mapping.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use camino::Utf8Path;
//! use fsearch_core::{CacheKey, ResultTier, ScanFilter};
//! use fsearch_scanner::{MemoryResultCache, ScanCache};
//!
//! let backend = MemoryResultCache::new(100, Duration::from_secs(60), 1024 * 1024);
//! let cache = ScanCache::new(Arc::new(backend));
//!
//! let key = CacheKey::new(Utf8Path::new("/data"), None, &ScanFilter::new());
//! assert!(cache.store(ResultTier::Complete, &key, &["/data/a.txt".to_owned()]));
//! assert_eq!(cache.lookup_complete(&key), Some(vec!["/data/a.txt".to_owned()]));
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use fsearch_core::{CacheConfig, CacheKey, ResultTier, ScanToken};
use moka::sync::Cache;
use tracing::{debug, warn};

/// Keyed byte store with a rejection policy.
///
/// Implementations must be [`Send`] and [`Sync`]: completion handlers write
/// from worker threads while pollers read from caller threads.
pub trait ResultCache: Send + Sync {
    /// Stores `value` under `key`. Returns `false` if the value was rejected
    /// or the backend is unavailable.
    fn put(&self, key: &str, value: Vec<u8>) -> bool;

    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<Vec<u8>>;
}

/// In-process [`ResultCache`] backed by `moka`.
///
/// Entries expire after the configured time-to-live and the least valuable
/// ones are evicted once the capacity is reached. Values larger than the
/// per-entry ceiling are refused outright.
#[derive(Clone)]
pub struct MemoryResultCache {
    entries: Cache<String, Arc<[u8]>>,
    max_entry_size: u64,
}

impl MemoryResultCache {
    /// Creates a backend.
    ///
    /// # Arguments
    ///
    /// * `max_entries` - Capacity in number of entries
    /// * `time_to_live` - Lifetime of each entry from insertion
    /// * `max_entry_size` - Largest accepted value, in bytes
    #[must_use]
    pub fn new(max_entries: u64, time_to_live: Duration, max_entry_size: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(time_to_live)
            .build();

        Self {
            entries,
            max_entry_size,
        }
    }

    /// Creates a backend from the `cache` configuration section.
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            config.max_entries,
            config.time_to_live(),
            config.max_entry_size.as_u64(),
        )
    }

    /// Returns the approximate number of stored entries.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

impl ResultCache for MemoryResultCache {
    fn put(&self, key: &str, value: Vec<u8>) -> bool {
        let size = value.len() as u64;
        if size > self.max_entry_size {
            debug!(key, size, limit = self.max_entry_size, "Refusing oversized cache entry");
            return false;
        }
        self.entries.insert(key.to_owned(), Arc::from(value));
        true
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.get(key).map(|value| value.to_vec())
    }
}

impl fmt::Debug for MemoryResultCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryResultCache")
            .field("entries", &self.entries.entry_count())
            .field("max_entry_size", &self.max_entry_size)
            .finish()
    }
}

/// Typed view over a [`ResultCache`] backend.
///
/// Backend errors never escape: a failed write is `false`, a failed or
/// undecodable read is a miss.
#[derive(Clone)]
pub struct ScanCache {
    backend: Arc<dyn ResultCache>,
}

impl ScanCache {
    /// Wraps a backend.
    #[must_use]
    pub fn new(backend: Arc<dyn ResultCache>) -> Self {
        Self { backend }
    }

    fn tier_key(tier: ResultTier, key: &CacheKey) -> String {
        format!("{}:{key}", tier.label())
    }

    fn token_key(token: ScanToken) -> String {
        format!("token:{token}")
    }

    /// Stores a finished result in `tier`. Returns `false` if it could not be
    /// serialized or the backend refused it.
    pub fn store(&self, tier: ResultTier, key: &CacheKey, result: &[String]) -> bool {
        let payload = match serde_json::to_vec(result) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(key = %key, error = %err, "Failed to serialize scan result");
                return false;
            }
        };
        let size = payload.len();

        if self.backend.put(&Self::tier_key(tier, key), payload) {
            debug!(key = %key, tier = %tier, size, "Cached scan result");
            true
        } else {
            warn!(key = %key, tier = %tier, size, "Cache rejected scan result");
            false
        }
    }

    /// Records which cache key a token's scan was computed for.
    pub fn remember_token(&self, token: ScanToken, key: &CacheKey) -> bool {
        self.backend
            .put(&Self::token_key(token), key.as_str().as_bytes().to_vec())
    }

    /// Returns the cache key recorded for `token`, if any.
    #[must_use]
    pub fn key_for_token(&self, token: ScanToken) -> Option<CacheKey> {
        let bytes = self.backend.get(&Self::token_key(token))?;
        match String::from_utf8(bytes) {
            Ok(key) => Some(CacheKey::from_raw(key)),
            Err(err) => {
                warn!(token = %token, error = %err, "Discarding corrupt token mapping");
                None
            }
        }
    }

    /// Looks up `key` in one tier.
    #[must_use]
    pub fn lookup(&self, tier: ResultTier, key: &CacheKey) -> Option<Vec<String>> {
        let bytes = self.backend.get(&Self::tier_key(tier, key))?;
        match serde_json::from_slice(&bytes) {
            Ok(result) => Some(result),
            Err(err) => {
                warn!(key = %key, tier = %tier, error = %err, "Discarding undecodable cache entry");
                None
            }
        }
    }

    /// Looks up `key` in the complete tier only.
    #[must_use]
    pub fn lookup_complete(&self, key: &CacheKey) -> Option<Vec<String>> {
        self.lookup(ResultTier::Complete, key)
    }

    /// Looks up `key` in the complete tier, then the interrupted tier.
    #[must_use]
    pub fn lookup_any(&self, key: &CacheKey) -> Option<(ResultTier, Vec<String>)> {
        [ResultTier::Complete, ResultTier::Interrupted]
            .into_iter()
            .find_map(|tier| self.lookup(tier, key).map(|result| (tier, result)))
    }
}

impl fmt::Debug for ScanCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanCache").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8Path;
    use fsearch_core::ScanFilter;

    use super::*;

    fn key(dir: &str) -> CacheKey {
        CacheKey::new(Utf8Path::new(dir), None, &ScanFilter::new())
    }

    fn cache(max_entry_size: u64) -> ScanCache {
        ScanCache::new(Arc::new(MemoryResultCache::new(
            100,
            Duration::from_secs(60),
            max_entry_size,
        )))
    }

    #[test]
    fn test_memory_cache_put_get() {
        let backend = MemoryResultCache::new(10, Duration::from_secs(60), 16);
        assert!(backend.put("k", b"value".to_vec()));
        assert_eq!(backend.get("k"), Some(b"value".to_vec()));
        assert_eq!(backend.get("missing"), None);
    }

    #[test]
    fn test_memory_cache_rejects_oversized_values() {
        let backend = MemoryResultCache::new(10, Duration::from_secs(60), 4);
        assert!(backend.put("fits", b"1234".to_vec()));
        assert!(!backend.put("too-big", b"12345".to_vec()));
        assert_eq!(backend.get("too-big"), None);
    }

    #[test]
    fn test_memory_cache_expires_entries() {
        let backend = MemoryResultCache::new(10, Duration::from_millis(20), 16);
        assert!(backend.put("k", b"v".to_vec()));
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(backend.get("k"), None);
    }

    #[test]
    fn test_tiers_are_separate() {
        let cache = cache(1024);
        let key = key("/r");
        let paths = vec!["/r/a".to_owned()];

        assert!(cache.store(ResultTier::Interrupted, &key, &paths));
        assert_eq!(cache.lookup_complete(&key), None);
        assert_eq!(
            cache.lookup_any(&key),
            Some((ResultTier::Interrupted, paths.clone()))
        );

        assert!(cache.store(ResultTier::Complete, &key, &[]));
        assert_eq!(cache.lookup_any(&key), Some((ResultTier::Complete, Vec::new())));
    }

    #[test]
    fn test_token_mapping() {
        let cache = cache(1024);
        let token = ScanToken::generate();
        let key = key("/srv");

        assert_eq!(cache.key_for_token(token), None);
        assert!(cache.remember_token(token, &key));
        assert_eq!(cache.key_for_token(token), Some(key));
    }

    #[test]
    fn test_store_reports_rejection() {
        // `["/r/a"]` serializes to 8 bytes.
        let cache = cache(7);
        let key = key("/r");
        assert!(!cache.store(ResultTier::Complete, &key, &["/r/a".to_owned()]));
        assert_eq!(cache.lookup_complete(&key), None);
    }

    #[test]
    fn test_undecodable_entry_is_a_miss() {
        let backend = Arc::new(MemoryResultCache::new(10, Duration::from_secs(60), 1024));
        let key = key("/r");
        backend.put(&format!("complete:{key}"), b"not json".to_vec());

        let cache = ScanCache::new(backend);
        assert_eq!(cache.lookup_complete(&key), None);
    }
}
