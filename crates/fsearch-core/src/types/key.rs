//! Request fingerprints used as cache keys.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use super::filter::ScanFilter;
use super::request::ScanRequest;

/// Deterministic fingerprint of a request's effective parameters.
///
/// Built from the lexically normalized directory path, the depth limit, and
/// the serialized filter. The thread count is deliberately excluded since it
/// does not change the result.
///
/// # Examples
///
/// ```
/// use fsearch_core::{CacheKey, ScanRequest};
///
/// let a = CacheKey::for_request(&ScanRequest::new("/data/").with_threads(2));
/// let b = CacheKey::for_request(&ScanRequest::new("/data").with_threads(8));
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds the key for a request.
    #[must_use]
    pub fn for_request(request: &ScanRequest) -> Self {
        Self::new(&request.directory_path, request.depth_limit, &request.filter)
    }

    /// Builds the key from its parts.
    #[must_use]
    pub fn new(directory: &Utf8Path, depth_limit: Option<u32>, filter: &ScanFilter) -> Self {
        let directory: Utf8PathBuf = directory.components().collect();
        let depth = depth_limit.map_or_else(|| "unlimited".to_owned(), |d| d.to_string());
        let filter = serde_json::to_string(filter).unwrap_or_else(|_| format!("{filter:?}"));
        Self(format!("{directory}:{depth}:{filter}"))
    }

    /// Wraps a key previously obtained from [`as_str`](Self::as_str), for
    /// example when reading it back from a cache.
    #[must_use]
    pub const fn from_raw(raw: String) -> Self {
        Self(raw)
    }

    /// Returns the key as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
