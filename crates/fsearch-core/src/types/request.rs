//! Scan request type.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use super::filter::ScanFilter;

/// A request to search a directory tree.
///
/// # Examples
///
/// ```
/// use fsearch_core::{ScanFilter, ScanRequest};
///
/// let request = ScanRequest::new("/var/log")
///     .with_threads(2)
///     .with_depth_limit(1)
///     .with_filter(ScanFilter::new().with_name_pattern("*.log"));
///
/// assert_eq!(request.threads_count, Some(2));
/// assert_eq!(request.depth_limit, Some(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Root directory of the traversal.
    pub directory_path: Utf8PathBuf,

    /// Worker threads for this scan; `None` uses the configured default.
    #[serde(default)]
    pub threads_count: Option<usize>,

    /// Maximum number of directory levels descended below the root;
    /// `None` is unlimited and `Some(0)` visits only the root's own files.
    #[serde(default)]
    pub depth_limit: Option<u32>,

    /// Criteria every reported file satisfies.
    #[serde(default)]
    pub filter: ScanFilter,
}

impl ScanRequest {
    /// Creates an unfiltered, unlimited-depth request for `directory_path`.
    #[must_use]
    pub fn new(directory_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            directory_path: directory_path.into(),
            threads_count: None,
            depth_limit: None,
            filter: ScanFilter::default(),
        }
    }

    /// Sets the worker thread count.
    #[must_use]
    pub const fn with_threads(mut self, threads: usize) -> Self {
        self.threads_count = Some(threads);
        self
    }

    /// Sets the depth limit.
    #[must_use]
    pub const fn with_depth_limit(mut self, depth_limit: u32) -> Self {
        self.depth_limit = Some(depth_limit);
        self
    }

    /// Sets the filter.
    #[must_use]
    pub fn with_filter(mut self, filter: ScanFilter) -> Self {
        self.filter = filter;
        self
    }
}
