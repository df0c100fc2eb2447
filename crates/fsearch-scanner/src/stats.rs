//! Scan progress statistics with atomic counters.
//!
//! This module provides [`ScanStats`] for tracking a running scan and
//! [`StatsSnapshot`] for point-in-time views of it.
//!
//! # Thread Safety
//!
//! All counters use [`AtomicU64`] with [`Relaxed`](std::sync::atomic::Ordering::Relaxed)
//! ordering. The numbers are informational and don't need to be consistent
//! with each other at any instant.
//!
//! # Examples
//!
//! ```
//! use fsearch_scanner::ScanStats;
//!
//! let stats = ScanStats::new();
//! stats.record_directory();
//! stats.record_file();
//! stats.record_match();
//!
//! let snapshot = stats.snapshot();
//! println!("{} of {} files matched", snapshot.files_matched, snapshot.files_examined);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Atomic counters for one scan.
#[derive(Debug, Default)]
pub struct ScanStats {
    /// Directories whose listing succeeded.
    directories_visited: AtomicU64,
    /// Directories whose listing failed and were treated as empty.
    directories_unreadable: AtomicU64,
    /// Files handed to the matcher.
    files_examined: AtomicU64,
    /// Files left out because their path is not valid UTF-8.
    files_skipped: AtomicU64,
    /// Files that matched.
    files_matched: AtomicU64,
}

impl ScanStats {
    /// Creates a new [`ScanStats`] with all counters at zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use fsearch_scanner::ScanStats;
    ///
    /// let stats = ScanStats::new();
    /// assert_eq!(stats.snapshot().files_examined, 0);
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a directory that was listed.
    #[inline]
    pub fn record_directory(&self) {
        self.directories_visited.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a directory that could not be listed.
    #[inline]
    pub fn record_unreadable_directory(&self) {
        self.directories_unreadable.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a file handed to the matcher.
    #[inline]
    pub fn record_file(&self) {
        self.files_examined.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a file that could not be represented and was left out.
    #[inline]
    pub fn record_skipped_file(&self) {
        self.files_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a matching file.
    #[inline]
    pub fn record_match(&self) {
        self.files_matched.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            directories_visited: self.directories_visited.load(Ordering::Relaxed),
            directories_unreadable: self.directories_unreadable.load(Ordering::Relaxed),
            files_examined: self.files_examined.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            files_matched: self.files_matched.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of [`ScanStats`].
///
/// Safe to store, serialize, and send between threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Directories whose listing succeeded.
    pub directories_visited: u64,
    /// Directories whose listing failed.
    pub directories_unreadable: u64,
    /// Files handed to the matcher.
    pub files_examined: u64,
    /// Files left out because their path is not valid UTF-8.
    #[serde(default)]
    pub files_skipped: u64,
    /// Files that matched.
    pub files_matched: u64,
}

impl StatsSnapshot {
    /// Returns the share of examined files that matched, as a percentage.
    ///
    /// Returns 0.0 if nothing was examined.
    ///
    /// # Examples
    ///
    /// ```
    /// use fsearch_scanner::StatsSnapshot;
    ///
    /// let snap = StatsSnapshot {
    ///     files_examined: 200,
    ///     files_matched: 50,
    ///     ..Default::default()
    /// };
    /// assert!((snap.match_percent() - 25.0).abs() < 0.1);
    /// ```
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Acceptable for statistics display
    pub fn match_percent(&self) -> f64 {
        if self.files_examined == 0 {
            return 0.0;
        }

        (self.files_matched as f64 / self.files_examined as f64) * 100.0
    }

    /// Returns the total number of directories encountered.
    #[inline]
    #[must_use]
    pub const fn directories_seen(&self) -> u64 {
        self.directories_visited + self.directories_unreadable
    }
}
