//! Error types for the fsearch-scanner crate.
//!
//! This module provides [`ScanError`] for everything the orchestrator reports
//! to callers, and [`WalkError`] for the unexpected failures that abort a
//! single traversal.

use std::sync::Arc;

use camino::Utf8PathBuf;
use fsearch_core::{ConfigError, FilterError, ScanToken};

/// Errors that can occur while starting, polling, or running scans.
///
/// # Error Recovery Strategy
///
/// - **Request errors** ([`ScanError::InconsistentFilter`],
///   [`ScanError::InvalidThreadCount`], [`ScanError::InvalidRoot`]): reported
///   before any work starts; the caller fixes the request.
/// - **Admission** ([`ScanError::AdmissionLimitExceeded`]): transient; retry
///   once running scans finish.
/// - **Lookup** ([`ScanError::NotFound`]): the token is unknown, killed, or
///   reclaimed.
/// - **Execution** ([`ScanError::Execution`]): the traversal itself failed;
///   surfaced once by the next poll.
///
/// Per-directory I/O errors never show up here: the walker treats an
/// unreadable subtree as empty.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The filter is internally inconsistent.
    #[error("inconsistent filter: {0}")]
    InconsistentFilter(#[from] FilterError),

    /// Too many scans are already running.
    #[error("admission limit exceeded: {limit} scans already running")]
    AdmissionLimitExceeded {
        /// The configured maximum number of concurrent scans.
        limit: usize,
    },

    /// The requested thread count is zero or above the hard ceiling.
    #[error("invalid thread count {requested}: must be between 1 and {max}")]
    InvalidThreadCount {
        /// The thread count that was asked for.
        requested: usize,
        /// The hard ceiling.
        max: usize,
    },

    /// The scan root is missing or not a directory.
    #[error("invalid scan root {path}: {reason}")]
    InvalidRoot {
        /// The offending path.
        path: Utf8PathBuf,
        /// Why it was rejected.
        reason: String,
    },

    /// The orchestrator configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The per-scan worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// No cached result and no live scan exist for the token.
    #[error("no scan found for token {0}")]
    NotFound(ScanToken),

    /// The traversal failed with an unexpected error.
    #[error("scan {token} failed: {source}")]
    Execution {
        /// The failed scan.
        token: ScanToken,
        /// The walker failure.
        #[source]
        source: Arc<WalkError>,
    },

    /// A scan's completion timestamp was set twice.
    #[error("completion time of scan {0} was already set")]
    CompletionAlreadyMarked(ScanToken),
}

impl ScanError {
    /// Creates a new [`ScanError::InvalidRoot`] error.
    #[inline]
    pub fn invalid_root(path: impl Into<Utf8PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidRoot {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if retrying the same call later may succeed.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::AdmissionLimitExceeded { .. })
    }

    /// Returns the token this error concerns, if any.
    #[must_use]
    pub const fn token(&self) -> Option<ScanToken> {
        match self {
            Self::NotFound(token)
            | Self::CompletionAlreadyMarked(token)
            | Self::Execution { token, .. } => Some(*token),
            _ => None,
        }
    }
}

/// Unexpected failures that abort a traversal.
///
/// Ordinary I/O errors are not represented: they are absorbed per subtree.
/// Unrepresentable paths are skipped and counted, not raised.
#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    /// A worker panicked while walking.
    #[error("walker panicked: {0}")]
    Panicked(String),
}
