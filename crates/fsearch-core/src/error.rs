//! Error types for the fsearch-core crate.
//!
//! This module provides [`ConfigError`] for configuration loading and
//! validation failures, and [`FilterError`] for scan filters that are rejected
//! before any traversal starts.

/// Errors that can occur during configuration loading and validation.
///
/// Invalid values are always reported, never clamped to something usable.
///
/// # Examples
///
/// ```
/// use fsearch_core::ConfigError;
///
/// let error = ConfigError::InvalidByteSize("12 parsecs".to_owned());
/// assert!(error.to_string().contains("12 parsecs"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// A memory size string could not be parsed.
    #[error("invalid memory size format: '{0}'")]
    InvalidByteSize(String),

    /// An I/O error occurred while reading configuration.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates a new [`ConfigError::InvalidOption`] error.
    #[inline]
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by [`ScanFilter::validate`](crate::ScanFilter::validate).
///
/// Validation happens once per scan request, never per file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    /// A text-content pattern was combined with a name pattern that does not
    /// identify a recognized text-file extension (or with no name pattern).
    #[error("text content pattern can only be applied to text files (name pattern: {name_pattern:?})")]
    InconsistentTextFilter {
        /// The offending name pattern, if one was given.
        name_pattern: Option<String>,
    },

    /// A pattern was present but empty.
    #[error("{field} cannot be empty")]
    EmptyPattern {
        /// Which filter field was empty.
        field: &'static str,
    },
}
