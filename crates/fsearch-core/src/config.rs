//! Configuration structures for the fsearch scan service.
//!
//! This module provides configuration types for the two configurable parts of
//! the service:
//!
//! - [`ScannerConfig`] - Orchestrator settings (threads, admission, reclamation)
//! - [`CacheConfig`] - Result cache settings (TTL, entry ceiling, capacity)
//! - [`Config`] - Root configuration combining both
//!
//! All configuration types implement [`Default`]. Loading goes through
//! [`Config::load`] or [`Config::from_json_str`], both of which validate the
//! result; invalid values fail fast and are never clamped.

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Maximum allowed thread count, as a multiple of available hardware
/// concurrency.
pub const THREAD_CEILING_MULTIPLIER: usize = 4;

/// Returns the hard ceiling for per-scan worker threads.
///
/// This is [`THREAD_CEILING_MULTIPLIER`] times the available hardware
/// concurrency (at least one core is assumed).
#[must_use]
pub fn max_thread_count() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get) * THREAD_CEILING_MULTIPLIER
}

/// A size in bytes, parsed from human-readable strings such as `"256mb"`.
///
/// Accepted forms are a plain integer (bytes) or `<digits><unit>` where the
/// unit is one of `b`, `k`/`kb`, `m`/`mb`, `g`/`gb`, case-insensitive and
/// 1024-based. Deserializes from either a JSON number or a string.
///
/// # Examples
///
/// ```
/// use fsearch_core::ByteSize;
///
/// let size: ByteSize = "256mb".parse().unwrap();
/// assert_eq!(size.as_u64(), 256 * 1024 * 1024);
///
/// let size: ByteSize = "4K".parse().unwrap();
/// assert_eq!(size.as_u64(), 4096);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "ByteSizeRepr", into = "u64")]
pub struct ByteSize(u64);

impl ByteSize {
    /// Creates a size from a raw byte count.
    #[inline]
    #[must_use]
    pub const fn bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    /// Creates a size from a number of kibibytes.
    #[inline]
    #[must_use]
    pub const fn kib(kib: u64) -> Self {
        Self(kib * 1024)
    }

    /// Creates a size from a number of mebibytes.
    #[inline]
    #[must_use]
    pub const fn mib(mib: u64) -> Self {
        Self(mib * 1024 * 1024)
    }

    /// Returns the size in bytes.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl FromStr for ByteSize {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim().to_ascii_lowercase();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, unit) = trimmed.split_at(split);

        let invalid = || ConfigError::InvalidByteSize(value.to_owned());
        let number: u64 = digits.parse().map_err(|_| invalid())?;

        let multiplier: u64 = match unit {
            "" | "b" => 1,
            "k" | "kb" => 1024,
            "m" | "mb" => 1024 * 1024,
            "g" | "gb" => 1024 * 1024 * 1024,
            _ => return Err(invalid()),
        };

        number.checked_mul(multiplier).map(Self).ok_or_else(invalid)
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}b", self.0)
    }
}

impl From<ByteSize> for u64 {
    #[inline]
    fn from(size: ByteSize) -> Self {
        size.0
    }
}

/// Wire form of [`ByteSize`].
#[derive(Deserialize)]
#[serde(untagged)]
enum ByteSizeRepr {
    Bytes(u64),
    Text(String),
}

impl TryFrom<ByteSizeRepr> for ByteSize {
    type Error = ConfigError;

    fn try_from(repr: ByteSizeRepr) -> Result<Self, Self::Error> {
        match repr {
            ByteSizeRepr::Bytes(bytes) => Ok(Self(bytes)),
            ByteSizeRepr::Text(text) => text.parse(),
        }
    }
}

/// Configuration for the scan orchestrator.
///
/// # Examples
///
/// ```
/// use fsearch_core::ScannerConfig;
///
/// let config = ScannerConfig::default();
/// assert_eq!(config.max_active_scans, 16);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Worker threads per scan when the request does not specify a count.
    pub default_threads: usize,

    /// Maximum number of scans that may be running at the same time.
    pub max_active_scans: usize,

    /// How long a finished but uncached scan result is kept, in seconds.
    ///
    /// The reclamation task runs every quarter of this interval.
    pub buffered_result_ttl_secs: u64,

    /// Files at or below this size are searched for text in one read; larger
    /// files are streamed line by line.
    pub stream_file_size_limit: ByteSize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            default_threads: 4,
            max_active_scans: 16,
            buffered_result_ttl_secs: 600,
            stream_file_size_limit: ByteSize::mib(10),
        }
    }
}

impl ScannerConfig {
    /// Returns the buffered-result time-to-live.
    #[inline]
    #[must_use]
    pub const fn buffered_result_ttl(&self) -> Duration {
        Duration::from_secs(self.buffered_result_ttl_secs)
    }

    /// Returns the period of the background reclamation task.
    #[must_use]
    pub fn reclamation_period(&self) -> Duration {
        (self.buffered_result_ttl() / 4).max(Duration::from_millis(1))
    }

    /// Checks every option against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let max_threads = max_thread_count();
        if self.default_threads == 0 {
            return Err(ConfigError::invalid_option(
                "scanner.default_threads",
                "must be greater than 0",
            ));
        }
        if self.default_threads > max_threads {
            return Err(ConfigError::invalid_option(
                "scanner.default_threads",
                format!("{} exceeds the ceiling of {max_threads}", self.default_threads),
            ));
        }
        if self.max_active_scans == 0 {
            return Err(ConfigError::invalid_option(
                "scanner.max_active_scans",
                "must be greater than 0",
            ));
        }
        if self.buffered_result_ttl_secs == 0 {
            return Err(ConfigError::invalid_option(
                "scanner.buffered_result_ttl_secs",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Configuration for the in-memory result cache.
///
/// # Examples
///
/// ```
/// use fsearch_core::{ByteSize, CacheConfig};
///
/// let config = CacheConfig::default();
/// assert_eq!(config.max_entry_size, ByteSize::mib(64));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of a cache entry, in seconds.
    pub time_to_live_secs: u64,

    /// Serialized payloads larger than this are rejected.
    pub max_entry_size: ByteSize,

    /// Maximum number of entries held by the backend.
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            time_to_live_secs: 3600,
            max_entry_size: ByteSize::mib(64),
            max_entries: 10_000,
        }
    }
}

impl CacheConfig {
    /// Returns the entry time-to-live.
    #[inline]
    #[must_use]
    pub const fn time_to_live(&self) -> Duration {
        Duration::from_secs(self.time_to_live_secs)
    }

    /// Checks every option against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_to_live_secs == 0 {
            return Err(ConfigError::invalid_option(
                "cache.time_to_live_secs",
                "must be greater than 0",
            ));
        }
        if self.max_entries == 0 {
            return Err(ConfigError::invalid_option(
                "cache.max_entries",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Root configuration for the fsearch service.
///
/// # Examples
///
/// ```
/// use fsearch_core::Config;
///
/// let config = Config::from_json_str(r#"{"scanner": {"max_active_scans": 2}}"#).unwrap();
/// assert_eq!(config.scanner.max_active_scans, 2);
/// assert_eq!(config.cache.time_to_live_secs, 3600);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Orchestrator configuration.
    pub scanner: ScannerConfig,

    /// Result cache configuration.
    pub cache: CacheConfig,
}

impl Config {
    /// Parses and validates a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a JSON configuration file.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scanner.validate()?;
        self.cache.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scanner_config_defaults() {
        let config = ScannerConfig::default();
        assert_eq!(config.default_threads, 4);
        assert_eq!(config.buffered_result_ttl(), Duration::from_secs(600));
        assert_eq!(config.reclamation_period(), Duration::from_secs(150));
        assert_eq!(config.stream_file_size_limit.as_u64(), 10 * 1024 * 1024);
    }

    #[test]
    fn test_byte_size_parsing() {
        assert_eq!("512".parse::<ByteSize>().unwrap().as_u64(), 512);
        assert_eq!("512b".parse::<ByteSize>().unwrap().as_u64(), 512);
        assert_eq!("2k".parse::<ByteSize>().unwrap().as_u64(), 2048);
        assert_eq!(" 3MB ".parse::<ByteSize>().unwrap().as_u64(), 3 * 1024 * 1024);
        assert_eq!("1g".parse::<ByteSize>().unwrap().as_u64(), 1024 * 1024 * 1024);
    }

    #[test]
    fn test_byte_size_rejects_malformed() {
        for bad in ["", "mb", "12tb", "1.5mb", "-3k", "99999999999999999999g"] {
            let err = bad.parse::<ByteSize>().unwrap_err();
            assert!(matches!(err, ConfigError::InvalidByteSize(_)), "{bad}");
        }
    }

    #[test]
    fn test_byte_size_deserializes_from_number_or_string() {
        let from_number: ByteSize = serde_json::from_str("1024").unwrap();
        let from_text: ByteSize = serde_json::from_str(r#""1kb""#).unwrap();
        assert_eq!(from_number, from_text);
        assert!(serde_json::from_str::<ByteSize>(r#""lots""#).is_err());
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed = Config::from_json_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_config_deserialize_with_missing_fields() {
        let json = r#"{"cache": {"max_entry_size": "256mb"}}"#;
        let config = Config::from_json_str(json).unwrap();
        assert_eq!(config.cache.max_entry_size, ByteSize::mib(256));
        assert_eq!(config.cache.max_entries, 10_000);
        assert_eq!(config.scanner, ScannerConfig::default());
    }

    #[test]
    fn test_zero_threads_rejected() {
        let err = Config::from_json_str(r#"{"scanner": {"default_threads": 0}}"#).unwrap_err();
        assert!(err.to_string().contains("scanner.default_threads"));
    }

    #[test]
    fn test_threads_above_ceiling_rejected() {
        let config = ScannerConfig {
            default_threads: max_thread_count() + 1,
            ..ScannerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ScannerConfig {
            default_threads: max_thread_count(),
            ..ScannerConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_limits_rejected() {
        let scanner = ScannerConfig {
            max_active_scans: 0,
            ..ScannerConfig::default()
        };
        assert!(scanner.validate().is_err());

        let scanner = ScannerConfig {
            buffered_result_ttl_secs: 0,
            ..ScannerConfig::default()
        };
        assert!(scanner.validate().is_err());

        let cache = CacheConfig {
            time_to_live_secs: 0,
            ..CacheConfig::default()
        };
        assert!(cache.validate().is_err());
    }

    #[test]
    fn test_invalid_size_in_config_rejected() {
        let err = Config::from_json_str(r#"{"cache": {"max_entry_size": "huge"}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
