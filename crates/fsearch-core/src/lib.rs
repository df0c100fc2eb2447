//! Core types, configuration, and errors for the fsearch scan service.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - Domain types ([`ScanFilter`], [`ScanRequest`], [`ScanResult`], [`ScanToken`])
//! - Request fingerprints ([`CacheKey`]) for result memoization
//! - Configuration structures ([`Config`], [`ScannerConfig`], [`CacheConfig`])
//! - Error types ([`ConfigError`], [`FilterError`])
//!
//! Nothing here spawns threads; the concurrent machinery lives in
//! `fsearch-scanner`.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    ByteSize, CacheConfig, Config, ScannerConfig, THREAD_CEILING_MULTIPLIER, max_thread_count,
};
pub use error::{ConfigError, FilterError};
pub use types::{
    CacheKey, Interval, NamePattern, ResultTier, ScanFilter, ScanRequest, ScanResult, ScanToken,
    TEXT_FILE_EXTENSIONS, TextPattern, is_text_file_name,
};
