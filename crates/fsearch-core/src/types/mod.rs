//! Domain types for the fsearch scan service.
//!
//! # Module Organization
//!
//! - [`filter`] - Composite filter criteria and their pattern types
//! - [`request`] - The scan request
//! - [`result`] - Tokens, result tiers, and observable scan results
//! - [`key`] - Deterministic request fingerprints
//!
//! All public types are re-exported here and at the crate root:
//!
//! ```
//! use fsearch_core::{CacheKey, ScanFilter, ScanRequest, ScanResult, ScanToken};
//! ```

pub mod filter;
pub mod key;
pub mod request;
pub mod result;

pub use filter::{
    Interval, NamePattern, ScanFilter, TEXT_FILE_EXTENSIONS, TextPattern, is_text_file_name,
};
pub use key::CacheKey;
pub use request::ScanRequest;
pub use result::{ResultTier, ScanResult, ScanToken};
