//! Concurrent filesystem search engine.
//!
//! This crate runs on-demand searches over directory trees. A caller starts
//! a scan, gets a token back immediately, polls for partial or final results,
//! and may kill the scan at any time. Finished results are cached against a
//! fingerprint of the request so identical requests skip the traversal.
//!
//! # Overview
//!
//! The main entry point is [`ScanOrchestrator`], which combines:
//!
//! - [`DirectoryWalker`]: Parallel fork/join traversal on a per-scan rayon pool
//! - [`FilterMatcher`]: Per-file evaluation of a [`ScanFilter`](fsearch_core::ScanFilter)
//! - [`ScanCache`]: Two-tier result cache over a [`ResultCache`] backend
//! - [`ScanStats`]: Atomic counters for progress reporting
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use fsearch_core::{Config, ScanFilter, ScanRequest};
//! use fsearch_scanner::ScanOrchestrator;
//!
//! let orchestrator = ScanOrchestrator::new(&Config::default())?;
//! let request = ScanRequest::new("/var/log")
//!     .with_depth_limit(3)
//!     .with_filter(ScanFilter::new().with_name_pattern("*.log").with_text_content("panic"));
//!
//! let mut result = orchestrator.start_scan(&request)?;
//! while let (Some(token), false) = (result.token, result.completed) {
//!     std::thread::sleep(Duration::from_millis(100));
//!     result = orchestrator.get_result(token)?;
//! }
//!
//! for path in &result.result {
//!     println!("{path}");
//! }
//! # Ok::<(), fsearch_scanner::ScanError>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! ScanOrchestrator (main entry point)
//!     │
//!     ├── ScanCache ── ResultCache (MemoryResultCache: moka)
//!     │
//!     ├── admission (Semaphore, one permit per running scan)
//!     │
//!     ├── ScanRegistry (DashMap<ScanToken, Arc<ScanContext>>)
//!     │       │
//!     │       └── ScanContext
//!     │               ├── rayon ThreadPool (one per scan)
//!     │               ├── CancellationToken (child of the orchestrator's)
//!     │               ├── PartialResults (boxcar::Vec<String>)
//!     │               └── ScanStats (atomic counters)
//!     │
//!     └── reclaimer (tokio task)
//!
//! DirectoryWalker ── FileMatcher (FilterMatcher ── TextSearch)
//! ```
//!
//! # Concurrency
//!
//! - **Isolation**: every scan owns its pool; no lock is shared between scans
//! - **Cancellation**: cooperative, checked per directory and per entry
//! - **Registry**: sharded concurrent map, never locked as a whole

#![deny(clippy::all)]
#![warn(missing_docs)]

mod cache;
mod context;
mod error;
mod matcher;
mod orchestrator;
mod partial;
mod registry;
mod stats;
mod text;
mod walker;

pub use cache::{MemoryResultCache, ResultCache, ScanCache};
pub use error::{ScanError, WalkError};
pub use matcher::{FileMatcher, FilterMatcher};
pub use orchestrator::ScanOrchestrator;
pub use partial::PartialResults;
pub use stats::{ScanStats, StatsSnapshot};
pub use text::TextSearch;
pub use walker::DirectoryWalker;
