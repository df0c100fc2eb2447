//! Scan lifecycle management.
//!
//! [`ScanOrchestrator`] issues tokens, answers from the cache when it can,
//! bounds how many scans run at once, gives every scan its own rayon pool,
//! and tears scans down once they are cached, killed, reclaimed, or shut
//! down.
//!
//! # Lifecycle
//!
//! ```text
//! start_scan ──► cache hit? ──yes──► ScanResult { token: None, completed: true }
//!                   │ no
//!                   ▼
//!       reserve admission slot ──none free──► AdmissionLimitExceeded
//!                   │
//!                   ▼
//!          register context, spawn walker on the scan's pool
//!                   │
//!                   ▼  (on the pool)
//!          walk ─► give slot back ─► store in cache tier ─► stored? ─yes─► drop context, release pool
//!                                                             │ no
//!                                                             ▼
//!                                                    stamp completion time, wait for reclamation
//! ```
//!
//! Admission slots are semaphore permits. A slot is taken before the pool is
//! built and returned exactly once: when the walker finishes, or when kill,
//! reclamation, or shutdown releases the scan.
//!
//! `get_result` never blocks: it answers from the cache, then from the live
//! context, and reports [`ScanError::NotFound`] when neither exists.

use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use fsearch_core::{
    CacheKey, Config, ResultTier, ScanFilter, ScanRequest, ScanResult, ScanToken, ScannerConfig,
    max_thread_count,
};
use rayon::ThreadPoolBuilder;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cache::{MemoryResultCache, ResultCache, ScanCache};
use crate::context::{ScanContext, ScanOutcome};
use crate::error::{ScanError, WalkError};
use crate::matcher::{FileMatcher, FilterMatcher};
use crate::registry::ScanRegistry;
use crate::stats::StatsSnapshot;
use crate::walker::DirectoryWalker;

/// Owns every in-flight scan and the collaborators they share.
///
/// All methods take `&self` and are safe to call from many threads. Dropping
/// the orchestrator runs [`shutdown`](Self::shutdown).
///
/// # Examples
///
/// ```no_run
/// use fsearch_core::{Config, ScanFilter, ScanRequest};
/// use fsearch_scanner::ScanOrchestrator;
///
/// let orchestrator = ScanOrchestrator::new(&Config::default())?;
/// let request = ScanRequest::new("/var/log")
///     .with_filter(ScanFilter::new().with_name_pattern("*.log"));
///
/// let started = orchestrator.start_scan(&request)?;
/// if let Some(token) = started.token {
///     let progress = orchestrator.get_result(token)?;
///     println!("{} matches so far", progress.result.len());
/// }
/// # Ok::<(), fsearch_scanner::ScanError>(())
/// ```
pub struct ScanOrchestrator {
    config: ScannerConfig,
    matcher: Arc<dyn FileMatcher>,
    cache: ScanCache,
    registry: Arc<ScanRegistry>,
    /// One permit per scan allowed to run at the same time.
    admission: Arc<Semaphore>,
    /// Parent of every scan's cancellation token.
    shutdown: CancellationToken,
}

/// Everything a walker job needs, moved onto the scan's pool.
struct ScanJob {
    context: Arc<ScanContext>,
    registry: Arc<ScanRegistry>,
    cache: ScanCache,
    matcher: Arc<dyn FileMatcher>,
    filter: ScanFilter,
    root: Utf8PathBuf,
    depth_limit: Option<u32>,
}

impl ScanOrchestrator {
    /// Creates an orchestrator with the production matcher and an in-memory
    /// cache, both built from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Config`] if `config` does not validate.
    pub fn new(config: &Config) -> Result<Self, ScanError> {
        config.validate()?;
        let matcher = FilterMatcher::new(config.scanner.stream_file_size_limit.as_u64());
        let cache = MemoryResultCache::from_config(&config.cache);
        Self::with_parts(config.scanner.clone(), Arc::new(matcher), Arc::new(cache))
    }

    /// Creates an orchestrator from explicit collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Config`] if `config` does not validate.
    pub fn with_parts(
        config: ScannerConfig,
        matcher: Arc<dyn FileMatcher>,
        cache: Arc<dyn ResultCache>,
    ) -> Result<Self, ScanError> {
        config.validate()?;
        let slots = config.max_active_scans.min(Semaphore::MAX_PERMITS);
        Ok(Self {
            config,
            matcher,
            cache: ScanCache::new(cache),
            registry: Arc::new(ScanRegistry::new()),
            admission: Arc::new(Semaphore::new(slots)),
            shutdown: CancellationToken::new(),
        })
    }

    /// Returns the scanner configuration in effect.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Starts a scan, or answers straight from the cache.
    ///
    /// On a cache hit the result has no token and is already complete. On a
    /// miss the walker starts on a fresh pool and the result carries the new
    /// token plus whatever was matched by the time this returns.
    ///
    /// # Errors
    ///
    /// - [`ScanError::InconsistentFilter`] if the filter does not validate.
    /// - [`ScanError::InvalidThreadCount`] if the effective thread count is 0
    ///   or above [`max_thread_count`].
    /// - [`ScanError::InvalidRoot`] if the directory is missing or not a
    ///   directory.
    /// - [`ScanError::AdmissionLimitExceeded`] if too many scans are running.
    /// - [`ScanError::ThreadPool`] if the worker pool cannot be created.
    pub fn start_scan(&self, request: &ScanRequest) -> Result<ScanResult, ScanError> {
        request.filter.validate()?;

        let threads = request.threads_count.unwrap_or(self.config.default_threads);
        let max = max_thread_count();
        if threads == 0 || threads > max {
            return Err(ScanError::InvalidThreadCount {
                requested: threads,
                max,
            });
        }

        let root = resolve_root(&request.directory_path)?;
        let key = CacheKey::new(&root, request.depth_limit, &request.filter);

        if let Some(result) = self.cache.lookup_complete(&key) {
            info!(key = %key, matched = result.len(), "Serving scan from cache");
            return Ok(ScanResult::finished(None, ResultTier::Complete, result));
        }

        let Ok(permit) = Arc::clone(&self.admission).try_acquire_owned() else {
            warn!(limit = self.config.max_active_scans, "Rejecting scan");
            return Err(ScanError::AdmissionLimitExceeded {
                limit: self.config.max_active_scans,
            });
        };

        let token = ScanToken::generate();
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |index| format!("fsearch-{token}-{index}"))
            .build()?;

        let context = Arc::new(ScanContext::new(
            token,
            key,
            pool,
            permit,
            self.shutdown.child_token(),
        ));
        self.registry.insert(Arc::clone(&context));

        let job = ScanJob {
            context: Arc::clone(&context),
            registry: Arc::clone(&self.registry),
            cache: self.cache.clone(),
            matcher: Arc::clone(&self.matcher),
            filter: request.filter.clone(),
            root: root.clone(),
            depth_limit: request.depth_limit,
        };
        if !context.spawn(move || job.run()) {
            // Only a concurrent shutdown releases a pool this early.
            self.registry.remove(&token);
            return Err(ScanError::NotFound(token));
        }

        info!(
            token = %token,
            root = %root,
            threads,
            depth_limit = ?request.depth_limit,
            "Scan started"
        );

        Ok(ScanResult {
            token: Some(token),
            completed: false,
            tier: None,
            result: context.partial().snapshot(),
        })
    }

    /// Reports the current state of a scan without waiting for it.
    ///
    /// A result cached for the token is served first, from either tier, with
    /// no token attached. Otherwise the live context answers: a running scan
    /// returns its partial matches; a finished one returns its final result
    /// and is dropped.
    ///
    /// # Errors
    ///
    /// - [`ScanError::NotFound`] if neither a cached result nor a live scan
    ///   exists for the token.
    /// - [`ScanError::Execution`] if the walker failed. The context is dropped,
    ///   so the next call reports [`ScanError::NotFound`].
    pub fn get_result(&self, token: ScanToken) -> Result<ScanResult, ScanError> {
        if let Some((tier, result)) = self
            .cache
            .key_for_token(token)
            .and_then(|key| self.cache.lookup_any(&key))
        {
            debug!(token = %token, tier = %tier, "Serving result from cache");
            return Ok(ScanResult::finished(None, tier, result));
        }

        let context = self
            .registry
            .get(&token)
            .ok_or(ScanError::NotFound(token))?;

        let Some(outcome) = context.outcome() else {
            return Ok(ScanResult::running(token, context.partial().snapshot()));
        };

        self.registry.remove(&token);
        context.release();

        match outcome {
            ScanOutcome::Finished { tier, result } => {
                Ok(ScanResult::finished(Some(token), *tier, result.clone()))
            }
            ScanOutcome::Failed(source) => Err(ScanError::Execution {
                token,
                source: Arc::clone(source),
            }),
        }
    }

    /// Interrupts a scan and releases its pool.
    ///
    /// Returns `false` if no live scan exists for the token. Matches found so
    /// far are stored in the interrupted tier once the walker notices the
    /// interruption.
    pub fn kill(&self, token: ScanToken) -> bool {
        let Some(context) = self.registry.remove(&token) else {
            debug!(token = %token, "Kill requested for unknown scan");
            return false;
        };

        context.interrupt();
        context.release();
        info!(
            token = %token,
            matched = context.partial().len(),
            elapsed_ms = context.elapsed().as_millis(),
            "Scan killed"
        );
        true
    }

    /// Returns progress counters for a live scan.
    #[must_use]
    pub fn progress(&self, token: ScanToken) -> Option<StatsSnapshot> {
        self.registry
            .get(&token)
            .map(|context| context.stats().snapshot())
    }

    /// Returns the number of admission slots in use.
    #[must_use]
    pub fn active_scans(&self) -> usize {
        self.admission_limit() - self.admission.available_permits()
    }

    fn admission_limit(&self) -> usize {
        self.config.max_active_scans.min(Semaphore::MAX_PERMITS)
    }

    /// Returns the number of live contexts, running or awaiting reclamation.
    #[must_use]
    pub fn registered_scans(&self) -> usize {
        self.registry.len()
    }

    /// Drops every finished context whose completion time is older than the
    /// buffered-result TTL. Returns how many were dropped.
    pub fn reclaim_expired(&self) -> usize {
        reclaim(&self.registry, &self.config)
    }

    /// Spawns the periodic reclamation task on the current Tokio runtime.
    ///
    /// The task ticks every [`ScannerConfig::reclamation_period`] and stops on
    /// [`shutdown`](Self::shutdown). Must be called from within a runtime.
    pub fn spawn_reclaimer(&self) -> JoinHandle<()> {
        let registry = Arc::clone(&self.registry);
        let config = self.config.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.reclamation_period());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        reclaim(&registry, &config);
                    }
                }
            }

            debug!("Reclaimer stopped");
        })
    }

    /// Interrupts every scan, releases every pool, and clears the registry.
    ///
    /// Also stops the reclamation task. Returns how many contexts were torn
    /// down. Calling it again is harmless.
    pub fn shutdown(&self) -> usize {
        self.shutdown.cancel();

        let contexts = self.registry.drain();
        for context in &contexts {
            context.interrupt();
            context.release();
        }

        if !contexts.is_empty() {
            info!(count = contexts.len(), "Shut down outstanding scans");
        }
        contexts.len()
    }
}

impl Drop for ScanOrchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ScanOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanOrchestrator")
            .field("config", &self.config)
            .field("registered_scans", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl ScanJob {
    /// Runs on the scan's pool: walk, cache, then clean up or stamp.
    fn run(self) {
        let Self {
            context,
            registry,
            cache,
            matcher,
            filter,
            root,
            depth_limit,
        } = self;

        let walked = panic::catch_unwind(AssertUnwindSafe(|| {
            DirectoryWalker::new(
                matcher.as_ref(),
                &filter,
                context.cancel_token(),
                context.partial(),
                context.stats(),
            )
            .with_depth_limit(depth_limit)
            .walk(&root)
        }));
        context.vacate();

        let outcome = match walked {
            Ok(result) => ScanOutcome::Finished {
                tier: if context.is_interrupted() {
                    ResultTier::Interrupted
                } else {
                    ResultTier::Complete
                },
                result,
            },
            Err(payload) => ScanOutcome::Failed(Arc::new(WalkError::Panicked(panic_message(
                &*payload,
            )))),
        };

        let token = context.token();
        let stats = context.stats().snapshot();
        let stored = match &outcome {
            ScanOutcome::Finished { tier, result } => {
                info!(
                    token = %token,
                    tier = %tier,
                    matched = result.len(),
                    directories = stats.directories_visited,
                    unreadable = stats.directories_unreadable,
                    files = stats.files_examined,
                    skipped = stats.files_skipped,
                    elapsed_ms = context.elapsed().as_millis(),
                    "Scan finished"
                );
                cache.store(*tier, context.key(), result)
                    && cache.remember_token(token, context.key())
            }
            ScanOutcome::Failed(err) => {
                warn!(token = %token, error = %err, "Scan failed");
                false
            }
        };

        context.finish(outcome);

        if stored {
            registry.remove(&token);
            context.release();
        } else if let Err(err) = context.mark_completed() {
            error!(token = %token, error = %err, "Completion time set twice");
        }
    }
}

fn reclaim(registry: &ScanRegistry, config: &ScannerConfig) -> usize {
    let expired = registry.remove_expired(config.buffered_result_ttl(), Instant::now());
    for context in &expired {
        context.release();
        debug!(token = %context.token(), "Reclaimed scan context");
    }

    if !expired.is_empty() {
        info!(count = expired.len(), "Reclaimed expired scan contexts");
    }
    expired.len()
}

fn resolve_root(directory: &Utf8Path) -> Result<Utf8PathBuf, ScanError> {
    let absolute = std::path::absolute(directory)
        .map_err(|err| ScanError::invalid_root(directory, err.to_string()))?;
    let absolute = Utf8PathBuf::from_path_buf(absolute)
        .map_err(|_| ScanError::invalid_root(directory, "path is not valid UTF-8"))?;

    match fs::metadata(&absolute) {
        Ok(metadata) if metadata.is_dir() => Ok(absolute),
        Ok(_) => Err(ScanError::invalid_root(absolute, "not a directory")),
        Err(err) => Err(ScanError::invalid_root(absolute, err.to_string())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_owned())
}
