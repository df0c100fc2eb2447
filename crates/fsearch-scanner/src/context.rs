//! Per-scan state owned by the registry.

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use fsearch_core::{CacheKey, ResultTier, ScanToken};
use parking_lot::Mutex;
use rayon::ThreadPool;
use tokio::sync::OwnedSemaphorePermit;
use tokio_util::sync::CancellationToken;

use crate::error::{ScanError, WalkError};
use crate::partial::PartialResults;
use crate::stats::ScanStats;

/// How a walker job ended.
#[derive(Debug, Clone)]
pub(crate) enum ScanOutcome {
    /// The walk returned, fully or after cancellation.
    Finished {
        /// Which cache tier the result belongs to.
        tier: ResultTier,
        /// Every match of the walk.
        result: Vec<String>,
    },
    /// The walk hit an unexpected error.
    Failed(Arc<WalkError>),
}

/// Everything one in-flight scan owns.
///
/// Created by the orchestrator, stored in the registry, and shared with the
/// scan's own walker job. The worker pool is released at most once, whichever
/// of completion, kill, reclamation, or shutdown gets there first. The
/// admission slot goes back when the walker finishes or the pool is
/// released, whichever happens first.
#[derive(Debug)]
pub(crate) struct ScanContext {
    token: ScanToken,
    key: CacheKey,
    pool: Mutex<Option<ThreadPool>>,
    admission: Mutex<Option<OwnedSemaphorePermit>>,
    cancel: CancellationToken,
    partial: PartialResults,
    stats: ScanStats,
    outcome: OnceLock<ScanOutcome>,
    completed_at: OnceLock<Instant>,
    started_at: Instant,
}

impl ScanContext {
    pub(crate) fn new(
        token: ScanToken,
        key: CacheKey,
        pool: ThreadPool,
        admission: OwnedSemaphorePermit,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            token,
            key,
            pool: Mutex::new(Some(pool)),
            admission: Mutex::new(Some(admission)),
            cancel,
            partial: PartialResults::new(),
            stats: ScanStats::new(),
            outcome: OnceLock::new(),
            completed_at: OnceLock::new(),
            started_at: Instant::now(),
        }
    }

    pub(crate) const fn token(&self) -> ScanToken {
        self.token
    }

    pub(crate) const fn key(&self) -> &CacheKey {
        &self.key
    }

    pub(crate) const fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) const fn partial(&self) -> &PartialResults {
        &self.partial
    }

    pub(crate) const fn stats(&self) -> &ScanStats {
        &self.stats
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Runs `job` on this scan's pool. Returns `false` if the pool was
    /// already released.
    pub(crate) fn spawn<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        match self.pool.lock().as_ref() {
            Some(pool) => {
                pool.spawn(job);
                true
            }
            None => false,
        }
    }

    /// Drops the worker pool and the admission slot. Pool threads exit once
    /// their current task returns.
    pub(crate) fn release(&self) {
        let pool = self.pool.lock().take();
        drop(pool);
        self.vacate();
    }

    /// Gives the admission slot back. Only the first call has an effect.
    pub(crate) fn vacate(&self) {
        let permit = self.admission.lock().take();
        drop(permit);
    }

    #[cfg(test)]
    pub(crate) fn is_released(&self) -> bool {
        self.pool.lock().is_none()
    }

    /// Sets the interruption flag.
    pub(crate) fn interrupt(&self) {
        self.cancel.cancel();
    }

    pub(crate) fn is_interrupted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Records the walker outcome. Only the first call has an effect.
    pub(crate) fn finish(&self, outcome: ScanOutcome) {
        let _ = self.outcome.set(outcome);
    }

    pub(crate) fn outcome(&self) -> Option<&ScanOutcome> {
        self.outcome.get()
    }

    pub(crate) fn is_done(&self) -> bool {
        self.outcome.get().is_some()
    }

    /// Stamps the completion time.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::CompletionAlreadyMarked`] if it was already set.
    pub(crate) fn mark_completed(&self) -> Result<(), ScanError> {
        self.completed_at
            .set(Instant::now())
            .map_err(|_| ScanError::CompletionAlreadyMarked(self.token))
    }

    /// Returns `true` once the scan has finished, its completion time is set,
    /// and at least `ttl` has passed since.
    pub(crate) fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        self.is_done()
            && self
                .completed_at
                .get()
                .is_some_and(|at| now.saturating_duration_since(*at) >= ttl)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use camino::Utf8Path;
    use fsearch_core::ScanFilter;
    use tokio::sync::Semaphore;

    use super::*;

    fn context_with_slots(slots: &Arc<Semaphore>) -> ScanContext {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
        let key = CacheKey::new(Utf8Path::new("/tmp"), None, &ScanFilter::new());
        let permit = Arc::clone(slots).try_acquire_owned().unwrap();
        ScanContext::new(ScanToken::generate(), key, pool, permit, CancellationToken::new())
    }

    fn context() -> ScanContext {
        context_with_slots(&Arc::new(Semaphore::new(1)))
    }

    #[test]
    fn test_completion_time_is_set_once() {
        let ctx = context();
        assert!(ctx.mark_completed().is_ok());
        assert!(matches!(
            ctx.mark_completed(),
            Err(ScanError::CompletionAlreadyMarked(token)) if token == ctx.token()
        ));
    }

    #[test]
    fn test_expiry_requires_outcome_and_timestamp() {
        let ctx = context();
        let later = Instant::now() + Duration::from_secs(60);
        assert!(!ctx.is_expired(Duration::ZERO, later));

        ctx.mark_completed().unwrap();
        assert!(!ctx.is_expired(Duration::ZERO, later));

        ctx.finish(ScanOutcome::Finished {
            tier: ResultTier::Complete,
            result: Vec::new(),
        });
        assert!(ctx.is_expired(Duration::from_secs(30), later));
        assert!(!ctx.is_expired(Duration::from_secs(120), later));
    }

    #[test]
    fn test_first_outcome_wins() {
        let ctx = context();
        ctx.finish(ScanOutcome::Failed(Arc::new(WalkError::Panicked("x".to_owned()))));
        ctx.finish(ScanOutcome::Finished {
            tier: ResultTier::Complete,
            result: Vec::new(),
        });
        assert!(matches!(ctx.outcome(), Some(ScanOutcome::Failed(_))));
    }

    #[test]
    fn test_spawn_and_release() {
        let ctx = context();
        let (tx, rx) = mpsc::channel();
        assert!(ctx.spawn(move || tx.send(7).unwrap()));
        assert_eq!(rx.recv().unwrap(), 7);

        ctx.release();
        assert!(ctx.is_released());
        assert!(!ctx.spawn(|| {}));
    }

    #[test]
    fn test_admission_slot_is_returned_once() {
        let slots = Arc::new(Semaphore::new(2));
        let ctx = context_with_slots(&slots);
        let other = context_with_slots(&slots);
        assert_eq!(slots.available_permits(), 0);

        ctx.vacate();
        assert_eq!(slots.available_permits(), 1);
        ctx.vacate();
        ctx.release();
        assert_eq!(slots.available_permits(), 1);

        other.release();
        assert_eq!(slots.available_permits(), 2);
    }

    #[test]
    fn test_dropping_context_returns_slot() {
        let slots = Arc::new(Semaphore::new(1));
        let ctx = context_with_slots(&slots);
        assert!(Arc::clone(&slots).try_acquire_owned().is_err());

        drop(ctx);
        assert_eq!(slots.available_permits(), 1);
    }

    #[test]
    fn test_interrupt() {
        let ctx = context();
        assert!(!ctx.is_interrupted());
        ctx.interrupt();
        assert!(ctx.is_interrupted());
        assert!(ctx.cancel_token().is_cancelled());
    }
}
