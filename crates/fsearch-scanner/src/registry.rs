//! Token → context table for in-flight scans.
//!
//! This module provides [`ScanRegistry`], the single owner of every live
//! [`ScanContext`]. Entries are independent, so the table is a [`DashMap`]
//! rather than a map behind one lock.
//!
//! # Safety Pattern
//!
//! To avoid `DashMap` deadlocks, the registry:
//!
//! - **Never exposes `Ref` types**; lookups return a cloned [`Arc`]
//! - **Never calls back into the map** while iterating it
//! - **Collects first, then removes** when sweeping

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use fsearch_core::ScanToken;
use rustc_hash::FxBuildHasher;

use crate::context::ScanContext;

/// Concurrent owner of all live scan contexts.
#[derive(Debug, Default)]
pub(crate) struct ScanRegistry {
    contexts: DashMap<ScanToken, Arc<ScanContext>, FxBuildHasher>,
}

impl ScanRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a context under its token. Returns the displaced context if
    /// the token was already taken.
    pub(crate) fn insert(&self, context: Arc<ScanContext>) -> Option<Arc<ScanContext>> {
        self.contexts.insert(context.token(), context)
    }

    pub(crate) fn get(&self, token: &ScanToken) -> Option<Arc<ScanContext>> {
        self.contexts.get(token).map(|entry| Arc::clone(entry.value()))
    }

    pub(crate) fn remove(&self, token: &ScanToken) -> Option<Arc<ScanContext>> {
        self.contexts.remove(token).map(|(_, context)| context)
    }

    pub(crate) fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Removes and returns every context that has expired at `now`.
    pub(crate) fn remove_expired(&self, ttl: Duration, now: Instant) -> Vec<Arc<ScanContext>> {
        let expired: Vec<ScanToken> = self
            .contexts
            .iter()
            .filter(|entry| entry.value().is_expired(ttl, now))
            .map(|entry| *entry.key())
            .collect();

        expired
            .iter()
            .filter_map(|token| {
                self.contexts
                    .remove_if(token, |_, context| context.is_expired(ttl, now))
                    .map(|(_, context)| context)
            })
            .collect()
    }

    /// Removes and returns every context.
    pub(crate) fn drain(&self) -> Vec<Arc<ScanContext>> {
        let tokens: Vec<ScanToken> = self.contexts.iter().map(|entry| *entry.key()).collect();
        tokens
            .iter()
            .filter_map(|token| self.remove(token))
            .collect()
    }
}
