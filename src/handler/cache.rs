//! Response cache for dynamic handlers.
//!
//! # Responsibilities
//! - Memoize completed handler contexts keyed by (raw path, vary key)
//! - Hold each path's vary strategy, first writer wins
//! - Purge entries by exact path and by path prefix for the surgeon
//!
//! # Design Decisions
//! - DashMap for lock-free concurrent reads from request handling
//! - No request coalescing: concurrent misses may both run the handler
//! - The surgeon purges the cache in the same operation that mutates the
//!   tree, so stale entries never outlive their node

use std::sync::Arc;

use dashmap::DashMap;

use crate::handler::context::{CacheEntry, VaryFn};
use crate::observability::metrics;

/// How completed contexts for one path are keyed.
#[derive(Clone)]
pub enum CacheStrategy {
    /// Single entry under the empty key.
    Unconditional,
    /// Keyed by the path's vary function.
    Vary(Arc<VaryFn>),
}

/// Process-wide response cache, owned by the handler loader.
pub struct LoadCache {
    enabled: bool,
    entries: DashMap<(String, String), CacheEntry>,
    strategies: DashMap<String, CacheStrategy>,
}

impl LoadCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: DashMap::new(),
            strategies: DashMap::new(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// The vary strategy previously recorded for a path, if any.
    pub fn strategy(&self, raw_path: &str) -> Option<CacheStrategy> {
        self.strategies.get(raw_path).map(|s| s.value().clone())
    }

    /// Record a path's strategy; an existing strategy is kept (changing
    /// vary strategy mid-flight is unsupported).
    pub fn set_strategy(&self, raw_path: &str, strategy: CacheStrategy) {
        self.strategies
            .entry(raw_path.to_string())
            .or_insert(strategy);
    }

    pub fn get(&self, raw_path: &str, vary_key: &str) -> Option<CacheEntry> {
        if !self.enabled {
            return None;
        }
        self.entries
            .get(&(raw_path.to_string(), vary_key.to_string()))
            .map(|e| e.value().clone())
    }

    pub fn store(&self, raw_path: &str, vary_key: &str, entry: CacheEntry) {
        if !self.enabled {
            return;
        }
        self.entries
            .insert((raw_path.to_string(), vary_key.to_string()), entry);
        metrics::record_cache_size(self.entries.len());
    }

    /// Drop every entry and the strategy for an exact path.
    pub fn purge(&self, raw_path: &str) {
        self.strategies.remove(raw_path);
        self.entries.retain(|(path, _), _| path != raw_path);
        metrics::record_cache_size(self.entries.len());
    }

    /// Drop every entry and strategy under a path prefix. Used when a
    /// limbed node was a directory.
    pub fn purge_prefix(&self, prefix: &str) {
        self.strategies.retain(|path, _| !path.starts_with(prefix));
        self.entries.retain(|(path, _), _| !path.starts_with(prefix));
        metrics::record_cache_size(self.entries.len());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
