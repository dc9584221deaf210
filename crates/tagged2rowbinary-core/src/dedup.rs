//! Per-file deduplication of `(day, identifier)` pairs.
//!
//! A pair is processed when neither the persistent existence cache nor the
//! current file has seen it. The gate never writes to the persistent cache;
//! the caller merges [`DedupGate::into_seen`] into it once the output has been
//! handed off.

use std::collections::HashSet;
use std::fmt::Write;
use std::sync::Arc;

/// Read side of the persistent existence cache.
pub trait ExistsCache: Send + Sync {
    fn exists(&self, key: &str) -> bool;
}

impl ExistsCache for HashSet<String> {
    fn exists(&self, key: &str) -> bool {
        self.contains(key)
    }
}

impl<C: ExistsCache + ?Sized> ExistsCache for Arc<C> {
    fn exists(&self, key: &str) -> bool {
        (**self).exists(key)
    }
}

impl<C: ExistsCache + ?Sized> ExistsCache for &C {
    fn exists(&self, key: &str) -> bool {
        (**self).exists(key)
    }
}

/// Cache that has never seen anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl ExistsCache for NoCache {
    fn exists(&self, _key: &str) -> bool {
        false
    }
}

/// `"<day>:<identifier>"`
pub fn dedup_key(days: u16, identifier: &str) -> String {
    format!("{}:{}", days, identifier)
}

/// Combines a persistent cache with the set of keys admitted in this pass.
pub struct DedupGate<'c, C: ExistsCache + ?Sized> {
    cache: &'c C,
    seen: HashSet<String>,
    scratch: String,
}

impl<'c, C: ExistsCache + ?Sized> DedupGate<'c, C> {
    pub fn new(cache: &'c C) -> Self {
        Self {
            cache,
            seen: HashSet::new(),
            scratch: String::with_capacity(256),
        }
    }

    /// Returns `true` and records the key the first time a pair shows up.
    pub fn should_process(&mut self, days: u16, identifier: &str) -> bool {
        self.scratch.clear();
        // Writing into a String cannot fail.
        let _ = write!(self.scratch, "{}:{}", days, identifier);

        if self.seen.contains(self.scratch.as_str()) || self.cache.exists(&self.scratch) {
            return false;
        }
        self.seen.insert(self.scratch.clone());
        true
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn into_seen(self) -> HashSet<String> {
        self.seen
    }
}
