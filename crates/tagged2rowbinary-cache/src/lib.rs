// tagged2rowbinary-cache - Existence cache for tagged index keys
//
// Keys are `"<day>:<identifier>"` strings. A key merged into the cache answers
// `exists == true` until its TTL runs out; the parser never writes here, the
// orchestrator merges a file's new keys once that file's output is durable.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tagged2rowbinary_core::ExistsCache;
use tracing::debug;

/// Default key lifetime: 12 hours.
pub const DEFAULT_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// TTL-bounded set of index keys, shared between a writer (the orchestrator)
/// and any number of readers.
///
/// A TTL too large to represent as an `Instant` deadline means keys never expire.
#[derive(Debug)]
pub struct KeyCache {
    ttl: Duration,
    // `None`: no representable deadline
    entries: RwLock<HashMap<String, Option<Instant>>>,
}

impl Default for KeyCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl KeyCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Insert `keys`, each valid for one TTL from now. Re-merging a key
    /// extends it.
    pub fn merge<I>(&self, keys: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.merge_at(keys, Instant::now());
    }

    /// Drop expired keys; returns how many were removed.
    pub fn expire(&self) -> usize {
        self.expire_at(Instant::now())
    }

    /// Number of stored keys, expired ones included until `expire` runs.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn merge_at<I>(&self, keys: I, now: Instant)
    where
        I: IntoIterator<Item = String>,
    {
        let deadline = now.checked_add(self.ttl);
        let mut entries = self.entries.write();
        let before = entries.len();
        for key in keys {
            entries.insert(key, deadline);
        }
        debug!(
            added = entries.len() - before,
            total = entries.len(),
            "merged keys into existence cache"
        );
    }

    fn expire_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, deadline| is_live(*deadline, now));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, remaining = entries.len(), "expired cached keys");
        }
        removed
    }

    fn exists_at(&self, key: &str, now: Instant) -> bool {
        self.entries
            .read()
            .get(key)
            .is_some_and(|deadline| is_live(*deadline, now))
    }
}

fn is_live(deadline: Option<Instant>, now: Instant) -> bool {
    deadline.map_or(true, |deadline| deadline > now)
}

impl ExistsCache for KeyCache {
    fn exists(&self, key: &str) -> bool {
        self.exists_at(key, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_merged_keys_exist() {
        let cache = KeyCache::default();
        assert!(cache.is_empty());
        assert!(!cache.exists("19675:cpu?a=1"));

        cache.merge(keys(&["19675:cpu?a=1", "19675:mem?b=2"]));
        assert_eq!(cache.len(), 2);
        assert!(cache.exists("19675:cpu?a=1"));
        assert!(cache.exists("19675:mem?b=2"));
        assert!(!cache.exists("19676:cpu?a=1"));
    }

    #[test]
    fn test_expired_keys_do_not_exist() {
        let cache = KeyCache::new(Duration::from_secs(60));
        let start = Instant::now();
        cache.merge_at(keys(&["1:a?x=1"]), start);

        assert!(cache.exists_at("1:a?x=1", start + Duration::from_secs(59)));
        assert!(!cache.exists_at("1:a?x=1", start + Duration::from_secs(60)));
        // Still stored until swept.
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expire_removes_only_stale_keys() {
        let cache = KeyCache::new(Duration::from_secs(60));
        let start = Instant::now();
        cache.merge_at(keys(&["1:old?x=1"]), start);
        cache.merge_at(keys(&["1:new?x=1"]), start + Duration::from_secs(30));

        assert_eq!(cache.expire_at(start + Duration::from_secs(61)), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.exists_at("1:new?x=1", start + Duration::from_secs(61)));
        assert_eq!(cache.expire_at(start + Duration::from_secs(61)), 0);
    }

    #[test]
    fn test_remerge_extends_deadline() {
        let cache = KeyCache::new(Duration::from_secs(60));
        let start = Instant::now();
        cache.merge_at(keys(&["1:a?x=1"]), start);
        cache.merge_at(keys(&["1:a?x=1"]), start + Duration::from_secs(50));

        assert_eq!(cache.len(), 1);
        assert!(cache.exists_at("1:a?x=1", start + Duration::from_secs(100)));
    }

    #[test]
    fn test_unrepresentable_ttl_never_expires() {
        let cache = KeyCache::new(Duration::from_secs(u64::MAX));
        let start = Instant::now();
        cache.merge(keys(&["1:a?x=1"]));

        assert!(cache.exists("1:a?x=1"));
        assert!(cache.exists_at("1:a?x=1", start + Duration::from_secs(10 * 365 * 86_400)));
        assert_eq!(cache.expire(), 0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_shared_between_threads() {
        let cache = Arc::new(KeyCache::default());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    cache.merge((0..100).map(|i| format!("{}:m{}?x=1", t, i)));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 400);
        assert!(cache.exists("3:m99?x=1"));
    }
}
