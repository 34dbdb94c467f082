//! Bounded record cache with access-time expiry.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

struct CacheEntry<R> {
    value: Arc<R>,
    last_access: Instant,
}

/// LRU cache of adapted records keyed by id.
///
/// Entries expire once they go unread for `ttl`. Least recently used
/// entries are evicted when `capacity` is exceeded.
///
/// Every invalidation bumps a generation counter. A reader that loaded a
/// record from storage only caches it if no invalidation happened since it
/// started, so a read racing a write cannot resurrect the old state.
pub struct RecordCache<R> {
    entries: Mutex<LruCache<String, CacheEntry<R>>>,
    ttl: Duration,
    generation: AtomicU64,
}

impl<R> RecordCache<R> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            generation: AtomicU64::new(0),
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<R>> {
        let mut entries = self.entries();
        let now = Instant::now();
        match entries.get_mut(id) {
            None => return None,
            Some(entry) if now.duration_since(entry.last_access) < self.ttl => {
                entry.last_access = now;
                return Some(entry.value.clone());
            }
            Some(_) => {}
        }
        entries.pop(id);
        None
    }

    /// Current generation. Pass it to [`insert_if_fresh`](Self::insert_if_fresh).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Caches `value` unless an invalidation happened after `generation`
    /// was read. Returns whether it was cached.
    pub fn insert_if_fresh(&self, id: &str, value: Arc<R>, generation: u64) -> bool {
        let mut entries = self.entries();
        if self.generation.load(Ordering::Acquire) != generation {
            return false;
        }
        entries.put(
            id.to_string(),
            CacheEntry {
                value,
                last_access: Instant::now(),
            },
        );
        true
    }

    pub fn invalidate(&self, id: &str) {
        let mut entries = self.entries();
        self.generation.fetch_add(1, Ordering::AcqRel);
        entries.pop(id);
    }

    pub fn invalidate_all(&self) {
        let mut entries = self.entries();
        self.generation.fetch_add(1, Ordering::AcqRel);
        entries.clear();
    }

    /// Number of entries held, expired ones included until next touched.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, LruCache<String, CacheEntry<R>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(cache: &RecordCache<&'static str>, id: &str, value: &'static str) {
        assert!(cache.insert_if_fresh(id, Arc::new(value), cache.generation()));
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = RecordCache::new(2, Duration::from_secs(60));
        put(&cache, "a", "A");
        put(&cache, "b", "B");
        assert!(cache.get("a").is_some());
        put(&cache, "c", "C");
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn expires_after_idle_ttl() {
        let cache = RecordCache::new(10, Duration::from_millis(20));
        put(&cache, "a", "A");
        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn reads_extend_lifetime() {
        let cache = RecordCache::new(10, Duration::from_millis(200));
        put(&cache, "a", "A");
        for _ in 0..4 {
            std::thread::sleep(Duration::from_millis(80));
            assert!(cache.get("a").is_some());
        }
    }

    #[test]
    fn stale_generation_is_not_cached() {
        let cache = RecordCache::new(10, Duration::from_secs(60));
        let generation = cache.generation();
        cache.invalidate("a");
        assert!(!cache.insert_if_fresh("a", Arc::new("old"), generation));
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn invalidate_all_clears() {
        let cache = RecordCache::new(10, Duration::from_secs(60));
        put(&cache, "a", "A");
        put(&cache, "b", "B");
        cache.invalidate_all();
        assert!(cache.is_empty());
    }
}
