//! Compiled condition cache.
//!
//! Maps condition source text to the program compiled from it so identical
//! conditions are compiled once, across policies and across every store the
//! cache is shared with. Entries are never invalidated; [`ConditionCache::clear`]
//! exists so callers and tests can start from a known state.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A cache of compiled programs keyed by condition source text.
pub struct ConditionCache<P> {
    programs: RwLock<HashMap<String, Arc<P>>>,
    /// Cache hit counter
    hits: AtomicU64,
    /// Cache miss counter
    misses: AtomicU64,
}

impl<P> ConditionCache<P> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty cache with room for `capacity` programs.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            programs: RwLock::new(HashMap::with_capacity(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get the program compiled from `source`, if any.
    pub fn get(&self, source: &str) -> Option<Arc<P>> {
        let found = self.programs.read().get(source).cloned();

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(source, "condition cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Store the program compiled from `source`, replacing any previous one.
    pub fn put(&self, source: impl Into<String>, program: P) -> Arc<P> {
        let program = Arc::new(program);
        self.programs.write().insert(source.into(), Arc::clone(&program));
        program
    }

    /// Return the cached program for `source`, compiling and caching it on a
    /// miss.
    ///
    /// Compilation runs outside the lock. Two callers missing on the same
    /// text at once both compile; the last insert wins.
    pub fn get_or_compile<E>(
        &self,
        source: &str,
        compile: impl FnOnce(&str) -> Result<P, E>,
    ) -> Result<Arc<P>, E> {
        if let Some(program) = self.get(source) {
            return Ok(program);
        }
        let program = compile(source)?;
        Ok(self.put(source, program))
    }

    /// Clear all cached programs and reset the counters.
    pub fn clear(&self) {
        self.programs.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Number of cached programs.
    pub fn len(&self) -> usize {
        self.programs.read().len()
    }

    /// Whether the cache holds no program.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        CacheStats {
            hits,
            misses,
            size: self.len(),
            hit_rate,
        }
    }
}

impl<P> Default for ConditionCache<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for ConditionCache<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionCache")
            .field("stats", &self.stats())
            .finish()
    }
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Current cache size
    pub size: usize,
    /// Hit rate percentage
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn test_cache_put_get() {
        let cache = ConditionCache::new();
        cache.put("a == b", 42u32);

        assert_eq!(cache.get("a == b").as_deref(), Some(&42));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_miss() {
        let cache: ConditionCache<u32> = ConditionCache::new();
        assert!(cache.get("a == b").is_none());

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn test_get_or_compile_compiles_once() {
        let cache = ConditionCache::new();
        let compiles = AtomicUsize::new(0);
        let compile = |source: &str| -> Result<usize, ()> {
            compiles.fetch_add(1, Ordering::SeqCst);
            Ok(source.len())
        };

        let first = cache.get_or_compile("x > 1", compile).unwrap();
        let second = cache.get_or_compile("x > 1", compile).unwrap();

        assert_eq!(compiles.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_get_or_compile_does_not_cache_failures() {
        let cache: ConditionCache<u32> = ConditionCache::new();
        let result = cache.get_or_compile("(", |_| Err("unbalanced"));

        assert_eq!(result.unwrap_err(), "unbalanced");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_last_write_wins() {
        let cache = ConditionCache::new();
        cache.put("x", 1u32);
        cache.put("x", 2u32);

        assert_eq!(cache.get("x").as_deref(), Some(&2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_clear() {
        let cache = ConditionCache::new();
        cache.put("x", 1u32);
        cache.get("x");

        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 0);
        assert!(cache.get("x").is_none());
    }

    #[test]
    fn test_cache_stats() {
        let cache = ConditionCache::new();
        cache.put("x", 1u32);

        // Hit
        cache.get("x");
        // Miss
        cache.get("y");

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert_eq!(stats.hit_rate, 50.0);
    }

    #[test]
    fn test_concurrent_readers_and_writers() {
        let cache = Arc::new(ConditionCache::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for j in 0..100 {
                        let source = format!("cond-{}", (i + j) % 10);
                        let program = cache
                            .get_or_compile(&source, |s| Ok::<_, ()>(s.to_string()))
                            .unwrap();
                        assert_eq!(*program, source);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 10);
    }
}
