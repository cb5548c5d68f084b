//! Bounded, thread-safe cache of compiled record paths.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use lru::LruCache;
use tracing::trace;

use multilookup_shared::Result;

use crate::expression::RecordPath;

/// Compiled record paths keyed by expression text, evicted least-recently-used.
///
/// Callers receive an `Arc`, so eviction only drops the cache's own
/// reference; a path in use by a caller stays alive until that caller is done.
#[derive(Debug)]
pub struct PathCache {
    entries: Mutex<LruCache<String, Arc<RecordPath>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PathCache {
    /// Create a cache holding at most `capacity` compiled paths.
    pub fn new(capacity: usize) -> Self {
        // LruCache requires non-zero capacity
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Return the compiled form of `text`, compiling and caching it on a miss.
    pub fn get_compiled(&self, text: &str) -> Result<Arc<RecordPath>> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(path) = entries.get(text) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(path));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let path = Arc::new(RecordPath::compile(text)?);
        if let Some((evicted, _)) = entries.push(text.to_string(), Arc::clone(&path)) {
            trace!(path = %evicted, "evicted compiled record path");
        }
        Ok(path)
    }

    /// Number of compiled paths currently cached.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the cache holds no compiled paths.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of compiled paths kept.
    pub fn capacity(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .cap()
            .get()
    }

    /// Lookups served from the cache.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Lookups that required a compile.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}
