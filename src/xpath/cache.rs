//! Compiled path cache
//!
//! Front ends compile the same expressions over and over; [`PathCache`]
//! keeps the most recently used [`LocationPath`]s keyed by expression text.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use lru::LruCache;
use tracing::trace;

use super::compiler::LocationPath;
use crate::error::PathError;

/// Default number of compiled paths kept
pub const DEFAULT_CAPACITY: usize = 256;

/// Thread-safe LRU cache of compiled location paths
#[derive(Debug)]
pub struct PathCache {
    inner: Mutex<LruCache<String, Arc<LocationPath>>>,
}

impl Default for PathCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl PathCache {
    /// Cache holding at most `capacity` paths (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        PathCache {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Cached path for `key`, compiling and inserting it on a miss
    ///
    /// Compile errors are returned and nothing is cached.
    pub fn get_or_compile<F>(&self, key: &str, compile: F) -> Result<Arc<LocationPath>, PathError>
    where
        F: FnOnce() -> Result<LocationPath, PathError>,
    {
        if let Some(path) = self.get(key) {
            trace!(key, "path cache hit");
            return Ok(path);
        }
        trace!(key, "path cache miss");
        let path = Arc::new(compile()?);
        self.lock().put(key.to_string(), Arc::clone(&path));
        Ok(path)
    }

    pub fn get(&self, key: &str) -> Option<Arc<LocationPath>> {
        self.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    // poisoned locks are recovered
    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, Arc<LocationPath>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
