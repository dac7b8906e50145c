//! Keyed fetch cache for reference data.
//!
//! Entries are keyed by `(key, param)` in a bounded LRU. Nothing is fetched
//! while disabled or without a parameter, and failures are not cached.
//! Concurrent callers for the same entry share one fetch; a fetch whose
//! future is dropped leaves the entry empty for the next caller.

use lru::LruCache;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::OnceCell;
use tracing::debug;

pub const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(256) {
    Some(capacity) => capacity,
    None => panic!("cache capacity must be non-zero"),
};

/// Snapshot of one cached query
#[derive(Debug, Clone, PartialEq)]
pub struct Query<T> {
    pub data: Option<T>,
    pub is_loading: bool,
}

impl<T> Query<T> {
    pub fn idle() -> Self {
        Self {
            data: None,
            is_loading: false,
        }
    }

    fn ready(data: T) -> Self {
        Self {
            data: Some(data),
            is_loading: false,
        }
    }
}

type QueryKey = (String, String);

/// Filled at most once; in-flight fetches hold extra clones
type Cell<T> = Arc<OnceCell<T>>;

pub struct QueryCache<T> {
    entries: Mutex<LruCache<QueryKey, Cell<T>>>,
}

impl<T: Clone> QueryCache<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn entries(&self) -> MutexGuard<'_, LruCache<QueryKey, Cell<T>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current state without fetching or touching recency
    pub fn peek(&self, key: &str, param: &str) -> Query<T> {
        let entries = self.entries();
        let Some(cell) = entries.peek(&(key.to_string(), param.to_string())) else {
            return Query::idle();
        };
        match cell.get() {
            Some(data) => Query::ready(data.clone()),
            None => Query {
                data: None,
                is_loading: Arc::strong_count(cell) > 1,
            },
        }
    }

    /// Return the cached value or run `fetcher` for it.
    pub async fn fetch<F, Fut, E>(&self, key: &str, param: &str, enabled: bool, fetcher: F) -> Result<Query<T>, E>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !enabled || param.is_empty() {
            return Ok(Query::idle());
        }

        let cache_key = (key.to_string(), param.to_string());
        let cell = self
            .entries()
            .get_or_insert(cache_key.clone(), || Arc::new(OnceCell::new()))
            .clone();
        if let Some(data) = cell.get() {
            debug!("Cache hit for {}({})", key, param);
            return Ok(Query::ready(data.clone()));
        }

        let result = cell
            .get_or_try_init(|| {
                debug!("Fetching {}({})", key, param);
                fetcher(param.to_string())
            })
            .await
            .map(T::clone);

        if result.is_err() {
            let mut entries = self.entries();
            let unfilled = entries
                .peek(&cache_key)
                .is_some_and(|current| Arc::ptr_eq(current, &cell) && !current.initialized());
            if unfilled {
                entries.pop(&cache_key);
            }
        }
        result.map(Query::ready)
    }

    /// Drop every entry stored under `key`
    pub fn invalidate(&self, key: &str) {
        let mut entries = self.entries();
        let stale: Vec<QueryKey> = entries
            .iter()
            .filter(|((k, _), _)| k == key)
            .map(|(cache_key, _)| cache_key.clone())
            .collect();
        for cache_key in stale {
            entries.pop(&cache_key);
        }
    }

    pub fn clear(&self) {
        self.entries().clear();
    }
}

impl<T: Clone> Default for QueryCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
