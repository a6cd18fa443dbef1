//! Memoized URL joining.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Append-only map from `(base, segments...)` to the joined URL.
///
/// Owned by one [`Session`](crate::Session); entries are never invalidated
/// and live as long as the session does.
#[derive(Debug, Default)]
pub struct UrlCache {
    entries: Mutex<HashMap<Vec<String>, String>>,
    joins: AtomicUsize,
}

impl UrlCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Join `base` and `segments` with `/`, reusing a previous join of the
    /// same parts.
    pub fn join(&self, base: &str, segments: &[&str]) -> String {
        let mut key = Vec::with_capacity(segments.len() + 1);
        key.push(base.trim_end_matches('/').to_string());
        key.extend(segments.iter().map(|s| s.to_string()));

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(url) = entries.get(&key) {
            return url.clone();
        }

        self.joins.fetch_add(1, Ordering::Relaxed);
        let url = key.join("/");
        entries.insert(key, url.clone());
        url
    }

    /// Number of joins actually performed (cache misses).
    pub fn joins(&self) -> usize {
        self.joins.load(Ordering::Relaxed)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
