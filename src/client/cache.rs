//! Shared request caches: conditional-GET entries and learned permanent
//! redirects.
//!
//! Both tables are cheap-to-clone handles around a lock-guarded map, so a
//! complete update is always observed or not at all, never partially.
//! Concurrent writers to the same key are last-writer-wins. Entries never
//! expire; removal is a deliberate, manual operation.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderValue, Uri};
use parking_lot::Mutex;

/// A stored conditional-GET entry: the most recent validator observed for a
/// URL, and the body it validated.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    validator: HeaderValue,
    body: Bytes,
}

impl CacheEntry {
    /// The most recent `Last-Modified` value observed for this URL.
    pub fn validator(&self) -> &HeaderValue {
        &self.validator
    }

    /// The stored response body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

/// The conditional-GET cache, keyed by request URL.
///
/// An entry exists only for URLs which returned a 200 carrying a
/// `Last-Modified` header at least once, and is replaced wholesale on every
/// subsequent qualifying 200.
#[derive(Debug, Clone, Default)]
pub struct CacheStore {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

impl CacheStore {
    /// Create a new, empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The validator stored for `url`, if any.
    pub fn validator(&self, url: &Uri) -> Option<HeaderValue> {
        self.entries
            .lock()
            .get(&url.to_string())
            .map(|entry| entry.validator.clone())
    }

    /// The body stored for `url`, if any.
    pub fn body(&self, url: &Uri) -> Option<Bytes> {
        self.entries
            .lock()
            .get(&url.to_string())
            .map(|entry| entry.body.clone())
    }

    /// The full entry stored for `url`, if any.
    pub fn get(&self, url: &Uri) -> Option<CacheEntry> {
        self.entries.lock().get(&url.to_string()).cloned()
    }

    /// Store an entry for `url`, replacing any prior entry.
    pub fn insert(&self, url: &Uri, validator: HeaderValue, body: Bytes) {
        self.entries
            .lock()
            .insert(url.to_string(), CacheEntry { validator, body });
    }

    /// Remove the entry for `url`, returning it if present.
    pub fn remove(&self, url: &Uri) -> Option<CacheEntry> {
        self.entries.lock().remove(&url.to_string())
    }

    /// Whether an entry exists for `url`.
    pub fn contains(&self, url: &Uri) -> bool {
        self.entries.lock().contains_key(&url.to_string())
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// The number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// The table of learned permanent (301) redirects, keyed by source URL.
///
/// Once set, a mapping is authoritative for all future requests to the
/// source URL until explicitly removed.
#[derive(Debug, Clone, Default)]
pub struct RedirectTable {
    entries: Arc<Mutex<HashMap<String, Uri>>>,
}

impl RedirectTable {
    /// Create a new, empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The destination recorded for `url`, if any.
    pub fn lookup(&self, url: &Uri) -> Option<Uri> {
        self.entries.lock().get(&url.to_string()).cloned()
    }

    /// Record `url -> target`, overwriting any prior mapping.
    pub fn insert(&self, url: &Uri, target: Uri) {
        self.entries.lock().insert(url.to_string(), target);
    }

    /// Remove the mapping for `url`, returning it if present.
    pub fn remove(&self, url: &Uri) -> Option<Uri> {
        self.entries.lock().remove(&url.to_string())
    }

    /// Whether a mapping exists for `url`.
    pub fn contains(&self, url: &Uri) -> bool {
        self.entries.lock().contains_key(&url.to_string())
    }

    /// Remove all mappings.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// The number of recorded mappings.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the table holds no mappings.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use static_assertions::assert_impl_all;

    assert_impl_all!(CacheStore: Send, Sync, Clone);
    assert_impl_all!(RedirectTable: Send, Sync, Clone);

    fn url(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn cache_insert_replaces() {
        let cache = CacheStore::new();
        let u = url("http://example.com/doc");

        assert!(!cache.contains(&u));
        cache.insert(
            &u,
            HeaderValue::from_static("Mon, 01 Jan 2024 00:00:00 GMT"),
            Bytes::from("one"),
        );
        assert_eq!(cache.body(&u).unwrap(), "one");

        cache.insert(
            &u,
            HeaderValue::from_static("Tue, 02 Jan 2024 00:00:00 GMT"),
            Bytes::from("two"),
        );
        assert_eq!(cache.body(&u).unwrap(), "two");
        assert_eq!(
            cache.validator(&u).unwrap(),
            "Tue, 02 Jan 2024 00:00:00 GMT"
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_remove_is_manual_invalidation() {
        let cache = CacheStore::new();
        let u = url("http://example.com/doc");

        cache.insert(&u, HeaderValue::from_static("now"), Bytes::from("body"));
        let entry = cache.remove(&u).unwrap();
        assert_eq!(entry.body(), "body");
        assert!(cache.is_empty());
        assert!(cache.remove(&u).is_none());
    }

    #[test]
    fn redirect_table_overwrites() {
        let table = RedirectTable::new();
        let u = url("http://example.com/old");

        table.insert(&u, url("http://example.com/new"));
        table.insert(&u, url("http://example.com/newer"));
        assert_eq!(table.lookup(&u).unwrap(), url("http://example.com/newer"));
        assert_eq!(table.len(), 1);

        table.clear();
        assert!(table.is_empty());
    }
}
