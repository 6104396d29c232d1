use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::domain::CacheEntry;
use crate::storage::traits::KeyValueStore;

/// Timestamped cache over a [`KeyValueStore`].
///
/// Storage failures never escape: reads degrade to a miss and failed
/// writes are logged and reported through the return value.
pub struct CacheStore<S: KeyValueStore> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: KeyValueStore> CacheStore<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry<T>>(&raw) {
            Ok(mut entry) => {
                entry.key = key.to_string();
                Some(entry)
            }
            Err(e) => {
                warn!(key, error = %e, "cache entry unreadable, treating as miss");
                None
            }
        }
    }

    /// Write `payload` stamped with the current time. Returns false if the write failed.
    pub fn set<T: Serialize>(&self, key: &str, payload: &T) -> bool {
        let entry = CacheEntry::new(key, payload, self.clock.now());

        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "cache payload could not be serialized");
                return false;
            }
        };

        match self.store.put(key, &raw) {
            Ok(()) => {
                debug!(key, "cache entry written");
                true
            }
            Err(e) => {
                warn!(key, error = %e, "cache write failed, continuing without caching");
                false
            }
        }
    }

    pub fn is_fresh(&self, key: &str, ttl_minutes: u64) -> bool {
        self.get::<serde_json::Value>(key)
            .map(|entry| entry.is_fresh_at(ttl_minutes, self.clock.now()))
            .unwrap_or(false)
    }

    /// Delete every key starting with `prefix`; returns how many were removed.
    pub fn clear_namespace(&self, prefix: &str) -> usize {
        let keys = match self.store.keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!(prefix, error = %e, "could not enumerate cache keys");
                return 0;
            }
        };

        let mut removed = 0;
        for key in keys.iter().filter(|k| k.starts_with(prefix)) {
            match self.store.delete(key) {
                Ok(()) => removed += 1,
                Err(e) => warn!(key = key.as_str(), error = %e, "cache delete failed"),
            }
        }

        debug!(prefix, removed, "cache namespace cleared");
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::errors::ClubFeedError;
    use crate::storage::sqlite::{SqliteKeyValueStore, SqliteStorage};
    use crate::storage::traits::MockKeyValueStore;
    use chrono::{Duration, TimeZone, Utc};

    fn setup() -> (Arc<FixedClock>, CacheStore<SqliteKeyValueStore>) {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
        ));
        let store = SqliteKeyValueStore::new(SqliteStorage::in_memory().unwrap());
        (clock.clone(), CacheStore::new(store, clock))
    }

    #[test]
    fn test_set_then_get() {
        let (clock, cache) = setup();

        assert!(cache.set("blog_posts", &vec!["a".to_string(), "b".to_string()]));
        let entry = cache.get::<Vec<String>>("blog_posts").unwrap();

        assert_eq!(entry.key, "blog_posts");
        assert_eq!(entry.payload, vec!["a", "b"]);
        assert_eq!(entry.stored_at, clock.now());
    }

    #[test]
    fn test_get_missing_is_none() {
        let (_, cache) = setup();
        assert!(cache.get::<Vec<String>>("nothing_here").is_none());
        assert!(!cache.is_fresh("nothing_here", 30));
    }

    #[test]
    fn test_undeserializable_entry_is_miss() {
        let (_, cache) = setup();
        cache.set("blog_posts", &"just a string");

        assert!(cache.get::<Vec<u32>>("blog_posts").is_none());
    }

    #[test]
    fn test_freshness_threshold() {
        let (clock, cache) = setup();
        let written_at = clock.now();
        cache.set("blog_posts", &vec![1u8]);

        for ttl in [1u64, 30, 90] {
            let limit = Duration::milliseconds(ttl as i64 * 60_000);

            clock.set(written_at + limit - Duration::milliseconds(1));
            assert!(cache.is_fresh("blog_posts", ttl), "fresh just before {} min", ttl);

            clock.set(written_at + limit + Duration::milliseconds(1));
            assert!(!cache.is_fresh("blog_posts", ttl), "stale just after {} min", ttl);
        }
    }

    #[test]
    fn test_set_overwrites_and_restamps() {
        let (clock, cache) = setup();

        cache.set("blog_posts", &1u32);
        clock.advance(Duration::minutes(40));
        cache.set("blog_posts", &2u32);

        let entry = cache.get::<u32>("blog_posts").unwrap();
        assert_eq!(entry.payload, 2);
        assert_eq!(entry.stored_at, clock.now());
        assert!(cache.is_fresh("blog_posts", 30));
    }

    #[test]
    fn test_clear_namespace_only_removes_prefix() {
        let (_, cache) = setup();

        cache.set("football_standings_39", &1u32);
        cache.set("football_standings_140", &2u32);
        cache.set("blog_posts", &3u32);

        assert_eq!(cache.clear_namespace("football_"), 2);
        assert!(cache.get::<u32>("football_standings_39").is_none());
        assert!(cache.get::<u32>("blog_posts").is_some());
        assert_eq!(cache.clear_namespace("football_"), 0);
    }

    #[test]
    fn test_read_error_degrades_to_miss() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let mut store = MockKeyValueStore::new();
        store
            .expect_get()
            .returning(|_| Err(ClubFeedError::Database(rusqlite::Error::InvalidQuery)));

        let cache = CacheStore::new(store, clock);
        assert!(cache.get::<u32>("blog_posts").is_none());
        assert!(!cache.is_fresh("blog_posts", 30));
    }

    #[test]
    fn test_write_error_is_reported_not_raised() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let mut store = MockKeyValueStore::new();
        store
            .expect_put()
            .times(1)
            .returning(|_, _| Err(ClubFeedError::Database(rusqlite::Error::InvalidQuery)));

        let cache = CacheStore::new(store, clock);
        assert!(!cache.set("blog_posts", &vec![1u32]));
    }
}
