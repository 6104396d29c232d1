use crate::errors::ClubFeedResult;

/// Persistent string key / string value storage.
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> ClubFeedResult<Option<String>>;
    /// Insert or replace the value under `key` in a single write.
    fn put(&self, key: &str, value: &str) -> ClubFeedResult<()>;
    fn delete(&self, key: &str) -> ClubFeedResult<()>;
    fn keys(&self) -> ClubFeedResult<Vec<String>>;
}
