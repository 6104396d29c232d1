use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cached payload together with the time it was written.
///
/// Only `payload` and `storedAt` go to storage; `key` is filled in on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    #[serde(skip)]
    pub key: String,
    pub payload: T,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub stored_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(key: impl Into<String>, payload: T, stored_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            payload,
            stored_at,
        }
    }

    /// Milliseconds elapsed between the write and `now` (negative if the clock moved back).
    pub fn age_millis(&self, now: DateTime<Utc>) -> i64 {
        (now - self.stored_at).num_milliseconds()
    }

    pub fn is_fresh_at(&self, ttl_minutes: u64, now: DateTime<Utc>) -> bool {
        let ttl_millis = i64::try_from(ttl_minutes)
            .ok()
            .and_then(|m| m.checked_mul(60_000))
            .unwrap_or(i64::MAX);
        self.age_millis(now) < ttl_millis
    }
}
