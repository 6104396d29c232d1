use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Source of "now" for cache freshness and parse fallbacks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests.
///
/// Exported so crates embedding [`ContentAggregator`](crate::services::ContentAggregator)
/// can step their own tests across cache TTL boundaries without sleeping:
///
/// ```
/// use std::sync::Arc;
/// use chrono::{Duration, TimeZone, Utc};
/// use clubfeed::clock::{Clock, FixedClock};
///
/// let start = Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap();
/// let clock = Arc::new(FixedClock::new(start));
/// clock.advance(Duration::minutes(31));
/// assert_eq!(clock.now(), start + Duration::minutes(31));
/// ```
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
