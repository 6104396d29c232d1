pub mod aggregator;
pub mod match_service;

pub use aggregator::{
    CacheStatus, ContentAggregator, ContentOrigin, ContentResult, STALE_ADVISORY,
    UNAVAILABLE_ADVISORY,
};
pub use match_service::{
    get_upcoming_matches, get_upcoming_matches_at, load_calendar, next_tracked_match,
};
