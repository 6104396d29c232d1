use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::Config;
use crate::domain::{ContentItem, SourceState};
use crate::errors::{ClubFeedError, ClubFeedResult};
use crate::sources::{
    ContentSource, FeedFetcher, FeedParser, HttpFeedFetcher, ParserKind, SourceRegistry,
};
use crate::storage::{
    CacheStore, KeyValueStore, SourceStateStore, SqliteKeyValueStore, SqliteStorage,
};

pub const STALE_ADVISORY: &str = "content may be stale";
pub const UNAVAILABLE_ADVISORY: &str = "could not load content";

/// Where the returned items came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentOrigin {
    /// Fresh cache hit, no network
    Cache,
    /// Fetched and parsed just now
    Network,
    /// Refresh failed; an older cache entry was served
    StaleCache,
    /// Refresh failed and nothing was cached
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentResult {
    pub items: Vec<ContentItem>,
    pub origin: ContentOrigin,
    pub advisory: Option<String>,
}

impl ContentResult {
    pub fn is_error(&self) -> bool {
        self.origin == ContentOrigin::Unavailable
    }
}

/// Per-source cache status for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatus {
    pub key: String,
    pub stored_at: Option<DateTime<Utc>>,
    pub item_count: usize,
    pub fresh: bool,
}

/// One step of a `get_content` call.
enum Step {
    CheckCache,
    Fetch,
    Parse(String),
    Store(Vec<ContentItem>),
    Fallback(ClubFeedError),
}

pub struct ContentAggregator<S: KeyValueStore, F: FeedFetcher> {
    cache: CacheStore<S>,
    states: SourceStateStore<S>,
    fetcher: F,
    registry: SourceRegistry,
}

impl ContentAggregator<SqliteKeyValueStore, HttpFeedFetcher> {
    /// Wire up SQLite storage, the HTTP fetcher and the configured sources.
    pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> ClubFeedResult<Self> {
        let storage = SqliteStorage::new(&config.db_path)?;
        let kv = SqliteKeyValueStore::new(storage);

        Ok(Self::new(
            CacheStore::new(kv.clone(), clock.clone()),
            SourceStateStore::new(kv, clock.clone()),
            HttpFeedFetcher::new(),
            SourceRegistry::from_config(config, clock),
        ))
    }
}

impl<S: KeyValueStore, F: FeedFetcher> ContentAggregator<S, F> {
    pub fn new(
        cache: CacheStore<S>,
        states: SourceStateStore<S>,
        fetcher: F,
        registry: SourceRegistry,
    ) -> Self {
        Self {
            cache,
            states,
            fetcher,
            registry,
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Serve a feed with the default tag-pattern parser.
    pub fn get_content(
        &self,
        source_key: &str,
        fetch_url: &str,
        ttl_minutes: u64,
        force_refresh: bool,
    ) -> ContentResult {
        let parser = self.registry.parser(ParserKind::TagPatterns);
        self.get_content_with(parser, source_key, fetch_url, ttl_minutes, force_refresh)
    }

    /// Serve a registered source by name (or cache key).
    pub fn refresh_source(&self, name: &str, force_refresh: bool) -> ClubFeedResult<ContentResult> {
        let source: &ContentSource = self.registry.find(name)?;
        let parser = self.registry.parser(source.parser);

        Ok(self.get_content_with(
            parser,
            &source.key,
            &source.url,
            source.ttl_minutes,
            force_refresh,
        ))
    }

    /// Cached data while fresh, otherwise fetch and parse; on any failure
    /// serve whatever is cached, however old.
    pub fn get_content_with(
        &self,
        parser: &dyn FeedParser,
        source_key: &str,
        fetch_url: &str,
        ttl_minutes: u64,
        force_refresh: bool,
    ) -> ContentResult {
        let mut step = if force_refresh {
            Step::Fetch
        } else {
            Step::CheckCache
        };

        loop {
            step = match step {
                Step::CheckCache => {
                    let now = self.cache.clock().now();
                    match self.cache.get::<Vec<ContentItem>>(source_key) {
                        Some(entry) if entry.is_fresh_at(ttl_minutes, now) => {
                            debug!(source = source_key, "serving fresh cache");
                            return ContentResult {
                                items: entry.payload,
                                origin: ContentOrigin::Cache,
                                advisory: None,
                            };
                        }
                        _ => Step::Fetch,
                    }
                }

                Step::Fetch => match self.fetcher.fetch(fetch_url) {
                    Ok(body) => Step::Parse(body),
                    Err(e) => Step::Fallback(e),
                },

                Step::Parse(body) => match parser.parse(&body) {
                    Ok(items) if !items.is_empty() => Step::Store(items),
                    Ok(_) => Step::Fallback(ClubFeedError::EmptyFeed),
                    Err(e) => Step::Fallback(e),
                },

                Step::Store(items) => {
                    // A failed write is already logged; the caller still gets the data
                    self.cache.set(source_key, &items);
                    self.states.record_refresh(source_key);
                    info!(
                        source = source_key,
                        parser = parser.name(),
                        items = items.len(),
                        "content refreshed"
                    );
                    return ContentResult {
                        items,
                        origin: ContentOrigin::Network,
                        advisory: None,
                    };
                }

                Step::Fallback(error) => return self.fallback(source_key, error),
            };
        }
    }

    fn fallback(&self, source_key: &str, error: ClubFeedError) -> ContentResult {
        self.states.record_fallback(source_key);

        match self.cache.get::<Vec<ContentItem>>(source_key) {
            Some(entry) => {
                warn!(
                    source = source_key,
                    error = %error,
                    stored_at = %entry.stored_at,
                    "refresh failed, serving cached content"
                );
                ContentResult {
                    items: entry.payload,
                    origin: ContentOrigin::StaleCache,
                    advisory: Some(STALE_ADVISORY.to_string()),
                }
            }
            None => {
                warn!(source = source_key, error = %error, "refresh failed and nothing is cached");
                ContentResult {
                    items: Vec::new(),
                    origin: ContentOrigin::Unavailable,
                    advisory: Some(format!("{}: {}", UNAVAILABLE_ADVISORY, error)),
                }
            }
        }
    }

    pub fn state(&self, source_key: &str) -> SourceState {
        self.states.load(source_key)
    }

    /// Remember the newest item as seen; returns how many were new before.
    pub fn mark_seen(&self, source_key: &str, items: &[ContentItem]) -> usize {
        let unseen = self.unseen_count(source_key, items);
        if let Some(newest) = items.first() {
            self.states.mark_seen(source_key, &newest.id);
        }
        unseen
    }

    pub fn unseen_count(&self, source_key: &str, items: &[ContentItem]) -> usize {
        self.states.load(source_key).unseen_count(items)
    }

    pub fn cache_status(&self, source: &ContentSource) -> CacheStatus {
        let entry = self.cache.get::<Vec<ContentItem>>(&source.key);
        let now = self.cache.clock().now();

        CacheStatus {
            key: source.key.clone(),
            stored_at: entry.as_ref().map(|e| e.stored_at),
            item_count: entry.as_ref().map_or(0, |e| e.payload.len()),
            fresh: entry.map_or(false, |e| e.is_fresh_at(source.ttl_minutes, now)),
        }
    }

    pub fn clear_namespace(&self, prefix: &str) -> usize {
        self.cache.clear_namespace(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::sources::traits::MockFeedFetcher;
    use crate::sources::ParserOptions;
    use chrono::{Duration, TimeZone};
    use mockall::predicate::eq;

    const FEED_URL: &str = "https://rovers.example.com/feed/";

    const ONE_ITEM: &str = r#"<rss><channel><item>
        <guid>p1</guid><title>First</title>
        <content:encoded><![CDATA[<img src="http://x/a.jpg"><p>Body</p>]]></content:encoded>
    </item></channel></rss>"#;

    const TWO_ITEMS: &str = r#"<rss><channel>
        <item><guid>p2</guid><title>Second</title></item>
        <item><guid>p1</guid><title>First</title></item>
    </channel></rss>"#;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap()
    }

    fn aggregator(
        fetcher: MockFeedFetcher,
    ) -> (
        Arc<FixedClock>,
        ContentAggregator<SqliteKeyValueStore, MockFeedFetcher>,
    ) {
        let clock = Arc::new(FixedClock::new(start()));
        let kv = SqliteKeyValueStore::new(SqliteStorage::in_memory().unwrap());
        let aggregator = ContentAggregator::new(
            CacheStore::new(kv.clone(), clock.clone()),
            SourceStateStore::new(kv, clock.clone()),
            fetcher,
            SourceRegistry::new(ParserOptions::default(), clock.clone()),
        );
        (clock, aggregator)
    }

    fn network_down() -> ClubFeedError {
        ClubFeedError::HttpStatus {
            url: FEED_URL.to_string(),
            status: 503,
        }
    }

    #[test]
    fn test_miss_fetches_and_stores() {
        let mut fetcher = MockFeedFetcher::new();
        fetcher
            .expect_fetch()
            .with(eq(FEED_URL))
            .times(1)
            .returning(|_| Ok(ONE_ITEM.to_string()));
        let (_, aggregator) = aggregator(fetcher);

        let result = aggregator.get_content("blog_posts", FEED_URL, 30, false);

        assert_eq!(result.origin, ContentOrigin::Network);
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].image_url.as_deref(), Some("http://x/a.jpg"));
        assert!(result.advisory.is_none());
        assert_eq!(aggregator.state("blog_posts").refresh_count, 1);
    }

    #[test]
    fn test_fresh_cache_skips_network() {
        let mut fetcher = MockFeedFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|_| Ok(ONE_ITEM.to_string()));
        let (clock, aggregator) = aggregator(fetcher);

        let first = aggregator.get_content("blog_posts", FEED_URL, 30, false);
        clock.advance(Duration::minutes(29));
        let second = aggregator.get_content("blog_posts", FEED_URL, 30, false);

        assert_eq!(second.origin, ContentOrigin::Cache);
        assert_eq!(second.items, first.items);
    }

    #[test]
    fn test_stale_cache_refetches() {
        let mut fetcher = MockFeedFetcher::new();
        let mut calls = 0;
        fetcher.expect_fetch().times(2).returning(move |_| {
            calls += 1;
            Ok(if calls == 1 { ONE_ITEM } else { TWO_ITEMS }.to_string())
        });
        let (clock, aggregator) = aggregator(fetcher);

        aggregator.get_content("blog_posts", FEED_URL, 30, false);
        clock.advance(Duration::minutes(31));
        let result = aggregator.get_content("blog_posts", FEED_URL, 30, false);

        assert_eq!(result.origin, ContentOrigin::Network);
        assert_eq!(result.items.len(), 2);
    }

    #[test]
    fn test_force_refresh_bypasses_fresh_cache() {
        let mut fetcher = MockFeedFetcher::new();
        fetcher
            .expect_fetch()
            .times(2)
            .returning(|_| Ok(ONE_ITEM.to_string()));
        let (_, aggregator) = aggregator(fetcher);

        aggregator.get_content("blog_posts", FEED_URL, 30, false);
        let result = aggregator.get_content("blog_posts", FEED_URL, 30, true);

        assert_eq!(result.origin, ContentOrigin::Network);
    }

    #[test]
    fn test_network_failure_serves_stale_entry() {
        let mut fetcher = MockFeedFetcher::new();
        let mut calls = 0;
        fetcher.expect_fetch().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(ONE_ITEM.to_string())
            } else {
                Err(network_down())
            }
        });
        let (clock, aggregator) = aggregator(fetcher);

        let stored = aggregator.get_content("blog_posts", FEED_URL, 30, false);
        clock.advance(Duration::minutes(31));
        let result = aggregator.get_content("blog_posts", FEED_URL, 30, false);

        assert_eq!(result.origin, ContentOrigin::StaleCache);
        assert_eq!(result.items, stored.items);
        assert_eq!(result.advisory.as_deref(), Some(STALE_ADVISORY));
        assert_eq!(aggregator.state("blog_posts").fallback_count, 1);
    }

    #[test]
    fn test_forced_refresh_failure_keeps_fresh_entry() {
        let mut fetcher = MockFeedFetcher::new();
        let mut calls = 0;
        fetcher.expect_fetch().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(ONE_ITEM.to_string())
            } else {
                Err(network_down())
            }
        });
        let (_, aggregator) = aggregator(fetcher);

        aggregator.get_content("blog_posts", FEED_URL, 30, false);
        let result = aggregator.get_content("blog_posts", FEED_URL, 30, true);

        assert_eq!(result.origin, ContentOrigin::StaleCache);
        assert_eq!(result.items.len(), 1);
    }

    #[test]
    fn test_empty_parse_triggers_fallback() {
        let mut fetcher = MockFeedFetcher::new();
        let mut calls = 0;
        fetcher.expect_fetch().times(2).returning(move |_| {
            calls += 1;
            Ok(if calls == 1 {
                ONE_ITEM.to_string()
            } else {
                "<html>maintenance page</html>".to_string()
            })
        });
        let (clock, aggregator) = aggregator(fetcher);

        aggregator.get_content("blog_posts", FEED_URL, 30, false);
        clock.advance(Duration::hours(5));
        let result = aggregator.get_content("blog_posts", FEED_URL, 30, false);

        assert_eq!(result.origin, ContentOrigin::StaleCache);
        assert_eq!(result.items[0].id, "p1");
    }

    #[test]
    fn test_failure_with_empty_cache_is_unavailable() {
        let mut fetcher = MockFeedFetcher::new();
        fetcher.expect_fetch().returning(|_| Err(network_down()));
        let (_, aggregator) = aggregator(fetcher);

        let result = aggregator.get_content("blog_posts", FEED_URL, 30, false);

        assert!(result.is_error());
        assert!(result.items.is_empty());
        let advisory = result.advisory.unwrap();
        assert!(advisory.starts_with(UNAVAILABLE_ADVISORY));
        assert!(advisory.contains("503"));
    }

    #[test]
    fn test_store_failure_still_returns_fresh_items() {
        use crate::storage::traits::MockKeyValueStore;

        fn failing_store() -> MockKeyValueStore {
            let mut store = MockKeyValueStore::new();
            store.expect_get().returning(|_| Ok(None));
            store
                .expect_put()
                .returning(|_, _| Err(ClubFeedError::Database(rusqlite::Error::InvalidQuery)));
            store
        }

        let mut fetcher = MockFeedFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_| Ok(ONE_ITEM.to_string()));
        let clock = Arc::new(FixedClock::new(start()));
        let aggregator = ContentAggregator::new(
            CacheStore::new(failing_store(), clock.clone()),
            SourceStateStore::new(failing_store(), clock.clone()),
            fetcher,
            SourceRegistry::new(ParserOptions::default(), clock),
        );

        let result = aggregator.get_content("blog_posts", FEED_URL, 30, false);

        assert_eq!(result.origin, ContentOrigin::Network);
        assert_eq!(result.items.len(), 1);
    }

    #[test]
    fn test_feed_rs_parse_error_falls_back() {
        let mut fetcher = MockFeedFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_| Ok("definitely not xml".to_string()));
        let (_, aggregator) = aggregator(fetcher);

        let parser = aggregator.registry().parser(ParserKind::FeedRs);
        let result = aggregator.get_content_with(parser, "youtube_videos", FEED_URL, 30, false);

        assert_eq!(result.origin, ContentOrigin::Unavailable);
        assert!(result.advisory.unwrap().contains("Feed parsing failed"));
    }

    #[test]
    fn test_refresh_source_uses_registered_definition() {
        let mut fetcher = MockFeedFetcher::new();
        fetcher
            .expect_fetch()
            .with(eq("https://instagram.example/rss"))
            .times(1)
            .returning(|_| Ok(ONE_ITEM.to_string()));
        let (clock, mut aggregator) = aggregator(fetcher);

        let mut registry = SourceRegistry::new(ParserOptions::default(), clock);
        registry.register(ContentSource::new(
            "instagram",
            "instagram_posts",
            "https://instagram.example/rss",
            15,
            ParserKind::TagPatterns,
        ));
        aggregator.registry = registry;

        let result = aggregator.refresh_source("instagram", false).unwrap();
        assert_eq!(result.origin, ContentOrigin::Network);

        let status = aggregator.cache_status(aggregator.registry().find("instagram").unwrap());
        assert!(status.fresh);
        assert_eq!(status.item_count, 1);

        assert!(matches!(
            aggregator.refresh_source("tiktok", false),
            Err(ClubFeedError::UnknownSource(_))
        ));
    }

    #[test]
    fn test_seen_tracking() {
        let mut fetcher = MockFeedFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_| Ok(TWO_ITEMS.to_string()));
        let (_, aggregator) = aggregator(fetcher);

        let result = aggregator.get_content("blog_posts", FEED_URL, 30, true);
        assert_eq!(aggregator.unseen_count("blog_posts", &result.items), 2);

        assert_eq!(aggregator.mark_seen("blog_posts", &result.items), 2);
        assert_eq!(aggregator.unseen_count("blog_posts", &result.items), 0);
        assert_eq!(aggregator.state("blog_posts").last_seen_id.as_deref(), Some("p2"));
    }

    #[test]
    fn test_clear_namespace_forces_refetch() {
        let mut fetcher = MockFeedFetcher::new();
        fetcher
            .expect_fetch()
            .times(2)
            .returning(|_| Ok(ONE_ITEM.to_string()));
        let (_, aggregator) = aggregator(fetcher);

        aggregator.get_content("blog_posts", FEED_URL, 30, false);
        assert_eq!(aggregator.clear_namespace("blog_"), 1);

        let result = aggregator.get_content("blog_posts", FEED_URL, 30, false);
        assert_eq!(result.origin, ContentOrigin::Network);
    }
}
