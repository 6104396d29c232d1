use std::sync::Arc;

use serde::Serialize;

use crate::clock::Clock;
use crate::config::Config;
use crate::errors::{ClubFeedError, ClubFeedResult};
use crate::sources::feed_rs_parser::FeedRsParser;
use crate::sources::tag_parser::TagPatternParser;
use crate::sources::traits::{FeedParser, ParserOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserKind {
    TagPatterns,
    FeedRs,
}

impl ParserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParserKind::TagPatterns => "tag_patterns",
            ParserKind::FeedRs => "feed_rs",
        }
    }
}

impl std::fmt::Display for ParserKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named remote feed and how to cache and parse it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentSource {
    /// Name used on the command line, e.g. `blog`
    pub name: String,
    /// Cache key, `<domain>_<resource>`
    pub key: String,
    pub url: String,
    pub ttl_minutes: u64,
    pub parser: ParserKind,
}

impl ContentSource {
    pub fn new(
        name: impl Into<String>,
        key: impl Into<String>,
        url: impl Into<String>,
        ttl_minutes: u64,
        parser: ParserKind,
    ) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            url: url.into(),
            ttl_minutes,
            parser,
        }
    }
}

pub struct SourceRegistry {
    sources: Vec<ContentSource>,
    tag_parser: TagPatternParser,
    feed_rs_parser: FeedRsParser,
}

impl SourceRegistry {
    pub fn new(options: ParserOptions, clock: Arc<dyn Clock>) -> Self {
        Self {
            sources: Vec::new(),
            tag_parser: TagPatternParser::new(options.clone(), clock.clone()),
            feed_rs_parser: FeedRsParser::new(options, clock),
        }
    }

    /// Register the blog, Instagram and YouTube feeds that are configured.
    pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> Self {
        let options = ParserOptions {
            max_excerpt_length: config.excerpt_length,
            default_author: config.default_author.clone(),
        };
        let mut registry = Self::new(options, clock);
        let ttl = config.cache_ttl_minutes;

        if let Some(url) = &config.blog_feed_url {
            registry.register(ContentSource::new(
                "blog",
                "blog_posts",
                url,
                ttl,
                ParserKind::TagPatterns,
            ));
        }
        if let Some(url) = &config.instagram_feed_url {
            registry.register(ContentSource::new(
                "instagram",
                "instagram_posts",
                url,
                ttl,
                ParserKind::TagPatterns,
            ));
        }
        if let Some(url) = &config.youtube_feed_url {
            registry.register(ContentSource::new(
                "youtube",
                "youtube_videos",
                url,
                ttl,
                ParserKind::FeedRs,
            ));
        }

        registry
    }

    /// Add a source, replacing any existing one with the same name.
    pub fn register(&mut self, source: ContentSource) {
        self.sources.retain(|s| s.name != source.name);
        self.sources.push(source);
    }

    pub fn sources(&self) -> &[ContentSource] {
        &self.sources
    }

    pub fn find(&self, name: &str) -> ClubFeedResult<&ContentSource> {
        self.sources
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name) || s.key == name)
            .ok_or_else(|| ClubFeedError::UnknownSource(name.to_string()))
    }

    pub fn parser(&self, kind: ParserKind) -> &dyn FeedParser {
        match kind {
            ParserKind::TagPatterns => &self.tag_parser,
            ParserKind::FeedRs => &self.feed_rs_parser,
        }
    }
}
