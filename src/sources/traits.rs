use crate::config::{DEFAULT_AUTHOR, DEFAULT_EXCERPT_LENGTH};
use crate::domain::ContentItem;
use crate::errors::ClubFeedResult;

/// Retrieves raw feed text from a remote endpoint.
#[cfg_attr(test, mockall::automock)]
pub trait FeedFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> ClubFeedResult<String>;
}

/// Turns raw feed text into normalized content items.
pub trait FeedParser: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    fn parse(&self, raw: &str) -> ClubFeedResult<Vec<ContentItem>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserOptions {
    pub max_excerpt_length: usize,
    pub default_author: String,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            max_excerpt_length: DEFAULT_EXCERPT_LENGTH,
            default_author: DEFAULT_AUTHOR.to_string(),
        }
    }
}
