use std::sync::Arc;

use feed_rs::model::Entry;
use feed_rs::parser;

use crate::clock::Clock;
use crate::domain::ContentItem;
use crate::errors::{ClubFeedError, ClubFeedResult};
use crate::sources::tag_parser::{first_img_src, UNTITLED};
use crate::sources::text::{excerpt, html_to_text};
use crate::sources::traits::{FeedParser, ParserOptions};

/// Full XML parser for well-formed feeds (YouTube Atom, media RSS).
pub struct FeedRsParser {
    options: ParserOptions,
    clock: Arc<dyn Clock>,
}

impl FeedRsParser {
    pub fn new(options: ParserOptions, clock: Arc<dyn Clock>) -> Self {
        Self { options, clock }
    }

    fn media_image(entry: &Entry) -> Option<String> {
        let thumbnail = entry
            .media
            .iter()
            .flat_map(|m| m.thumbnails.iter())
            .map(|t| t.image.uri.clone())
            .find(|uri| !uri.is_empty());
        if thumbnail.is_some() {
            return thumbnail;
        }

        entry
            .media
            .iter()
            .flat_map(|m| m.content.iter())
            .filter(|c| {
                c.content_type
                    .as_ref()
                    .map_or(true, |t| t.to_string().starts_with("image/"))
            })
            .find_map(|c| c.url.as_ref().map(|u| u.to_string()))
    }

    fn to_item(&self, entry: Entry) -> ContentItem {
        let now = self.clock.now();
        let image = Self::media_image(&entry);

        let title = entry
            .title
            .as_ref()
            .map(|t| html_to_text(&t.content))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string());

        let content = entry
            .content
            .as_ref()
            .and_then(|c| c.body.clone())
            .unwrap_or_default();

        // YouTube keeps the video description in media:group
        let description = entry
            .summary
            .as_ref()
            .map(|s| s.content.clone())
            .or_else(|| {
                entry
                    .media
                    .iter()
                    .find_map(|m| m.description.as_ref().map(|d| d.content.clone()))
            })
            .unwrap_or_default();

        let image_url = image
            .or_else(|| first_img_src(&content))
            .or_else(|| first_img_src(&description));

        let link = entry
            .links
            .iter()
            .find(|l| l.rel.as_deref().map_or(true, |r| r == "alternate"))
            .or_else(|| entry.links.first())
            .map(|l| l.href.clone());

        let author = entry
            .authors
            .first()
            .map(|p| p.name.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| self.options.default_author.clone());

        let categories = entry
            .categories
            .iter()
            .map(|c| c.label.clone().unwrap_or_else(|| c.term.clone()))
            .filter(|c| !c.trim().is_empty())
            .collect();

        let body = if content.trim().is_empty() {
            description.clone()
        } else {
            content
        };
        let clean_text = html_to_text(&body);
        let summary = excerpt(&clean_text, self.options.max_excerpt_length);

        let published_at = entry.published.or(entry.updated).unwrap_or(now);

        ContentItem::new(entry.id, title, published_at, author)
            .with_link(link)
            .with_image_url(image_url)
            .with_categories(categories)
            .with_body(body, description, clean_text, summary)
    }
}

impl FeedParser for FeedRsParser {
    fn name(&self) -> &'static str {
        "feed-rs"
    }

    fn parse(&self, raw: &str) -> ClubFeedResult<Vec<ContentItem>> {
        let feed =
            parser::parse(raw.as_bytes()).map_err(|e| ClubFeedError::FeedParse(e.to_string()))?;

        Ok(feed.entries.into_iter().map(|e| self.to_item(e)).collect())
    }
}
