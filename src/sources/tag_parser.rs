//! Pattern-based RSS/Atom extraction.
//!
//! Third-party feeds (blog plugins, Instagram bridges) are frequently not
//! well-formed XML, so entries are located by tag patterns rather than by
//! a full parse. Everything here is best effort: a broken entry yields
//! whatever fields could be found and never fails the batch.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::clock::Clock;
use crate::domain::ContentItem;
use crate::errors::ClubFeedResult;
use crate::sources::text::{decode_entities, excerpt, html_to_text};
use crate::sources::traits::{FeedParser, ParserOptions};

pub const UNTITLED: &str = "Untitled";

static OPEN_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([A-Za-z][\w:.\-]*)(\s[^>]*)?>").expect("valid open tag regex"));

static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([\w:.\-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid attribute regex")
});

/// CDATA sections (body in group 1) and comments; neither holds real tags.
static OPAQUE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>|<!--.*?-->").expect("valid cdata/comment regex")
});

static IMG_SRC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<img\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#).expect("valid img regex")
});

/// One occurrence of an element inside a fragment.
#[derive(Debug, Clone, Copy)]
struct Element<'a> {
    open: &'a str,
    /// `None` for self-closing tags and for tags that are never closed
    inner: Option<&'a str>,
}

impl<'a> Element<'a> {
    fn attr(&self, name: &str) -> Option<String> {
        ATTR_RE.captures_iter(self.open).find_map(|caps| {
            if !caps[1].eq_ignore_ascii_case(name) {
                return None;
            }
            caps.get(2)
                .or_else(|| caps.get(3))
                .map(|m| decode_entities(m.as_str().trim()))
        })
    }

    fn text(&self) -> Option<String> {
        self.inner.map(unwrap_text)
    }
}

/// A slice of feed text with CDATA sections and comments blanked out for tag searches.
///
/// The masked copy has the same byte length as the original, so offsets
/// found in it slice the original directly.
struct Fragment<'a> {
    raw: &'a str,
    masked: String,
}

impl<'a> Fragment<'a> {
    fn new(raw: &'a str) -> Self {
        let mut bytes = raw.as_bytes().to_vec();
        for m in OPAQUE_RE.find_iter(raw) {
            for b in &mut bytes[m.start()..m.end()] {
                *b = b' ';
            }
        }
        // Only ASCII spaces were written over whole matches, which start and
        // end on char boundaries
        let masked = String::from_utf8(bytes)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned());

        Self {
            raw,
            masked: masked.to_ascii_lowercase(),
        }
    }

    /// All elements named `tag` (case-insensitive, prefix included), in source order.
    fn elements(&self, tag: &str) -> Vec<Element<'a>> {
        let tag = tag.to_ascii_lowercase();
        let raw = self.raw;
        let mut out = Vec::new();

        for caps in OPEN_TAG_RE.captures_iter(&self.masked) {
            if caps[1] != *tag {
                continue;
            }
            let whole = match caps.get(0) {
                Some(m) => m,
                None => continue,
            };
            let open = &raw[whole.start()..whole.end()];

            let inner = if whole.as_str().ends_with("/>") {
                None
            } else {
                self.find_close(&tag, whole.end())
                    .map(|close| &raw[whole.end()..close])
            };

            out.push(Element { open, inner });
        }

        out
    }

    fn find_close(&self, tag: &str, from: usize) -> Option<usize> {
        let needle = format!("</{}", tag);
        let mut offset = from;

        while let Some(pos) = self.masked[offset..].find(&needle) {
            let start = offset + pos;
            let after = start + needle.len();
            match self.masked[after..].chars().next() {
                Some('>') => return Some(start),
                Some(c) if c.is_whitespace() => return Some(start),
                _ => offset = after,
            }
        }

        None
    }

    fn first(&self, tag: &str) -> Option<Element<'a>> {
        self.elements(tag).into_iter().next()
    }

    /// Text of the first `tag` element that has non-blank content.
    fn text(&self, tag: &str) -> Option<String> {
        self.elements(tag)
            .into_iter()
            .filter_map(|e| e.text())
            .find(|t| !t.trim().is_empty())
    }

    /// First non-blank text among several candidate tags, in priority order.
    fn text_of_any(&self, tags: &[&str]) -> Option<String> {
        tags.iter().find_map(|tag| self.text(tag))
    }
}

/// Element body as text: CDATA sections verbatim, comments dropped, the rest entity-decoded.
fn unwrap_text(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut last = 0;

    for caps in OPAQUE_RE.captures_iter(inner) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&decode_entities(&inner[last..whole.start()]));
        if let Some(body) = caps.get(1) {
            out.push_str(body.as_str());
        }
        last = whole.end();
    }
    out.push_str(&decode_entities(&inner[last..]));

    out.trim().to_string()
}

pub fn first_img_src(html: &str) -> Option<String> {
    IMG_SRC_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| decode_entities(m.as_str().trim()))
        .filter(|src| !src.is_empty())
}

/// Parse the date formats feeds use in practice.
pub fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn is_image_type(mime: Option<&str>) -> bool {
    mime.map_or(true, |t| t.trim().to_ascii_lowercase().starts_with("image/"))
}

/// Default parser: tag-pattern heuristics over raw RSS 2.0 / Atom text.
pub struct TagPatternParser {
    options: ParserOptions,
    clock: Arc<dyn Clock>,
}

impl TagPatternParser {
    pub fn new(options: ParserOptions, clock: Arc<dyn Clock>) -> Self {
        Self { options, clock }
    }

    /// Split a document into per-entry fragments; RSS items win over Atom entries.
    fn entries<'a>(raw: &'a str) -> Vec<&'a str> {
        let document = Fragment::new(raw);
        let items = document.elements("item");
        let chosen = if items.is_empty() {
            document.elements("entry")
        } else {
            items
        };

        chosen.into_iter().filter_map(|e| e.inner).collect()
    }

    fn link(entry: &Fragment) -> Option<String> {
        if let Some(text) = entry.text("link") {
            return Some(text);
        }

        // Atom: prefer rel="alternate" (or no rel) over self/edit/enclosure links
        let links = entry.elements("link");
        links
            .iter()
            .filter(|l| l.attr("rel").map_or(true, |r| r.eq_ignore_ascii_case("alternate")))
            .chain(links.iter())
            .find_map(|l| l.attr("href"))
            .filter(|href| !href.is_empty())
    }

    fn author(entry: &Fragment) -> Option<String> {
        if let Some(creator) = entry.text("dc:creator") {
            return Some(creator);
        }

        let author = entry.first("author")?;
        let inner = author.inner?;
        let nested = Fragment::new(inner);
        nested.text("name").or_else(|| author.text())
    }

    fn categories(entry: &Fragment) -> Vec<String> {
        entry
            .elements("category")
            .into_iter()
            .filter_map(|c| {
                c.text()
                    .filter(|t| !t.is_empty())
                    .or_else(|| c.attr("term"))
            })
            .map(|c| html_to_text(&c))
            .filter(|c| !c.is_empty())
            .collect()
    }

    /// Image resolution, first hit wins: attachment, media content, content body, description.
    fn image_url(entry: &Fragment, content: &str, description: &str) -> Option<String> {
        let attachment = entry
            .elements("enclosure")
            .into_iter()
            .filter(|e| is_image_type(e.attr("type").as_deref()))
            .chain(entry.elements("media:thumbnail"))
            .find_map(|e| e.attr("url"));
        if attachment.is_some() {
            return attachment;
        }

        let media = entry
            .elements("media:content")
            .into_iter()
            .filter(|e| {
                e.attr("medium").map_or(true, |m| m.eq_ignore_ascii_case("image"))
                    && is_image_type(e.attr("type").as_deref())
            })
            .find_map(|e| e.attr("url"));
        if media.is_some() {
            return media;
        }

        first_img_src(content).or_else(|| first_img_src(description))
    }

    fn parse_entry(&self, raw: &str, index: usize, now: DateTime<Utc>) -> ContentItem {
        let entry = Fragment::new(raw);

        let id = entry
            .text_of_any(&["guid", "id"])
            .map(|id| id.trim().to_string())
            .unwrap_or_else(|| format!("{}-{}", now.timestamp_millis(), index));

        let title = entry
            .text("title")
            .map(|t| html_to_text(&t))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string());

        let published_at = ["pubDate", "published", "updated", "dc:date"]
            .iter()
            .filter_map(|tag| entry.text(tag))
            .find_map(|raw| parse_feed_date(&raw))
            .unwrap_or(now);

        let author = Self::author(&entry)
            .map(|a| html_to_text(&a))
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| self.options.default_author.clone());

        let content = entry
            .text_of_any(&["content:encoded", "content"])
            .unwrap_or_default();
        let description = entry
            .text_of_any(&["description", "summary"])
            .unwrap_or_default();

        let image_url = Self::image_url(&entry, &content, &description);

        let body = if content.trim().is_empty() {
            description.clone()
        } else {
            content
        };
        let clean_text = html_to_text(&body);
        let summary = excerpt(&clean_text, self.options.max_excerpt_length);

        ContentItem::new(id, title, published_at, author)
            .with_link(Self::link(&entry))
            .with_image_url(image_url)
            .with_categories(Self::categories(&entry))
            .with_body(body, description, clean_text, summary)
    }
}

impl FeedParser for TagPatternParser {
    fn name(&self) -> &'static str {
        "tag-patterns"
    }

    fn parse(&self, raw: &str) -> ClubFeedResult<Vec<ContentItem>> {
        let now = self.clock.now();

        Ok(Self::entries(raw)
            .into_iter()
            .enumerate()
            .map(|(index, entry)| self.parse_entry(entry, index, now))
            .collect())
    }
}
