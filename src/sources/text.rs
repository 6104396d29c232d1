use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use scraper::{ElementRef, Html};

pub const ELLIPSIS: &str = "...";

static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("valid entity regex")
});

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "ol", "p",
    "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Extract plain text from HTML content, preserving word boundaries
pub fn html_to_text(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let document = Html::parse_fragment(html);
    let mut text = String::new();
    push_text(document.root_element(), &mut text);

    collapse_whitespace(&text)
}

/// Block elements are padded on both sides so neighbouring words never merge.
fn push_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            let block = BLOCK_ELEMENTS.contains(&child.value().name());
            if block {
                out.push(' ');
            }
            push_text(child, out);
            if block {
                out.push(' ');
            }
        }
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate `text` to at most `max_len` characters, ellipsis included.
///
/// Cuts at the last whitespace that fits; only when the allowed prefix has
/// no whitespace at all is a word split.
pub fn excerpt(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }

    let marker_len = ELLIPSIS.chars().count();
    if max_len <= marker_len {
        // No room for the ellipsis, but still avoid splitting a word
        return word_prefix(text, max_len).to_string();
    }

    let budget = max_len - marker_len;
    format!("{}{}", word_prefix(text, budget), ELLIPSIS)
}

/// At most `max_chars` leading chars of `text`, cut at the last whitespace.
///
/// Only when that prefix has no whitespace at all is a word split.
fn word_prefix(text: &str, max_chars: usize) -> &str {
    let head_end = text
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let head = &text[..head_end];

    // The prefix already ends on a word boundary
    let next_is_space = text[head_end..]
        .chars()
        .next()
        .map_or(true, char::is_whitespace);

    let cut = if next_is_space {
        head.trim_end()
    } else {
        match head.rfind(char::is_whitespace) {
            Some(pos) => head[..pos].trim_end(),
            None => head,
        }
    };

    // Only whitespace before the first word: fall back to a hard cut
    if cut.is_empty() {
        head.trim()
    } else {
        cut
    }
}

/// Decode the XML entities plus numeric character references.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    ENTITY_RE
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            let decoded = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ if name.starts_with("#x") || name.starts_with("#X") => {
                    u32::from_str_radix(&name[2..], 16).ok().and_then(char::from_u32)
                }
                _ if name.starts_with('#') => name[1..].parse().ok().and_then(char::from_u32),
                _ => None,
            };
            decoded
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
