use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ContentItem;

/// Bookkeeping the aggregator keeps per content source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceState {
    pub source_key: String,
    #[serde(default)]
    pub refresh_count: u64,
    #[serde(default)]
    pub fallback_count: u64,
    #[serde(default)]
    pub last_refreshed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_seen_id: Option<String>,
}

impl SourceState {
    pub fn new(source_key: impl Into<String>) -> Self {
        Self {
            source_key: source_key.into(),
            ..Default::default()
        }
    }

    /// Number of items listed ahead of the last seen one.
    ///
    /// Feeds are newest-first, so everything before the last seen id is new.
    /// When nothing has been seen yet, or the seen item dropped off the
    /// feed, every item counts.
    pub fn unseen_count(&self, items: &[ContentItem]) -> usize {
        match &self.last_seen_id {
            Some(seen) => items
                .iter()
                .position(|item| &item.id == seen)
                .unwrap_or(items.len()),
            None => items.len(),
        }
    }
}
