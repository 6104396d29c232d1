use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized feed entry, the unit every content source produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    pub raw_content: String,
    pub description: String,
    pub clean_text: String,
    pub excerpt: String,
    pub image_url: Option<String>,
    pub link: Option<String>,
    pub published_at: DateTime<Utc>,
    pub author: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl ContentItem {
    pub fn new(id: String, title: String, published_at: DateTime<Utc>, author: String) -> Self {
        Self {
            id,
            title,
            raw_content: String::new(),
            description: String::new(),
            clean_text: String::new(),
            excerpt: String::new(),
            image_url: None,
            link: None,
            published_at,
            author,
            categories: Vec::new(),
        }
    }

    pub fn with_link(mut self, link: Option<String>) -> Self {
        self.link = link;
        self
    }

    pub fn with_image_url(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_body(
        mut self,
        raw_content: String,
        description: String,
        clean_text: String,
        excerpt: String,
    ) -> Self {
        self.raw_content = raw_content;
        self.description = description;
        self.clean_text = clean_text;
        self.excerpt = excerpt;
        self
    }
}
