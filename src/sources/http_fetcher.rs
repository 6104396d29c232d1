use reqwest::blocking::Client;
use tracing::debug;

use crate::errors::{ClubFeedError, ClubFeedResult};
use crate::sources::traits::FeedFetcher;

pub struct HttpFeedFetcher {
    client: Client,
}

impl HttpFeedFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .user_agent(concat!("clubfeed/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

impl Default for HttpFeedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedFetcher for HttpFeedFetcher {
    fn fetch(&self, url: &str) -> ClubFeedResult<String> {
        let response = self.client.get(url).send()?;
        let status = response.status();

        if !status.is_success() {
            return Err(ClubFeedError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text()?;
        debug!(url, bytes = body.len(), "feed fetched");
        Ok(body)
    }
}
