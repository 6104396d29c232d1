use url::Url;

use crate::errors::{ClubFeedError, ClubFeedResult};

pub const DEFAULT_TTL_MINUTES: u64 = 30;
pub const DEFAULT_EXCERPT_LENGTH: usize = 150;
pub const DEFAULT_AUTHOR: &str = "Club Media";

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub blog_feed_url: Option<String>,
    pub instagram_feed_url: Option<String>,
    pub youtube_feed_url: Option<String>,
    pub cache_ttl_minutes: u64,
    pub excerpt_length: usize,
    pub default_author: String,
    pub tracked_club: Option<String>,
    pub matches_path: String,
    pub log_level: String,
}

impl Config {
    /// Get the directory where the executable is located
    fn exe_dir() -> Option<std::path::PathBuf> {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    pub fn from_env() -> ClubFeedResult<Self> {
        let exe_dir = Self::exe_dir();

        // Try to load .env from executable's directory first
        if let Some(ref dir) = exe_dir {
            let env_path = dir.join(".env");
            if env_path.exists() {
                dotenvy::from_path(&env_path).ok();
            }
        }
        // Fall back to current directory
        dotenvy::dotenv().ok();

        let mut config = Self::from_lookup(|name| std::env::var(name).ok())?;

        // Default db_path is relative to executable directory
        if std::env::var("CLUBFEED_DB_PATH").is_err() {
            if let Some(dir) = exe_dir {
                config.db_path = dir.join("clubfeed.db").to_string_lossy().into_owned();
            }
        }

        Ok(config)
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> ClubFeedResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let blog_feed_url = optional_url(non_empty("CLUBFEED_BLOG_FEED_URL"))?;
        let instagram_feed_url = optional_url(non_empty("CLUBFEED_INSTAGRAM_FEED_URL"))?;
        let youtube_feed_url = optional_url(non_empty("CLUBFEED_YOUTUBE_FEED_URL"))?;

        let cache_ttl_minutes = match non_empty("CLUBFEED_CACHE_TTL_MINUTES") {
            Some(raw) => {
                let ttl: u64 = raw.trim().parse().map_err(|_| {
                    ClubFeedError::Config(format!(
                        "CLUBFEED_CACHE_TTL_MINUTES is not a number: {}",
                        raw
                    ))
                })?;
                if ttl == 0 {
                    return Err(ClubFeedError::Config(
                        "CLUBFEED_CACHE_TTL_MINUTES must be greater than zero".to_string(),
                    ));
                }
                ttl
            }
            None => DEFAULT_TTL_MINUTES,
        };

        let excerpt_length = match non_empty("CLUBFEED_EXCERPT_LENGTH") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                ClubFeedError::Config(format!("CLUBFEED_EXCERPT_LENGTH is not a number: {}", raw))
            })?,
            None => DEFAULT_EXCERPT_LENGTH,
        };

        Ok(Self {
            db_path: non_empty("CLUBFEED_DB_PATH").unwrap_or_else(|| "./clubfeed.db".to_string()),
            blog_feed_url,
            instagram_feed_url,
            youtube_feed_url,
            cache_ttl_minutes,
            excerpt_length,
            default_author: non_empty("CLUBFEED_DEFAULT_AUTHOR")
                .unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
            tracked_club: non_empty("CLUBFEED_TRACKED_CLUB"),
            matches_path: non_empty("CLUBFEED_MATCHES_PATH")
                .unwrap_or_else(|| "matches.json".to_string()),
            log_level: non_empty("CLUBFEED_LOG").unwrap_or_else(|| "warn".to_string()),
        })
    }
}

fn optional_url(value: Option<String>) -> ClubFeedResult<Option<String>> {
    match value {
        Some(raw) => {
            let parsed = Url::parse(raw.trim())
                .map_err(|e| ClubFeedError::InvalidUrl(format!("{}: {}", raw, e)))?;
            match parsed.scheme() {
                "http" | "https" => Ok(Some(parsed.to_string())),
                other => Err(ClubFeedError::InvalidUrl(format!(
                    "{}: unsupported scheme {}",
                    raw, other
                ))),
            }
        }
        None => Ok(None),
    }
}
