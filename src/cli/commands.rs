use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "clubfeed")]
#[command(about = "Club news, social feeds and fixtures with offline caching")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List configured content sources
    Sources,

    /// Show content for a source (blog, instagram, youtube)
    Content {
        /// Source name or cache key
        source: String,

        /// Ignore a fresh cache and fetch from the network
        #[arg(long)]
        force_refresh: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Remember the newest item as seen
        #[arg(long)]
        mark_seen: bool,
    },

    /// Show upcoming matches from the local calendar
    Matches {
        /// Calendar file (defaults to CLUBFEED_MATCHES_PATH)
        #[arg(short, long)]
        path: Option<String>,

        /// Print the matches as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete cached entries whose key starts with a prefix
    ClearCache {
        /// Key prefix, e.g. blog_ or instagram_
        prefix: String,
    },

    /// Show cache freshness and refresh counters per source
    Status,
}
