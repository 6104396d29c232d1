use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use clubfeed::cli::{Cli, Commands};
use clubfeed::clock::SystemClock;
use clubfeed::config::Config;
use clubfeed::errors::ClubFeedError;
use clubfeed::logging;
use clubfeed::services::{
    get_upcoming_matches, load_calendar, next_tracked_match, ContentAggregator, ContentResult,
};
use clubfeed::sources::HttpFeedFetcher;
use clubfeed::storage::SqliteKeyValueStore;

type Aggregator = ContentAggregator<SqliteKeyValueStore, HttpFeedFetcher>;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env().context("failed to load configuration")?;
    logging::init(&config.log_level);

    match cli.command {
        Commands::Sources => cmd_sources(&open_aggregator(&config)?),
        Commands::Content {
            source,
            force_refresh,
            json,
            mark_seen,
        } => cmd_content(&open_aggregator(&config)?, &source, force_refresh, json, mark_seen),
        Commands::Matches { path, json } => cmd_matches(&config, path, json),
        Commands::ClearCache { prefix } => cmd_clear_cache(&open_aggregator(&config)?, &prefix),
        Commands::Status => cmd_status(&open_aggregator(&config)?),
    }
}

fn open_aggregator(config: &Config) -> anyhow::Result<Aggregator> {
    ContentAggregator::from_config(config, Arc::new(SystemClock))
        .with_context(|| format!("failed to open cache at {}", config.db_path))
}

fn cmd_sources(aggregator: &Aggregator) -> anyhow::Result<()> {
    let sources = aggregator.registry().sources();

    if sources.is_empty() {
        println!("No content sources configured.");
        return Ok(());
    }

    println!("Configured sources:\n");
    for source in sources {
        println!("  {} [{}]", source.name, source.parser);
        println!("    URL: {}", source.url);
        println!("    Cache key: {} ({} min)", source.key, source.ttl_minutes);
        println!();
    }

    Ok(())
}

fn cmd_content(
    aggregator: &Aggregator,
    name: &str,
    force_refresh: bool,
    json: bool,
    mark_seen: bool,
) -> anyhow::Result<()> {
    let result = aggregator.refresh_source(name, force_refresh)?;
    let key = aggregator.registry().find(name)?.key.clone();

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_content(aggregator, &key, &result);
    }

    if mark_seen {
        aggregator.mark_seen(&key, &result.items);
    }

    Ok(())
}

fn print_content(aggregator: &Aggregator, key: &str, result: &ContentResult) {
    if let Some(advisory) = &result.advisory {
        println!("Note: {}\n", advisory);
    }

    if result.items.is_empty() {
        println!("No content available.");
        return;
    }

    let unseen = aggregator.unseen_count(key, &result.items);
    println!("{} items, {} new since last visit:\n", result.items.len(), unseen);

    for item in &result.items {
        println!("  {}", item.title);
        println!(
            "    {} by {}",
            item.published_at.format("%-d %b %Y %H:%M"),
            item.author
        );
        if !item.excerpt.is_empty() {
            println!("    {}", item.excerpt);
        }
        if let Some(link) = &item.link {
            println!("    {}", link);
        }
        println!();
    }
}

fn cmd_matches(config: &Config, path: Option<String>, json: bool) -> anyhow::Result<()> {
    let tracked = config
        .tracked_club
        .as_deref()
        .ok_or_else(|| ClubFeedError::MissingEnvVar("CLUBFEED_TRACKED_CLUB".to_string()))?;
    let path = path.unwrap_or_else(|| config.matches_path.clone());

    let raw = load_calendar(&path).with_context(|| format!("failed to read {}", path))?;
    let upcoming = get_upcoming_matches(&raw, tracked);

    if json {
        println!("{}", serde_json::to_string_pretty(&upcoming)?);
        return Ok(());
    }

    if upcoming.is_empty() {
        println!("No upcoming matches.");
        return Ok(());
    }

    println!("Upcoming matches:\n");
    for m in &upcoming {
        let marker = if m.involves_tracked_club() { "*" } else { " " };
        println!(
            "{} {} {} {}  {}",
            marker,
            m.day_of_week,
            m.formatted_date,
            m.formatted_time,
            m.fixture_label()
        );
        println!("    {} {} at {}", m.competition, m.round, m.venue);
    }

    if let Some(next) = next_tracked_match(&upcoming) {
        println!(
            "\nNext {} match: {} on {} at {}",
            tracked,
            next.fixture_label(),
            next.formatted_date,
            next.formatted_time
        );
    }

    Ok(())
}

fn cmd_clear_cache(aggregator: &Aggregator, prefix: &str) -> anyhow::Result<()> {
    if prefix.trim().is_empty() {
        return Err(ClubFeedError::InvalidInput("prefix must not be empty".to_string()).into());
    }

    let removed = aggregator.clear_namespace(prefix);
    println!("Cleared {} cached entries with prefix '{}'", removed, prefix);

    Ok(())
}

fn cmd_status(aggregator: &Aggregator) -> anyhow::Result<()> {
    let sources = aggregator.registry().sources();

    if sources.is_empty() {
        println!("No content sources configured.");
        return Ok(());
    }

    for source in sources {
        let status = aggregator.cache_status(source);
        let state = aggregator.state(&source.key);

        println!("{} [{}]", source.name, status.key);
        match status.stored_at {
            Some(stored_at) => println!(
                "  cached: {} items at {} ({})",
                status.item_count,
                stored_at.format("%Y-%m-%d %H:%M:%S UTC"),
                if status.fresh { "fresh" } else { "stale" }
            ),
            None => println!("  cached: nothing"),
        }
        println!(
            "  refreshes: {}, fallbacks: {}",
            state.refresh_count, state.fallback_count
        );
        if let Some(at) = state.last_refreshed_at {
            println!("  last refresh: {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        println!();
    }

    Ok(())
}
