//! linewatch CLI
//!
//! Long-lived watcher for the line status feed, publishing changes to
//! Bluesky. `watch` is the production mode; `once` and `history` exist for
//! operating and inspecting a deployment.

use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use linewatch::{
    error::Result,
    models::Config,
    pipeline::{Publisher, StatusDiff, Watcher, combine, compose},
    services::{BlueskyClient, Feed, StatusFeed},
    storage::{HistoryStore, LocalHistory},
};

/// linewatch - transit line status watcher
#[derive(Parser, Debug)]
#[command(
    name = "linewatch",
    version,
    about = "Watches a transit line status feed and posts changes to Bluesky"
)]
struct Cli {
    /// Path to storage directory for history and config
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Path to config file (default: {storage_dir}/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the feed forever, posting status changes
    Watch,

    /// Run a single poll cycle and exit
    Once {
        /// Print would-be posts instead of sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Show recently published posts
    History {
        /// Maximum number of posts to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Validate configuration and credentials
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(cli.storage_dir.join("config.toml")),
    };
    config.apply_env_overrides();

    match cli.command {
        Command::Watch => run_watch(&cli, config).await?,
        Command::Once { dry_run } => run_once(&cli, config, dry_run).await?,
        Command::History { limit } => show_history(&cli, limit).await?,
        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");

            match config.bluesky.credentials() {
                Ok((identifier, _)) => log::info!("✓ Credentials set for {}", identifier),
                Err(e) => log::warn!("{}", e),
            }
            log::info!("Validation complete");
        }
    }

    Ok(())
}

/// Poll forever. Returns only if setup fails before the loop starts.
async fn run_watch(cli: &Cli, config: Config) -> Result<()> {
    config.validate()?;
    let (identifier, password) = config.bluesky.credentials()?;

    let feed = StatusFeed::new(&config.feed)?;
    let client = BlueskyClient::new(&config.bluesky)?;
    let store = LocalHistory::new(&cli.storage_dir);
    let publisher = Publisher::new(Box::new(client), Box::new(store), &config.watcher);
    let mut watcher = Watcher::new(Box::new(feed), publisher, config.watcher.clone());

    log::info!(
        "Watching {} every {}s",
        config.feed.url,
        config.watcher.poll_interval_secs
    );
    watcher.run(identifier, password).await;
    Ok(())
}

/// One fetch-diff-publish cycle, or a printout of what it would post.
async fn run_once(cli: &Cli, config: Config, dry_run: bool) -> Result<()> {
    config.validate()?;
    let feed = StatusFeed::new(&config.feed)?;
    let store = LocalHistory::new(&cli.storage_dir);

    if dry_run {
        let snapshot = feed.fetch().await?;
        log::info!("Fetched {} lines", snapshot.len());

        let mut diff = StatusDiff::new();
        let events = diff.observe(&snapshot);
        let candidates: Vec<String> = events
            .iter()
            .map(|event| compose(event, config.watcher.max_post_chars))
            .collect();
        let messages = combine(candidates, config.watcher.max_post_chars);

        if messages.is_empty() {
            log::info!("All lines running well; nothing to post");
            return Ok(());
        }

        let history = store.load().await?;
        let now = Utc::now();
        let window = config.watcher.dedup_window_secs as i64;
        for text in &messages {
            if history.is_duplicate(text, now, window) {
                println!("-- would skip (recently posted) --\n{text}\n");
            } else {
                println!("-- would post --\n{text}\n");
            }
        }
        return Ok(());
    }

    let (identifier, password) = config.bluesky.credentials()?;
    let client = BlueskyClient::new(&config.bluesky)?;
    let publisher = Publisher::new(Box::new(client), Box::new(store), &config.watcher);
    let mut watcher = Watcher::new(Box::new(feed), publisher, config.watcher.clone());

    watcher.login(identifier, password).await?;
    let report = watcher.run_cycle().await?;
    log::info!(
        "Cycle complete: {} lines, {} change(s), {} posted, {} duplicate(s), {} failed",
        report.lines,
        report.events,
        report.delivery.posted,
        report.delivery.duplicates,
        report.delivery.failures
    );
    Ok(())
}

/// Print the most recent history entries, newest first.
async fn show_history(cli: &Cli, limit: usize) -> Result<()> {
    let store = LocalHistory::new(&cli.storage_dir);
    let history = store.load().await?;

    if history.is_empty() {
        log::info!("No posts recorded yet");
        return Ok(());
    }

    log::info!(
        "Showing {} of {} recorded post(s)",
        limit.min(history.len()),
        history.len()
    );
    for record in history.recent(limit) {
        println!("{}", record.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
        for line in record.text.lines() {
            println!("  {line}");
        }
    }
    Ok(())
}
