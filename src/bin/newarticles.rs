// Copyright © 2025, Peter Atashian
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wikinew::fetch::default_output;
use wikinew::{fetch_and_save, Config, Continue, FetchOptions};

/// Fetch Wikipedia articles created since a date and save their plain text.
#[derive(Debug, Parser)]
#[command(name = "newarticles", version)]
struct Args {
    /// Wikipedia language code (e.g. en, de, fr, zh)
    #[arg(long, default_value = "en")]
    language: String,
    /// Fetch articles created at or after this date (YYYY-MM-DD or ISO-8601)
    #[arg(long, alias = "since_date", default_value = "2025-01-01")]
    since_date: String,
    /// Maximum number of articles to fetch
    #[arg(long, alias = "max_articles", default_value_t = 10_000)]
    max_articles: usize,
    /// Output file path [default: wikipedia_articles_<lang>_<max>_since_<date>.txt]
    #[arg(long, alias = "output_file")]
    output_file: Option<PathBuf>,
    /// Pause between requests, in milliseconds
    #[arg(long, default_value_t = 200)]
    delay_ms: u64,
    /// Attempts per request before giving up
    #[arg(long, default_value_t = 3)]
    retries: u32,
    /// Resume the listing from an rccontinue value printed by an earlier run
    #[arg(long)]
    rccontinue: Option<String>,
    /// JSON file with client settings (useragent, baseapi, maxlag, timeout_secs)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Log requests and listing cursors
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "wikinew=debug,newarticles=debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    let output = args
        .output_file
        .clone()
        .unwrap_or_else(|| default_output(&args.language, args.max_articles, &args.since_date));
    let mut options = FetchOptions::new(&args.language, &args.since_date, args.max_articles, output)
        .context("invalid arguments")?;
    options.delay = Duration::from_millis(args.delay_ms);
    options.list_retry.attempts = args.retries;
    options.fetch_retry.attempts = args.retries;
    options.cursor = args.rccontinue.as_deref().map(Continue::from_rccontinue);
    let config = match &args.config {
        Some(path) => Config::load_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    let mw = options.client(config)?;
    let summary = fetch_and_save(&mw, &options)
        .with_context(|| format!("fetching new articles from {} failed", mw.baseapi()))?;
    println!(
        "Done! {} of {} listed articles saved to: {}",
        summary.written,
        summary.listed,
        options.output.display()
    );
    Ok(())
}
