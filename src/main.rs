//! Trawl main entry point
//!
//! This is the command-line interface for the Trawl site crawler.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use trawl::cache::PageStore;
use trawl::config::{load_config_with_hash, Config};
use trawl::crawler::Crawler;
use trawl::output::{generate_markdown_report, print_summary, write_json};
use tracing_subscriber::EnvFilter;

/// Trawl: search a website for patterns
///
/// Trawl crawls a single site breadth-first, runs a set of named regular
/// expressions against every page and reports what it found. Pages can be
/// kept in a page cache so that repeated runs do not hit the network.
#[derive(Parser, Debug)]
#[command(name = "trawl")]
#[command(version)]
#[command(about = "Search a website for patterns", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Crawl this root instead of the one in the configuration
    #[arg(long, value_name = "URL")]
    root: Option<String>,

    /// Write the result as JSON to this file
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,

    /// Write a markdown report to this file
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Empty the page cache before crawling
    #[arg(long)]
    clear_cache: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(root) = &cli.root {
        config.crawl.root = root.clone();
    }

    if cli.clear_cache {
        let cache = config
            .disk_cache()
            .with_context(|| format!("Failed to open cache {}", config.cache.directory.display()))?;
        cache.clear().context("Failed to clear the page cache")?;
    }

    if cli.dry_run {
        handle_dry_run(&config)?;
        return Ok(());
    }

    handle_crawl(&cli, &config, &config_hash).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("trawl=info,warn"),
            1 => EnvFilter::new("trawl=debug,info"),
            2 => EnvFilter::new("trawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> Result<()> {
    let options = config.crawl_options();

    println!("=== Trawl Dry Run ===\n");

    println!("Crawl Configuration:");
    println!("  Root: {}", config.crawl.root);
    println!("  Max depth: {}", options.max_depth);
    println!("  Max pages: {}", options.max_pages);
    if let Some(limit) = options.max_branch_count {
        println!("  Max pages per branch: {}", limit);
    }
    println!("  Domain scope: {:?}", options.domain_scope);
    println!("  Concurrency: {}", options.concurrency);
    println!("  Match target: {:?}", options.match_target);
    println!("  Respect robots.txt: {}", options.respect_robots);
    println!("  Valid extensions: {}", options.valid_extensions.join(", "));

    println!("\nFetch:");
    match options.fetch.scheme_hint {
        Some(scheme) => println!("  Scheme hint: {}", scheme),
        None => println!("  Scheme hint: none (probe https, then http)"),
    }
    println!("  Validate certificate: {}", options.fetch.validate_certificate);
    println!("  Validate reachability: {}", options.fetch.validate_reachability);
    println!("  Timeout: {}s", config.fetch.timeout_secs);

    println!("\nCache:");
    if options.store_to_cache {
        println!("  Directory: {}", config.cache.directory.display());
        match config.cache.max_size_mb {
            Some(0) => println!("  Read only"),
            Some(mb) => println!("  Max size: {} MB", mb),
            None => println!("  Max size: unlimited"),
        }
    } else {
        println!("  Disabled");
    }

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.user_agent_string());

    println!("\nSearches ({}):", config.searches.len());
    for (key, pattern) in &config.searches {
        println!("  - {} ({:?}): {}", key, options.policy_for(key), pattern);
    }

    if !options.sort_order_hints.is_empty() {
        println!("\nSort hints: {}", options.sort_order_hints.join(", "));
    }
    if !options.stop_on_keys.is_empty() {
        println!("Stop when found: {}", options.stop_on_keys.join(", "));
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(cli: &Cli, config: &Config, config_hash: &str) -> Result<()> {
    let specs = config.search_spec().context("Invalid search pattern")?;
    let options = config.crawl_options();
    let fetcher = config.build_fetcher().context("Failed to set up fetcher")?;

    tracing::info!(
        "Searching {} for {} patterns (max depth {}, max pages {})",
        config.crawl.root,
        specs.len(),
        options.max_depth,
        options.max_pages
    );

    let crawler = Crawler::new(fetcher);
    let result = crawler
        .crawl(&config.crawl.root, &specs, &options)
        .await
        .with_context(|| format!("Crawl of {} failed", config.crawl.root))?;

    if !cli.quiet {
        print_summary(&result);
    }

    if let Some(path) = &cli.json {
        write_json(&result, path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Result written to {}", path.display());
    }

    if let Some(path) = &cli.report {
        generate_markdown_report(&result, Some(config_hash), path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Report written to {}", path.display());
    }

    Ok(())
}
