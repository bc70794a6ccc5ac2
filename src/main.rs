//! Reply-Mesh main entry point
//!
//! This is the command-line interface for the Reply-Mesh follow-graph mapper.

use clap::Parser;
use reply_mesh::config::{load_config_with_hash, validate, Config};
use reply_mesh::crawler::{run_crawl, CrawlReport};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Reply-Mesh: who follows whom in a conversation thread
///
/// Reply-Mesh collects everyone who replied to a post, retrieves each
/// participant's follow list within the provider's rate limits, and writes
/// the follow relationships among participants as a CSV edge list.
#[derive(Parser, Debug)]
#[command(name = "reply-mesh")]
#[command(version)]
#[command(about = "A follow-graph mapper for conversation threads", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Root post to analyze, overriding the config file
    #[arg(long, value_name = "ID")]
    post_id: Option<String>,

    /// Author of the root post, overriding the config file
    #[arg(long, value_name = "HANDLE")]
    author: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the crawl plan without contacting the provider
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics of the latest archived run and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(post_id) = cli.post_id {
        config.target.post_id = post_id;
    }
    if let Some(author) = cli.author {
        config.target.author = author;
    }
    if let Err(e) = validate(&config) {
        tracing::error!("Invalid target: {}", e);
        return Err(e.into());
    }

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("reply_mesh=info,warn"),
            1 => EnvFilter::new("reply_mesh=debug,info"),
            2 => EnvFilter::new("reply_mesh=trace,debug"),
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

/// Handles the --dry-run mode: shows what a run would do
fn handle_dry_run(config: &Config) {
    println!("=== Reply-Mesh Dry Run ===\n");

    println!("Target:");
    println!("  Post: {}", config.target.post_id);
    println!("  Author: {}", config.target.author);

    println!("\nProvider:");
    println!("  Base URL: {}", config.api.base_url);
    println!("  Token variable: {}", config.api.bearer_token_env);
    let token_set = std::env::var(&config.api.bearer_token_env).is_ok_and(|t| !t.is_empty());
    println!("  Token present: {}", if token_set { "yes" } else { "no" });
    println!("  Request timeout: {}s", config.api.request_timeout_secs);

    println!("\nCrawler:");
    println!("  Cooldown: {}ms", config.crawler.cooldown_ms);
    println!("  Max replies scanned: {}", config.crawler.max_replies);
    println!("  Workers: {}", config.crawler.max_workers);
    println!("  Reply page size: {}", config.crawler.replies_page_size);
    println!("  Follow page size: {}", config.crawler.follows_page_size);

    println!("\nOutput:");
    println!("  Edges: {}", config.output.edges_path);
    println!("  Error log: {}", config.output.error_log_path);
    if config.output.write_follow_dumps {
        println!("  Follow dumps: {}", config.output.dump_dir);
    } else {
        println!("  Follow dumps: disabled");
    }
    println!("  Database: {}", config.output.database_path);

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would map replies to post {} by {}",
        config.target.post_id, config.target.author
    );
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use reply_mesh::output::{load_statistics, print_statistics};
    use reply_mesh::storage::open_storage;
    use std::path::Path;

    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;

    match load_statistics(&storage)? {
        Some(stats) => print_statistics(&stats),
        None => println!("No runs archived yet"),
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Mapping post {} by {} (cooldown {}ms, {} workers)",
        config.target.post_id,
        config.target.author,
        config.crawler.cooldown_ms,
        config.crawler.max_workers
    );

    match run_crawl(config, config_hash).await {
        Ok(report) => {
            log_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

fn log_report(report: &CrawlReport) {
    tracing::info!(
        "Crawl completed: {} edges among {} participants written to {}",
        report.edges.len(),
        report.participants.len(),
        report.edges_path.display()
    );
    tracing::info!(
        "{} reply pages, {} follow pages, {} cooldowns ({} throttled) in {:?}",
        report.reply_pages,
        report.follow_pages,
        report.cooldowns,
        report.throttles,
        report.elapsed
    );
    if !report.replies_complete {
        tracing::warn!("Reply scan ended early; some repliers may be missing");
    }
    if !report.failed.is_empty() {
        tracing::warn!("Unresolved accounts: {}", report.failed.join(", "));
    }
    if !report.incomplete.is_empty() {
        tracing::warn!("Incomplete follow lists: {}", report.incomplete.join(", "));
    }
    if let Some(lost) = &report.archive_error {
        tracing::warn!("Run archive incomplete ({}); the edge list is unaffected", lost);
    }
}
