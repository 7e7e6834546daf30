//! Sitewise main entry point
//!
//! This is the command-line interface for the Sitewise adaptive site crawler.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use sitewise::config::{load_config_with_hash, Config};
use sitewise::content::{DefaultTextExtractor, FileContentProcessor};
use sitewise::crawler::{CrawlManager, CrawlServices};
use sitewise::storage::{RunLedger, RunStatus, SqliteStorage};
use sitewise::TaskState;
use tracing_subscriber::EnvFilter;

/// Sitewise: an adaptive site crawler
///
/// Sitewise crawls the configured sites, detects what kind of site each one is
/// (Flask, Sphinx, WordPress, PDF, ...) and adapts its crawl accordingly,
/// saving pages to disk and recording every page in a SQLite ledger.
#[derive(Parser, Debug)]
#[command(name = "sitewise")]
#[command(version = "1.0.0")]
#[command(about = "An adaptive site crawler", long_about = None)]
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

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sitewise=info,warn"),
            1 => EnvFilter::new("sitewise=debug,info"),
            2 => EnvFilter::new("sitewise=trace,debug"),
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

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Sitewise Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Request timeout: {}s", config.crawler.request_timeout_seconds);
    println!(
        "  Retries: {} (delay {}s)",
        config.crawler.max_retries, config.crawler.retry_delay_seconds
    );
    println!(
        "  Politeness delay: {}s",
        config.crawler.politeness_delay_seconds
    );
    println!(
        "  Shutdown timeout: {}s",
        config.crawler.shutdown_timeout_seconds
    );
    match config.crawler.recrawl_interval_seconds {
        Some(interval) => println!("  Recrawl every: {}s", interval),
        None => println!("  Recrawl: single pass"),
    }
    println!("  User agent: {}", config.crawler.user_agent);

    println!("\nStorage:");
    println!("  Output directory: {}", config.storage.output_dir);
    println!("  Database: {}", config.storage.database_path);
    println!(
        "  Save HTML: {}, save PDF: {}",
        config.storage.save_html, config.storage.save_pdf
    );

    println!("\nSites ({}):", config.sites.len());
    for site in &config.sites {
        let site_type = match site.explicit_type() {
            Some(site_type) => site_type.to_string(),
            None => "detect".to_string(),
        };
        println!("  - {} [{}]", site.url, site_type);
        println!("    allowed: {}", site.effective_allowed_domains().join(", "));
        if site.include_pdf {
            println!("    include PDF downloads");
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use sitewise::output::{load_statistics, print_statistics};

    println!("Database: {}\n", config.storage.database_path);

    // Open the database
    let storage = SqliteStorage::new(Path::new(&config.storage.database_path))?;

    // Load statistics
    let stats = load_statistics(&storage)?;

    // Print statistics
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str) -> Result<(), Box<dyn std::error::Error>> {
    let storage = SqliteStorage::new(Path::new(&config.storage.database_path))?;
    let ledger = RunLedger::begin(Arc::new(Mutex::new(storage)), config_hash)?;
    tracing::info!("Starting crawl run {}", ledger.run_id());

    let services = CrawlServices::new(
        Arc::new(FileContentProcessor::from_config(&config.storage)),
        Arc::new(DefaultTextExtractor),
        &config.storage.output_dir,
    )
    .with_ledger(ledger.clone());

    let manager = CrawlManager::new(config.crawler.clone(), services);

    tokio::select! {
        _ = crawl_loop(&manager, &config) => {}
        _ = shutdown_signal() => {
            tracing::info!("Shutdown requested");
            manager.shutdown().await;
        }
    }

    let status = if manager.is_shutting_down() {
        RunStatus::Interrupted
    } else {
        RunStatus::Completed
    };
    ledger.finish(status)?;

    tracing::info!(
        "Crawl run {} finished: {}",
        ledger.run_id(),
        status.to_db_string()
    );
    Ok(())
}

/// Crawls every site once, or repeatedly when a recrawl interval is set
async fn crawl_loop(manager: &CrawlManager, config: &Config) {
    loop {
        let results = manager.run_all(&config.sites).await;

        let completed = results
            .iter()
            .filter(|(_, state)| *state == TaskState::Completed)
            .count();
        tracing::info!("Pass finished: {}/{} sites completed", completed, results.len());
        for (site, state) in results.iter().filter(|(_, s)| *s != TaskState::Completed) {
            tracing::warn!("Site {} ended as {}", site, state);
        }

        let Some(interval) = config.crawler.recrawl_interval() else {
            break;
        };

        tracing::info!("Next pass in {}s", interval.as_secs());
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = manager.wait_for_shutdown() => break,
        }
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
