//! Site-Pulse main entry point
//!
//! This is the command-line interface for the Site-Pulse health checker.

use anyhow::Context;
use clap::Parser;
use site_pulse::config::{load_config_with_hash, Config};
use site_pulse::crawler::{reanalyze_run, HealthCheck};
use site_pulse::output::{
    generate_markdown_report, generate_summary, load_statistics, print_statistics,
};
use site_pulse::progress::ProgressEvent;
use site_pulse::storage::{open_storage, Storage};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

/// Site-Pulse: an SEO site-health crawler
///
/// Site-Pulse crawls the internal pages of one website, records SEO signals
/// for every page, detects cross-page issues and scores the site's health.
#[derive(Parser, Debug)]
#[command(name = "site-pulse")]
#[command(version)]
#[command(about = "An SEO site-health crawler", long_about = None)]
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

    /// Validate config and show what would be checked without crawling
    #[arg(long, conflicts_with_all = ["stats", "export_report", "reanalyze"])]
    dry_run: bool,

    /// Show statistics of the latest run and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_report", "reanalyze"])]
    stats: bool,

    /// Write the markdown report of the latest run and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "reanalyze"])]
    export_report: bool,

    /// Re-run issue detection for a completed run and exit
    #[arg(long, value_name = "RUN_ID", conflicts_with_all = ["dry_run", "stats", "export_report"])]
    reanalyze: Option<i64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.export_report {
        handle_export_report(&config, None)?;
    } else if let Some(run_id) = cli.reanalyze {
        handle_reanalyze(&config, run_id)?;
    } else {
        handle_check(&config, &config_hash).await?;
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
            0 => EnvFilter::new("site_pulse=info,warn"),
            1 => EnvFilter::new("site_pulse=debug,info"),
            2 => EnvFilter::new("site_pulse=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Site-Pulse Dry Run ===\n");

    println!("Site: {}", config.site.url);

    println!("\nCrawler Configuration:");
    println!("  Page cap: {}", config.crawler.page_cap);
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Respect robots.txt: {}", config.crawler.respect_robots);
    println!("  Use sitemap: {}", config.crawler.use_sitemap);
    println!(
        "  Attempts: {} (backoff {}ms)",
        config.crawler.max_attempts, config.crawler.retry_backoff_ms
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nScoring weights:");
    println!(
        "  error {}, warning {}, notice {}",
        config.scoring.error_weight, config.scoring.warning_weight, config.scoring.notice_weight
    );

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Report: {}", config.output.report_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics of the latest run
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let Some(run) = storage.get_latest_run()? else {
        println!("No crawl runs found.");
        return Ok(());
    };

    let stats = load_statistics(&storage, run.id)?;
    let issues_by_type = storage.count_issues_by_type(run.id)?;
    print_statistics(&run, &stats, &issues_by_type);

    Ok(())
}

/// Handles the --export-report mode: writes the markdown report
fn handle_export_report(config: &Config, run_id: Option<i64>) -> anyhow::Result<()> {
    let storage = open_storage(Path::new(&config.output.database_path))?;

    tracing::info!("Loading run data from database...");
    let summary = generate_summary(&storage, run_id)?;

    let report_path = Path::new(&config.output.report_path);
    generate_markdown_report(&summary, report_path)
        .with_context(|| format!("failed to write {}", report_path.display()))?;

    println!("✓ Report for run {} written to: {}", summary.run_id, report_path.display());
    Ok(())
}

/// Handles the --reanalyze mode
fn handle_reanalyze(config: &Config, run_id: i64) -> anyhow::Result<()> {
    let mut storage = open_storage(Path::new(&config.output.database_path))?;
    let report = reanalyze_run(config, &mut storage, run_id)?;

    println!(
        "✓ Run {}: {} issues, health score {}",
        run_id,
        report.issues.len(),
        report.health_score
    );
    Ok(())
}

/// Handles the main health check
async fn handle_check(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    let mut storage = open_storage(Path::new(&config.output.database_path))?;

    let (sender, receiver) = broadcast::channel(64);
    let check = HealthCheck::new(config, config_hash).with_events(sender);

    let abort = check.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping the crawl...");
            abort.abort();
        }
    });
    let logger = tokio::spawn(log_progress(receiver, config.crawler.max_attempts.max(1)));

    tracing::info!("Starting health check of {}", config.site.url);
    let outcome = check.run(&mut storage).await;
    // closes the channel so the logger ends even after a cancelled attempt
    drop(check);
    if let Err(e) = logger.await {
        tracing::debug!("Progress logger ended abnormally: {}", e);
    }
    let outcome = outcome?;

    tracing::info!(
        "Run {} completed after {} attempt(s): {} pages, {} issues, health score {}",
        outcome.run_id,
        outcome.attempts,
        outcome.pages_crawled,
        outcome.report.issues.len(),
        outcome.report.health_score
    );

    handle_export_report(config, Some(outcome.run_id))
}

/// Logs progress events until the check reaches its terminal event
///
/// A failed attempt may be followed by a retry, so only the last allowed
/// failure ends the log.
async fn log_progress(mut receiver: broadcast::Receiver<ProgressEvent>, max_attempts: u32) {
    let mut failures = 0;
    loop {
        match receiver.recv().await {
            Ok(ProgressEvent::Progress(update)) => tracing::info!(
                "{}% ({}/{} URLs, {} issues, eta {})",
                update.progress_percent,
                update.urls_crawled,
                update.total_urls,
                update.issues_found,
                update.eta
            ),
            Ok(ProgressEvent::Completed(done)) => {
                tracing::info!(
                    "Crawl of run {} done: {} URLs, score {}",
                    done.run_id,
                    done.total_urls_crawled,
                    done.health_score
                );
                break;
            }
            Ok(ProgressEvent::Failed(failed)) => {
                tracing::warn!(
                    "Run {} failed after {} URLs",
                    failed.run_id,
                    failed.total_urls_crawled
                );
                failures += 1;
                if failures >= max_attempts {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!("Progress log skipped {} events", skipped)
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use site_pulse::progress::{CompletionEvent, FailureEvent};
    use std::time::Duration;

    fn failed(run_id: i64) -> ProgressEvent {
        ProgressEvent::Failed(FailureEvent {
            run_id,
            total_urls_crawled: 0,
        })
    }

    #[tokio::test]
    async fn test_log_progress_stops_at_completion() {
        let (sender, receiver) = broadcast::channel(8);
        let logger = tokio::spawn(log_progress(receiver, 3));

        sender.send(failed(1)).unwrap();
        sender
            .send(ProgressEvent::Completed(CompletionEvent {
                run_id: 2,
                total_urls_crawled: 4,
                total_issues_found: 1,
                health_score: 90,
            }))
            .unwrap();

        // the sender stays open; the logger must end on its own
        tokio::time::timeout(Duration::from_secs(1), logger)
            .await
            .expect("logger kept running after completion")
            .unwrap();
        drop(sender);
    }

    #[tokio::test]
    async fn test_log_progress_waits_for_retries() {
        let (sender, receiver) = broadcast::channel(8);
        let logger = tokio::spawn(log_progress(receiver, 2));

        sender.send(failed(1)).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!logger.is_finished());

        sender.send(failed(2)).unwrap();
        tokio::time::timeout(Duration::from_secs(1), logger)
            .await
            .expect("logger kept running after the last attempt failed")
            .unwrap();
        drop(sender);
    }
}
