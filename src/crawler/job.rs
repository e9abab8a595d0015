//! Health-check job
//!
//! One health check of the configured site: create a run, crawl it through a
//! `CrawlController`, then run issue detection over the stored records.
//! Failed attempts are retried with exponential backoff, each attempt in a
//! fresh run.

use crate::analysis::{analyze_run, AnalysisReport, DetectionOptions};
use crate::config::Config;
use crate::crawler::{AbortHandle, ControllerOptions, CrawlController, CrawlEngine};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::state::RunStatus;
use crate::storage::Storage;
use crate::{PulseError, Result};
use std::time::Duration;
use tokio::sync::broadcast;

/// Result of a successful health check
#[derive(Debug, Clone)]
pub struct HealthCheckOutcome {
    pub run_id: i64,
    /// Attempts used, including the successful one
    pub attempts: u32,
    pub pages_crawled: u32,
    pub report: AnalysisReport,
}

/// A configured health check, ready to run against a storage backend
pub struct HealthCheck<'c> {
    config: &'c Config,
    config_hash: String,
    events: Option<broadcast::Sender<ProgressEvent>>,
    abort: AbortHandle,
}

impl<'c> HealthCheck<'c> {
    pub fn new(config: &'c Config, config_hash: &str) -> Self {
        Self {
            config,
            config_hash: config_hash.to_string(),
            events: None,
            abort: AbortHandle::new(),
        }
    }

    /// Publishes progress events on the given channel
    pub fn with_events(mut self, sender: broadcast::Sender<ProgressEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Handle that cancels the check from another task
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Runs attempts until one succeeds, the attempts run out, or the check is
    /// cancelled
    pub async fn run<S: Storage + ?Sized>(&self, storage: &mut S) -> Result<HealthCheckOutcome> {
        let max_attempts = self.config.crawler.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.attempt(storage).await {
                Ok((run_id, pages_crawled, report)) => {
                    return Ok(HealthCheckOutcome {
                        run_id,
                        attempts: attempt,
                        pages_crawled,
                        report,
                    })
                }
                Err(e) if attempt >= max_attempts || !is_retryable(&e) => return Err(e),
                Err(e) => {
                    let backoff = backoff_delay(self.config.crawler.retry_backoff_ms, attempt);
                    tracing::warn!(
                        "Health check attempt {}/{} failed: {}; retrying in {:?}",
                        attempt,
                        max_attempts,
                        e,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt<S: Storage + ?Sized>(
        &self,
        storage: &mut S,
    ) -> Result<(i64, u32, AnalysisReport)> {
        let engine = CrawlEngine::from_config(self.config)?;
        let run_id = storage.create_run(engine.base().as_str(), &self.config_hash)?;

        let mut controller = match CrawlController::new(
            &mut *storage,
            run_id,
            ControllerOptions::from(&self.config.crawler),
            self.reporter(run_id),
        ) {
            Ok(controller) => controller.with_abort(self.abort.clone()),
            Err(e) => {
                fail_run(storage, run_id);
                self.reporter(run_id).report_failed(0);
                return Err(e);
            }
        };

        let crawled = crawl(&engine, &mut controller).await;
        let cancelled = controller.is_cancelled();
        let pages_crawled = controller.state().pages_crawled();

        let crawled = match crawled {
            Ok(()) if cancelled => Err(PulseError::Cancelled { run_id }),
            other => other,
        };

        if let Err(e) = crawled {
            controller.abandon();
            let mut reporter = controller.into_reporter();
            fail_run(storage, run_id);
            reporter.report_failed(pages_crawled);
            tracing::error!("Run {} failed: {}", run_id, e);
            return Err(e);
        }

        let mut reporter = controller.into_reporter();
        let options = detection_options(self.config, self.config.crawler.page_cap);
        let report = match analyze_run(storage, run_id, &options) {
            Ok(report) => report,
            Err(e) => {
                // the crawl itself completed; the run keeps its provisional results
                reporter.report_failed(pages_crawled);
                tracing::error!("Run {}: issue detection failed: {}", run_id, e);
                return Err(e.into());
            }
        };

        reporter.report_completed(
            pages_crawled,
            report.issues.len() as u32,
            report.health_score,
        );
        Ok((run_id, pages_crawled, report))
    }

    fn reporter(&self, run_id: i64) -> ProgressReporter {
        match &self.events {
            Some(sender) => ProgressReporter::new(run_id, sender.clone()),
            None => ProgressReporter::silent(run_id),
        }
    }
}

async fn crawl<S: Storage + ?Sized>(
    engine: &CrawlEngine,
    controller: &mut CrawlController<'_, S>,
) -> Result<()> {
    let plan = engine.prepare().await?;
    controller.record_discovery(plan.strategy(), &plan.seeds, plan.sitemap_urls);

    let stats = engine.run(plan, controller).await?;
    tracing::debug!("Run {}: engine stats {:?}", controller.run_id(), stats);

    // finish() already ran inside the finished_crawling hook
    if let Some(e) = controller.take_finish_error() {
        return Err(e.into());
    }
    Ok(())
}

/// Marks a run failed, logging instead of failing when that is not possible
fn fail_run<S: Storage + ?Sized>(storage: &mut S, run_id: i64) {
    if let Err(e) = storage.fail_run(run_id) {
        tracing::warn!("Run {}: could not mark failed: {}", run_id, e);
    }
}

fn is_retryable(error: &PulseError) -> bool {
    !matches!(
        error,
        PulseError::Cancelled { .. }
            | PulseError::Config(_)
            | PulseError::Analysis(_)
            | PulseError::RobotsDenied { .. }
    )
}

/// `base * 2^(attempt - 1)`
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 1u64 << attempt.saturating_sub(1).min(16);
    Duration::from_millis(base_ms.saturating_mul(factor))
}

/// Runs one health check with the given configuration
pub async fn run_health_check<S: Storage + ?Sized>(
    config: &Config,
    config_hash: &str,
    storage: &mut S,
    events: Option<broadcast::Sender<ProgressEvent>>,
) -> Result<HealthCheckOutcome> {
    let mut check = HealthCheck::new(config, config_hash);
    if let Some(sender) = events {
        check = check.with_events(sender);
    }
    check.run(storage).await
}

fn detection_options(config: &Config, page_cap: u32) -> DetectionOptions {
    DetectionOptions {
        page_cap,
        weights: (&config.scoring).into(),
    }
}

/// Re-runs issue detection for a completed run, replacing its issues
///
/// Truncation is judged against the page cap the run was crawled with. Runs
/// stored without one fall back to the configured cap.
pub fn reanalyze_run<S: Storage + ?Sized>(
    config: &Config,
    storage: &mut S,
    run_id: i64,
) -> Result<AnalysisReport> {
    let run = storage.get_run(run_id)?;
    if run.status != RunStatus::Completed {
        return Err(PulseError::RunNotAnalyzable {
            run_id,
            status: run.status,
        });
    }

    let page_cap = run
        .summary
        .as_ref()
        .and_then(|summary| summary.page_cap)
        .unwrap_or(config.crawler.page_cap);
    let options = detection_options(config, page_cap);
    Ok(analyze_run(storage, run_id, &options)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff_delay(100, 1), Duration::from_millis(100));
        assert_eq!(backoff_delay(100, 2), Duration::from_millis(200));
        assert_eq!(backoff_delay(100, 4), Duration::from_millis(800));
        assert_eq!(backoff_delay(0, 3), Duration::ZERO);
    }

    #[test]
    fn test_retryable_errors() {
        assert!(is_retryable(&PulseError::SeedUnreachable {
            url: "https://example.com/".to_string(),
            message: "timeout".to_string(),
        }));
        assert!(!is_retryable(&PulseError::Cancelled { run_id: 1 }));
        assert!(!is_retryable(&PulseError::RobotsDenied {
            url: "https://example.com/".to_string(),
        }));
    }
}
