//! Crawl controller
//!
//! Implements `CrawlObserver` for one run: enforces the page cap, turns
//! responses into page records, buffers and persists them, keeps the run row
//! current, emits progress and finalizes the run.

use crate::analysis::provisional_score;
use crate::config::CrawlerConfig;
use crate::crawler::{AbortHandle, CrawlObserver, FetchError};
use crate::extract::{extract_page, ExtractedPage, FetchedResponse};
use crate::progress::ProgressReporter;
use crate::state::{CrawlState, RunStatus};
use crate::storage::{RunSummary, Storage, StorageError};
use chrono::Utc;
use std::collections::HashSet;

/// Knobs the controller needs from the crawler configuration
#[derive(Debug, Clone, Copy)]
pub struct ControllerOptions {
    pub page_cap: u32,
    pub progress_interval: u32,
    pub persist_batch_size: usize,
    pub max_body_bytes: usize,
}

impl From<&CrawlerConfig> for ControllerOptions {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            page_cap: config.page_cap,
            progress_interval: config.progress_interval,
            persist_batch_size: config.persist_batch_size,
            max_body_bytes: config.max_body_bytes,
        }
    }
}

/// How the run found its URLs, stored in the run summary
#[derive(Debug, Clone, Default)]
struct Discovery {
    strategy: String,
    sitemap_urls: u32,
}

/// Observer that records one crawl run
pub struct CrawlController<'s, S: Storage + ?Sized> {
    storage: &'s mut S,
    state: CrawlState,
    reporter: ProgressReporter,
    options: ControllerOptions,
    buffer: Vec<ExtractedPage>,
    abort: AbortHandle,
    discovery: Discovery,
    finish_error: Option<StorageError>,
}

impl<'s, S: Storage + ?Sized> CrawlController<'s, S> {
    /// Takes ownership of a pending run and marks it running
    pub fn new(
        storage: &'s mut S,
        run_id: i64,
        options: ControllerOptions,
        reporter: ProgressReporter,
    ) -> crate::Result<Self> {
        storage.update_run_status(run_id, RunStatus::Running)?;
        tracing::info!("Run {} started (page cap {})", run_id, options.page_cap);

        Ok(Self {
            storage,
            state: CrawlState::new(run_id, options.page_cap, Utc::now()),
            reporter,
            options,
            buffer: Vec::with_capacity(options.persist_batch_size),
            abort: AbortHandle::new(),
            discovery: Discovery {
                strategy: "links".to_string(),
                sitemap_urls: 0,
            },
            finish_error: None,
        })
    }

    /// Uses an externally owned abort flag
    pub fn with_abort(mut self, abort: AbortHandle) -> Self {
        self.abort = abort;
        self
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn run_id(&self) -> i64 {
        self.state.run_id
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    /// Records how the engine seeded the crawl
    pub fn record_discovery(&mut self, strategy: &str, seeds: &[String], sitemap_urls: u32) {
        self.discovery = Discovery {
            strategy: strategy.to_string(),
            sitemap_urls,
        };
        for seed in seeds {
            self.state.add_known_url(seed);
        }
    }

    /// True once the abort flag was raised, by a caller or by an external fail
    pub fn is_cancelled(&self) -> bool {
        self.abort.is_aborted()
    }

    /// Flushes buffered records and completes the run
    ///
    /// Only the first call does anything. A cancelled run is flushed but not
    /// completed. A run whose records cannot all be stored is not completed
    /// either; the error is returned instead.
    pub fn finish(&mut self) -> Result<(), StorageError> {
        if !self.state.mark_finished() {
            return Ok(());
        }
        self.flush()?;

        if self.is_cancelled() {
            tracing::info!("Run {} stopped by cancellation", self.state.run_id);
            return Ok(());
        }

        let score = provisional_score(self.state.recorded(), self.state.error_pages());
        let provisional = self.state.provisional_counts();
        let summary = self.summary();
        let run_id = self.state.run_id;

        self.storage
            .update_progress(run_id, self.state.pages_crawled(), self.state.discovered())?;
        self.storage
            .complete_run(run_id, &provisional, score, &summary)?;

        tracing::info!(
            "Run {} finished: {} pages crawled, {} errors, provisional score {}",
            run_id,
            self.state.pages_crawled(),
            self.state.error_pages(),
            score
        );
        Ok(())
    }

    /// Error raised by a `finish` that ran inside the `finished_crawling` hook
    pub fn take_finish_error(&mut self) -> Option<StorageError> {
        self.finish_error.take()
    }

    /// Persists what is buffered and stops recording, without completing the run
    pub fn abandon(&mut self) {
        if self.state.mark_finished() {
            if let Err(e) = self.flush() {
                tracing::warn!(
                    "Run {}: {} page records lost: {}",
                    self.state.run_id,
                    self.buffer.len(),
                    e
                );
            }
        }
    }

    /// Releases the storage borrow, keeping the reporter for terminal events
    pub fn into_reporter(self) -> ProgressReporter {
        self.reporter
    }

    fn summary(&self) -> RunSummary {
        let unique = |links: &[crate::extract::PageLink]| {
            links.iter().map(|l| l.url.as_str()).collect::<HashSet<_>>().len() as u32
        };

        RunSummary {
            strategy: self.discovery.strategy.clone(),
            sitemap_urls: self.discovery.sitemap_urls,
            internal_links: self.state.internal_links().len() as u32,
            unique_internal_links: unique(self.state.internal_links()),
            external_links: self.state.external_links().len() as u32,
            unique_external_links: unique(self.state.external_links()),
            average_response_time_ms: self.state.average_response_time_ms(),
            page_cap: Some(self.options.page_cap),
        }
    }

    fn record(&mut self, page: ExtractedPage) {
        self.state.record_page(&page);
        self.buffer.push(page);
        if self.buffer.len() >= self.options.persist_batch_size.max(1) {
            if let Err(e) = self.flush() {
                tracing::warn!(
                    "Run {}: failed to persist {} page records, will retry: {}",
                    self.state.run_id,
                    self.buffer.len(),
                    e
                );
            }
        }
    }

    /// Bulk-inserts the buffer; on failure the records stay buffered
    fn flush(&mut self) -> Result<(), StorageError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        match self.storage.insert_pages(self.state.run_id, &self.buffer) {
            Ok(inserted) => {
                tracing::debug!(
                    "Run {}: persisted {} page records",
                    self.state.run_id,
                    inserted
                );
                self.buffer.clear();
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

impl<'s, S: Storage + ?Sized> CrawlObserver for CrawlController<'s, S> {
    fn will_crawl(&mut self, url: &str, _anchor_text: Option<&str>) {
        let attempted = self.state.record_attempt(url);

        if let Err(e) = self.storage.update_progress(
            self.state.run_id,
            self.state.pages_crawled(),
            self.state.discovered(),
        ) {
            tracing::warn!("Run {}: failed to store progress: {}", self.state.run_id, e);
        }

        if attempted % self.options.progress_interval.max(1) == 0 {
            self.reporter.report_progress(&self.state);
        }
    }

    fn crawled(
        &mut self,
        url: &str,
        response: &FetchedResponse,
        _referrer: Option<&str>,
        _anchor_text: Option<&str>,
    ) {
        if self.state.is_over_cap() {
            tracing::debug!("Page cap reached, not recording {}", url);
            return;
        }

        let page = match extract_page(url, response, self.options.max_body_bytes) {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Extraction failed for {}: {}", url, e);
                ExtractedPage::degraded(url, response, &e.to_string())
            }
        };

        tracing::debug!(
            "Crawled {} (HTTP {}, {} ms, {} internal links)",
            url,
            page.status_code,
            page.response_time_ms,
            page.internal_links.len()
        );
        self.record(page);
    }

    fn crawl_failed(
        &mut self,
        url: &str,
        error: &FetchError,
        _referrer: Option<&str>,
        _anchor_text: Option<&str>,
    ) {
        if self.state.is_over_cap() {
            tracing::debug!("Page cap reached, not recording failure of {}", url);
            return;
        }

        tracing::debug!("Fetch failed for {}: {}", url, error);
        self.record(ExtractedPage::failed(url, error.status, &error.message));
    }

    fn finished_crawling(&mut self) {
        if let Err(e) = self.finish() {
            tracing::error!("Run {}: failed to finalize: {}", self.state.run_id, e);
            self.finish_error = Some(e);
        }
    }

    fn should_continue(&mut self) -> bool {
        if self.abort.is_aborted() {
            return false;
        }

        match self.storage.get_run_status(self.state.run_id) {
            Ok(RunStatus::Failed) => {
                tracing::info!("Run {} was marked failed externally", self.state.run_id);
                self.abort.abort();
                return false;
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Run {}: cannot read status: {}", self.state.run_id, e),
        }

        !self.state.cap_reached()
    }
}
