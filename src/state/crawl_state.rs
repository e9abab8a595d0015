use crate::analysis::{annotation_severity, IssueCounts};
use crate::extract::{ExtractedPage, PageLink};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Mutable state of one crawl run
///
/// Owned by exactly one controller for the lifetime of the run and only
/// touched from inside its hook handlers.
#[derive(Debug, Clone)]
pub struct CrawlState {
    pub run_id: i64,
    page_cap: u32,
    started_at: DateTime<Utc>,

    /// about-to-fetch invocations, including those past the cap
    attempted: u32,

    /// Page records produced (fetched, degraded or failed)
    recorded: u32,

    /// Records with status 0 or >= 400
    error_pages: u32,

    /// Per-page annotations seen so far, by severity
    provisional: IssueCounts,

    total_response_ms: f64,
    internal_links: Vec<PageLink>,
    external_links: Vec<PageLink>,

    /// Every URL known to the run: attempted pages plus internal link targets
    known_urls: HashSet<String>,

    current_url: Option<String>,
    finished: bool,
}

impl CrawlState {
    pub fn new(run_id: i64, page_cap: u32, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            page_cap,
            started_at,
            attempted: 0,
            recorded: 0,
            error_pages: 0,
            provisional: IssueCounts::default(),
            total_response_ms: 0.0,
            internal_links: Vec::new(),
            external_links: Vec::new(),
            known_urls: HashSet::new(),
            current_url: None,
            finished: false,
        }
    }

    /// Counts one about-to-fetch and returns the new attempted total
    pub fn record_attempt(&mut self, url: &str) -> u32 {
        self.attempted += 1;
        self.known_urls.insert(url.to_string());
        self.current_url = Some(url.to_string());
        self.attempted
    }

    /// Adds a URL found outside of page links, e.g. a sitemap entry
    pub fn add_known_url(&mut self, url: &str) {
        self.known_urls.insert(url.to_string());
    }

    /// Folds one page record into the running totals
    pub fn record_page(&mut self, page: &ExtractedPage) {
        self.recorded += 1;
        if page.is_error_status() {
            self.error_pages += 1;
        }
        for annotation in &page.annotations {
            self.provisional.add(annotation_severity(annotation.kind));
        }
        self.total_response_ms += page.response_time_ms;

        for link in &page.internal_links {
            self.known_urls.insert(link.url.clone());
        }
        self.internal_links.extend(page.internal_links.iter().cloned());
        self.external_links.extend(page.external_links.iter().cloned());
    }

    /// Marks the run finished; returns false if it already was
    pub fn mark_finished(&mut self) -> bool {
        !std::mem::replace(&mut self.finished, true)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn attempted(&self) -> u32 {
        self.attempted
    }

    /// The attempted count clamped to the cap, as persisted on the run
    pub fn pages_crawled(&self) -> u32 {
        self.attempted.min(self.page_cap)
    }

    pub fn page_cap(&self) -> u32 {
        self.page_cap
    }

    /// Attempts already went past the cap; nothing more may be stored
    pub fn is_over_cap(&self) -> bool {
        self.attempted > self.page_cap
    }

    /// No further fetches should be started
    pub fn cap_reached(&self) -> bool {
        self.attempted >= self.page_cap
    }

    pub fn discovered(&self) -> u32 {
        self.known_urls.len() as u32
    }

    /// Best estimate of how many URLs this run will crawl
    pub fn total_crawlable(&self) -> u32 {
        self.discovered().max(self.attempted).min(self.page_cap)
    }

    pub fn recorded(&self) -> u32 {
        self.recorded
    }

    pub fn error_pages(&self) -> u32 {
        self.error_pages
    }

    pub fn issues_found(&self) -> u32 {
        self.provisional.total()
    }

    pub fn provisional_counts(&self) -> IssueCounts {
        self.provisional
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    pub fn internal_links(&self) -> &[PageLink] {
        &self.internal_links
    }

    pub fn external_links(&self) -> &[PageLink] {
        &self.external_links
    }

    /// Mean response time over recorded pages, 0 when none
    pub fn average_response_time_ms(&self) -> f64 {
        if self.recorded == 0 {
            0.0
        } else {
            ((self.total_response_ms / self.recorded as f64) * 100.0).round() / 100.0
        }
    }
}
