//! Lifecycle hooks between a crawl engine and whoever records the crawl

use crate::crawler::FetchError;
use crate::extract::FetchedResponse;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Callbacks a crawl engine invokes for every URL it handles
///
/// Per URL the engine calls `will_crawl`, then exactly one of `crawled` or
/// `crawl_failed`. `finished_crawling` is called once when the engine stops
/// on its own. `should_continue` is polled before each fetch.
pub trait CrawlObserver {
    /// A fetch of `url` is about to start
    fn will_crawl(&mut self, url: &str, anchor_text: Option<&str>);

    /// `url` answered with an HTTP response (any status)
    fn crawled(
        &mut self,
        url: &str,
        response: &FetchedResponse,
        referrer: Option<&str>,
        anchor_text: Option<&str>,
    );

    /// `url` produced no usable response
    fn crawl_failed(
        &mut self,
        url: &str,
        error: &FetchError,
        referrer: Option<&str>,
        anchor_text: Option<&str>,
    );

    /// The engine ran out of URLs or was told to stop
    fn finished_crawling(&mut self);

    /// Whether the engine may start another fetch
    fn should_continue(&mut self) -> bool {
        true
    }
}

/// Shared flag that asks a running crawl to stop
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
