use crate::progress::{CompletionEvent, Eta, FailureEvent, ProgressEvent, ProgressUpdate};
use crate::state::CrawlState;
use chrono::Utc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Share of `total` that has been crawled, as a whole percentage in 0..=100
pub fn progress_percent(crawled: u32, total: u32) -> u8 {
    let percent = (crawled as f64 / total.max(1) as f64 * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}

/// Remaining time, extrapolated from the average time per crawled URL
pub fn estimate_eta(elapsed: Duration, crawled: u32, total: u32) -> Eta {
    let average = elapsed.as_secs_f64() / crawled.max(1) as f64;
    let remaining = total.saturating_sub(crawled) as f64;
    let eta = average * remaining;

    if eta <= 0.0 {
        Eta::AlmostDone
    } else {
        Eta::Remaining(eta.ceil() as u64)
    }
}

/// Broadcasts progress for one run
///
/// Sends at most one terminal event; anything reported after it is dropped.
#[derive(Debug)]
pub struct ProgressReporter {
    run_id: i64,
    sender: Option<broadcast::Sender<ProgressEvent>>,
    finished: bool,
}

impl ProgressReporter {
    pub fn new(run_id: i64, sender: broadcast::Sender<ProgressEvent>) -> Self {
        Self {
            run_id,
            sender: Some(sender),
            finished: false,
        }
    }

    /// A reporter that computes updates but sends nothing
    pub fn silent(run_id: i64) -> Self {
        Self {
            run_id,
            sender: None,
            finished: false,
        }
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Snapshot of the run's progress at this instant
    pub fn snapshot(&self, state: &CrawlState) -> ProgressUpdate {
        let crawled = state.pages_crawled();
        let total = state.total_crawlable();
        let elapsed = (Utc::now() - state.started_at())
            .to_std()
            .unwrap_or_default();

        ProgressUpdate {
            run_id: self.run_id,
            urls_crawled: crawled,
            total_urls: total,
            issues_found: state.issues_found(),
            progress_percent: progress_percent(crawled, total),
            current_url: state.current_url().map(str::to_string),
            eta: estimate_eta(elapsed, crawled, total),
        }
    }

    pub fn report_progress(&self, state: &CrawlState) {
        if self.finished {
            return;
        }
        let update = self.snapshot(state);
        tracing::debug!(
            "Run {}: {}/{} URLs ({}%), ETA {}",
            update.run_id,
            update.urls_crawled,
            update.total_urls,
            update.progress_percent,
            update.eta
        );
        self.send(ProgressEvent::Progress(update));
    }

    /// Sends the completion event; returns false if a terminal event was already sent
    pub fn report_completed(
        &mut self,
        total_urls_crawled: u32,
        total_issues_found: u32,
        health_score: u8,
    ) -> bool {
        if std::mem::replace(&mut self.finished, true) {
            return false;
        }
        self.send(ProgressEvent::Completed(CompletionEvent {
            run_id: self.run_id,
            total_urls_crawled,
            total_issues_found,
            health_score,
        }));
        true
    }

    /// Sends the failure event; returns false if a terminal event was already sent
    pub fn report_failed(&mut self, total_urls_crawled: u32) -> bool {
        if std::mem::replace(&mut self.finished, true) {
            return false;
        }
        self.send(ProgressEvent::Failed(FailureEvent {
            run_id: self.run_id,
            total_urls_crawled,
        }));
        true
    }

    fn send(&self, event: ProgressEvent) {
        if let Some(sender) = &self.sender {
            // no subscribers is fine
            let _ = sender.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(50, 100), 50);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(progress_percent(5, 0), 100);
        assert_eq!(progress_percent(150, 100), 100);
    }

    #[test]
    fn test_estimate_eta() {
        // 10 URLs in 20s, 5 to go at 2s each
        assert_eq!(
            estimate_eta(Duration::from_secs(20), 10, 15),
            Eta::Remaining(10)
        );
        assert_eq!(estimate_eta(Duration::from_secs(20), 10, 10), Eta::AlmostDone);
        assert_eq!(estimate_eta(Duration::from_secs(20), 12, 10), Eta::AlmostDone);
        assert_eq!(estimate_eta(Duration::ZERO, 0, 10), Eta::AlmostDone);
    }

    #[tokio::test]
    async fn test_progress_broadcast() {
        let (tx, mut rx) = broadcast::channel(16);
        let reporter = ProgressReporter::new(7, tx);

        let mut state = CrawlState::new(7, 100, Utc::now());
        state.record_attempt("https://example.com/");
        reporter.report_progress(&state);

        match rx.recv().await.unwrap() {
            ProgressEvent::Progress(update) => {
                assert_eq!(update.run_id, 7);
                assert_eq!(update.urls_crawled, 1);
                assert_eq!(update.current_url.as_deref(), Some("https://example.com/"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_single_terminal_event() {
        let (tx, mut rx) = broadcast::channel(16);
        let mut reporter = ProgressReporter::new(1, tx);

        assert!(reporter.report_completed(10, 3, 90));
        assert!(!reporter.report_failed(10));
        assert!(!reporter.report_completed(10, 3, 90));

        let state = CrawlState::new(1, 10, Utc::now());
        reporter.report_progress(&state);

        assert!(matches!(rx.recv().await.unwrap(), ProgressEvent::Completed(_)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_send_without_subscribers() {
        let (tx, rx) = broadcast::channel(4);
        drop(rx);
        let mut reporter = ProgressReporter::new(1, tx);
        assert!(reporter.report_failed(0));
    }
}
