//! Statistics generation from crawl database
//!
//! This module provides functionality for extracting and displaying
//! per-run statistics from the storage layer.

use crate::analysis::IssueType;
use crate::extract::ExtractedPage;
use crate::output::OutputResult;
use crate::storage::{RunRecord, Storage};

/// How many of the slowest pages are kept
const SLOWEST_PAGES: usize = 10;

/// Page-level statistics of one run
#[derive(Debug, Clone, Default)]
pub struct RunStatistics {
    /// Number of stored page records
    pub total_pages: u64,

    /// Records by status class: 2xx, 3xx, 4xx, 5xx
    pub success_pages: u64,
    pub redirect_pages: u64,
    pub client_error_pages: u64,
    pub server_error_pages: u64,

    /// Fetches that produced no HTTP status
    pub failed_fetches: u64,

    /// Records with status 0 or >= 400
    pub error_pages: u64,

    pub html_pages: u64,
    pub total_bytes: u64,
    pub average_response_time_ms: f64,

    /// (url, response time) of the slowest pages, slowest first
    pub slowest_pages: Vec<(String, f64)>,
}

impl RunStatistics {
    /// Computes statistics over a run's page records
    pub fn from_pages<'a>(pages: impl IntoIterator<Item = &'a ExtractedPage>) -> Self {
        let mut stats = Self::default();
        let mut timings = Vec::new();
        let mut total_ms = 0.0;

        for page in pages {
            stats.total_pages += 1;
            match page.status_code {
                0 => stats.failed_fetches += 1,
                200..=299 => stats.success_pages += 1,
                300..=399 => stats.redirect_pages += 1,
                400..=499 => stats.client_error_pages += 1,
                500..=599 => stats.server_error_pages += 1,
                _ => {}
            }
            if page.is_error_status() {
                stats.error_pages += 1;
            }
            if page.is_html() {
                stats.html_pages += 1;
            }
            stats.total_bytes += page.page_size_bytes;
            total_ms += page.response_time_ms;
            timings.push((page.url.clone(), page.response_time_ms));
        }

        if stats.total_pages > 0 {
            stats.average_response_time_ms =
                ((total_ms / stats.total_pages as f64) * 100.0).round() / 100.0;
        }

        timings.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        timings.truncate(SLOWEST_PAGES);
        stats.slowest_pages = timings;
        stats
    }
}

/// Loads statistics for one run from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `run_id` - The run to summarize
pub fn load_statistics(storage: &dyn Storage, run_id: i64) -> OutputResult<RunStatistics> {
    let pages = storage.get_pages(run_id)?;
    Ok(RunStatistics::from_pages(pages.iter().map(|r| &r.page)))
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `run` - The run the statistics belong to
/// * `stats` - The statistics to display
/// * `issues_by_type` - Stored issue counts per type
pub fn print_statistics(
    run: &RunRecord,
    stats: &RunStatistics,
    issues_by_type: &[(IssueType, u64)],
) {
    println!("=== Site Health Statistics ===\n");

    println!("Run {} ({}):", run.id, run.website);
    println!("  Status: {}", run.status);
    println!("  Started: {}", run.started_at);
    if let Some(finished) = &run.finished_at {
        println!("  Finished: {}", finished);
    }
    match (run.health_score, run.provisional_score) {
        (Some(score), _) => println!("  Health score: {}", score),
        (None, Some(score)) => println!("  Health score: {} (provisional)", score),
        (None, None) => println!("  Health score: n/a"),
    }
    println!();

    println!("Pages:");
    println!("  Crawled: {}", run.pages_crawled);
    println!("  Discovered: {}", run.pages_discovered);
    println!("  Records: {}", stats.total_pages);
    for (label, count) in [
        ("2xx", stats.success_pages),
        ("3xx", stats.redirect_pages),
        ("4xx", stats.client_error_pages),
        ("5xx", stats.server_error_pages),
        ("failed", stats.failed_fetches),
    ] {
        let percentage = if stats.total_pages > 0 {
            (count as f64 / stats.total_pages as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", label, count, percentage);
    }
    println!(
        "  Average response time: {:.0} ms",
        stats.average_response_time_ms
    );
    println!();

    if !issues_by_type.is_empty() {
        println!("Issues by Type:");
        for (issue_type, count) in issues_by_type {
            println!(
                "  [{}] {}: {}",
                issue_type.severity(),
                issue_type.title(),
                count
            );
        }
        println!();
    }

    if !stats.slowest_pages.is_empty() {
        println!("Slowest Pages:");
        for (url, ms) in &stats.slowest_pages {
            println!("  {:>8.0} ms  {}", ms, url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str, status: u16, ms: f64) -> ExtractedPage {
        ExtractedPage {
            url: url.to_string(),
            status_code: status,
            content_type: Some("text/html".to_string()),
            response_time_ms: ms,
            page_size_bytes: 1000,
            ..Default::default()
        }
    }

    #[test]
    fn test_status_classes() {
        let pages = vec![
            page("https://example.com/", 200, 100.0),
            page("https://example.com/old", 301, 20.0),
            page("https://example.com/gone", 404, 30.0),
            page("https://example.com/boom", 500, 40.0),
            page("https://example.com/down", 0, 10.0),
        ];
        let stats = RunStatistics::from_pages(&pages);

        assert_eq!(stats.total_pages, 5);
        assert_eq!(stats.success_pages, 1);
        assert_eq!(stats.redirect_pages, 1);
        assert_eq!(stats.client_error_pages, 1);
        assert_eq!(stats.server_error_pages, 1);
        assert_eq!(stats.failed_fetches, 1);
        assert_eq!(stats.error_pages, 3);
        assert_eq!(stats.total_bytes, 5000);
        assert_eq!(stats.average_response_time_ms, 40.0);
    }

    #[test]
    fn test_slowest_pages_first() {
        let pages = vec![
            page("https://example.com/a", 200, 10.0),
            page("https://example.com/b", 200, 900.0),
            page("https://example.com/c", 200, 300.0),
        ];
        let stats = RunStatistics::from_pages(&pages);
        assert_eq!(stats.slowest_pages[0].0, "https://example.com/b");
        assert_eq!(stats.slowest_pages[2].0, "https://example.com/a");
    }

    #[test]
    fn test_empty_run() {
        let stats = RunStatistics::from_pages(&Vec::<ExtractedPage>::new());
        assert_eq!(stats.total_pages, 0);
        assert_eq!(stats.average_response_time_ms, 0.0);
    }
}
