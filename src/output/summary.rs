//! Report types
//!
//! This module defines the error type for report generation and the
//! health summary assembled from one stored run.

use crate::analysis::{Issue, IssueCounts, IssueType};
use crate::output::stats::RunStatistics;
use crate::storage::{RunSummary, StorageError};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("No crawl runs found in database")]
    NoRuns,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Everything the health report shows about one run
#[derive(Debug, Clone, Default)]
pub struct HealthSummary {
    // Run metadata
    pub run_id: i64,
    pub website: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub duration_seconds: Option<u64>,
    pub status: String,
    pub config_hash: String,

    // Crawl totals
    pub pages_crawled: u32,
    pub pages_discovered: u32,
    pub statistics: RunStatistics,
    pub crawl: Option<RunSummary>,

    // Issues
    pub counts: IssueCounts,
    pub health_score: Option<u8>,
    /// True when detection has not run and the score is the crawl-time estimate
    pub score_is_provisional: bool,
    pub issues_by_type: Vec<(IssueType, u64)>,
    /// Stored order: most severe first
    pub issues: Vec<Issue>,
}

impl HealthSummary {
    /// Share of recorded pages that returned 2xx, as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.statistics.total_pages == 0 {
            return 0.0;
        }
        (self.statistics.success_pages as f64 / self.statistics.total_pages as f64) * 100.0
    }

    /// Share of recorded pages with status >= 400 or no status, as a percentage
    pub fn error_rate(&self) -> f64 {
        if self.statistics.total_pages == 0 {
            return 0.0;
        }
        (self.statistics.error_pages as f64 / self.statistics.total_pages as f64) * 100.0
    }
}
