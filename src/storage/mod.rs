//! Storage module for persisting crawl data
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Run lifecycle rows (status, counters, provisional and computed scores)
//! - Append-only page records
//! - Per-run issue sets

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::analysis::{Issue, IssueCounts};
use crate::extract::ExtractedPage;
use crate::state::RunStatus;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(PulseError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> crate::Result<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub website: String,
    pub status: RunStatus,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    /// Never exceeds the page cap
    pub pages_crawled: u32,
    pub pages_discovered: u32,
    /// Annotation tallies written at crawl-finished
    pub provisional: Option<IssueCounts>,
    pub provisional_score: Option<u8>,
    /// Written by the detection pass
    pub computed: Option<IssueCounts>,
    pub health_score: Option<u8>,
    pub summary: Option<RunSummary>,
}

impl RunRecord {
    /// The authoritative score if detection ran, otherwise the provisional one
    pub fn best_score(&self) -> Option<u8> {
        self.health_score.or(self.provisional_score)
    }
}

/// Run-level facts stored as a JSON blob on the run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// How URLs were found, e.g. "sitemap+links" or "links"
    pub strategy: String,
    pub sitemap_urls: u32,
    pub internal_links: u32,
    pub unique_internal_links: u32,
    pub external_links: u32,
    pub unique_external_links: u32,
    pub average_response_time_ms: f64,
    /// Page cap the run was crawled with; detection uses it to tell a
    /// truncated run from a complete one
    #[serde(default)]
    pub page_cap: Option<u32>,
}

/// Represents a stored page
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub id: i64,
    pub run_id: i64,
    pub created_at: String,
    pub page: ExtractedPage,
}

/// Represents a stored issue
#[derive(Debug, Clone)]
pub struct IssueRecord {
    pub id: i64,
    pub run_id: i64,
    pub created_at: String,
    pub issue: Issue,
}
