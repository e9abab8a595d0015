//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::analysis::{Issue, IssueCounts, IssueType};
use crate::extract::ExtractedPage;
use crate::state::RunStatus;
use crate::storage::{IssueRecord, PageRecord, RunRecord, RunSummary};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Invalid run transition: {from:?} -> {to:?}")]
    InvalidTransition { from: RunStatus, to: RunStatus },

    #[error("Unknown stored value: {0}")]
    UnknownValue(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Page records are append-only: once inserted they are never updated. The
/// issue set of a run is only ever replaced as a whole.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run in the pending state
    ///
    /// # Arguments
    ///
    /// * `website` - Base URL of the checked site
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, website: &str, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets only the status of a run
    fn get_run_status(&self, run_id: i64) -> StorageResult<RunStatus>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Gets the most recent runs, newest first
    fn list_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>>;

    /// Moves a run to a new status, rejecting transitions the lifecycle forbids
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Stores the crawled counter and the discovered estimate
    fn update_progress(
        &mut self,
        run_id: i64,
        pages_crawled: u32,
        pages_discovered: u32,
    ) -> StorageResult<()>;

    /// Marks a running run completed with its provisional results
    fn complete_run(
        &mut self,
        run_id: i64,
        provisional: &IssueCounts,
        provisional_score: u8,
        summary: &RunSummary,
    ) -> StorageResult<()>;

    /// Marks a run failed with a finish timestamp
    ///
    /// A run that is already failed is left untouched.
    fn fail_run(&mut self, run_id: i64) -> StorageResult<()>;

    // ===== Page Records =====

    /// Inserts a batch of page records in one transaction
    ///
    /// Returns how many rows were written; a URL already recorded for the
    /// run is skipped.
    fn insert_pages(&mut self, run_id: i64, pages: &[ExtractedPage]) -> StorageResult<usize>;

    /// Gets all page records of a run in insertion order
    fn get_pages(&self, run_id: i64) -> StorageResult<Vec<PageRecord>>;

    /// Counts the page records of a run
    fn count_pages(&self, run_id: i64) -> StorageResult<u64>;

    // ===== Issues =====

    /// Replaces a run's issue set and stores the computed counts and score
    ///
    /// Delete, insert and run update happen in a single transaction.
    fn replace_issues(
        &mut self,
        run_id: i64,
        issues: &[Issue],
        counts: &IssueCounts,
        health_score: u8,
    ) -> StorageResult<()>;

    /// Gets all issues of a run in stored order
    fn get_issues(&self, run_id: i64) -> StorageResult<Vec<IssueRecord>>;

    /// Issue counts per type for a run, most severe types first
    fn count_issues_by_type(&self, run_id: i64) -> StorageResult<Vec<(IssueType, u64)>>;
}
