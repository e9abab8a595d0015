//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.
//! Link lists, annotations, issue payloads and run summaries are stored as
//! JSON text columns.

use crate::analysis::{Issue, IssueCounts, IssueType, Severity};
use crate::extract::ExtractedPage;
use crate::state::RunStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{IssueRecord, PageRecord, RunRecord, RunSummary};
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use std::path::Path;

const RUN_COLUMNS: &str = "id, website, status, started_at, finished_at, config_hash, \
     pages_crawled, pages_discovered, provisional_errors, provisional_warnings, \
     provisional_notices, provisional_score, computed_errors, computed_warnings, \
     computed_notices, health_score, summary";

const PAGE_COLUMNS: &str = "id, run_id, created_at, url, status_code, content_type, \
     canonical_url, title, meta_description, h1, internal_links, external_links, \
     page_size_bytes, response_time_ms, image_count, stylesheet_count, script_count, \
     images_missing_alt, insecure_resource_count, redirect_location, is_soft_404, \
     is_redirect_loop, is_noindex, annotations, html";

const ISSUE_COLUMNS: &str =
    "id, run_id, created_at, url, issue_type, severity, title, description, data";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(PulseError)` - Failed to open database
    pub fn new(path: &Path) -> crate::Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> crate::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn transition(&self, run_id: i64, to: RunStatus) -> StorageResult<()> {
        let from = self.get_run_status(run_id)?;
        if from.can_transition_to(to) {
            Ok(())
        } else {
            Err(StorageError::InvalidTransition { from, to })
        }
    }

    fn ensure_run(&self, run_id: i64) -> StorageResult<()> {
        self.get_run_status(run_id).map(|_| ())
    }
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text).map_err(|e| conversion_error(idx, e))
}

fn optional_json_column<T: DeserializeOwned>(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<T>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| serde_json::from_str(&t).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn status_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<RunStatus> {
    let value: String = row.get(idx)?;
    RunStatus::from_db_string(&value).ok_or_else(|| {
        conversion_error(idx, StorageError::UnknownValue(format!("run status '{}'", value)))
    })
}

/// Three nullable counter columns starting at `idx`
fn counts_columns(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<IssueCounts>> {
    let errors: Option<u32> = row.get(idx)?;
    let warnings: Option<u32> = row.get(idx + 1)?;
    let notices: Option<u32> = row.get(idx + 2)?;

    Ok(match (errors, warnings, notices) {
        (Some(errors), Some(warnings), Some(notices)) => Some(IssueCounts {
            errors,
            warnings,
            notices,
        }),
        _ => None,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        website: row.get(1)?,
        status: status_column(row, 2)?,
        started_at: row.get(3)?,
        finished_at: row.get(4)?,
        config_hash: row.get(5)?,
        pages_crawled: row.get(6)?,
        pages_discovered: row.get(7)?,
        provisional: counts_columns(row, 8)?,
        provisional_score: row.get(11)?,
        computed: counts_columns(row, 12)?,
        health_score: row.get(15)?,
        summary: optional_json_column::<RunSummary>(row, 16)?,
    })
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
    let page_size_bytes: i64 = row.get(12)?;

    Ok(PageRecord {
        id: row.get(0)?,
        run_id: row.get(1)?,
        created_at: row.get(2)?,
        page: ExtractedPage {
            url: row.get(3)?,
            status_code: row.get(4)?,
            content_type: row.get(5)?,
            canonical_url: row.get(6)?,
            title: row.get(7)?,
            meta_description: row.get(8)?,
            h1: row.get(9)?,
            internal_links: json_column(row, 10)?,
            external_links: json_column(row, 11)?,
            page_size_bytes: page_size_bytes.max(0) as u64,
            response_time_ms: row.get(13)?,
            image_count: row.get(14)?,
            stylesheet_count: row.get(15)?,
            script_count: row.get(16)?,
            images_missing_alt: row.get(17)?,
            insecure_resource_count: row.get(18)?,
            redirect_location: row.get(19)?,
            is_soft_404: row.get(20)?,
            is_redirect_loop: row.get(21)?,
            is_noindex: row.get(22)?,
            annotations: json_column(row, 23)?,
            html: row.get(24)?,
        },
    })
}

fn issue_from_row(row: &Row<'_>) -> rusqlite::Result<IssueRecord> {
    let type_str: String = row.get(4)?;
    let issue_type = IssueType::from_db_string(&type_str).ok_or_else(|| {
        conversion_error(4, StorageError::UnknownValue(format!("issue type '{}'", type_str)))
    })?;
    let severity_str: String = row.get(5)?;
    let severity = Severity::from_db_string(&severity_str).ok_or_else(|| {
        conversion_error(5, StorageError::UnknownValue(format!("severity '{}'", severity_str)))
    })?;

    Ok(IssueRecord {
        id: row.get(0)?,
        run_id: row.get(1)?,
        created_at: row.get(2)?,
        issue: Issue {
            url: row.get(3)?,
            issue_type,
            severity,
            title: row.get(6)?,
            description: row.get(7)?,
            data: optional_json_column(row, 8)?,
        },
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, website: &str, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (website, status, started_at, config_hash) VALUES (?1, ?2, ?3, ?4)",
            params![website, RunStatus::Pending.to_db_string(), now, config_hash],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_run_status(&self, run_id: i64) -> StorageResult<RunStatus> {
        self.conn
            .query_row(
                "SELECT status FROM runs WHERE id = ?1",
                params![run_id],
                |row| status_column(row, 0),
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let sql = format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS);
        let run = self.conn.query_row(&sql, [], run_from_row).optional()?;
        Ok(run)
    }

    fn list_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>> {
        let sql = format!("SELECT {} FROM runs ORDER BY id DESC LIMIT ?1", RUN_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let runs = stmt
            .query_map(params![limit as i64], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        self.transition(run_id, status)?;
        self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE id = ?2",
            params![status.to_db_string(), run_id],
        )?;
        Ok(())
    }

    fn update_progress(
        &mut self,
        run_id: i64,
        pages_crawled: u32,
        pages_discovered: u32,
    ) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET pages_crawled = ?1, pages_discovered = ?2 WHERE id = ?3",
            params![pages_crawled, pages_discovered, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn complete_run(
        &mut self,
        run_id: i64,
        provisional: &IssueCounts,
        provisional_score: u8,
        summary: &RunSummary,
    ) -> StorageResult<()> {
        self.transition(run_id, RunStatus::Completed)?;
        let now = Utc::now().to_rfc3339();
        let summary_json = serde_json::to_string(summary)?;

        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, provisional_errors = ?3,
             provisional_warnings = ?4, provisional_notices = ?5, provisional_score = ?6,
             summary = ?7 WHERE id = ?8",
            params![
                RunStatus::Completed.to_db_string(),
                now,
                provisional.errors,
                provisional.warnings,
                provisional.notices,
                provisional_score,
                summary_json,
                run_id
            ],
        )?;
        Ok(())
    }

    fn fail_run(&mut self, run_id: i64) -> StorageResult<()> {
        if self.get_run_status(run_id)? == RunStatus::Failed {
            return Ok(());
        }
        self.transition(run_id, RunStatus::Failed)?;

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![RunStatus::Failed.to_db_string(), now, run_id],
        )?;
        Ok(())
    }

    // ===== Page Records =====

    fn insert_pages(&mut self, run_id: i64, pages: &[ExtractedPage]) -> StorageResult<usize> {
        self.ensure_run(run_id)?;
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut inserted = 0;

        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO pages (run_id, created_at, url, status_code, content_type,
                 canonical_url, title, meta_description, h1, internal_links, external_links,
                 page_size_bytes, response_time_ms, image_count, stylesheet_count, script_count,
                 images_missing_alt, insecure_resource_count, redirect_location, is_soft_404,
                 is_redirect_loop, is_noindex, annotations, html)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                 ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)",
            )?;

            for page in pages {
                let internal_links = serde_json::to_string(&page.internal_links)?;
                let external_links = serde_json::to_string(&page.external_links)?;
                let annotations = serde_json::to_string(&page.annotations)?;

                inserted += stmt.execute(params![
                    run_id,
                    now,
                    page.url,
                    page.status_code,
                    page.content_type,
                    page.canonical_url,
                    page.title,
                    page.meta_description,
                    page.h1,
                    internal_links,
                    external_links,
                    page.page_size_bytes as i64,
                    page.response_time_ms,
                    page.image_count,
                    page.stylesheet_count,
                    page.script_count,
                    page.images_missing_alt,
                    page.insecure_resource_count,
                    page.redirect_location,
                    page.is_soft_404,
                    page.is_redirect_loop,
                    page.is_noindex,
                    annotations,
                    page.html,
                ])?;
            }
        }

        tx.commit()?;
        Ok(inserted)
    }

    fn get_pages(&self, run_id: i64) -> StorageResult<Vec<PageRecord>> {
        let sql = format!(
            "SELECT {} FROM pages WHERE run_id = ?1 ORDER BY id ASC",
            PAGE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let pages = stmt
            .query_map(params![run_id], page_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pages)
    }

    fn count_pages(&self, run_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Issues =====

    fn replace_issues(
        &mut self,
        run_id: i64,
        issues: &[Issue],
        counts: &IssueCounts,
        health_score: u8,
    ) -> StorageResult<()> {
        self.ensure_run(run_id)?;
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        tx.execute("DELETE FROM issues WHERE run_id = ?1", params![run_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO issues (run_id, created_at, url, issue_type, severity, title,
                 description, data) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for issue in issues {
                let data = issue.data.as_ref().map(serde_json::to_string).transpose()?;
                stmt.execute(params![
                    run_id,
                    now,
                    issue.url,
                    issue.issue_type.to_db_string(),
                    issue.severity.to_db_string(),
                    issue.title,
                    issue.description,
                    data,
                ])?;
            }
        }
        tx.execute(
            "UPDATE runs SET computed_errors = ?1, computed_warnings = ?2,
             computed_notices = ?3, health_score = ?4 WHERE id = ?5",
            params![
                counts.errors,
                counts.warnings,
                counts.notices,
                health_score,
                run_id
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn get_issues(&self, run_id: i64) -> StorageResult<Vec<IssueRecord>> {
        let sql = format!(
            "SELECT {} FROM issues WHERE run_id = ?1 ORDER BY id ASC",
            ISSUE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let issues = stmt
            .query_map(params![run_id], issue_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(issues)
    }

    fn count_issues_by_type(&self, run_id: i64) -> StorageResult<Vec<(IssueType, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT issue_type, COUNT(*) FROM issues WHERE run_id = ?1 GROUP BY issue_type",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut counts = Vec::with_capacity(rows.len());
        for (type_str, count) in rows {
            let issue_type = IssueType::from_db_string(&type_str)
                .ok_or_else(|| StorageError::UnknownValue(format!("issue type '{}'", type_str)))?;
            counts.push((issue_type, count as u64));
        }
        counts.sort_by_key(|(t, _)| (t.severity(), *t));

        Ok(counts)
    }
}
