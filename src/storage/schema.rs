//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Site-Pulse database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per health check
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    website TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    pages_crawled INTEGER NOT NULL DEFAULT 0,
    pages_discovered INTEGER NOT NULL DEFAULT 0,
    provisional_errors INTEGER,
    provisional_warnings INTEGER,
    provisional_notices INTEGER,
    provisional_score INTEGER,
    computed_errors INTEGER,
    computed_warnings INTEGER,
    computed_notices INTEGER,
    health_score INTEGER,
    summary TEXT
);

CREATE INDEX IF NOT EXISTS idx_runs_status ON runs(status);

-- One row per crawled URL per run, never updated
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    url TEXT NOT NULL,
    status_code INTEGER NOT NULL,
    content_type TEXT,
    canonical_url TEXT,
    title TEXT,
    meta_description TEXT,
    h1 TEXT,
    internal_links TEXT NOT NULL,
    external_links TEXT NOT NULL,
    page_size_bytes INTEGER NOT NULL DEFAULT 0,
    response_time_ms REAL NOT NULL DEFAULT 0,
    image_count INTEGER NOT NULL DEFAULT 0,
    stylesheet_count INTEGER NOT NULL DEFAULT 0,
    script_count INTEGER NOT NULL DEFAULT 0,
    images_missing_alt INTEGER NOT NULL DEFAULT 0,
    insecure_resource_count INTEGER NOT NULL DEFAULT 0,
    redirect_location TEXT,
    is_soft_404 INTEGER NOT NULL DEFAULT 0,
    is_redirect_loop INTEGER NOT NULL DEFAULT 0,
    is_noindex INTEGER NOT NULL DEFAULT 0,
    annotations TEXT NOT NULL,
    html TEXT,
    created_at TEXT NOT NULL,
    UNIQUE(run_id, url)
);

CREATE INDEX IF NOT EXISTS idx_pages_run ON pages(run_id);

-- Output of the detection pass, replaced as a whole per run
CREATE TABLE IF NOT EXISTS issues (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    url TEXT NOT NULL,
    issue_type TEXT NOT NULL,
    severity TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    data TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_issues_run ON issues(run_id);
CREATE INDEX IF NOT EXISTS idx_issues_type ON issues(run_id, issue_type);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
