//! Site-Pulse: an SEO site-health crawler
//!
//! This crate crawls the internal pages of a website, extracts SEO signals
//! from every page, reports live progress, and runs a cross-page analysis
//! (broken links, duplicates, orphaned pages) that produces a health score.

pub mod analysis;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod progress;
pub mod robots;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Site-Pulse operations
#[derive(Debug, Error)]
pub enum PulseError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Seed URL {url} could not be fetched: {message}")]
    SeedUnreachable { url: String, message: String },

    #[error("URL disallowed by robots.txt: {url}")]
    RobotsDenied { url: String },

    #[error("Crawl run {run_id} was cancelled")]
    Cancelled { run_id: i64 },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Issue detection failed: {0}")]
    Analysis(#[from] analysis::AnalysisError),

    #[error("Run {run_id} cannot be analyzed in status {status}")]
    RunNotAnalyzable {
        run_id: i64,
        status: state::RunStatus,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid run transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::RunStatus,
        to: state::RunStatus,
    },

    #[error("Report error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Site-Pulse operations
pub type Result<T> = std::result::Result<T, PulseError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use analysis::{detect_issues, Issue, IssueType, Severity};
pub use config::Config;
pub use crawler::{run_health_check, AbortHandle, CrawlController, CrawlObserver, HealthCheck};
pub use extract::{extract_page, ExtractedPage};
pub use progress::{ProgressEvent, ProgressReporter};
pub use state::{CrawlState, RunStatus};
