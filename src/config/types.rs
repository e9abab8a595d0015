use serde::Deserialize;

/// Main configuration structure for Site-Pulse
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

/// The website a health check runs against
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Base URL; only URLs on exactly this host are crawled
    pub url: String,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Hard cap on pages crawled per run
    #[serde(rename = "page-cap")]
    pub page_cap: u32,

    /// Delay between consecutive requests (milliseconds)
    #[serde(rename = "request-delay-ms")]
    pub request_delay_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Emit a progress event every N about-to-fetch hooks
    #[serde(rename = "progress-interval")]
    pub progress_interval: u32,

    /// Number of page records buffered before a bulk insert
    #[serde(rename = "persist-batch-size")]
    pub persist_batch_size: usize,

    /// Stored HTML is truncated to this many bytes
    #[serde(rename = "max-body-bytes")]
    pub max_body_bytes: usize,

    /// Whether robots.txt is honored
    #[serde(rename = "respect-robots")]
    pub respect_robots: bool,

    /// Whether /sitemap.xml entries seed the crawl
    #[serde(rename = "use-sitemap")]
    pub use_sitemap: bool,

    /// Job-level attempts before a check is given up
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Base backoff between attempts, doubled after each failure (milliseconds)
    #[serde(rename = "retry-backoff-ms")]
    pub retry_backoff_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            page_cap: 1000,
            request_delay_ms: 250,
            request_timeout_secs: 30,
            progress_interval: 5,
            persist_batch_size: 25,
            max_body_bytes: 500 * 1024,
            respect_robots: true,
            use_sitemap: true,
            max_attempts: 3,
            retry_backoff_ms: 1000,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the markdown health report
    #[serde(rename = "report-path")]
    pub report_path: String,
}

/// Optional overrides for the health score penalty weights
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    #[serde(rename = "error-weight")]
    pub error_weight: f64,

    #[serde(rename = "warning-weight")]
    pub warning_weight: f64,

    #[serde(rename = "notice-weight")]
    pub notice_weight: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let weights = crate::analysis::ScoreWeights::default();
        Self {
            error_weight: weights.error,
            warning_weight: weights.warning,
            notice_weight: weights.notice,
        }
    }
}

impl From<&ScoringConfig> for crate::analysis::ScoreWeights {
    fn from(config: &ScoringConfig) -> Self {
        Self {
            error: config.error_weight,
            warning: config.warning_weight,
            notice: config.notice_weight,
        }
    }
}
