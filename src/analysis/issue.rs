//! Issue types, severities and per-run counts

use serde::{Deserialize, Serialize};
use std::fmt;

/// How bad an issue is
///
/// Ordered most severe first, so sorting a list of issues puts errors on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Notice,
}

impl Severity {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Notice => "notice",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "error" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            "notice" => Some(Self::Notice),
            _ => None,
        }
    }

    pub fn all() -> [Self; 3] {
        [Self::Error, Self::Warning, Self::Notice]
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Every issue the detection pass can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    MissingTitle,
    DuplicateTitle,
    DuplicateMetaDescription,
    BrokenInternalLink,
    HttpError,
    RedirectLoop,
    InvalidCanonical,
    MixedContent,
    MissingMetaDescription,
    MissingH1,
    OrphanedPage,
    RedirectChain,
    SlowResponse,
    LargePage,
    Soft404,
    MissingAltText,
    LargeImages,
    Noindex,
    ShortTitle,
    LongTitle,
    FewInternalLinks,
}

impl IssueType {
    pub fn severity(&self) -> Severity {
        match self {
            Self::MissingTitle
            | Self::DuplicateTitle
            | Self::DuplicateMetaDescription
            | Self::BrokenInternalLink
            | Self::HttpError
            | Self::RedirectLoop
            | Self::InvalidCanonical
            | Self::MixedContent => Severity::Error,

            Self::MissingMetaDescription
            | Self::MissingH1
            | Self::OrphanedPage
            | Self::RedirectChain
            | Self::SlowResponse
            | Self::LargePage
            | Self::Soft404
            | Self::MissingAltText => Severity::Warning,

            Self::LargeImages
            | Self::Noindex
            | Self::ShortTitle
            | Self::LongTitle
            | Self::FewInternalLinks => Severity::Notice,
        }
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::MissingTitle => "missing_title",
            Self::DuplicateTitle => "duplicate_title",
            Self::DuplicateMetaDescription => "duplicate_meta_description",
            Self::BrokenInternalLink => "broken_internal_link",
            Self::HttpError => "http_error",
            Self::RedirectLoop => "redirect_loop",
            Self::InvalidCanonical => "invalid_canonical",
            Self::MixedContent => "mixed_content",
            Self::MissingMetaDescription => "missing_meta_description",
            Self::MissingH1 => "missing_h1",
            Self::OrphanedPage => "orphaned_page",
            Self::RedirectChain => "redirect_chain",
            Self::SlowResponse => "slow_response",
            Self::LargePage => "large_page",
            Self::Soft404 => "soft_404",
            Self::MissingAltText => "missing_alt_text",
            Self::LargeImages => "large_images",
            Self::Noindex => "noindex",
            Self::ShortTitle => "short_title",
            Self::LongTitle => "long_title",
            Self::FewInternalLinks => "few_internal_links",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        Self::all().into_iter().find(|t| t.to_db_string() == s)
    }

    /// Short human-readable name
    pub fn title(&self) -> &'static str {
        match self {
            Self::MissingTitle => "Missing title tag",
            Self::DuplicateTitle => "Duplicate title tag",
            Self::DuplicateMetaDescription => "Duplicate meta description",
            Self::BrokenInternalLink => "Broken internal link",
            Self::HttpError => "HTTP error",
            Self::RedirectLoop => "Redirect loop",
            Self::InvalidCanonical => "Invalid canonical URL",
            Self::MixedContent => "Mixed content",
            Self::MissingMetaDescription => "Missing meta description",
            Self::MissingH1 => "Missing H1 heading",
            Self::OrphanedPage => "Orphaned page",
            Self::RedirectChain => "Redirect",
            Self::SlowResponse => "Slow response",
            Self::LargePage => "Large page",
            Self::Soft404 => "Soft 404",
            Self::MissingAltText => "Images missing alt text",
            Self::LargeImages => "Many images",
            Self::Noindex => "Page excluded from indexing",
            Self::ShortTitle => "Title too short",
            Self::LongTitle => "Title too long",
            Self::FewInternalLinks => "Few internal links",
        }
    }

    pub fn all() -> [Self; 21] {
        [
            Self::MissingTitle,
            Self::DuplicateTitle,
            Self::DuplicateMetaDescription,
            Self::BrokenInternalLink,
            Self::HttpError,
            Self::RedirectLoop,
            Self::InvalidCanonical,
            Self::MixedContent,
            Self::MissingMetaDescription,
            Self::MissingH1,
            Self::OrphanedPage,
            Self::RedirectChain,
            Self::SlowResponse,
            Self::LargePage,
            Self::Soft404,
            Self::MissingAltText,
            Self::LargeImages,
            Self::Noindex,
            Self::ShortTitle,
            Self::LongTitle,
            Self::FewInternalLinks,
        ]
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// One finding of the detection pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// The offending page (or, for orphaned pages, the never-crawled target)
    pub url: String,
    pub issue_type: IssueType,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub data: Option<serde_json::Value>,
}

impl Issue {
    pub fn new(issue_type: IssueType, url: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            issue_type,
            severity: issue_type.severity(),
            title: issue_type.title().to_string(),
            description: description.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Key used to give detection output a stable order
    pub(crate) fn sort_key(&self) -> (Severity, IssueType, &str, &str) {
        (self.severity, self.issue_type, &self.url, &self.description)
    }
}

/// Issue totals by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCounts {
    pub errors: u32,
    pub warnings: u32,
    pub notices: u32,
}

impl IssueCounts {
    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Notice => self.notices += 1,
        }
    }

    pub fn from_issues(issues: &[Issue]) -> Self {
        let mut counts = Self::default();
        for issue in issues {
            counts.add(issue.severity);
        }
        counts
    }

    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.notices
    }
}
