//! Issue detection over the page records of a finished run
//!
//! Detection is a second pass: it sees every record of the run at once, so it
//! can find problems no single page reveals (duplicate titles, broken links,
//! linked-but-uncrawled targets). Results are written back by replacing the
//! run's whole issue set, which makes re-running it idempotent.

mod issue;
mod rules;
mod score;

pub use issue::{Issue, IssueCounts, IssueType, Severity};
pub use rules::{
    RuleContext, LONG_TITLE_CHARS, MAX_IMAGE_COUNT, MIN_INTERNAL_LINKS, SHORT_TITLE_CHARS,
};
pub use score::{
    annotation_severity, health_score, provisional_score, ScoreWeights, ERROR_WEIGHT,
    NOTICE_WEIGHT, WARNING_WEIGHT,
};

use crate::extract::ExtractedPage;
use crate::storage::{Storage, StorageError};
use thiserror::Error;

/// Errors raised during detection
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Malformed page record {url}: {reason}")]
    MalformedRecord { url: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Inputs to detection besides the records
#[derive(Debug, Clone, Copy)]
pub struct DetectionOptions {
    /// Page cap the run was crawled with
    pub page_cap: u32,
    pub weights: ScoreWeights,
}

/// Outcome of one detection pass
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// Sorted by severity, type, url and description
    pub issues: Vec<Issue>,
    pub counts: IssueCounts,
    pub health_score: u8,
    pub pages_analyzed: usize,
    /// Rules that failed and contributed no issues
    pub skipped_rules: Vec<&'static str>,
}

/// Runs every rule over the given records and scores the result
///
/// Never fails: a rule that errors is logged and skipped.
pub fn detect_issues(pages: &[ExtractedPage], options: &DetectionOptions) -> AnalysisReport {
    let ctx = RuleContext {
        truncated: pages.len() as u64 >= u64::from(options.page_cap),
    };

    let mut issues = Vec::new();
    let mut skipped_rules = Vec::new();
    for (name, rule) in rules::RULES {
        match rule(pages, &ctx) {
            Ok(found) => issues.extend(found),
            Err(e) => {
                tracing::warn!("Detection rule '{}' skipped: {}", name, e);
                skipped_rules.push(*name);
            }
        }
    }

    issues.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    let counts = IssueCounts::from_issues(&issues);
    let health_score = health_score(&counts, pages.len(), &options.weights);

    AnalysisReport {
        issues,
        counts,
        health_score,
        pages_analyzed: pages.len(),
        skipped_rules,
    }
}

/// Loads a run's records, detects issues and stores them with the score
pub fn analyze_run<S: Storage + ?Sized>(
    storage: &mut S,
    run_id: i64,
    options: &DetectionOptions,
) -> AnalysisResult<AnalysisReport> {
    let pages: Vec<ExtractedPage> = storage
        .get_pages(run_id)?
        .into_iter()
        .map(|record| record.page)
        .collect();

    let report = detect_issues(&pages, options);
    storage.replace_issues(run_id, &report.issues, &report.counts, report.health_score)?;

    tracing::info!(
        "Run {}: {} issues ({} errors, {} warnings, {} notices), health score {}",
        run_id,
        report.issues.len(),
        report.counts.errors,
        report.counts.warnings,
        report.counts.notices,
        report.health_score
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::PageLink;
    use crate::storage::SqliteStorage;

    fn options() -> DetectionOptions {
        DetectionOptions {
            page_cap: 1000,
            weights: ScoreWeights::default(),
        }
    }

    fn page(url: &str, title: &str, links: &[&str]) -> ExtractedPage {
        ExtractedPage {
            url: url.to_string(),
            status_code: 200,
            content_type: Some("text/html".to_string()),
            title: Some(title.to_string()),
            meta_description: Some(format!("Description of {}", url)),
            h1: Some(title.to_string()),
            internal_links: links
                .iter()
                .map(|l| PageLink {
                    url: l.to_string(),
                    anchor_text: None,
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_issues_sorted_by_severity() {
        let pages = vec![
            page("https://example.com/b", "Short", &[]),
            page("https://example.com/a", "Short", &[]),
        ];
        let report = detect_issues(&pages, &options());

        let severities: Vec<_> = report.issues.iter().map(|i| i.severity).collect();
        let mut sorted = severities.clone();
        sorted.sort();
        assert_eq!(severities, sorted);

        // duplicate_title errors come first, ordered by url
        assert_eq!(report.issues[0].issue_type, IssueType::DuplicateTitle);
        assert_eq!(report.issues[0].url, "https://example.com/a");
    }

    #[test]
    fn test_failing_rule_is_skipped() {
        let mut bad = page("::garbage::", "A Perfectly Reasonable Title Here", &[]);
        bad.canonical_url = Some("https://example.com/".to_string());
        let report = detect_issues(&[bad], &options());

        assert_eq!(report.skipped_rules, vec!["canonical"]);
        assert!(report
            .issues
            .iter()
            .any(|i| i.issue_type == IssueType::FewInternalLinks));
    }

    #[test]
    fn test_truncated_by_cap() {
        let pages = vec![page("https://example.com/", "Home", &["https://example.com/next"])];
        let capped = DetectionOptions {
            page_cap: 1,
            ..options()
        };
        let report = detect_issues(&pages, &capped);
        assert!(report
            .issues
            .iter()
            .all(|i| i.issue_type != IssueType::BrokenInternalLink));
    }

    #[test]
    fn test_analyze_run_is_idempotent() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("https://example.com/", "hash").unwrap();
        storage
            .insert_pages(
                run_id,
                &[
                    page("https://example.com/a", "Same", &["https://example.com/x"]),
                    page("https://example.com/b", "Same", &[]),
                    ExtractedPage {
                        url: "https://example.com/x".to_string(),
                        status_code: 404,
                        ..Default::default()
                    },
                ],
            )
            .unwrap();

        let first = analyze_run(&mut storage, run_id, &options()).unwrap();
        let second = analyze_run(&mut storage, run_id, &options()).unwrap();

        assert_eq!(first.issues, second.issues);
        let stored = storage.get_issues(run_id).unwrap();
        assert_eq!(stored.len(), first.issues.len());

        let broken: Vec<_> = stored
            .iter()
            .filter(|r| r.issue.issue_type == IssueType::BrokenInternalLink)
            .collect();
        assert_eq!(broken.len(), 1);
        assert_eq!(broken[0].issue.url, "https://example.com/a");

        let run = storage.get_run(run_id).unwrap();
        assert_eq!(run.health_score, Some(first.health_score));
        assert_eq!(run.computed, Some(first.counts));
    }

    #[test]
    fn test_empty_run_scores_zero() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("https://example.com/", "hash").unwrap();

        let report = analyze_run(&mut storage, run_id, &options()).unwrap();
        assert_eq!(report.pages_analyzed, 0);
        assert!(report.issues.is_empty());
        assert_eq!(report.health_score, 0);

        let run = storage.get_run(run_id).unwrap();
        assert_eq!(run.best_score(), Some(0));
    }
}
