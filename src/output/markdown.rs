//! Markdown health report
//!
//! Renders a `HealthSummary` as a human-readable markdown document: run
//! metadata, score, page status breakdown, issue tables and the slowest pages.

use crate::analysis::Severity;
use crate::output::{HealthSummary, OutputResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Issues listed per severity before the rest is elided
const ISSUES_PER_SEVERITY: usize = 50;

/// Writes the markdown report for a run
///
/// # Arguments
///
/// * `summary` - The run's health summary
/// * `output_path` - Path where the markdown file should be written
pub fn generate_markdown_report(summary: &HealthSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_report(summary);

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a health summary as markdown
pub fn format_markdown_report(summary: &HealthSummary) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Site Health Report: {}\n\n", summary.website));

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Run ID**: {}\n", summary.run_id));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at));
    if let Some(finished) = &summary.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished));
    }
    if let Some(duration) = summary.duration_seconds {
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} minutes)\n",
            duration,
            duration as f64 / 60.0
        ));
    }
    md.push_str(&format!("- **Status**: {}\n", summary.status));
    md.push_str(&format!("- **Config Hash**: {}\n", summary.config_hash));
    if let Some(crawl) = &summary.crawl {
        md.push_str(&format!("- **Discovery**: {}", crawl.strategy));
        if crawl.sitemap_urls > 0 {
            md.push_str(&format!(" ({} sitemap URLs)", crawl.sitemap_urls));
        }
        md.push('\n');
    }
    md.push('\n');

    // Score
    md.push_str("## Health Score\n\n");
    match summary.health_score {
        Some(score) if summary.score_is_provisional => {
            md.push_str(&format!("**{} / 100** (provisional)\n\n", score))
        }
        Some(score) => md.push_str(&format!("**{} / 100**\n\n", score)),
        None => md.push_str("Not available\n\n"),
    }
    md.push_str("| Severity | Count |\n");
    md.push_str("|----------|-------|\n");
    md.push_str(&format!("| Errors | {} |\n", summary.counts.errors));
    md.push_str(&format!("| Warnings | {} |\n", summary.counts.warnings));
    md.push_str(&format!("| Notices | {} |\n\n", summary.counts.notices));

    // Pages
    let stats = &summary.statistics;
    md.push_str("## Pages\n\n");
    md.push_str(&format!("- **Pages Crawled**: {}\n", summary.pages_crawled));
    md.push_str(&format!(
        "- **Pages Discovered**: {}\n",
        summary.pages_discovered
    ));
    md.push_str(&format!("- **Success Rate**: {:.2}%\n", summary.success_rate()));
    md.push_str(&format!("- **Error Rate**: {:.2}%\n", summary.error_rate()));
    md.push_str(&format!(
        "- **Average Response Time**: {:.0} ms\n",
        stats.average_response_time_ms
    ));
    if let Some(crawl) = &summary.crawl {
        md.push_str(&format!(
            "- **Internal Links**: {} ({} unique)\n",
            crawl.internal_links, crawl.unique_internal_links
        ));
        md.push_str(&format!(
            "- **External Links**: {} ({} unique)\n",
            crawl.external_links, crawl.unique_external_links
        ));
    }
    md.push('\n');

    md.push_str("| Status | Pages |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| 2xx | {} |\n", stats.success_pages));
    md.push_str(&format!("| 3xx | {} |\n", stats.redirect_pages));
    md.push_str(&format!("| 4xx | {} |\n", stats.client_error_pages));
    md.push_str(&format!("| 5xx | {} |\n", stats.server_error_pages));
    md.push_str(&format!("| Failed | {} |\n\n", stats.failed_fetches));

    // Issue breakdown
    if !summary.issues_by_type.is_empty() {
        md.push_str("## Issues by Type\n\n");
        md.push_str("| Issue | Severity | Count |\n");
        md.push_str("|-------|----------|-------|\n");
        for (issue_type, count) in &summary.issues_by_type {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                issue_type.title(),
                issue_type.severity(),
                count
            ));
        }
        md.push('\n');
    }

    for severity in Severity::all() {
        let issues: Vec<_> = summary
            .issues
            .iter()
            .filter(|i| i.severity == severity)
            .collect();
        if issues.is_empty() {
            continue;
        }

        let heading = match severity {
            Severity::Error => "Errors",
            Severity::Warning => "Warnings",
            Severity::Notice => "Notices",
        };
        md.push_str(&format!("## {}\n\n", heading));
        md.push_str("| URL | Issue | Details |\n");
        md.push_str("|-----|-------|---------|\n");
        for issue in issues.iter().take(ISSUES_PER_SEVERITY) {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                issue.url,
                issue.title,
                escape_cell(&issue.description)
            ));
        }
        if issues.len() > ISSUES_PER_SEVERITY {
            md.push_str(&format!(
                "\n... and {} more\n",
                issues.len() - ISSUES_PER_SEVERITY
            ));
        }
        md.push('\n');
    }

    if !stats.slowest_pages.is_empty() {
        md.push_str("## Slowest Pages\n\n");
        md.push_str("| URL | Response Time |\n");
        md.push_str("|-----|---------------|\n");
        for (url, ms) in &stats.slowest_pages {
            md.push_str(&format!("| {} | {:.0} ms |\n", url, ms));
        }
        md.push('\n');
    }

    md
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Issue, IssueCounts, IssueType};
    use crate::output::stats::RunStatistics;

    fn create_test_summary() -> HealthSummary {
        HealthSummary {
            run_id: 7,
            website: "https://example.com/".to_string(),
            started_at: "2024-01-01T00:00:00+00:00".to_string(),
            finished_at: Some("2024-01-01T00:10:00+00:00".to_string()),
            duration_seconds: Some(600),
            status: "completed".to_string(),
            config_hash: "abc123".to_string(),
            pages_crawled: 40,
            pages_discovered: 45,
            statistics: RunStatistics {
                total_pages: 40,
                success_pages: 38,
                client_error_pages: 2,
                error_pages: 2,
                ..Default::default()
            },
            counts: IssueCounts {
                errors: 2,
                warnings: 1,
                notices: 0,
            },
            health_score: Some(42),
            issues_by_type: vec![(IssueType::BrokenInternalLink, 2), (IssueType::MissingH1, 1)],
            issues: vec![
                Issue::new(
                    IssueType::BrokenInternalLink,
                    "https://example.com/a",
                    "Links to https://example.com/x (HTTP 404)",
                ),
                Issue::new(IssueType::MissingH1, "https://example.com/b", "Page has no <h1>"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_format_markdown_report() {
        let markdown = format_markdown_report(&create_test_summary());

        assert!(markdown.contains("# Site Health Report: https://example.com/"));
        assert!(markdown.contains("**42 / 100**"));
        assert!(markdown.contains("| Errors | 2 |"));
        assert!(markdown.contains("| 4xx | 2 |"));
        assert!(markdown.contains("## Errors"));
        assert!(markdown.contains("## Warnings"));
        assert!(!markdown.contains("## Notices"));
    }

    #[test]
    fn test_provisional_score_marked() {
        let mut summary = create_test_summary();
        summary.score_is_provisional = true;
        let markdown = format_markdown_report(&summary);
        assert!(markdown.contains("(provisional)"));
    }

    #[test]
    fn test_pipes_escaped_in_cells() {
        assert_eq!(escape_cell("a|b\nc"), "a\\|b c");
    }

    #[test]
    fn test_report_written_to_nested_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("health.md");

        generate_markdown_report(&create_test_summary(), &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Site Health Report"));
    }
}
