//! Output module for run statistics and health reports
//!
//! This module handles:
//! - Assembling a health summary of a stored run
//! - Printing per-run statistics
//! - Writing the markdown health report

mod markdown;
pub mod stats;
mod summary;

pub use markdown::{format_markdown_report, generate_markdown_report};
pub use stats::{load_statistics, print_statistics, RunStatistics};
pub use summary::{HealthSummary, OutputError, OutputResult};

use crate::storage::Storage;
use chrono::{DateTime, Utc};

/// Builds the health summary of a run
///
/// # Arguments
///
/// * `storage` - The storage backend containing crawl data
/// * `run_id` - The run to summarize, or `None` for the most recent run
pub fn generate_summary(storage: &dyn Storage, run_id: Option<i64>) -> OutputResult<HealthSummary> {
    let run = match run_id {
        Some(id) => storage.get_run(id)?,
        None => storage.get_latest_run()?.ok_or(OutputError::NoRuns)?,
    };

    let duration_seconds = run.finished_at.as_deref().and_then(|finished| {
        let started = run.started_at.parse::<DateTime<Utc>>().ok()?;
        let finished = finished.parse::<DateTime<Utc>>().ok()?;
        Some((finished - started).num_seconds().max(0) as u64)
    });

    let statistics = load_statistics(storage, run.id)?;
    let issues_by_type = storage.count_issues_by_type(run.id)?;
    let issues = storage
        .get_issues(run.id)?
        .into_iter()
        .map(|record| record.issue)
        .collect();

    // detection results win over the crawl-time tallies
    let (counts, score_is_provisional) = match run.computed {
        Some(counts) => (counts, false),
        None => (
            run.provisional.unwrap_or_default(),
            run.provisional_score.is_some(),
        ),
    };

    Ok(HealthSummary {
        run_id: run.id,
        website: run.website.clone(),
        started_at: run.started_at.clone(),
        finished_at: run.finished_at.clone(),
        duration_seconds,
        status: run.status.to_db_string().to_string(),
        config_hash: run.config_hash.clone(),
        pages_crawled: run.pages_crawled,
        pages_discovered: run.pages_discovered,
        statistics,
        crawl: run.summary.clone(),
        counts,
        health_score: run.best_score(),
        score_is_provisional,
        issues_by_type,
        issues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{analyze_run, DetectionOptions, IssueCounts, ScoreWeights};
    use crate::extract::ExtractedPage;
    use crate::state::RunStatus;
    use crate::storage::{RunSummary, SqliteStorage};

    fn completed_run(storage: &mut SqliteStorage) -> i64 {
        let run_id = storage.create_run("https://example.com/", "hash").unwrap();
        storage.update_run_status(run_id, RunStatus::Running).unwrap();
        storage
            .insert_pages(
                run_id,
                &[
                    ExtractedPage {
                        url: "https://example.com/".to_string(),
                        status_code: 200,
                        content_type: Some("text/html".to_string()),
                        ..Default::default()
                    },
                    ExtractedPage {
                        url: "https://example.com/gone".to_string(),
                        status_code: 404,
                        ..Default::default()
                    },
                ],
            )
            .unwrap();
        storage
            .complete_run(run_id, &IssueCounts::default(), 50, &RunSummary::default())
            .unwrap();
        run_id
    }

    #[test]
    fn test_no_runs() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(
            generate_summary(&storage, None),
            Err(OutputError::NoRuns)
        ));
    }

    #[test]
    fn test_provisional_before_detection() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = completed_run(&mut storage);

        let summary = generate_summary(&storage, None).unwrap();
        assert_eq!(summary.run_id, run_id);
        assert_eq!(summary.health_score, Some(50));
        assert!(summary.score_is_provisional);
        assert_eq!(summary.statistics.total_pages, 2);
        assert!(summary.issues.is_empty());
    }

    #[test]
    fn test_detection_results_used() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = completed_run(&mut storage);
        let options = DetectionOptions {
            page_cap: 1000,
            weights: ScoreWeights::default(),
        };
        let report = analyze_run(&mut storage, run_id, &options).unwrap();

        let summary = generate_summary(&storage, Some(run_id)).unwrap();
        assert!(!summary.score_is_provisional);
        assert_eq!(summary.health_score, Some(report.health_score));
        assert_eq!(summary.counts, report.counts);
        assert_eq!(summary.issues.len(), report.issues.len());
    }
}
