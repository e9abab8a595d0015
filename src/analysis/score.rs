//! Health score formulas

use crate::analysis::{IssueCounts, Severity};
use crate::extract::AnnotationKind;

pub const ERROR_WEIGHT: f64 = 10.0;
pub const WARNING_WEIGHT: f64 = 3.0;
pub const NOTICE_WEIGHT: f64 = 1.0;

/// Penalty per issue of each severity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub error: f64,
    pub warning: f64,
    pub notice: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            error: ERROR_WEIGHT,
            warning: WARNING_WEIGHT,
            notice: NOTICE_WEIGHT,
        }
    }
}

/// Computed health score in 0..=100
///
/// The weighted issue total is normalized by the number of analyzed pages, so
/// a large site is not punished for its size alone. A run with no pages
/// scores 0.
pub fn health_score(counts: &IssueCounts, pages: usize, weights: &ScoreWeights) -> u8 {
    if pages == 0 {
        return 0;
    }
    let weighted = counts.errors as f64 * weights.error
        + counts.warnings as f64 * weights.warning
        + counts.notices as f64 * weights.notice;
    let penalty = weighted / pages as f64;

    (100.0 - penalty).max(0.0).round().min(100.0) as u8
}

/// Score written when the crawl finishes, before detection runs
///
/// Share of recorded pages that did not error, as a percentage. 0 when
/// nothing was recorded.
pub fn provisional_score(total: u32, error_pages: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let ok = total.saturating_sub(error_pages) as f64;
    (ok / total as f64 * 100.0).round() as u8
}

/// Severity used to tally fetch-time annotations into provisional counts
pub fn annotation_severity(kind: AnnotationKind) -> Severity {
    match kind {
        AnnotationKind::HttpError
        | AnnotationKind::MissingTitle
        | AnnotationKind::CrawlError
        | AnnotationKind::CrawlFailed => Severity::Error,
        AnnotationKind::MissingMetaDescription
        | AnnotationKind::MissingH1
        | AnnotationKind::SlowResponse
        | AnnotationKind::LargePage => Severity::Warning,
        AnnotationKind::Noindex => Severity::Notice,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provisional_score() {
        assert_eq!(provisional_score(100, 15), 85);
        assert_eq!(provisional_score(3, 1), 67);
        assert_eq!(provisional_score(0, 0), 0);
        assert_eq!(provisional_score(10, 0), 100);
    }

    #[test]
    fn test_health_score_clean_site() {
        let counts = IssueCounts::default();
        assert_eq!(health_score(&counts, 10, &ScoreWeights::default()), 100);
    }

    #[test]
    fn test_health_score_normalized_by_pages() {
        // 2 errors, 3 warnings, 5 notices over 2 pages: (20 + 9 + 5) / 2 = 17
        let counts = IssueCounts { errors: 2, warnings: 3, notices: 5 };
        assert_eq!(health_score(&counts, 2, &ScoreWeights::default()), 83);
    }

    #[test]
    fn test_health_score_floors_at_zero() {
        let counts = IssueCounts { errors: 50, warnings: 0, notices: 0 };
        assert_eq!(health_score(&counts, 1, &ScoreWeights::default()), 0);
    }

    #[test]
    fn test_health_score_zero_pages() {
        let weights = ScoreWeights::default();
        assert_eq!(health_score(&IssueCounts::default(), 0, &weights), 0);
        let counts = IssueCounts { errors: 0, warnings: 1, notices: 0 };
        assert_eq!(health_score(&counts, 0, &weights), 0);
    }

    #[test]
    fn test_custom_weights() {
        let weights = ScoreWeights { error: 20.0, warning: 0.0, notice: 0.0 };
        let counts = IssueCounts { errors: 1, warnings: 10, notices: 10 };
        assert_eq!(health_score(&counts, 1, &weights), 80);
    }
}
