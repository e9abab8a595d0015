//! Derived flags and per-page annotations

use crate::extract::{AnnotationKind, ExtractedPage, PageAnnotation};

/// Phrases that mark a 200 response as a soft 404
pub const SOFT_404_PHRASES: &[&str] = &[
    "page not found",
    "404 error",
    "not found",
    "page does not exist",
    "error 404",
];

/// Responses slower than this are annotated as slow
pub const SLOW_RESPONSE_MS: f64 = 1000.0;

/// Bodies larger than this are annotated as large
pub const LARGE_PAGE_BYTES: u64 = 1024 * 1024;

/// A 200 whose body or title reads like a "not found" page
pub fn is_soft_404(status: u16, body: &str, title: Option<&str>) -> bool {
    if status != 200 {
        return false;
    }

    let contains_phrase = |text: &str| {
        let lowered = text.to_lowercase();
        SOFT_404_PHRASES.iter().any(|p| lowered.contains(p))
    };

    contains_phrase(body) || title.map(contains_phrase).unwrap_or(false)
}

/// The response redirects to the URL that was requested
///
/// Only the literal same-URL case is caught; redirect chains are not walked.
pub fn is_redirect_loop(request_url: &str, location: Option<&str>) -> bool {
    location.map(|l| l == request_url).unwrap_or(false)
}

/// Truncates to at most `max_bytes`, backing off to a char boundary
pub fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }

    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Per-page annotations recorded alongside the page at fetch time
pub fn annotate(page: &ExtractedPage) -> Vec<PageAnnotation> {
    let mut annotations = Vec::new();

    if page.status_code >= 400 {
        annotations.push(PageAnnotation::new(
            AnnotationKind::HttpError,
            format!("HTTP {}", page.status_code),
        ));
    }

    // Tag checks only make sense for HTML that actually rendered
    if page.is_html() && page.is_success() {
        if page.title.is_none() {
            annotations.push(PageAnnotation::new(AnnotationKind::MissingTitle, "Missing <title>"));
        }
        if page.meta_description.is_none() {
            annotations.push(PageAnnotation::new(
                AnnotationKind::MissingMetaDescription,
                "Missing meta description",
            ));
        }
        if page.h1.is_none() {
            annotations.push(PageAnnotation::new(AnnotationKind::MissingH1, "Missing <h1>"));
        }
    }

    if page.response_time_ms > SLOW_RESPONSE_MS {
        annotations.push(PageAnnotation::new(
            AnnotationKind::SlowResponse,
            format!("Response took {:.2}ms", page.response_time_ms),
        ));
    }

    if page.page_size_bytes > LARGE_PAGE_BYTES {
        annotations.push(PageAnnotation::new(
            AnnotationKind::LargePage,
            format!("Page is {} bytes", page.page_size_bytes),
        ));
    }

    if page.is_noindex {
        annotations.push(PageAnnotation::new(AnnotationKind::Noindex, "noindex directive"));
    }

    annotations
}
