//! Detection rules
//!
//! Each rule is a pure function over the whole set of page records of a run.
//! A rule that hits a malformed record returns an error and contributes
//! nothing; the other rules are unaffected.

use crate::analysis::{AnalysisError, AnalysisResult, Issue, IssueType};
use crate::extract::{ExtractedPage, PageLink, LARGE_PAGE_BYTES, SLOW_RESPONSE_MS};
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};
use url::Url;

pub const SHORT_TITLE_CHARS: usize = 30;
pub const LONG_TITLE_CHARS: usize = 60;
pub const MIN_INTERNAL_LINKS: usize = 3;
pub const MAX_IMAGE_COUNT: u32 = 50;

/// Facts about the run that rules may need beyond the records themselves
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleContext {
    /// The run stopped at the page cap, so unvisited link targets prove nothing
    pub truncated: bool,
}

pub type RuleFn = fn(&[ExtractedPage], &RuleContext) -> AnalysisResult<Vec<Issue>>;

/// All rules, by name
pub const RULES: &[(&str, RuleFn)] = &[
    ("response", response_rule),
    ("content", content_rule),
    ("duplicates", duplicate_rule),
    ("canonical", canonical_rule),
    ("mixed_content", mixed_content_rule),
    ("links", link_rule),
];

/// Pages the content rules look at: 2xx responses carrying HTML
fn content_pages(pages: &[ExtractedPage]) -> impl Iterator<Item = &ExtractedPage> {
    pages.iter().filter(|p| p.is_success() && p.is_html())
}

fn page_url(page: &ExtractedPage) -> AnalysisResult<Url> {
    Url::parse(&page.url).map_err(|e| AnalysisError::MalformedRecord {
        url: page.url.clone(),
        reason: e.to_string(),
    })
}

/// Status, timing, size and indexing checks that apply to every record
pub fn response_rule(pages: &[ExtractedPage], _ctx: &RuleContext) -> AnalysisResult<Vec<Issue>> {
    let mut issues = Vec::new();

    for page in pages {
        if page.is_error_status() {
            let description = if page.status_code == 0 {
                "The page could not be fetched".to_string()
            } else {
                format!("The page returned HTTP {}", page.status_code)
            };
            issues.push(
                Issue::new(IssueType::HttpError, &page.url, description)
                    .with_data(json!({ "status_code": page.status_code })),
            );
        }

        if page.is_redirect_loop {
            issues.push(Issue::new(
                IssueType::RedirectLoop,
                &page.url,
                "The page redirects to itself",
            ));
        } else if page.is_redirect() {
            issues.push(
                Issue::new(
                    IssueType::RedirectChain,
                    &page.url,
                    format!("The page redirects with HTTP {}", page.status_code),
                )
                .with_data(json!({
                    "status_code": page.status_code,
                    "location": page.redirect_location,
                })),
            );
        }

        if page.response_time_ms > SLOW_RESPONSE_MS {
            issues.push(
                Issue::new(
                    IssueType::SlowResponse,
                    &page.url,
                    format!("Response took {:.0} ms", page.response_time_ms),
                )
                .with_data(json!({ "response_time_ms": page.response_time_ms })),
            );
        }

        if page.page_size_bytes > LARGE_PAGE_BYTES {
            issues.push(
                Issue::new(
                    IssueType::LargePage,
                    &page.url,
                    format!("Page is {} bytes", page.page_size_bytes),
                )
                .with_data(json!({ "page_size_bytes": page.page_size_bytes })),
            );
        }

        if page.is_soft_404 {
            issues.push(Issue::new(
                IssueType::Soft404,
                &page.url,
                "The page answers 200 but looks like a not-found page",
            ));
        }

        if page.is_noindex {
            issues.push(Issue::new(
                IssueType::Noindex,
                &page.url,
                "The page asks search engines not to index it",
            ));
        }
    }

    Ok(issues)
}

/// Tag, link-count and image checks on 2xx HTML pages
pub fn content_rule(pages: &[ExtractedPage], _ctx: &RuleContext) -> AnalysisResult<Vec<Issue>> {
    let mut issues = Vec::new();

    for page in content_pages(pages) {
        match page.title.as_deref() {
            None => issues.push(Issue::new(
                IssueType::MissingTitle,
                &page.url,
                "The page has no <title>",
            )),
            Some(title) => {
                let len = title.chars().count();
                if len < SHORT_TITLE_CHARS {
                    issues.push(
                        Issue::new(
                            IssueType::ShortTitle,
                            &page.url,
                            format!("Title is {} characters", len),
                        )
                        .with_data(json!({ "title": title, "length": len })),
                    );
                } else if len > LONG_TITLE_CHARS {
                    issues.push(
                        Issue::new(
                            IssueType::LongTitle,
                            &page.url,
                            format!("Title is {} characters", len),
                        )
                        .with_data(json!({ "title": title, "length": len })),
                    );
                }
            }
        }

        if page.meta_description.is_none() {
            issues.push(Issue::new(
                IssueType::MissingMetaDescription,
                &page.url,
                "The page has no meta description",
            ));
        }

        if page.h1.is_none() {
            issues.push(Issue::new(
                IssueType::MissingH1,
                &page.url,
                "The page has no <h1>",
            ));
        }

        if page.internal_links.len() < MIN_INTERNAL_LINKS {
            issues.push(
                Issue::new(
                    IssueType::FewInternalLinks,
                    &page.url,
                    format!("Only {} internal links", page.internal_links.len()),
                )
                .with_data(json!({ "internal_links": page.internal_links.len() })),
            );
        }

        if page.images_missing_alt > 0 {
            issues.push(
                Issue::new(
                    IssueType::MissingAltText,
                    &page.url,
                    format!("{} images have no alt text", page.images_missing_alt),
                )
                .with_data(json!({ "images_missing_alt": page.images_missing_alt })),
            );
        }

        if page.image_count > MAX_IMAGE_COUNT {
            issues.push(
                Issue::new(
                    IssueType::LargeImages,
                    &page.url,
                    format!("The page loads {} images", page.image_count),
                )
                .with_data(json!({ "image_count": page.image_count })),
            );
        }
    }

    Ok(issues)
}

/// Titles and meta descriptions shared by two or more 2xx HTML pages
pub fn duplicate_rule(pages: &[ExtractedPage], _ctx: &RuleContext) -> AnalysisResult<Vec<Issue>> {
    let mut issues = Vec::new();

    let mut titles: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut descriptions: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for page in content_pages(pages) {
        if let Some(title) = page.title.as_deref().filter(|t| !t.is_empty()) {
            titles.entry(title).or_default().push(&page.url);
        }
        if let Some(desc) = page.meta_description.as_deref().filter(|d| !d.is_empty()) {
            descriptions.entry(desc).or_default().push(&page.url);
        }
    }

    for (title, urls) in titles.iter().filter(|(_, urls)| urls.len() > 1) {
        for url in urls {
            issues.push(
                Issue::new(
                    IssueType::DuplicateTitle,
                    *url,
                    format!("Title shared with {} other pages", urls.len() - 1),
                )
                .with_data(json!({ "title": title, "urls": urls })),
            );
        }
    }

    for (description, urls) in descriptions.iter().filter(|(_, urls)| urls.len() > 1) {
        for url in urls {
            issues.push(
                Issue::new(
                    IssueType::DuplicateMetaDescription,
                    *url,
                    format!("Meta description shared with {} other pages", urls.len() - 1),
                )
                .with_data(json!({ "meta_description": description, "urls": urls })),
            );
        }
    }

    Ok(issues)
}

/// Canonical URLs that do not parse or point to another host
pub fn canonical_rule(pages: &[ExtractedPage], _ctx: &RuleContext) -> AnalysisResult<Vec<Issue>> {
    let mut issues = Vec::new();

    for page in content_pages(pages) {
        let Some(canonical) = page.canonical_url.as_deref() else {
            continue;
        };
        let host = page_url(page)?.host_str().map(|h| h.to_ascii_lowercase());

        let reason = match Url::parse(canonical) {
            Err(e) => Some(format!("Canonical URL {} does not parse: {}", canonical, e)),
            Ok(target) if target.host_str().map(|h| h.to_ascii_lowercase()) != host => {
                Some(format!("Canonical URL {} points to another host", canonical))
            }
            Ok(_) => None,
        };

        if let Some(description) = reason {
            issues.push(
                Issue::new(IssueType::InvalidCanonical, &page.url, description)
                    .with_data(json!({ "canonical_url": canonical })),
            );
        }
    }

    Ok(issues)
}

/// https pages that pull resources over plain http
pub fn mixed_content_rule(
    pages: &[ExtractedPage],
    _ctx: &RuleContext,
) -> AnalysisResult<Vec<Issue>> {
    let mut issues = Vec::new();

    for page in content_pages(pages).filter(|p| p.insecure_resource_count > 0) {
        if page_url(page)?.scheme() != "https" {
            continue;
        }
        issues.push(
            Issue::new(
                IssueType::MixedContent,
                &page.url,
                format!(
                    "{} resources are loaded over http://",
                    page.insecure_resource_count
                ),
            )
            .with_data(json!({ "insecure_resource_count": page.insecure_resource_count })),
        );
    }

    Ok(issues)
}

/// Broken internal links and linked targets that were never crawled
///
/// A target missing from the records only counts when the run was not cut
/// short by the page cap.
pub fn link_rule(pages: &[ExtractedPage], ctx: &RuleContext) -> AnalysisResult<Vec<Issue>> {
    let statuses: HashMap<&str, u16> = pages
        .iter()
        .map(|p| (p.url.as_str(), p.status_code))
        .collect();

    let mut issues = Vec::new();
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut never_crawled: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for source in pages {
        for link in &source.internal_links {
            if !seen.insert((source.url.as_str(), link.url.as_str())) {
                continue;
            }

            match statuses.get(link.url.as_str()) {
                Some(&status) if status == 0 || status >= 400 => {
                    issues.push(broken_link(source, link, Some(status)));
                }
                Some(_) => {}
                None if !ctx.truncated => {
                    issues.push(broken_link(source, link, None));
                    never_crawled
                        .entry(link.url.as_str())
                        .or_default()
                        .push(&source.url);
                }
                None => {}
            }
        }
    }

    for (target, sources) in never_crawled {
        issues.push(
            Issue::new(
                IssueType::OrphanedPage,
                target,
                format!("Linked from {} pages but never crawled", sources.len()),
            )
            .with_data(json!({ "linked_from": sources })),
        );
    }

    Ok(issues)
}

fn broken_link(source: &ExtractedPage, link: &PageLink, status: Option<u16>) -> Issue {
    let description = match status {
        Some(0) => format!("Link to {} failed to load", link.url),
        Some(code) => format!("Link to {} returns HTTP {}", link.url, code),
        None => format!("Link to {} was never crawled", link.url),
    };

    Issue::new(IssueType::BrokenInternalLink, &source.url, description).with_data(json!({
        "target": link.url,
        "status_code": status,
        "anchor_text": link.anchor_text,
    }))
}
