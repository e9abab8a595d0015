//! Page data extraction
//!
//! Turns one fetched response into the structured record stored for a page:
//! SEO tags, classified links, resource counts, timing, derived flags
//! (soft-404, redirect loop, noindex) and per-page annotations.
//!
//! Extraction is a pure function of its inputs. Malformed HTML never fails
//! it; missing or unreadable fields degrade to `None`.

mod html;
mod signals;

pub use html::{extract_internal_links, parse_document, ParsedDocument};
pub use signals::{
    annotate, is_redirect_loop, is_soft_404, truncate_utf8, LARGE_PAGE_BYTES,
    SLOW_RESPONSE_MS, SOFT_404_PHRASES,
};

use crate::url::parse_http_url;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors that prevent a page from being extracted
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid request URL {url}: {message}")]
    InvalidUrl { url: String, message: String },
}

/// The subset of response headers the extractor looks at
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    pub x_robots_tag: Option<String>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub location: Option<String>,
    pub link: Option<String>,
}

impl ResponseHeaders {
    /// Picks the interesting headers out of a full header map
    pub fn from_header_map(headers: &HeaderMap) -> Self {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        };

        Self {
            x_robots_tag: get("x-robots-tag"),
            content_type: get("content-type"),
            content_length: get("content-length").and_then(|v| v.trim().parse().ok()),
            location: get("location"),
            link: get("link"),
        }
    }
}

/// A response as handed to the observer by the crawl engine
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    /// Final HTTP status code
    pub status: u16,
    pub headers: ResponseHeaders,
    pub body: Vec<u8>,
    /// Client-side time around the fetch
    pub elapsed: Duration,
}

/// A link found on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLink {
    pub url: String,
    pub anchor_text: Option<String>,
}

/// Kinds of per-page annotations captured at fetch time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    HttpError,
    MissingTitle,
    MissingMetaDescription,
    MissingH1,
    SlowResponse,
    LargePage,
    Noindex,
    CrawlError,
    CrawlFailed,
}

/// Informational finding stored with a page record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageAnnotation {
    pub kind: AnnotationKind,
    pub message: String,
}

impl PageAnnotation {
    pub fn new(kind: AnnotationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Everything recorded about one fetched URL
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedPage {
    pub url: String,
    /// 0 when the fetch failed without a status
    pub status_code: u16,
    pub content_type: Option<String>,
    pub canonical_url: Option<String>,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub h1: Option<String>,
    pub internal_links: Vec<PageLink>,
    pub external_links: Vec<PageLink>,
    pub page_size_bytes: u64,
    pub response_time_ms: f64,
    pub image_count: u32,
    pub stylesheet_count: u32,
    pub script_count: u32,
    pub images_missing_alt: u32,
    /// Resources referenced over plain http://
    pub insecure_resource_count: u32,
    pub redirect_location: Option<String>,
    pub is_soft_404: bool,
    pub is_redirect_loop: bool,
    pub is_noindex: bool,
    pub annotations: Vec<PageAnnotation>,
    /// Body, truncated to the configured cap
    pub html: Option<String>,
}

impl ExtractedPage {
    /// True when the page carries HTML (or did not say what it carries)
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("html"))
            .unwrap_or(true)
    }

    /// Status 0 (no response) or any 4xx/5xx
    pub fn is_error_status(&self) -> bool {
        self.status_code == 0 || self.status_code >= 400
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status_code)
    }

    /// Page record for a response whose extraction failed
    pub fn degraded(url: &str, response: &FetchedResponse, message: &str) -> Self {
        Self {
            url: url.to_string(),
            status_code: response.status,
            content_type: response.headers.content_type.clone(),
            page_size_bytes: response.body.len() as u64,
            response_time_ms: round_ms(response.elapsed),
            annotations: vec![PageAnnotation::new(AnnotationKind::CrawlError, message)],
            ..Default::default()
        }
    }

    /// Page record for a fetch that never produced a usable response
    pub fn failed(url: &str, status_code: Option<u16>, message: &str) -> Self {
        Self {
            url: url.to_string(),
            status_code: status_code.unwrap_or(0),
            annotations: vec![PageAnnotation::new(AnnotationKind::CrawlFailed, message)],
            ..Default::default()
        }
    }
}

/// Milliseconds rounded to two decimals
pub fn round_ms(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0 * 100.0).round() / 100.0
}

/// Extracts the page record for one fetched URL
///
/// # Arguments
///
/// * `url` - The URL that was requested
/// * `response` - Status, headers, body and timing of the fetch
/// * `max_body_bytes` - Cap applied to the stored HTML
///
/// # Returns
///
/// * `Ok(ExtractedPage)` - Always, unless the request URL itself is unusable
/// * `Err(ExtractError)` - The request URL could not be parsed
pub fn extract_page(
    url: &str,
    response: &FetchedResponse,
    max_body_bytes: usize,
) -> Result<ExtractedPage, ExtractError> {
    let page_url = parse_http_url(url).map_err(|e| ExtractError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    let body = String::from_utf8_lossy(&response.body);
    let mut page = ExtractedPage {
        url: url.to_string(),
        status_code: response.status,
        content_type: response.headers.content_type.clone(),
        page_size_bytes: response
            .headers
            .content_length
            .unwrap_or(0)
            .max(response.body.len() as u64),
        response_time_ms: round_ms(response.elapsed),
        redirect_location: response.headers.location.clone(),
        is_redirect_loop: is_redirect_loop(url, response.headers.location.as_deref()),
        ..Default::default()
    };

    if page.is_html() && !body.is_empty() {
        let doc = parse_document(&body, &page_url);
        page.title = doc.title;
        page.meta_description = doc.meta_description;
        page.h1 = doc.h1;
        page.canonical_url = doc.canonical_url;
        page.internal_links = doc.internal_links;
        page.external_links = doc.external_links;
        page.image_count = doc.image_count;
        page.stylesheet_count = doc.stylesheet_count;
        page.script_count = doc.script_count;
        page.images_missing_alt = doc.images_missing_alt;
        page.insecure_resource_count = doc.insecure_resource_count;
        page.is_noindex = doc.meta_noindex;
        page.html = Some(truncate_utf8(&body, max_body_bytes).to_string());
    }

    page.is_noindex |= response
        .headers
        .x_robots_tag
        .as_deref()
        .map(|v| v.to_ascii_lowercase().contains("noindex"))
        .unwrap_or(false);
    page.is_soft_404 = is_soft_404(page.status_code, &body, page.title.as_deref());
    page.annotations = annotate(&page);

    Ok(page)
}
