//! HTML parser for SEO tags, links and resource counts

use crate::extract::PageLink;
use crate::url::{is_internal, resolve_canonical, resolve_href};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("title selector is valid"));
static META_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[name]").expect("meta selector is valid"));
static H1_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1").expect("h1 selector is valid"));
static CANONICAL_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("link[rel~='canonical'][href]").expect("canonical selector is valid")
});
static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector is valid"));
static IMG_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("img selector is valid"));
static STYLESHEET_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("link[rel~='stylesheet']").expect("stylesheet selector is valid")
});
static SCRIPT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script[src]").expect("script selector is valid"));

/// Fields read from one HTML document
#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub h1: Option<String>,
    pub canonical_url: Option<String>,
    pub internal_links: Vec<PageLink>,
    pub external_links: Vec<PageLink>,
    pub image_count: u32,
    pub stylesheet_count: u32,
    pub script_count: u32,
    pub images_missing_alt: u32,
    pub insecure_resource_count: u32,
    /// `<meta name="robots">` contains noindex
    pub meta_noindex: bool,
}

/// Parses HTML content relative to the page it was fetched from
///
/// Links are deduplicated by first occurrence, so the anchor text kept is the
/// first one seen for each URL. Internal means exactly the page's host.
///
/// # Example
///
/// ```
/// use site_pulse::extract::parse_document;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let page = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_document(html, &page);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.internal_links[0].url, "https://example.com/page");
/// ```
pub fn parse_document(html: &str, page_url: &Url) -> ParsedDocument {
    let document = Html::parse_document(html);

    let (internal_links, external_links) = extract_links(&document, page_url);
    let (image_count, images_missing_alt) = count_images(&document);

    ParsedDocument {
        title: first_text(&document, &TITLE_SELECTOR),
        meta_description: meta_content(&document, "description"),
        h1: first_text(&document, &H1_SELECTOR),
        canonical_url: document
            .select(&CANONICAL_SELECTOR)
            .next()
            .and_then(|el| el.value().attr("href"))
            .and_then(|href| resolve_canonical(href, page_url)),
        internal_links,
        external_links,
        image_count,
        stylesheet_count: document.select(&STYLESHEET_SELECTOR).count() as u32,
        script_count: document.select(&SCRIPT_SELECTOR).count() as u32,
        images_missing_alt,
        insecure_resource_count: count_insecure_resources(&document),
        meta_noindex: meta_content(&document, "robots")
            .map(|c| c.to_ascii_lowercase().contains("noindex"))
            .unwrap_or(false),
    }
}

/// Internal links of a page, in document order
///
/// Used by the crawl engine for URL discovery.
pub fn extract_internal_links(html: &str, page_url: &Url) -> Vec<PageLink> {
    let document = Html::parse_document(html);
    extract_links(&document, page_url).0
}

/// Collapsed, trimmed text of the first element matching `selector`
fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document.select(selector).next().and_then(element_text)
}

fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = element
        .text()
        .flat_map(|t| t.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ");

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// `content` of the first `<meta name=...>` whose name matches case-insensitively
fn meta_content(document: &Html, name: &str) -> Option<String> {
    document
        .select(&META_SELECTOR)
        .find(|el| {
            el.value()
                .attr("name")
                .map(|n| n.trim().eq_ignore_ascii_case(name))
                .unwrap_or(false)
        })
        .and_then(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

fn extract_links(document: &Html, page_url: &Url) -> (Vec<PageLink>, Vec<PageLink>) {
    let mut seen = HashSet::new();
    let mut internal = Vec::new();
    let mut external = Vec::new();

    for element in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(resolved) = resolve_href(href, page_url) else {
            continue;
        };
        if !seen.insert(resolved.to_string()) {
            continue;
        }

        let link = PageLink {
            url: resolved.to_string(),
            anchor_text: element_text(element),
        };

        if is_internal(page_url, &resolved) {
            internal.push(link);
        } else {
            external.push(link);
        }
    }

    (internal, external)
}

/// Returns (total images, images without a non-empty alt)
fn count_images(document: &Html) -> (u32, u32) {
    let mut total = 0;
    let mut missing_alt = 0;

    for img in document.select(&IMG_SELECTOR) {
        total += 1;
        let has_alt = img
            .value()
            .attr("alt")
            .map(|alt| !alt.trim().is_empty())
            .unwrap_or(false);
        if !has_alt {
            missing_alt += 1;
        }
    }

    (total, missing_alt)
}

fn count_insecure_resources(document: &Html) -> u32 {
    let is_insecure = |value: Option<&str>| {
        value
            .map(|v| v.trim().to_ascii_lowercase().starts_with("http://"))
            .unwrap_or(false)
    };

    let images = document
        .select(&IMG_SELECTOR)
        .filter(|el| is_insecure(el.value().attr("src")))
        .count();
    let scripts = document
        .select(&SCRIPT_SELECTOR)
        .filter(|el| is_insecure(el.value().attr("src")))
        .count();
    let stylesheets = document
        .select(&STYLESHEET_SELECTOR)
        .filter(|el| is_insecure(el.value().attr("href")))
        .count();

    (images + scripts + stylesheets) as u32
}
