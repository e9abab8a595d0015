use crate::url::host::origin_of;
use crate::UrlError;
use url::Url;

/// Schemes that never lead to a crawlable page
const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:", "sms:", "ftp:"];

/// Parses a URL and requires an HTTP(S) scheme with a host
pub fn parse_http_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}

/// Resolves an `<a href>` value found on `page_url` to an absolute URL
///
/// Root-relative hrefs (`/about`) resolve against the page's scheme and host;
/// other relative forms resolve against the page URL itself. Fragments are
/// dropped so `/a#top` and `/a` name the same page.
///
/// Returns None if the link should be skipped:
/// - javascript:, mailto:, tel:, data: and other non-HTTP schemes
/// - fragment-only or empty hrefs
/// - hrefs that cannot be resolved
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_pulse::url::resolve_href;
///
/// let page = Url::parse("https://example.com/page").unwrap();
/// let link = resolve_href("/about", &page).unwrap();
/// assert_eq!(link.as_str(), "https://example.com/about");
/// assert!(resolve_href("mailto:a@b.com", &page).is_none());
/// ```
pub fn resolve_href(href: &str, page_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if SKIPPED_SCHEMES.iter().any(|s| lowered.starts_with(s)) {
        return None;
    }

    let resolved = if href.starts_with('/') && !href.starts_with("//") {
        Url::parse(&format!("{}{}", origin_of(page_url), href)).ok()?
    } else {
        page_url.join(href).ok()?
    };

    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }

    let mut resolved = resolved;
    resolved.set_fragment(None);
    Some(resolved)
}

/// Resolves a canonical href
///
/// Root-relative values are joined onto the page's scheme and host; any
/// other value is returned verbatim (trimmed), even if it does not parse.
/// Cross-page analysis decides whether a canonical is valid.
pub fn resolve_canonical(href: &str, page_url: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    if href.starts_with('/') && !href.starts_with("//") {
        return Some(format!("{}{}", origin_of(page_url), href));
    }

    Some(href.to_string())
}
