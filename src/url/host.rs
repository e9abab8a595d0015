use url::Url;

/// Extracts the host from a URL, lowercased
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_pulse::url::extract_host;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_host(&url), Some("example.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true if `link` lives on exactly the same host as `page`
///
/// Subdomains are external: `blog.example.com` is not internal to
/// `example.com`. Ports and schemes are ignored.
pub fn is_internal(page: &Url, link: &Url) -> bool {
    match (extract_host(page), extract_host(link)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Returns `scheme://host[:port]` for a URL
pub fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}
