//! Sitemap seeding
//!
//! Reads `/sitemap.xml` (and, one level deep, the sitemaps a sitemap index
//! points to) and returns the page URLs on the site's host.

use crate::url::{is_internal, parse_http_url};
use reqwest::Client;
use std::collections::HashSet;
use url::Url;

/// Child sitemaps followed from a sitemap index
const MAX_CHILD_SITEMAPS: usize = 10;

/// All `<loc>` values of an XML document, with XML entities unescaped
pub fn extract_locs(xml: &str) -> Vec<String> {
    let mut locs = Vec::new();
    let mut rest = xml;

    while let Some(start) = rest.find("<loc>") {
        let after = &rest[start + "<loc>".len()..];
        let Some(end) = after.find("</loc>") else {
            break;
        };
        let loc = after[..end]
            .trim()
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&apos;", "'");
        if !loc.is_empty() {
            locs.push(loc);
        }
        rest = &after[end + "</loc>".len()..];
    }

    locs
}

fn is_sitemap_index(xml: &str) -> bool {
    xml.contains("<sitemapindex")
}

async fn fetch_xml(client: &Client, url: &str) -> Option<String> {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("Sitemap {} not fetched: {}", url, e);
            return None;
        }
    };
    if !response.status().is_success() {
        tracing::debug!("Sitemap {} returned HTTP {}", url, response.status().as_u16());
        return None;
    }
    response.text().await.ok()
}

/// Internal page URLs listed in the site's sitemap, in document order
///
/// Any failure yields an empty list; a missing sitemap is normal.
pub async fn fetch_sitemap_urls(client: &Client, base: &Url) -> Vec<String> {
    let Ok(sitemap_url) = base.join("/sitemap.xml") else {
        return Vec::new();
    };
    let Some(xml) = fetch_xml(client, sitemap_url.as_str()).await else {
        return Vec::new();
    };

    let mut documents = Vec::new();
    if is_sitemap_index(&xml) {
        for child in extract_locs(&xml)
            .into_iter()
            .filter_map(|loc| parse_http_url(&loc).ok())
            .filter(|loc| is_internal(base, loc))
            .take(MAX_CHILD_SITEMAPS)
        {
            if let Some(child_xml) = fetch_xml(client, child.as_str()).await {
                documents.push(child_xml);
            }
        }
    } else {
        documents.push(xml);
    }

    let mut seen = HashSet::new();
    let mut urls = Vec::new();
    for doc in &documents {
        for loc in extract_locs(doc) {
            let Ok(mut url) = parse_http_url(&loc) else {
                continue;
            };
            if !is_internal(base, &url) {
                continue;
            }
            url.set_fragment(None);
            if seen.insert(url.to_string()) {
                urls.push(url.to_string());
            }
        }
    }

    tracing::info!("Sitemap {} listed {} internal URLs", sitemap_url, urls.len());
    urls
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_extract_locs() {
        let xml = r#"<?xml version="1.0"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://example.com/</loc></url>
  <url><loc> https://example.com/search?q=a&amp;page=2 </loc></url>
</urlset>"#;
        assert_eq!(
            extract_locs(xml),
            vec![
                "https://example.com/".to_string(),
                "https://example.com/search?q=a&page=2".to_string()
            ]
        );
    }

    #[test]
    fn test_extract_locs_single_line() {
        let xml = "<urlset><url><loc>https://a.com/1</loc></url><url><loc>https://a.com/2</loc></url></urlset>";
        assert_eq!(extract_locs(xml).len(), 2);
    }

    #[test]
    fn test_extract_locs_unterminated() {
        assert!(extract_locs("<loc>https://a.com/").is_empty());
    }

    #[tokio::test]
    async fn test_fetch_sitemap_filters_external() {
        let server = MockServer::start().await;
        let xml = format!(
            "<urlset><url><loc>{0}/a</loc></url><url><loc>https://other.com/b</loc></url><url><loc>{0}/a</loc></url></urlset>",
            server.uri()
        );
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(xml))
            .mount(&server)
            .await;

        let base = Url::parse(&server.uri()).unwrap();
        let urls = fetch_sitemap_urls(&Client::new(), &base).await;
        assert_eq!(urls, vec![format!("{}/a", server.uri())]);
    }

    #[tokio::test]
    async fn test_fetch_sitemap_index() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                "<sitemapindex><sitemap><loc>{}/pages.xml</loc></sitemap></sitemapindex>",
                server.uri()
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/pages.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                "<urlset><url><loc>{}/deep</loc></url></urlset>",
                server.uri()
            )))
            .mount(&server)
            .await;

        let base = Url::parse(&server.uri()).unwrap();
        let urls = fetch_sitemap_urls(&Client::new(), &base).await;
        assert_eq!(urls, vec![format!("{}/deep", server.uri())]);
    }

    #[tokio::test]
    async fn test_missing_sitemap() {
        let server = MockServer::start().await;
        let base = Url::parse(&server.uri()).unwrap();
        assert!(fetch_sitemap_urls(&Client::new(), &base).await.is_empty());
    }
}
