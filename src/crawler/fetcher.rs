//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests that capture status, headers, body and timing
//! - Error classification for the failure hook

use crate::config::UserAgentConfig;
use crate::extract::{FetchedResponse, ResponseHeaders};
use reqwest::{redirect::Policy, Client};
use std::time::{Duration, Instant};
use thiserror::Error;

/// A fetch that produced no usable response
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct FetchError {
    pub message: String,
    /// HTTP status, when the failure happened after headers arrived
    pub status: Option<u16>,
}

impl FetchError {
    fn from_reqwest(e: &reqwest::Error, status: Option<u16>) -> Self {
        let message = if e.is_timeout() {
            "Request timeout".to_string()
        } else if e.is_connect() {
            "Connection refused".to_string()
        } else {
            e.to_string()
        };
        Self {
            message,
            status: status.or_else(|| e.status().map(|s| s.as_u16())),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are not followed; the engine sees every 3xx and decides what
/// to enqueue.
///
/// # Example
///
/// ```no_run
/// use site_pulse::config::UserAgentConfig;
/// use site_pulse::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "SitePulse".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10).min(timeout))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches one URL, timing the request from send to last body byte
///
/// Any HTTP status is a successful fetch; only transport failures and body
/// read errors are reported as `FetchError`.
///
/// At most `max_body_bytes` of the body are kept. The rest is read and
/// counted but dropped, and a truncated response reports the full size in
/// `headers.content_length`.
pub async fn fetch_page(
    client: &Client,
    url: &str,
    max_body_bytes: usize,
) -> Result<FetchedResponse, FetchError> {
    let started = Instant::now();

    let mut response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(&e, None))?;

    let status = response.status().as_u16();
    let mut headers = ResponseHeaders::from_header_map(response.headers());
    let mut body = Vec::new();
    let mut total: u64 = 0;

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| FetchError::from_reqwest(&e, Some(status)))?
    {
        total += chunk.len() as u64;
        let room = max_body_bytes.saturating_sub(body.len());
        body.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }

    if total > body.len() as u64 {
        tracing::debug!("Kept {} of {} body bytes from {}", body.len(), total, url);
        headers.content_length = Some(total);
    }

    Ok(FetchedResponse {
        status,
        headers,
        body,
        elapsed: started.elapsed(),
    })
}
