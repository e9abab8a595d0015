//! Robots.txt handling module
//!
//! The crawl engine fetches robots.txt once per run and consults it before
//! every request.

mod parser;

pub use parser::RobotsRules;

use reqwest::Client;
use url::Url;

/// Fetches robots.txt from the origin of `base`
///
/// A missing file (4xx) allows everything. So do server errors and network
/// failures, which are logged.
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `base` - Any URL on the site
/// * `agent` - Product token matched against `User-agent` groups
pub async fn fetch_robots(client: &Client, base: &Url, agent: &str) -> RobotsRules {
    let robots_url = match base.join("/robots.txt") {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Cannot build robots.txt URL for {}: {}", base, e);
            return RobotsRules::allow_all(agent);
        }
    };

    let response = match client.get(robots_url.as_str()).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Failed to fetch {}: {}", robots_url, e);
            return RobotsRules::allow_all(agent);
        }
    };

    let status = response.status();
    if !status.is_success() {
        if status.is_server_error() {
            tracing::warn!("{} returned HTTP {}", robots_url, status.as_u16());
        } else {
            tracing::debug!("No robots.txt at {} (HTTP {})", robots_url, status.as_u16());
        }
        return RobotsRules::allow_all(agent);
    }

    match response.text().await {
        Ok(body) => {
            tracing::debug!("Loaded robots.txt from {}", robots_url);
            RobotsRules::from_content(&body, agent)
        }
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", robots_url, e);
            RobotsRules::allow_all(agent)
        }
    }
}
