//! Reference crawl engine
//!
//! Breadth-first crawl of one site's internal URLs, driving a
//! `CrawlObserver`. Politeness: robots.txt gate, a fixed delay between
//! requests (robots `Crawl-delay` wins when larger), one request at a time.

use crate::config::Config;
use crate::crawler::sitemap::fetch_sitemap_urls;
use crate::crawler::{build_http_client, fetch_page, CrawlObserver};
use crate::extract::{extract_internal_links, FetchedResponse, PageLink};
use crate::robots::{fetch_robots, RobotsRules};
use crate::url::{is_internal, parse_http_url, resolve_href};
use crate::{PulseError, Result};
use reqwest::Client;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use url::Url;

/// Engine behavior
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub request_delay: Duration,
    pub respect_robots: bool,
    pub use_sitemap: bool,
    /// Only follow URLs on exactly the base URL's host
    pub internal_only: bool,
    /// Bytes of each response body kept in memory
    pub max_body_bytes: usize,
}

/// Seeds and rules resolved before the first page is fetched
#[derive(Debug, Clone)]
pub struct CrawlPlan {
    /// Base URL first, then sitemap entries
    pub seeds: Vec<String>,
    pub sitemap_urls: u32,
    pub robots: RobotsRules,
}

impl CrawlPlan {
    /// Discovery strategy label stored in the run summary
    pub fn strategy(&self) -> &'static str {
        if self.sitemap_urls > 0 {
            "sitemap+links"
        } else {
            "links"
        }
    }
}

/// What the engine did, for logging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub fetched: u32,
    pub failed: u32,
    pub robots_skipped: u32,
}

#[derive(Debug)]
struct QueuedUrl {
    url: String,
    referrer: Option<String>,
    anchor_text: Option<String>,
}

pub struct CrawlEngine {
    client: Client,
    base: Url,
    agent: String,
    options: EngineOptions,
}

impl CrawlEngine {
    pub fn new(client: Client, base: Url, agent: &str, options: EngineOptions) -> Self {
        Self {
            client,
            base,
            agent: agent.to_string(),
            options,
        }
    }

    /// Builds the engine and its HTTP client from the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let base = parse_http_url(&config.site.url)?;
        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.crawler.request_timeout_secs),
        )?;

        Ok(Self::new(
            client,
            base,
            &config.user_agent.crawler_name,
            EngineOptions {
                request_delay: Duration::from_millis(config.crawler.request_delay_ms),
                respect_robots: config.crawler.respect_robots,
                use_sitemap: config.crawler.use_sitemap,
                internal_only: true,
                max_body_bytes: config.crawler.max_body_bytes,
            },
        ))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Loads robots.txt and the sitemap
    ///
    /// Fails when robots.txt disallows the base URL itself.
    pub async fn prepare(&self) -> Result<CrawlPlan> {
        let robots = if self.options.respect_robots {
            fetch_robots(&self.client, &self.base, &self.agent).await
        } else {
            RobotsRules::allow_all(&self.agent)
        };

        let seed = self.base.to_string();
        if !robots.is_allowed(&seed) {
            return Err(PulseError::RobotsDenied { url: seed });
        }

        let mut seeds = vec![seed];
        let mut sitemap_urls = 0;
        if self.options.use_sitemap {
            for url in fetch_sitemap_urls(&self.client, &self.base).await {
                sitemap_urls += 1;
                if !seeds.contains(&url) {
                    seeds.push(url);
                }
            }
        }

        Ok(CrawlPlan {
            seeds,
            sitemap_urls,
            robots,
        })
    }

    /// Crawls until the queue empties or the observer says stop
    ///
    /// A transport failure on the base URL is fatal; on any other URL it is
    /// handed to the observer.
    pub async fn run<O: CrawlObserver + ?Sized>(
        &self,
        plan: CrawlPlan,
        observer: &mut O,
    ) -> Result<EngineStats> {
        let seed = self.base.to_string();
        let delay = plan
            .robots
            .crawl_delay()
            .map_or(self.options.request_delay, |d| d.max(self.options.request_delay));

        let mut seen: HashSet<String> = plan.seeds.iter().cloned().collect();
        let mut queue: VecDeque<QueuedUrl> = plan
            .seeds
            .into_iter()
            .map(|url| QueuedUrl {
                url,
                referrer: None,
                anchor_text: None,
            })
            .collect();

        let mut stats = EngineStats::default();
        let mut first = true;

        while let Some(item) = queue.pop_front() {
            if !observer.should_continue() {
                tracing::debug!("Observer stopped the crawl with {} URLs queued", queue.len() + 1);
                break;
            }

            if self.options.respect_robots && !plan.robots.is_allowed(&item.url) {
                tracing::debug!("Skipping {} (disallowed by robots.txt)", item.url);
                stats.robots_skipped += 1;
                continue;
            }

            if !first && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            first = false;

            observer.will_crawl(&item.url, item.anchor_text.as_deref());

            match fetch_page(&self.client, &item.url, self.options.max_body_bytes).await {
                Ok(response) => {
                    stats.fetched += 1;
                    for link in self.discover(&item.url, &response) {
                        if seen.insert(link.url.clone()) {
                            queue.push_back(QueuedUrl {
                                url: link.url,
                                referrer: Some(item.url.clone()),
                                anchor_text: link.anchor_text,
                            });
                        }
                    }
                    observer.crawled(
                        &item.url,
                        &response,
                        item.referrer.as_deref(),
                        item.anchor_text.as_deref(),
                    );
                }
                Err(error) => {
                    stats.failed += 1;
                    observer.crawl_failed(
                        &item.url,
                        &error,
                        item.referrer.as_deref(),
                        item.anchor_text.as_deref(),
                    );
                    if item.url == seed {
                        return Err(PulseError::SeedUnreachable {
                            url: item.url,
                            message: error.message,
                        });
                    }
                }
            }
        }

        observer.finished_crawling();
        tracing::debug!(
            "Engine done: {} fetched, {} failed, {} skipped by robots.txt",
            stats.fetched,
            stats.failed,
            stats.robots_skipped
        );
        Ok(stats)
    }

    /// URLs to enqueue from one response: the redirect target and page links
    fn discover(&self, url: &str, response: &FetchedResponse) -> Vec<PageLink> {
        let Ok(page_url) = Url::parse(url) else {
            return Vec::new();
        };
        let mut links = Vec::new();

        if (300..400).contains(&response.status) {
            if let Some(target) = response
                .headers
                .location
                .as_deref()
                .and_then(|loc| resolve_href(loc, &page_url))
            {
                links.push(PageLink {
                    url: target.to_string(),
                    anchor_text: None,
                });
            }
        }

        let is_html = response
            .headers
            .content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("html"))
            .unwrap_or(true);
        if is_html && !response.body.is_empty() {
            let body = String::from_utf8_lossy(&response.body);
            links.extend(extract_internal_links(&body, &page_url));
        }

        if self.options.internal_only {
            links.retain(|link| {
                Url::parse(&link.url)
                    .map(|u| is_internal(&self.base, &u))
                    .unwrap_or(false)
            });
        }
        links
    }
}
