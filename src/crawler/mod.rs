//! Crawler module for site health checks
//!
//! This module contains the crawl side of a health check:
//! - HTTP fetching without automatic redirects
//! - Sitemap seeding and the breadth-first reference engine
//! - The observer contract between engine and controller
//! - The controller that records a run, and the job that retries it

mod controller;
mod engine;
mod fetcher;
mod job;
mod observer;
mod sitemap;

pub use controller::{ControllerOptions, CrawlController};
pub use engine::{CrawlEngine, CrawlPlan, EngineOptions, EngineStats};
pub use fetcher::{build_http_client, fetch_page, FetchError};
pub use job::{reanalyze_run, run_health_check, HealthCheck, HealthCheckOutcome};
pub use observer::{AbortHandle, CrawlObserver};
pub use sitemap::{extract_locs, fetch_sitemap_urls};
