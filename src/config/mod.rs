//! Configuration module for Site-Pulse
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use site_pulse::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("site-pulse.toml")).unwrap();
//! println!("Crawler will stop after {} pages", config.crawler.page_cap);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, OutputConfig, ScoringConfig, SiteConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
