//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `RunStatus`: lifecycle of a crawl run (pending, running, completed, failed)
//! - `CrawlState`: per-run counters and accumulated links, owned by one controller

mod crawl_state;
mod run_status;

pub use crawl_state::CrawlState;
pub use run_status::RunStatus;
