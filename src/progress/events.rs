//! Event types sent to progress subscribers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Estimated time left in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Eta {
    /// Whole seconds, rounded up
    Remaining(u64),
    AlmostDone,
}

impl fmt::Display for Eta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remaining(secs) if *secs >= 60 => write!(f, "{}m {}s", secs / 60, secs % 60),
            Self::Remaining(secs) => write!(f, "{}s", secs),
            Self::AlmostDone => write!(f, "almost done"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub run_id: i64,
    pub urls_crawled: u32,
    pub total_urls: u32,
    pub issues_found: u32,
    pub progress_percent: u8,
    pub current_url: Option<String>,
    pub eta: Eta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub run_id: i64,
    pub total_urls_crawled: u32,
    pub total_issues_found: u32,
    pub health_score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureEvent {
    pub run_id: i64,
    pub total_urls_crawled: u32,
}

/// Everything a subscriber can receive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    Progress(ProgressUpdate),
    Completed(CompletionEvent),
    Failed(FailureEvent),
}

impl ProgressEvent {
    pub fn run_id(&self) -> i64 {
        match self {
            Self::Progress(e) => e.run_id,
            Self::Completed(e) => e.run_id,
            Self::Failed(e) => e.run_id,
        }
    }

    /// Completed or failed; no further events follow for the run
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }
}
