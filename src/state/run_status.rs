//! Lifecycle states of a crawl run
//!
//! `pending → running → {completed | failed}`; a pending run may also fail
//! before it starts. Completed and failed are terminal.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStatus {
    /// Check requested, crawl not started
    Pending,

    /// Crawl in progress
    Running,

    /// Crawl finished; health score is meaningful
    Completed,

    /// Crawl aborted by an engine error or external cancellation
    Failed,
}

impl RunStatus {
    /// Returns true for completed and failed
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if the state machine allows moving to `to`
    pub fn can_transition_to(&self, to: RunStatus) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Failed)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }

    /// Validated transition
    pub fn transition(self, to: RunStatus) -> crate::Result<RunStatus> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(crate::PulseError::InvalidTransition { from: self, to })
        }
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn all() -> [Self; 4] {
        [Self::Pending, Self::Running, Self::Completed, Self::Failed]
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
