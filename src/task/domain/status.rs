//! Task lifecycle status and its transition rules.
//!
//! ```text
//! pending ──run──▶ running ──complete──▶ COMPLETED
//!    │               │
//!    │               └──fail/cancel──▶ FAILED
//!    └──fail/cancel──────────────────▶ FAILED
//! ```
//!
//! `Completed` and `Failed` are terminal: once reached, a further
//! `update_task` call requesting a status change is rejected as a no-op
//! rather than applied (§4.6 of the design).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A task's lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Created, not yet started.
    Pending,
    /// Actively being worked.
    Running,
    /// Terminal: finished successfully.
    Completed,
    /// Terminal: finished unsuccessfully, or cancelled, or the owning
    /// agent went offline while it was running.
    Failed,
}

impl TaskStatus {
    /// Returns the canonical lowercase name used on the wire and in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether this status is terminal: no further status transition is
    /// accepted once reached.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognised task status string.
#[derive(Debug, Clone, Error)]
#[error("invalid task status '{0}'; expected pending, running, completed, or failed")]
pub struct ParseTaskStatusError(String);

impl FromStr for TaskStatus {
    type Err = ParseTaskStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(ParseTaskStatusError(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TaskStatus::Pending, false)]
    #[case(TaskStatus::Running, false)]
    #[case(TaskStatus::Completed, true)]
    #[case(TaskStatus::Failed, true)]
    fn terminality_matches_the_state_machine(#[case] status: TaskStatus, #[case] expected: bool) {
        assert_eq!(status.is_terminal(), expected);
    }

    #[test]
    fn rejects_unknown_status() {
        assert!("cancelled".parse::<TaskStatus>().is_err());
    }
}
