//! An agent's self-reported activity status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Self-reported activity status of a waiting agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Not currently blocked on anything.
    Idle,
    /// Actively executing a task.
    Working,
    /// Blocked inside `wait_for_message`.
    Waiting,
}

impl AgentStatus {
    /// Returns the canonical lowercase name used on the wire and in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Working => "working",
            Self::Waiting => "waiting",
        }
    }
}

impl Default for AgentStatus {
    fn default() -> Self {
        Self::Idle
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognised agent status string.
#[derive(Debug, Clone, Error)]
#[error("invalid agent status '{0}'; expected idle, working, or waiting")]
pub struct ParseAgentStatusError(String);

impl FromStr for AgentStatus {
    type Err = ParseAgentStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "idle" => Ok(Self::Idle),
            "working" => Ok(Self::Working),
            "waiting" => Ok(Self::Waiting),
            other => Err(ParseAgentStatusError(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("idle", AgentStatus::Idle)]
    #[case("working", AgentStatus::Working)]
    #[case("waiting", AgentStatus::Waiting)]
    fn parses_known_statuses(#[case] input: &str, #[case] expected: AgentStatus) {
        assert_eq!(input.parse::<AgentStatus>().expect("valid status"), expected);
    }

    #[test]
    fn rejects_unknown_status() {
        assert!("sleeping".parse::<AgentStatus>().is_err());
    }
}
