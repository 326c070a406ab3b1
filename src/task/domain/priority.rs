//! Task priority: four levels, ordered `urgent` highest.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A task's priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    /// Needs attention immediately.
    Urgent,
    /// Above-normal attention.
    High,
    /// Ordinary traffic; the default.
    Normal,
    /// Can wait behind everything else.
    Low,
}

impl TaskPriority {
    /// Returns the canonical lowercase name used on the wire and in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Urgent => "urgent",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        Self::Normal
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognised task priority string.
#[derive(Debug, Clone, Error)]
#[error("invalid task priority '{0}'; expected urgent, high, normal, or low")]
pub struct ParseTaskPriorityError(String);

impl FromStr for TaskPriority {
    type Err = ParseTaskPriorityError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "urgent" => Ok(Self::Urgent),
            "high" => Ok(Self::High),
            "normal" => Ok(Self::Normal),
            "low" => Ok(Self::Low),
            other => Err(ParseTaskPriorityError(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("urgent", TaskPriority::Urgent)]
    #[case("high", TaskPriority::High)]
    #[case("normal", TaskPriority::Normal)]
    #[case("low", TaskPriority::Low)]
    fn parses_known_priorities(#[case] input: &str, #[case] expected: TaskPriority) {
        assert_eq!(input.parse::<TaskPriority>().expect("valid priority"), expected);
    }

    #[test]
    fn rejects_unknown_priority() {
        assert!("critical".parse::<TaskPriority>().is_err());
    }
}
