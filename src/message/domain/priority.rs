//! Message priority.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A message's priority, one of three levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Ordinary traffic; the default.
    Normal,
    /// Above-normal attention.
    High,
    /// Time-sensitive; should be surfaced ahead of other unread mail.
    Urgent,
}

impl Priority {
    /// Returns the canonical lowercase name used on the wire and in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognised priority string.
#[derive(Debug, Clone, Error)]
#[error("invalid priority '{0}'; expected normal, high, or urgent")]
pub struct ParsePriorityError(String);

impl FromStr for Priority {
    type Err = ParsePriorityError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            other => Err(ParsePriorityError(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("normal", Priority::Normal)]
    #[case("high", Priority::High)]
    #[case("urgent", Priority::Urgent)]
    fn parses_known_priorities(#[case] input: &str, #[case] expected: Priority) {
        assert_eq!(input.parse::<Priority>().expect("valid priority"), expected);
    }

    #[test]
    fn rejects_unknown_priority() {
        assert!("critical".parse::<Priority>().is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        for priority in [Priority::Normal, Priority::High, Priority::Urgent] {
            let parsed: Priority = priority.to_string().parse().expect("round trip");
            assert_eq!(parsed, priority);
        }
    }
}
