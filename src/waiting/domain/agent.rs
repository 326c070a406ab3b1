//! Waiting-agent registry record.

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

use super::AgentStatus;
use crate::task::domain::TaskId;

/// A record of one agent's registration with the waiting registry.
///
/// Invariants: at most one record per `agent_id` (the repository enforces
/// upsert semantics); `heartbeat` is non-decreasing across successive
/// updates for the same `agent_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitingAgent {
    /// Unique agent identity; the primary key.
    pub agent_id: String,
    /// Free-form category, derived from `agent_id` if not supplied.
    pub agent_type: String,
    /// Opaque capability descriptor.
    pub capabilities: Option<serde_json::Value>,
    /// Self-reported activity status.
    pub status: AgentStatus,
    /// The task this agent is currently associated with, if any.
    pub current_task_id: Option<TaskId>,
    /// When this agent entered its current wait.
    pub waiting_since: DateTime<Utc>,
    /// Timestamp of the most recent heartbeat.
    pub heartbeat: DateTime<Utc>,
    /// Whether the agent is believed to still be connected.
    pub is_online: bool,
    /// When this agent was last marked offline, if ever.
    pub last_disconnect: Option<DateTime<Utc>>,
}

impl WaitingAgent {
    /// Creates a fresh registration, online, with `waiting_since` and
    /// `heartbeat` both stamped to `clock`'s current time.
    #[must_use]
    pub fn new(
        agent_id: impl Into<String>,
        agent_type: impl Into<String>,
        capabilities: Option<serde_json::Value>,
        status: AgentStatus,
        current_task_id: Option<TaskId>,
        clock: &impl Clock,
    ) -> Self {
        let now = clock.utc();
        Self {
            agent_id: agent_id.into(),
            agent_type: agent_type.into(),
            capabilities,
            status,
            current_task_id,
            waiting_since: now,
            heartbeat: now,
            is_online: true,
            last_disconnect: None,
        }
    }

    /// Derives an `agent_type` from `client_id` by taking its leading
    /// lower-case/hyphen run (e.g. `"qwen3"` -> `"qwen"`).
    #[must_use]
    pub fn derive_agent_type(client_id: &str) -> String {
        let derived: String = client_id
            .chars()
            .take_while(|c| c.is_ascii_lowercase() || *c == '-')
            .collect();
        if derived.is_empty() {
            client_id.to_owned()
        } else {
            derived
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("qwen3", "qwen")]
    #[case("claude-code-7", "claude-code-")]
    #[case("BOB", "BOB")]
    fn derives_agent_type_from_leading_lowercase_run(#[case] client_id: &str, #[case] expected: &str) {
        assert_eq!(WaitingAgent::derive_agent_type(client_id), expected);
    }
}
