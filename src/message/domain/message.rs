//! The Message aggregate: a single row exchanged between agents.

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

use super::{MessageId, Priority};
use crate::session::SessionTag;

/// A message sent by one agent, optionally addressed to a session.
///
/// Messages are immutable after creation; the only mutation the service
/// layer performs afterwards is flipping `read` via `mark_read`, or
/// deleting the row outright via retention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier.
    pub id: MessageId,
    /// Agent identity that sent this message.
    pub sender: String,
    /// Payload text, already stripped of any legacy session prefix.
    pub content: String,
    /// Insertion time.
    pub timestamp: DateTime<Utc>,
    /// Whether the recipient has acknowledged this message via `mark_read`.
    pub read: bool,
    /// Optional reference to a causally-prior message. Not enforced as a
    /// foreign key; may dangle after retention deletes its target.
    pub reply_to: Option<MessageId>,
    /// Priority level.
    pub priority: Priority,
    /// Opaque metadata blob, serialised as-is.
    pub metadata: Option<serde_json::Value>,
    /// The session this message belongs to, if any.
    pub session: Option<SessionTag>,
}

impl Message {
    /// Constructs a new, unread message with a fresh identifier and the
    /// current timestamp.
    #[must_use]
    pub fn new(
        sender: impl Into<String>,
        content: impl Into<String>,
        priority: Priority,
        reply_to: Option<MessageId>,
        session: Option<SessionTag>,
        metadata: Option<serde_json::Value>,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id: MessageId::new(),
            sender: sender.into(),
            content: content.into(),
            timestamp: clock.utc(),
            read: false,
            reply_to,
            priority,
            metadata,
            session,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockable::DefaultClock;

    #[test]
    fn new_message_is_unread_and_stamped_with_now() {
        let clock = DefaultClock;
        let message = Message::new("alice", "hello", Priority::Normal, None, None, None, &clock);
        assert!(!message.read);
        assert_eq!(message.sender, "alice");
        assert_eq!(message.content, "hello");
    }
}
