//! The message service: send, read, mark-read, search, send-batch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;

use crate::message::{
    domain::{Message, MessageId, Priority},
    error::{RepositoryError, ValidationError},
    ports::repository::{MessageFilter, MessageRepository, SearchFilter},
};
use crate::session::SessionTag;

/// Orchestrates message persistence: validates input, delegates to the
/// repository port, and decodes/encodes session tags at the boundary.
pub struct MessageService<C: Clock> {
    repository: Arc<dyn MessageRepository>,
    clock: C,
}

/// Outcome of [`MessageService::send`].
#[derive(Debug, Clone)]
pub struct SendOutcome {
    /// Identifier of the newly-created message.
    pub id: MessageId,
    /// Insertion timestamp.
    pub timestamp: DateTime<Utc>,
    /// The session the message was filed under, synthesised if unset.
    pub session: SessionTag,
}

impl<C: Clock> MessageService<C> {
    /// Wraps `repository`, using `clock` for all timestamps this service
    /// stamps onto new messages.
    pub fn new(repository: Arc<dyn MessageRepository>, clock: C) -> Self {
        Self { repository, clock }
    }

    /// Validates and persists a new message.
    ///
    /// If `session` is unset, a fresh tag is synthesised so the sender can
    /// address follow-up replies to this exact instance.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyContent`] for empty content, or
    /// propagates a repository error.
    pub async fn send(
        &self,
        sender: impl Into<String>,
        content: impl Into<String>,
        priority: Priority,
        reply_to: Option<MessageId>,
        session: Option<SessionTag>,
        metadata: Option<serde_json::Value>,
    ) -> Result<SendOutcome, SendError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(SendError::Validation(ValidationError::EmptyContent));
        }
        let session = session.unwrap_or_else(SessionTag::generate);
        let message = Message::new(sender, content, priority, reply_to, Some(session.clone()), metadata, &self.clock);
        let id = message.id;
        let timestamp = message.timestamp;
        self.repository.insert(&message).await?;
        Ok(SendOutcome { id, timestamp, session })
    }

    /// Persists every message in `batch` as one atomic operation on the
    /// backend; any validation failure aborts before any row is written.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyContent`] if any element is empty,
    /// or propagates a repository error.
    pub async fn send_batch(
        &self,
        batch: Vec<(String, String, Priority, Option<MessageId>, Option<SessionTag>)>,
    ) -> Result<Vec<MessageId>, SendError> {
        let mut messages = Vec::with_capacity(batch.len());
        for (sender, content, priority, reply_to, session) in batch {
            if content.trim().is_empty() {
                return Err(SendError::Validation(ValidationError::EmptyContent));
            }
            let session = session.unwrap_or_else(SessionTag::generate);
            messages.push(Message::new(sender, content, priority, reply_to, Some(session), None, &self.clock));
        }
        let ids = messages.iter().map(|message| message.id).collect();
        self.repository.insert_batch(&messages).await?;
        Ok(ids)
    }

    /// Lists messages matching `filter`. Retention runs as a side effect of
    /// the repository call, per §4.4.
    ///
    /// # Errors
    ///
    /// Propagates a repository error.
    pub async fn read(&self, filter: MessageFilter) -> Result<Vec<Message>, RepositoryError> {
        self.repository.read(&filter).await
    }

    /// Flips `read = true` for every id in `ids` that exists, returning the
    /// number actually updated.
    ///
    /// # Errors
    ///
    /// Propagates a repository error.
    pub async fn mark_read(&self, ids: &[MessageId]) -> Result<u64, RepositoryError> {
        self.repository.mark_read(ids).await
    }

    /// Substring-searches message content, honouring the optional sender
    /// and half-open time range in `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyKeyword`] for an empty keyword, or
    /// propagates a repository error.
    pub async fn search(&self, filter: SearchFilter) -> Result<Vec<Message>, SendError> {
        if filter.keyword.is_empty() {
            return Err(SendError::Validation(ValidationError::EmptyKeyword));
        }
        Ok(self.repository.search(&filter).await?)
    }
}

/// Errors from [`MessageService::send`], [`MessageService::send_batch`],
/// and [`MessageService::search`].
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The caller-supplied input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The repository failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::adapters::memory::InMemoryMessageRepository;
    use crate::retention::RetentionPolicy;
    use mockable::DefaultClock;
    use std::time::Duration;

    fn service() -> MessageService<DefaultClock> {
        let repo = InMemoryMessageRepository::new(RetentionPolicy {
            min_length: 0,
            max_age: Duration::from_secs(3_600 * 24 * 365),
            grace: Duration::from_secs(0),
            legacy_lossy: false,
        });
        MessageService::new(Arc::new(repo), DefaultClock)
    }

    #[tokio::test]
    async fn send_rejects_empty_content() {
        let service = service();
        let err = service
            .send("alice", "   ", Priority::Normal, None, None, None)
            .await
            .expect_err("empty content rejected");
        assert!(matches!(err, SendError::Validation(ValidationError::EmptyContent)));
    }

    #[tokio::test]
    async fn send_then_read_round_trips_with_a_synthesised_session() {
        let service = service();
        let outcome = service
            .send("alice", "hello", Priority::Normal, None, None, None)
            .await
            .expect("send succeeds");

        let messages = service
            .read(MessageFilter::default())
            .await
            .expect("read succeeds");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, outcome.id);
        assert_eq!(messages[0].session, Some(outcome.session));
    }

    #[tokio::test]
    async fn scenario_s1_send_receive_mark_read() {
        let service = service();
        let outcome = service
            .send("alice", "hello", Priority::Normal, None, None, None)
            .await
            .expect("send succeeds");

        let unread = service
            .read(MessageFilter {
                unread_only: true,
                sender: None,
                session: None,
                limit: Some(10),
            })
            .await
            .expect("read succeeds");
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].sender, "alice");
        assert_eq!(unread[0].content, "hello");
        assert!(!unread[0].read);

        let updated = service.mark_read(&[outcome.id]).await.expect("mark_read succeeds");
        assert_eq!(updated, 1);

        let unread_again = service
            .read(MessageFilter {
                unread_only: true,
                sender: None,
                session: None,
                limit: None,
            })
            .await
            .expect("read succeeds");
        assert!(unread_again.is_empty());
    }

    #[tokio::test]
    async fn scenario_s4_session_multiplex() {
        let service = service();
        let s1 = SessionTag::new("s1");
        let s2 = SessionTag::new("s2");
        service
            .send("alice1", "A", Priority::Normal, None, Some(s1.clone()), None)
            .await
            .expect("send succeeds");
        service
            .send("alice2", "B", Priority::Normal, None, Some(s2.clone()), None)
            .await
            .expect("send succeeds");

        let only_s1 = service
            .read(MessageFilter {
                unread_only: false,
                sender: None,
                session: Some(s1),
                limit: None,
            })
            .await
            .expect("read succeeds");
        assert_eq!(only_s1.len(), 1);
        assert_eq!(only_s1[0].content, "A");

        let only_s2 = service
            .read(MessageFilter {
                unread_only: false,
                sender: None,
                session: Some(s2),
                limit: None,
            })
            .await
            .expect("read succeeds");
        assert_eq!(only_s2.len(), 1);
        assert_eq!(only_s2[0].content, "B");

        let both = service
            .read(MessageFilter::default())
            .await
            .expect("read succeeds");
        assert_eq!(both.len(), 2);
    }

    #[tokio::test]
    async fn send_batch_persists_every_element_in_order() {
        let service = service();
        let batch = vec![
            ("alice".to_owned(), "first".to_owned(), Priority::Normal, None, None),
            ("alice".to_owned(), "second message, long enough".to_owned(), Priority::Normal, None, None),
        ];
        let ids = service.send_batch(batch).await.expect("batch succeeds");
        assert_eq!(ids.len(), 2);

        let messages = service.read(MessageFilter::default()).await.expect("read succeeds");
        assert_eq!(messages.len(), 2);
    }

    #[tokio::test]
    async fn insert_batch_is_atomic_on_a_duplicate_id() {
        let repo = InMemoryMessageRepository::new(RetentionPolicy {
            min_length: 0,
            max_age: Duration::from_secs(3_600 * 24 * 365),
            grace: Duration::from_secs(0),
            legacy_lossy: false,
        });
        let clock = DefaultClock;
        let existing = Message::new("alice", "already there", Priority::Normal, None, None, None, &clock);
        repo.insert(&existing).await.expect("insert succeeds");

        let mut colliding = Message::new("bob", "brand new content", Priority::Normal, None, None, None, &clock);
        colliding.id = existing.id;
        let unrelated = Message::new("carol", "also new content", Priority::Normal, None, None, None, &clock);

        let err = repo.insert_batch(&[unrelated, colliding]).await;
        assert!(err.is_err());

        let all = repo.read(&MessageFilter::default()).await.expect("read succeeds");
        assert_eq!(all.len(), 1, "neither batch element should have been persisted");
        assert_eq!(all[0].sender, "alice");
    }
}
