//! In-memory implementation of the `MessageRepository` port.
//!
//! Provides a simple, thread-safe repository for unit and integration
//! tests without a database. Applies the same retention policy as the
//! SQLite adapter so the scenarios in §8 of the design behave identically
//! under either backend.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use mockable::{Clock, DefaultClock};

use crate::message::{
    domain::{Message, MessageId},
    error::RepositoryError,
    ports::repository::{MessageFilter, MessageRepository, RepositoryResult, SearchFilter, WaitFilter},
};
use crate::retention::RetentionPolicy;
use crate::session;

/// Thread-safe, retention-aware in-memory [`MessageRepository`].
#[derive(Clone)]
pub struct InMemoryMessageRepository {
    messages: Arc<RwLock<Vec<Message>>>,
    retention: RetentionPolicy,
}

impl InMemoryMessageRepository {
    /// Creates an empty repository governed by `retention`.
    #[must_use]
    pub fn new(retention: RetentionPolicy) -> Self {
        Self {
            messages: Arc::new(RwLock::new(Vec::new())),
            retention,
        }
    }

    fn sweep(&self) {
        let now = DefaultClock.utc();
        let mut guard = self.messages.write().unwrap_or_else(|poison| poison.into_inner());
        let min_length = self.retention.min_length;
        let max_age = self.retention.max_age;
        let grace = self.retention.grace;
        let legacy = self.retention.legacy_lossy;

        let grace = chrono::Duration::from_std(grace).unwrap_or(chrono::Duration::zero());
        let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::zero());
        guard.retain(|m| {
            let age = now.signed_duration_since(m.timestamp);
            let too_short = m.content.len() < min_length;
            let past_grace = legacy || age > grace;
            let too_old = age > max_age;
            !(too_short && past_grace) && !too_old
        });

        // Keep only the newest of each (content, sender) duplicate pair.
        let mut seen = std::collections::HashSet::new();
        let mut kept: Vec<Message> = Vec::with_capacity(guard.len());
        for message in guard.iter().rev().cloned() {
            let key = (message.sender.clone(), message.content.clone());
            if seen.insert(key) {
                kept.push(message);
            }
        }
        kept.reverse();
        *guard = kept;
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn insert(&self, message: &Message) -> RepositoryResult<()> {
        let mut guard = self.messages.write().unwrap_or_else(|poison| poison.into_inner());
        if guard.iter().any(|m| m.id == message.id) {
            return Err(RepositoryError::DuplicateMessage(message.id));
        }
        guard.push(message.clone());
        Ok(())
    }

    async fn insert_batch(&self, batch: &[Message]) -> RepositoryResult<()> {
        let mut guard = self.messages.write().unwrap_or_else(|poison| poison.into_inner());
        let mut seen = std::collections::HashSet::with_capacity(batch.len());
        for message in batch {
            if guard.iter().any(|m| m.id == message.id) || !seen.insert(message.id) {
                return Err(RepositoryError::DuplicateMessage(message.id));
            }
        }
        guard.extend(batch.iter().cloned());
        Ok(())
    }

    async fn read(&self, filter: &MessageFilter) -> RepositoryResult<Vec<Message>> {
        self.sweep();
        let guard = self.messages.read().unwrap_or_else(|poison| poison.into_inner());
        let mut matching: Vec<Message> = guard
            .iter()
            .filter(|m| !filter.unread_only || !m.read)
            .filter(|m| filter.sender.as_deref().is_none_or(|s| s == m.sender))
            .filter(|m| {
                filter.session.as_ref().is_none_or(|tag| {
                    m.session.as_ref() == Some(tag) || session::content_matches_tag(&m.content, tag)
                })
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = filter.limit {
            matching.truncate(limit as usize);
        }
        Ok(matching)
    }

    async fn mark_read(&self, ids: &[MessageId]) -> RepositoryResult<u64> {
        let mut guard = self.messages.write().unwrap_or_else(|poison| poison.into_inner());
        let mut count = 0u64;
        for message in guard.iter_mut() {
            if ids.contains(&message.id) && !message.read {
                message.read = true;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn search(&self, filter: &SearchFilter) -> RepositoryResult<Vec<Message>> {
        let guard = self.messages.read().unwrap_or_else(|poison| poison.into_inner());
        let mut matching: Vec<Message> = guard
            .iter()
            .filter(|m| m.content.contains(&filter.keyword))
            .filter(|m| filter.sender.as_deref().is_none_or(|s| s == m.sender))
            .filter(|m| filter.start.is_none_or(|start| m.timestamp >= start))
            .filter(|m| filter.end.is_none_or(|end| m.timestamp < end))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = filter.limit {
            matching.truncate(limit as usize);
        }
        Ok(matching)
    }

    async fn poll_candidate(&self, waiter: &WaitFilter) -> RepositoryResult<Option<Message>> {
        let guard = self.messages.read().unwrap_or_else(|poison| poison.into_inner());
        let mut candidates: Vec<&Message> = guard
            .iter()
            .filter(|m| !m.read)
            .filter(|m| m.sender != waiter.client_id)
            .filter(|m| waiter.last_seen.is_none_or(|last_seen| m.timestamp > last_seen))
            .filter(|m| !waiter.exclude_ids.contains(&m.id))
            .filter(|m| {
                waiter.session.as_ref().is_none_or(|tag| {
                    m.session.as_ref() == Some(tag) || session::content_matches_tag(&m.content, tag)
                })
            })
            .collect();
        candidates.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(candidates.first().map(|m| (*m).clone()))
    }
}
