//! Domain error types for the message service and its repository port.

use std::sync::Arc;
use thiserror::Error;

use super::domain::MessageId;

/// Errors returned when a caller-supplied message fails validation before
/// it ever reaches a repository.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    /// `content` was empty after trimming.
    #[error("message content must not be empty")]
    EmptyContent,

    /// `priority` was not one of the allowed values.
    #[error("invalid priority '{0}'; expected normal, high, or urgent")]
    InvalidPriority(String),

    /// A keyword passed to `search` was empty.
    #[error("search keyword must not be empty")]
    EmptyKeyword,
}

/// Errors surfaced by a [`super::ports::repository::MessageRepository`]
/// implementation.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A message with this identifier already exists.
    #[error("duplicate message: {0}")]
    DuplicateMessage(MessageId),

    /// The underlying store failed.
    #[error("storage error: {0}")]
    Storage(Arc<dyn std::error::Error + Send + Sync>),
}

impl RepositoryError {
    /// Wraps any error type as a storage failure.
    #[must_use]
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Arc::new(err))
    }
}
