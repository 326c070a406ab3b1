//! Domain error types for the task service and its repository port.

use std::sync::Arc;
use thiserror::Error;

use super::domain::TaskId;

/// Errors returned when caller-supplied task input fails validation.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    /// `title` was empty after trimming.
    #[error("task title must not be empty")]
    EmptyTitle,
}

/// Errors surfaced by a [`super::ports::repository::TaskRepository`]
/// implementation.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A task with this identifier already exists.
    #[error("duplicate task: {0}")]
    DuplicateTask(TaskId),

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
