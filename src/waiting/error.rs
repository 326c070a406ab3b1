//! Error taxonomy for the waiting registry.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// Errors surfaced by a [`crate::waiting::ports::WaitingRegistryRepository`].
#[derive(Debug, Error, Clone)]
pub enum RepositoryError {
    /// The underlying backend failed.
    #[error("waiting registry storage error: {0}")]
    Storage(#[source] Arc<dyn StdError + Send + Sync>),
}

impl RepositoryError {
    /// Wraps an arbitrary backend error as [`RepositoryError::Storage`].
    pub fn storage(err: impl StdError + Send + Sync + 'static) -> Self {
        Self::Storage(Arc::new(err))
    }
}
