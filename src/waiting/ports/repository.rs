//! Repository port for the waiting registry.

use async_trait::async_trait;

use super::super::{domain::WaitingAgent, error::RepositoryError};

/// Result type for waiting-registry repository operations.
pub type WaitingRegistryResult<T> = Result<T, RepositoryError>;

/// Waiting-registry persistence contract.
///
/// Implementations must enforce upsert semantics on `agent_id`: [`Self::upsert`]
/// never produces two rows for the same identity.
#[async_trait]
pub trait WaitingRegistryRepository: Send + Sync {
    /// Inserts or replaces the record for `agent.agent_id`.
    ///
    /// # Errors
    ///
    /// Returns a storage error on backend failure.
    async fn upsert(&self, agent: &WaitingAgent) -> WaitingRegistryResult<()>;

    /// Fetches the record for `agent_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns a storage error on backend failure.
    async fn find(&self, agent_id: &str) -> WaitingRegistryResult<Option<WaitingAgent>>;

    /// Deletes the record for `agent_id`. Idempotent: deleting an absent
    /// record is not an error.
    ///
    /// # Errors
    ///
    /// Returns a storage error on backend failure.
    async fn remove(&self, agent_id: &str) -> WaitingRegistryResult<()>;

    /// Lists every record, optionally restricted to `agent_type`, ordered
    /// by `waiting_since` ascending (longest-waiting first).
    ///
    /// # Errors
    ///
    /// Returns a storage error on backend failure.
    async fn list(&self, agent_type: Option<&str>) -> WaitingRegistryResult<Vec<WaitingAgent>>;
}
