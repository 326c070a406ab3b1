//! Repository port for task persistence.

use async_trait::async_trait;

use crate::task::{
    domain::{Task, TaskId, TaskStatus},
    error::RepositoryError,
};

/// Result type for task repository operations.
pub type TaskRepositoryResult<T> = Result<T, RepositoryError>;

/// Filters applied by [`TaskRepository::list`].
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Restrict to tasks assigned to this agent.
    pub assigned_to: Option<String>,
    /// Restrict to tasks with this status.
    pub status: Option<TaskStatus>,
    /// Maximum number of rows to return.
    pub limit: Option<u32>,
}

/// Task persistence contract.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Inserts a new task.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::DuplicateTask`] if `task.id` already
    /// exists, or a storage error for any other backend failure.
    async fn insert(&self, task: &Task) -> TaskRepositoryResult<()>;

    /// Finds a task by identifier.
    ///
    /// # Errors
    ///
    /// Returns a storage error on backend failure.
    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>>;

    /// Overwrites a task row with the given snapshot, used after a service
    /// has computed the next state transition in-process.
    ///
    /// # Errors
    ///
    /// Returns a storage error on backend failure.
    async fn save(&self, task: &Task) -> TaskRepositoryResult<()>;

    /// Lists tasks matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns a storage error on backend failure.
    async fn list(&self, filter: &TaskFilter) -> TaskRepositoryResult<Vec<Task>>;

    /// Lists every task currently `running` and assigned to `agent_id`,
    /// used by the liveness sweeper.
    ///
    /// # Errors
    ///
    /// Returns a storage error on backend failure.
    async fn find_running_for_agent(&self, agent_id: &str) -> TaskRepositoryResult<Vec<Task>>;
}
