//! In-memory implementation of the `TaskRepository` port.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::task::{
    domain::{Task, TaskId},
    error::RepositoryError,
    ports::repository::{TaskFilter, TaskRepository, TaskRepositoryResult},
};

/// Thread-safe in-memory [`TaskRepository`], suitable for tests only.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTaskRepository {
    tasks: Arc<RwLock<Vec<Task>>>,
}

impl InMemoryTaskRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn insert(&self, task: &Task) -> TaskRepositoryResult<()> {
        let mut guard = self.tasks.write().unwrap_or_else(|poison| poison.into_inner());
        if guard.iter().any(|t| t.id == task.id) {
            return Err(RepositoryError::DuplicateTask(task.id));
        }
        guard.push(task.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        let guard = self.tasks.read().unwrap_or_else(|poison| poison.into_inner());
        Ok(guard.iter().find(|t| t.id == id).cloned())
    }

    async fn save(&self, task: &Task) -> TaskRepositoryResult<()> {
        let mut guard = self.tasks.write().unwrap_or_else(|poison| poison.into_inner());
        if let Some(existing) = guard.iter_mut().find(|t| t.id == task.id) {
            *existing = task.clone();
        } else {
            guard.push(task.clone());
        }
        Ok(())
    }

    async fn list(&self, filter: &TaskFilter) -> TaskRepositoryResult<Vec<Task>> {
        let guard = self.tasks.read().unwrap_or_else(|poison| poison.into_inner());
        let mut matching: Vec<Task> = guard
            .iter()
            .filter(|t| filter.assigned_to.as_deref().is_none_or(|a| a == t.assigned_to))
            .filter(|t| filter.status.is_none_or(|s| s == t.status))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            matching.truncate(limit as usize);
        }
        Ok(matching)
    }

    async fn find_running_for_agent(&self, agent_id: &str) -> TaskRepositoryResult<Vec<Task>> {
        let guard = self.tasks.read().unwrap_or_else(|poison| poison.into_inner());
        Ok(guard
            .iter()
            .filter(|t| t.assigned_to == agent_id && t.status == crate::task::domain::TaskStatus::Running)
            .cloned()
            .collect())
    }
}
