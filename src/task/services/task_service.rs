//! The task service: create, update, cancel, query.

use std::sync::Arc;

use mockable::Clock;

use crate::task::{
    domain::{Task, TaskId, TaskPriority, TaskStatus},
    error::{RepositoryError, ValidationError},
    ports::repository::{TaskFilter, TaskRepository},
};

/// Orchestrates task lifecycle transitions on top of a [`TaskRepository`].
pub struct TaskService<C: Clock> {
    repository: Arc<dyn TaskRepository>,
    clock: C,
}

/// A partial update applied by [`TaskService::update_task`].
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    /// Requested status transition, if any.
    pub status: Option<TaskStatus>,
    /// Progress percentage, `0..=100`.
    pub progress: Option<u8>,
    /// Result payload to record.
    pub result: Option<String>,
    /// Diagnostic message to record.
    pub error_message: Option<String>,
}

impl<C: Clock> TaskService<C> {
    /// Wraps `repository`, using `clock` for every timestamp this service
    /// stamps onto tasks.
    pub fn new(repository: Arc<dyn TaskRepository>, clock: C) -> Self {
        Self { repository, clock }
    }

    /// Validates and persists a new, `pending` task.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyTitle`] for an empty title, or
    /// propagates a repository error.
    pub async fn create_task(
        &self,
        title: impl Into<String>,
        description: Option<String>,
        assigned_to: impl Into<String>,
        created_by: impl Into<String>,
        priority: TaskPriority,
    ) -> Result<TaskId, TaskServiceError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(TaskServiceError::Validation(ValidationError::EmptyTitle));
        }
        let task = Task::new(title, description, assigned_to, created_by, priority, &self.clock);
        let id = task.id;
        self.repository.insert(&task).await?;
        Ok(id)
    }

    /// Applies a partial update to the task identified by `id`.
    ///
    /// Once a task has reached a terminal status (`completed` or `failed`),
    /// a further status change is rejected as a no-op: the row is left
    /// untouched and `false` is returned. Diagnostic fields (`result`,
    /// `error_message`) may still be recorded on a terminal task via an
    /// update that does not also request a status change.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::NotFound`] if `id` is unknown, or
    /// propagates a repository error.
    pub async fn update_task(&self, id: TaskId, update: TaskUpdate) -> Result<bool, TaskServiceError> {
        let Some(mut task) = self.repository.find_by_id(id).await? else {
            return Err(TaskServiceError::NotFound(id));
        };

        if let Some(status) = update.status {
            if task.status.is_terminal() {
                return Ok(false);
            }
            if status == TaskStatus::Running && task.started_at.is_none() {
                task.started_at = Some(self.clock.utc());
            }
            if status.is_terminal() {
                task.completed_at = Some(self.clock.utc());
            }
            task.status = status;
        }

        if let Some(progress) = update.progress {
            task.progress = progress;
        }
        if let Some(result) = update.result {
            task.result = Some(result);
        }
        if let Some(error_message) = update.error_message {
            task.error_message = Some(error_message);
        }

        task.updated_at = self.clock.utc();
        self.repository.save(&task).await?;
        Ok(true)
    }

    /// Cancels the task identified by `id`: transitions it to `failed` with
    /// `error_message = "cancelled"`. Idempotent, and valid from any state,
    /// including an already-terminal one.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::NotFound`] if `id` is unknown, or
    /// propagates a repository error.
    pub async fn cancel_task(&self, id: TaskId) -> Result<bool, TaskServiceError> {
        let Some(mut task) = self.repository.find_by_id(id).await? else {
            return Err(TaskServiceError::NotFound(id));
        };
        if task.status.is_terminal() {
            return Ok(true);
        }
        let now = self.clock.utc();
        task.status = TaskStatus::Failed;
        task.error_message = Some("cancelled".to_owned());
        task.completed_at = Some(now);
        task.updated_at = now;
        self.repository.save(&task).await?;
        Ok(true)
    }

    /// Lists tasks matching `filter`.
    ///
    /// # Errors
    ///
    /// Propagates a repository error.
    pub async fn get_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>, RepositoryError> {
        self.repository.list(&filter).await
    }

    /// Lists tasks assigned to `agent_id`, optionally restricted to
    /// `status`.
    ///
    /// # Errors
    ///
    /// Propagates a repository error.
    pub async fn get_my_tasks(
        &self,
        agent_id: impl Into<String>,
        status: Option<TaskStatus>,
        limit: Option<u32>,
    ) -> Result<Vec<Task>, RepositoryError> {
        self.repository
            .list(&TaskFilter {
                assigned_to: Some(agent_id.into()),
                status,
                limit,
            })
            .await
    }

    /// Fetches full detail for one task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::NotFound`] if `id` is unknown, or
    /// propagates a repository error.
    pub async fn get_task_details(&self, id: TaskId) -> Result<Task, TaskServiceError> {
        self.repository.find_by_id(id).await?.ok_or(TaskServiceError::NotFound(id))
    }
}

/// Errors from [`TaskService`] operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    /// The caller-supplied input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// No task exists with the requested id.
    #[error("task not found: {0}")]
    NotFound(TaskId),
    /// The repository failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::adapters::memory::InMemoryTaskRepository;
    use mockable::DefaultClock;

    fn service() -> TaskService<DefaultClock> {
        TaskService::new(Arc::new(InMemoryTaskRepository::new()), DefaultClock)
    }

    #[tokio::test]
    async fn create_task_rejects_empty_title() {
        let service = service();
        let err = service
            .create_task("   ", None, "worker", "iflow", TaskPriority::Normal)
            .await
            .expect_err("empty title rejected");
        assert!(matches!(err, TaskServiceError::Validation(ValidationError::EmptyTitle)));
    }

    #[tokio::test]
    async fn update_task_on_terminal_task_is_a_no_op_for_status() {
        let service = service();
        let id = service
            .create_task("analyse", None, "worker", "iflow", TaskPriority::Normal)
            .await
            .expect("create succeeds");
        service
            .update_task(id, TaskUpdate { status: Some(TaskStatus::Completed), ..Default::default() })
            .await
            .expect("update succeeds");

        let changed = service
            .update_task(id, TaskUpdate { status: Some(TaskStatus::Running), ..Default::default() })
            .await
            .expect("update succeeds");
        assert!(!changed);

        let task = service.get_task_details(id).await.expect("task exists");
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn update_task_allows_diagnostic_fields_on_terminal_task() {
        let service = service();
        let id = service
            .create_task("analyse", None, "worker", "iflow", TaskPriority::Normal)
            .await
            .expect("create succeeds");
        service
            .update_task(id, TaskUpdate { status: Some(TaskStatus::Failed), ..Default::default() })
            .await
            .expect("update succeeds");

        service
            .update_task(id, TaskUpdate { result: Some("retry logged".to_owned()), ..Default::default() })
            .await
            .expect("update succeeds");

        let task = service.get_task_details(id).await.expect("task exists");
        assert_eq!(task.result.as_deref(), Some("retry logged"));
    }

    #[tokio::test]
    async fn cancel_task_is_idempotent() {
        let service = service();
        let id = service
            .create_task("analyse", None, "worker", "iflow", TaskPriority::Normal)
            .await
            .expect("create succeeds");
        assert!(service.cancel_task(id).await.expect("cancel succeeds"));
        assert!(service.cancel_task(id).await.expect("cancel succeeds again"));

        let task = service.get_task_details(id).await.expect("task exists");
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error_message.as_deref(), Some("cancelled"));
    }

    #[tokio::test]
    async fn scenario_s5_task_happy_path() {
        let service = service();
        let id = service
            .create_task("analyse", None, "worker", "iflow", TaskPriority::Normal)
            .await
            .expect("create succeeds");

        let pending = service
            .get_tasks(TaskFilter {
                assigned_to: Some("worker".to_owned()),
                status: Some(TaskStatus::Pending),
                limit: None,
            })
            .await
            .expect("list succeeds");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);

        service
            .update_task(id, TaskUpdate { status: Some(TaskStatus::Running), ..Default::default() })
            .await
            .expect("update succeeds");
        service
            .update_task(id, TaskUpdate { progress: Some(50), ..Default::default() })
            .await
            .expect("heartbeat-style progress update succeeds");
        service
            .update_task(
                id,
                TaskUpdate {
                    status: Some(TaskStatus::Completed),
                    result: Some("done".to_owned()),
                    ..Default::default()
                },
            )
            .await
            .expect("update succeeds");

        let task = service.get_task_details(id).await.expect("task exists");
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.progress, 50);
        assert!(task.completed_at.is_some());
        assert_eq!(task.result.as_deref(), Some("done"));
    }
}
