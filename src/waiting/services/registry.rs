//! The waiting registry service: register, heartbeat, report status, list.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mockable::Clock;

use crate::task::domain::{TaskId, TaskStatus};
use crate::task::ports::repository::TaskRepository;
use crate::waiting::{
    domain::{AgentStatus, WaitingAgent},
    error::RepositoryError,
    ports::repository::WaitingRegistryRepository,
};

/// A waiting-agent record enriched with fields derived at read time.
#[derive(Debug, Clone)]
pub struct WaitingAgentView {
    /// The underlying registry record.
    pub agent: WaitingAgent,
    /// Wall-clock duration since `waiting_since`.
    pub waiting_duration: Duration,
    /// Wall-clock duration since the last heartbeat.
    pub heartbeat_age: Duration,
    /// Whether `heartbeat_age` exceeds the configured timeout threshold.
    pub is_timeout: bool,
}

/// Orchestrates waiting-registry registration, heartbeats, and queries.
pub struct WaitingRegistryService<C: Clock> {
    repository: Arc<dyn WaitingRegistryRepository>,
    tasks: Arc<dyn TaskRepository>,
    clock: C,
    timeout_threshold: Duration,
}

impl<C: Clock> WaitingRegistryService<C> {
    /// Wraps `repository` and `tasks`, using `clock` for all timestamps and
    /// `timeout_threshold` as the heartbeat-age cutoff reported by
    /// [`Self::get_waiting_agents`].
    pub fn new(
        repository: Arc<dyn WaitingRegistryRepository>,
        tasks: Arc<dyn TaskRepository>,
        clock: C,
        timeout_threshold: Duration,
    ) -> Self {
        Self { repository, tasks, clock, timeout_threshold }
    }

    /// Registers or refreshes the waiting record for `agent_id`, setting
    /// `waiting_since = heartbeat = now` and `is_online = true`.
    ///
    /// If `task_id` and `progress` are both set, the linked task's
    /// `progress` and `updated_at` are updated as a side effect.
    ///
    /// # Errors
    ///
    /// Propagates a repository error from either the registry or the task
    /// store.
    pub async fn register_waiting(
        &self,
        agent_id: impl Into<String>,
        agent_type: Option<String>,
        capabilities: Option<serde_json::Value>,
        status: AgentStatus,
        task_id: Option<TaskId>,
        progress: Option<u8>,
    ) -> Result<(), RegisterError> {
        let agent_id = agent_id.into();
        let agent_type = agent_type.unwrap_or_else(|| WaitingAgent::derive_agent_type(&agent_id));
        let record = WaitingAgent::new(agent_id, agent_type, capabilities, status, task_id, &self.clock);
        self.repository.upsert(&record).await?;

        if let (Some(task_id), Some(progress)) = (task_id, progress) {
            if let Some(mut task) = self.tasks.find_by_id(task_id).await.map_err(RegisterError::Task)? {
                task.progress = progress;
                task.updated_at = self.clock.utc();
                self.tasks.save(&task).await.map_err(RegisterError::Task)?;
            }
        }
        Ok(())
    }

    /// Removes the waiting record for `agent_id`. Idempotent.
    ///
    /// # Errors
    ///
    /// Propagates a repository error.
    pub async fn unregister_waiting(&self, agent_id: &str) -> Result<(), RepositoryError> {
        self.repository.remove(agent_id).await
    }

    /// Updates `heartbeat` for `agent_id` to `now`, optionally syncing the
    /// linked task's `progress`.
    ///
    /// # Errors
    ///
    /// Propagates a repository error from either the registry or the task
    /// store. A missing registry record is a silent no-op, matching the
    /// convenience semantics of a best-effort liveness ping.
    pub async fn heartbeat(
        &self,
        agent_id: &str,
        task_id: Option<TaskId>,
        progress: Option<u8>,
    ) -> Result<(), RegisterError> {
        let Some(mut record) = self.repository.find(agent_id).await? else {
            return Ok(());
        };
        record.heartbeat = self.clock.utc();
        record.is_online = true;
        self.repository.upsert(&record).await?;

        if let (Some(task_id), Some(progress)) = (task_id, progress) {
            if let Some(mut task) = self.tasks.find_by_id(task_id).await.map_err(RegisterError::Task)? {
                task.progress = progress;
                task.updated_at = self.clock.utc();
                self.tasks.save(&task).await.map_err(RegisterError::Task)?;
            }
        }
        Ok(())
    }

    /// Updates `status` and `waiting_since` for `agent_id`; optionally syncs
    /// the linked task's status (`working` maps to `running`, any other
    /// reported status maps to `pending`).
    ///
    /// # Errors
    ///
    /// Propagates a repository error from either the registry or the task
    /// store. A missing registry record is a silent no-op.
    pub async fn report_status(
        &self,
        agent_id: &str,
        status: AgentStatus,
        task_id: Option<TaskId>,
        progress: Option<u8>,
    ) -> Result<(), RegisterError> {
        let Some(mut record) = self.repository.find(agent_id).await? else {
            return Ok(());
        };
        record.status = status;
        record.waiting_since = self.clock.utc();
        self.repository.upsert(&record).await?;

        if let Some(task_id) = task_id.or(record.current_task_id) {
            if let Some(mut task) = self.tasks.find_by_id(task_id).await.map_err(RegisterError::Task)? {
                task.status = if status == AgentStatus::Working { TaskStatus::Running } else { TaskStatus::Pending };
                if let Some(progress) = progress {
                    task.progress = progress;
                }
                task.updated_at = self.clock.utc();
                self.tasks.save(&task).await.map_err(RegisterError::Task)?;
            }
        }
        Ok(())
    }

    /// Lists waiting agents, optionally restricted to `agent_type`, each
    /// enriched with `waiting_duration`, `heartbeat_age`, and `is_timeout`.
    ///
    /// # Errors
    ///
    /// Propagates a repository error.
    pub async fn get_waiting_agents(&self, agent_type: Option<&str>) -> Result<Vec<WaitingAgentView>, RepositoryError> {
        let now = self.clock.utc();
        let records = self.repository.list(agent_type).await?;
        Ok(records.into_iter().map(|agent| self.enrich(agent, now)).collect())
    }

    fn enrich(&self, agent: WaitingAgent, now: DateTime<Utc>) -> WaitingAgentView {
        let waiting_duration = duration_since(agent.waiting_since, now);
        let heartbeat_age = duration_since(agent.heartbeat, now);
        let is_timeout = heartbeat_age > self.timeout_threshold;
        WaitingAgentView { agent, waiting_duration, heartbeat_age, is_timeout }
    }
}

fn duration_since(past: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    now.signed_duration_since(past).to_std().unwrap_or(Duration::ZERO)
}

/// Errors from [`WaitingRegistryService`] operations that touch both the
/// waiting registry and the task store.
#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    /// The waiting-registry repository failed.
    #[error(transparent)]
    Registry(#[from] RepositoryError),
    /// The task repository failed.
    #[error(transparent)]
    Task(crate::task::error::RepositoryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::adapters::memory::InMemoryTaskRepository;
    use crate::task::domain::{Task, TaskPriority};
    use crate::waiting::adapters::memory::InMemoryWaitingRegistryRepository;
    use mockable::DefaultClock;

    fn service() -> WaitingRegistryService<DefaultClock> {
        WaitingRegistryService::new(
            Arc::new(InMemoryWaitingRegistryRepository::new()),
            Arc::new(InMemoryTaskRepository::new()),
            DefaultClock,
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn register_waiting_derives_agent_type_when_unset() {
        let service = service();
        service
            .register_waiting("qwen3", None, None, AgentStatus::Idle, None, None)
            .await
            .expect("register succeeds");

        let agents = service.get_waiting_agents(None).await.expect("list succeeds");
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].agent.agent_type, "qwen");
    }

    #[tokio::test]
    async fn register_twice_for_the_same_identity_leaves_one_row() {
        let service = service();
        service
            .register_waiting("bob", Some("worker".to_owned()), None, AgentStatus::Idle, None, None)
            .await
            .expect("first register succeeds");
        service
            .register_waiting("bob", Some("worker".to_owned()), None, AgentStatus::Waiting, None, None)
            .await
            .expect("second register succeeds");

        let agents = service.get_waiting_agents(None).await.expect("list succeeds");
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].agent.status, AgentStatus::Waiting);
    }

    #[tokio::test]
    async fn unregister_waiting_removes_the_record() {
        let service = service();
        service
            .register_waiting("bob", Some("worker".to_owned()), None, AgentStatus::Idle, None, None)
            .await
            .expect("register succeeds");
        service.unregister_waiting("bob").await.expect("unregister succeeds");
        assert!(service.get_waiting_agents(None).await.expect("list succeeds").is_empty());
    }

    #[tokio::test]
    async fn heartbeat_syncs_linked_task_progress() {
        let tasks = Arc::new(InMemoryTaskRepository::new());
        let task = Task::new("analyse", None, "worker", "iflow", TaskPriority::Normal, &DefaultClock);
        tasks.insert(&task).await.expect("insert succeeds");

        let service = WaitingRegistryService::new(
            Arc::new(InMemoryWaitingRegistryRepository::new()),
            tasks.clone(),
            DefaultClock,
            Duration::from_secs(60),
        );
        service
            .register_waiting("worker", None, None, AgentStatus::Working, Some(task.id), None)
            .await
            .expect("register succeeds");
        service
            .heartbeat("worker", Some(task.id), Some(42))
            .await
            .expect("heartbeat succeeds");

        let updated = tasks.find_by_id(task.id).await.expect("find succeeds").expect("task exists");
        assert_eq!(updated.progress, 42);
    }
}
