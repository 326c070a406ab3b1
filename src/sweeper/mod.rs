//! The liveness sweeper: detects stale waiting-agent records and fails
//! their in-flight tasks.

use std::sync::Arc;
use std::time::Duration;

use mockable::Clock;

use crate::task::domain::{Task, TaskStatus};
use crate::task::ports::repository::TaskRepository;
use crate::waiting::domain::WaitingAgent;
use crate::waiting::ports::repository::WaitingRegistryRepository;

/// Outcome of one [`LivenessSweeper::check_offline_agents`] call.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Waiting-agent records newly marked offline by this sweep.
    pub detached_agents: Vec<WaitingAgent>,
    /// Tasks now in a non-terminal-but-unowned state and candidates for
    /// reassignment.
    pub reassignable_tasks: Vec<Task>,
}

/// Errors from [`LivenessSweeper::check_offline_agents`].
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    /// The waiting registry failed.
    #[error(transparent)]
    Waiting(#[from] crate::waiting::error::RepositoryError),
    /// The task repository failed.
    #[error(transparent)]
    Task(#[from] crate::task::error::RepositoryError),
}

/// Detects agents whose heartbeat has gone stale and fails their running
/// work. Driven entirely by external callers; invoking it is cheap and
/// idempotent, per §4.9.
pub struct LivenessSweeper<C: Clock> {
    waiting: Arc<dyn WaitingRegistryRepository>,
    tasks: Arc<dyn TaskRepository>,
    clock: C,
}

impl<C: Clock> LivenessSweeper<C> {
    /// Wraps the waiting-registry and task repositories, using `clock` for
    /// heartbeat-age comparisons and completion timestamps.
    pub fn new(waiting: Arc<dyn WaitingRegistryRepository>, tasks: Arc<dyn TaskRepository>, clock: C) -> Self {
        Self { waiting, tasks, clock }
    }

    /// Marks every waiting record whose heartbeat age exceeds
    /// `timeout_seconds` as offline, fails any `running` task it owned with
    /// `error_message = "agent offline"`, and returns both lists.
    ///
    /// # Errors
    ///
    /// Propagates a repository error from either the waiting registry or
    /// the task store.
    pub async fn check_offline_agents(&self, timeout_seconds: u64) -> Result<SweepReport, SweepError> {
        let threshold = Duration::from_secs(timeout_seconds);
        let now = self.clock.utc();

        let mut report = SweepReport::default();
        for mut agent in self.waiting.list(None).await? {
            if !agent.is_online {
                continue;
            }
            let age = now.signed_duration_since(agent.heartbeat).to_std().unwrap_or(Duration::ZERO);
            if age <= threshold {
                continue;
            }

            agent.is_online = false;
            agent.last_disconnect = Some(now);
            self.waiting.upsert(&agent).await?;
            report.detached_agents.push(agent.clone());

            if let Some(task_id) = agent.current_task_id {
                if let Some(mut task) = self.tasks.find_by_id(task_id).await? {
                    if task.status == TaskStatus::Running {
                        task.status = TaskStatus::Failed;
                        task.error_message = Some("agent offline".to_owned());
                        task.completed_at = Some(now);
                        task.updated_at = now;
                        self.tasks.save(&task).await?;
                        report.reassignable_tasks.push(task);
                    }
                }
            }
        }
        Ok(report)
    }
}
