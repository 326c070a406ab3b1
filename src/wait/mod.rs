//! The blocking `wait_for_message` primitive.
//!
//! This is the broker's defining contract (§4.8): it couples waiting-agent
//! registration, adaptive-cadence polling, message delivery, and
//! unregistration into one operation.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mockable::Clock;

use crate::config::{WAIT_FAST_PHASE, WAIT_FAST_POLL, WAIT_SLOW_POLL};
use crate::message::domain::{Message, MessageId};
use crate::message::error::RepositoryError as MessageRepositoryError;
use crate::message::ports::repository::{MessageRepository, WaitFilter};
use crate::session::SessionTag;
use crate::task::domain::TaskId;
use crate::task::error::RepositoryError as TaskRepositoryError;
use crate::task::ports::repository::TaskRepository;
use crate::waiting::domain::AgentStatus;
use crate::waiting::error::RepositoryError as WaitingRepositoryError;
use crate::waiting::ports::repository::WaitingRegistryRepository;

/// Input to [`WaitCoordinator::wait_for_message`].
#[derive(Debug, Clone)]
pub struct WaitRequest {
    /// Maximum time to wait before returning a timeout outcome.
    pub timeout: Duration,
    /// The waiting agent's identity.
    pub client_id: String,
    /// Restrict delivery to messages addressed to this session.
    pub session: Option<SessionTag>,
    /// Only consider messages strictly newer than this.
    pub last_seen: Option<DateTime<Utc>>,
    /// Agent category; derived from `client_id` if unset.
    pub agent_type: Option<String>,
    /// Opaque capability descriptor recorded on the waiting record.
    pub capabilities: Option<serde_json::Value>,
    /// Self-reported activity status recorded on the waiting record.
    pub status: AgentStatus,
    /// Task this wait is associated with, if any.
    pub task_id: Option<TaskId>,
    /// Progress to record against `task_id`, if both are set.
    pub progress: Option<u8>,
}

/// Result of a `wait_for_message` call.
#[derive(Debug, Clone)]
pub enum WaitOutcome {
    /// A candidate message was delivered.
    Delivered {
        /// The delivered message, with its session prefix decoded.
        message: Message,
        /// Wall-clock time elapsed between entry and delivery.
        wait_time: Duration,
    },
    /// No candidate arrived before `timeout` elapsed.
    TimedOut {
        /// The requested timeout, echoed back.
        wait_time: Duration,
    },
}

/// Errors from [`WaitCoordinator::wait_for_message`].
#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    /// The message repository failed.
    #[error(transparent)]
    Message(#[from] MessageRepositoryError),
    /// The waiting registry failed.
    #[error(transparent)]
    Waiting(#[from] WaitingRepositoryError),
    /// The task repository failed.
    #[error(transparent)]
    Task(#[from] TaskRepositoryError),
}

/// Orchestrates the blocking wait loop described in §4.8.
pub struct WaitCoordinator<C: Clock> {
    messages: Arc<dyn MessageRepository>,
    waiting: Arc<dyn WaitingRegistryRepository>,
    tasks: Arc<dyn TaskRepository>,
    clock: C,
}

impl<C: Clock> WaitCoordinator<C> {
    /// Wraps the message, waiting-registry, and task repositories, using
    /// `clock` for elapsed-time bookkeeping.
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        waiting: Arc<dyn WaitingRegistryRepository>,
        tasks: Arc<dyn TaskRepository>,
        clock: C,
    ) -> Self {
        Self { messages, waiting, tasks, clock }
    }

    /// Registers `request.client_id` as waiting, polls for a delivery
    /// candidate with adaptive cadence until one arrives or `request.timeout`
    /// elapses, then unregisters the waiting record on every exit path.
    ///
    /// # Errors
    ///
    /// Propagates a repository error from either the message store or the
    /// waiting registry.
    pub async fn wait_for_message(&self, request: WaitRequest) -> Result<WaitOutcome, WaitError> {
        let agent_type = request
            .agent_type
            .clone()
            .unwrap_or_else(|| crate::waiting::domain::WaitingAgent::derive_agent_type(&request.client_id));

        let entry = self.clock.utc();
        let record = crate::waiting::domain::WaitingAgent::new(
            request.client_id.clone(),
            agent_type,
            request.capabilities.clone(),
            request.status,
            request.task_id,
            &self.clock,
        );
        self.waiting.upsert(&record).await?;

        if let (Some(task_id), Some(progress)) = (request.task_id, request.progress) {
            if let Some(mut task) = self.tasks.find_by_id(task_id).await? {
                task.progress = progress;
                task.updated_at = self.clock.utc();
                self.tasks.save(&task).await?;
            }
        }

        let outcome = self.poll_until_hit_or_timeout(&request, entry).await;

        self.waiting.remove(&request.client_id).await?;
        outcome
    }

    async fn poll_until_hit_or_timeout(
        &self,
        request: &WaitRequest,
        entry: DateTime<Utc>,
    ) -> Result<WaitOutcome, WaitError> {
        let mut excluded: Vec<MessageId> = Vec::new();
        loop {
            let elapsed = elapsed_since(entry, self.clock.utc());
            if elapsed >= request.timeout {
                return Ok(WaitOutcome::TimedOut { wait_time: request.timeout });
            }

            let filter = WaitFilter {
                client_id: request.client_id.clone(),
                last_seen: request.last_seen,
                session: request.session.clone(),
                exclude_ids: excluded.clone(),
            };
            match self.messages.poll_candidate(&filter).await {
                Ok(Some(message)) => {
                    let wait_time = elapsed_since(entry, self.clock.utc());
                    return Ok(WaitOutcome::Delivered { message, wait_time });
                }
                Ok(None) => {}
                Err(_) => {
                    // Transient store errors between polls are swallowed; the
                    // loop keeps retrying until timeout (§7).
                }
            }
            excluded.clear();

            let poll_interval = if elapsed < WAIT_FAST_PHASE { WAIT_FAST_POLL } else { WAIT_SLOW_POLL };
            tokio::time::sleep(poll_interval.min(request.timeout.saturating_sub(elapsed))).await;
        }
    }
}

fn elapsed_since(entry: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    now.signed_duration_since(entry).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::adapters::memory::InMemoryMessageRepository;
    use crate::message::domain::Priority;
    use crate::retention::RetentionPolicy;
    use crate::task::adapters::memory::InMemoryTaskRepository;
    use crate::waiting::adapters::memory::InMemoryWaitingRegistryRepository;
    use mockable::DefaultClock;

    fn coordinator() -> WaitCoordinator<DefaultClock> {
        let messages = InMemoryMessageRepository::new(RetentionPolicy {
            min_length: 0,
            max_age: Duration::from_secs(3_600 * 24),
            grace: Duration::from_secs(0),
            legacy_lossy: false,
        });
        WaitCoordinator::new(
            Arc::new(messages),
            Arc::new(InMemoryWaitingRegistryRepository::new()),
            Arc::new(InMemoryTaskRepository::new()),
            DefaultClock,
        )
    }

    fn default_request(client_id: &str, timeout: Duration) -> WaitRequest {
        WaitRequest {
            timeout,
            client_id: client_id.to_owned(),
            session: None,
            last_seen: None,
            agent_type: None,
            capabilities: None,
            status: AgentStatus::Waiting,
            task_id: None,
            progress: None,
        }
    }

    #[tokio::test]
    async fn scenario_s3_blocking_wait_timeout() {
        let coordinator = coordinator();
        let outcome = coordinator
            .wait_for_message(default_request("bob", Duration::from_millis(50)))
            .await
            .expect("wait succeeds");
        assert!(matches!(outcome, WaitOutcome::TimedOut { .. }));

        let waiting = coordinator.waiting.list(None).await.expect("list succeeds");
        assert!(waiting.is_empty(), "waiting registry must have no row for bob after timeout");
    }

    #[tokio::test]
    async fn scenario_s2_blocking_wait_hit() {
        let coordinator = coordinator();
        let message = Message::new("alice", "ping", Priority::Normal, None, None, None, &DefaultClock);
        coordinator.messages.insert(&message).await.expect("insert succeeds");

        let outcome = coordinator
            .wait_for_message(default_request("bob", Duration::from_secs(10)))
            .await
            .expect("wait succeeds");
        match outcome {
            WaitOutcome::Delivered { message, .. } => {
                assert_eq!(message.sender, "alice");
                assert_eq!(message.content, "ping");
            }
            WaitOutcome::TimedOut { .. } => panic!("expected a delivered message"),
        }

        let waiting = coordinator.waiting.list(None).await.expect("list succeeds");
        assert!(waiting.is_empty(), "waiting registry must have no row for bob after delivery");
    }

    #[tokio::test]
    async fn entry_syncs_linked_task_progress_before_polling() {
        use crate::task::domain::{Task, TaskPriority};

        let messages = InMemoryMessageRepository::new(RetentionPolicy {
            min_length: 0,
            max_age: Duration::from_secs(3_600 * 24),
            grace: Duration::from_secs(0),
            legacy_lossy: false,
        });
        let tasks = Arc::new(InMemoryTaskRepository::new());
        let task = Task::new("analyse", None, "worker", "iflow", TaskPriority::Normal, &DefaultClock);
        tasks.insert(&task).await.expect("insert succeeds");

        let coordinator = WaitCoordinator::new(
            Arc::new(messages),
            Arc::new(InMemoryWaitingRegistryRepository::new()),
            tasks.clone(),
            DefaultClock,
        );

        let mut request = default_request("worker", Duration::from_millis(50));
        request.task_id = Some(task.id);
        request.progress = Some(77);
        let outcome = coordinator.wait_for_message(request).await.expect("wait succeeds");
        assert!(matches!(outcome, WaitOutcome::TimedOut { .. }));

        let updated = tasks.find_by_id(task.id).await.expect("find succeeds").expect("task exists");
        assert_eq!(updated.progress, 77);
    }

    #[tokio::test]
    async fn wait_excludes_the_waiters_own_messages() {
        let coordinator = coordinator();
        let message = Message::new("bob", "my own message", Priority::Normal, None, None, None, &DefaultClock);
        coordinator.messages.insert(&message).await.expect("insert succeeds");

        let outcome = coordinator
            .wait_for_message(default_request("bob", Duration::from_millis(50)))
            .await
            .expect("wait succeeds");
        assert!(matches!(outcome, WaitOutcome::TimedOut { .. }));
    }
}
