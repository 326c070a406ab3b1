//! Cross-module scenarios that exercise several services together against
//! shared in-memory repositories, the way a single broker process wires
//! them at startup (see `src/bin/board_server.rs`).

use std::sync::Arc;
use std::time::Duration;

use board::message::adapters::memory::InMemoryMessageRepository;
use board::message::domain::Priority;
use board::message::services::MessageService;
use board::retention::RetentionPolicy;
use board::sweeper::LivenessSweeper;
use board::task::adapters::memory::InMemoryTaskRepository;
use board::task::domain::{TaskPriority, TaskStatus};
use board::task::services::{TaskService, TaskUpdate};
use board::wait::{WaitCoordinator, WaitOutcome, WaitRequest};
use board::waiting::adapters::memory::InMemoryWaitingRegistryRepository;
use board::waiting::domain::AgentStatus;
use board::waiting::ports::repository::WaitingRegistryRepository;
use board::waiting::services::WaitingRegistryService;
use mockable::DefaultClock;

fn unbounded_retention() -> RetentionPolicy {
    RetentionPolicy {
        min_length: 0,
        max_age: Duration::from_secs(3_600 * 24 * 365),
        grace: Duration::from_secs(0),
        legacy_lossy: false,
    }
}

#[tokio::test]
async fn worker_picks_up_a_task_waits_for_a_nudge_then_completes_it() {
    let messages = Arc::new(InMemoryMessageRepository::new(unbounded_retention()));
    let tasks = Arc::new(InMemoryTaskRepository::new());
    let waiting = Arc::new(InMemoryWaitingRegistryRepository::new());

    let message_service = MessageService::new(messages.clone(), DefaultClock);
    let task_service = TaskService::new(tasks.clone(), DefaultClock);
    let wait_coordinator = WaitCoordinator::new(messages, waiting, tasks.clone(), DefaultClock);

    let task_id = task_service
        .create_task("analyse logs", None, "worker", "iflow", TaskPriority::Normal)
        .await
        .expect("create_task succeeds");

    task_service
        .update_task(task_id, TaskUpdate { status: Some(TaskStatus::Running), ..Default::default() })
        .await
        .expect("update_task succeeds");

    message_service
        .send("iflow", "go ahead and finish up", Priority::Normal, None, None, None)
        .await
        .expect("send succeeds");

    let outcome = wait_coordinator
        .wait_for_message(WaitRequest {
            timeout: Duration::from_secs(5),
            client_id: "worker".to_owned(),
            session: None,
            last_seen: None,
            agent_type: None,
            capabilities: None,
            status: AgentStatus::Working,
            task_id: Some(task_id),
            progress: Some(80),
        })
        .await
        .expect("wait succeeds");

    match outcome {
        WaitOutcome::Delivered { message, .. } => assert_eq!(message.sender, "iflow"),
        WaitOutcome::TimedOut { .. } => panic!("expected the nudge message to be delivered"),
    }

    task_service
        .update_task(
            task_id,
            TaskUpdate { status: Some(TaskStatus::Completed), result: Some("done".to_owned()), ..Default::default() },
        )
        .await
        .expect("update_task succeeds");

    let task = task_service.get_task_details(task_id).await.expect("task exists");
    assert_eq!(task.status, TaskStatus::Completed);
    assert!(task.completed_at.is_some());
}

#[tokio::test]
async fn scenario_s6_agent_death_makes_its_task_reassignable() {
    let tasks = Arc::new(InMemoryTaskRepository::new());
    let waiting = Arc::new(InMemoryWaitingRegistryRepository::new());

    let task_service = TaskService::new(tasks.clone(), DefaultClock);
    let waiting_service =
        WaitingRegistryService::new(waiting.clone(), tasks.clone(), DefaultClock, Duration::from_secs(60));
    let sweeper = LivenessSweeper::new(waiting.clone(), tasks.clone(), DefaultClock);

    let task_id = task_service
        .create_task("long-running analysis", None, "worker", "iflow", TaskPriority::Normal)
        .await
        .expect("create_task succeeds");
    task_service
        .update_task(task_id, TaskUpdate { status: Some(TaskStatus::Running), ..Default::default() })
        .await
        .expect("update_task succeeds");

    waiting_service
        .register_waiting("worker", None, None, AgentStatus::Working, Some(task_id), None)
        .await
        .expect("register_waiting succeeds");

    // Simulate the worker process dying without ever unregistering: back-date
    // its heartbeat past the sweeper's timeout threshold.
    let mut record = waiting.find("worker").await.expect("find succeeds").expect("record exists");
    record.heartbeat -= chrono::Duration::seconds(120);
    waiting.upsert(&record).await.expect("upsert succeeds");

    let report = sweeper.check_offline_agents(60).await.expect("sweep succeeds");
    assert_eq!(report.detached_agents.len(), 1);
    assert_eq!(report.detached_agents[0].agent_id, "worker");
    assert_eq!(report.reassignable_tasks.len(), 1);
    assert_eq!(report.reassignable_tasks[0].id, task_id);

    let task = task_service.get_task_details(task_id).await.expect("task exists");
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.error_message.as_deref(), Some("agent offline"));

    let stored_agent = waiting_service
        .get_waiting_agents(None)
        .await
        .expect("list succeeds")
        .into_iter()
        .find(|view| view.agent.agent_id == "worker")
        .expect("worker row still present, marked offline");
    assert!(!stored_agent.agent.is_online);
}
