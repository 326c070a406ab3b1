//! Entry point: wires configuration, the shared store, repositories, and
//! services into a [`BoardServer`], then serves line-delimited JSON-RPC
//! over standard input/output until the input stream closes.

use std::process::ExitCode;
use std::sync::Arc;

use board::config::BoardConfig;
use board::message::adapters::sqlite::SqliteMessageRepository;
use board::message::services::MessageService;
use board::retention::RetentionPolicy;
use board::rpc::BoardServer;
use board::store::Store;
use board::sweeper::LivenessSweeper;
use board::task::adapters::sqlite::SqliteTaskRepository;
use board::task::services::TaskService;
use board::wait::WaitCoordinator;
use board::waiting::adapters::sqlite::SqliteWaitingRegistryRepository;
use board::waiting::services::WaitingRegistryService;
use mockable::DefaultClock;
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = BoardConfig::from_env();
    info!(state_dir = %config.state_dir.display(), "starting board server");

    let store = match Store::open(&config.database_path(), config.pool_size, config.pool_timeout) {
        Ok(store) => store,
        Err(err) => {
            tracing::error!(%err, "failed to open store");
            return ExitCode::FAILURE;
        }
    };

    let retention = RetentionPolicy {
        min_length: config.retention_min_length,
        max_age: config.retention_max_age,
        grace: config.retention_grace,
        legacy_lossy: config.legacy_lossy_retention,
    };

    let messages: Arc<dyn board::message::ports::repository::MessageRepository> =
        Arc::new(SqliteMessageRepository::new(store.clone(), retention));
    let tasks: Arc<dyn board::task::ports::repository::TaskRepository> =
        Arc::new(SqliteTaskRepository::new(store.clone()));
    let waiting: Arc<dyn board::waiting::ports::repository::WaitingRegistryRepository> =
        Arc::new(SqliteWaitingRegistryRepository::new(store.clone()));

    let message_service = MessageService::new(messages.clone(), DefaultClock);
    let task_service = TaskService::new(tasks.clone(), DefaultClock);
    let waiting_service =
        WaitingRegistryService::new(waiting.clone(), tasks.clone(), DefaultClock, config.wait_timeout);
    let wait_coordinator = WaitCoordinator::new(messages, waiting.clone(), tasks.clone(), DefaultClock);
    let sweeper = LivenessSweeper::new(waiting, tasks, DefaultClock);

    let server = BoardServer::new(
        message_service,
        task_service,
        waiting_service,
        wait_coordinator,
        sweeper,
        config.sweeper_timeout,
    );

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    if let Err(err) = server.serve(stdin, stdout).await {
        tracing::error!(%err, "board server terminated with an I/O error");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
