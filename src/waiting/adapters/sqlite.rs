//! SQLite-backed implementation of the `WaitingRegistryRepository` port.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rusqlite::{OptionalExtension, Row, params};

use crate::store::Store;
use crate::task::domain::TaskId;
use crate::waiting::{domain::WaitingAgent, error::RepositoryError, ports::repository::WaitingRegistryRepository};

/// Production [`WaitingRegistryRepository`] backed by the shared [`Store`].
#[derive(Clone)]
pub struct SqliteWaitingRegistryRepository {
    store: Store,
}

impl SqliteWaitingRegistryRepository {
    /// Wraps `store`.
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

fn row_to_agent(row: &Row<'_>) -> rusqlite::Result<WaitingAgent> {
    let capabilities: Option<String> = row.get("capabilities")?;
    let status: String = row.get("status")?;
    let current_task_id: Option<String> = row.get("current_task_id")?;
    let waiting_since: i64 = row.get("waiting_since")?;
    let heartbeat: i64 = row.get("heartbeat")?;
    let last_disconnect: Option<i64> = row.get("last_disconnect")?;
    let is_online: i64 = row.get("is_online")?;

    Ok(WaitingAgent {
        agent_id: row.get("agent_id")?,
        agent_type: row.get("agent_type")?,
        capabilities: capabilities.and_then(|c| serde_json::from_str(&c).ok()),
        status: status.parse().unwrap_or(crate::waiting::domain::AgentStatus::Idle),
        current_task_id: current_task_id.and_then(|id| TaskId::parse(&id).ok()),
        waiting_since: Utc.timestamp_opt(waiting_since, 0).single().unwrap_or_else(Utc::now),
        heartbeat: Utc.timestamp_opt(heartbeat, 0).single().unwrap_or_else(Utc::now),
        is_online: is_online != 0,
        last_disconnect: last_disconnect.and_then(|t| Utc.timestamp_opt(t, 0).single()),
    })
}

#[async_trait]
impl WaitingRegistryRepository for SqliteWaitingRegistryRepository {
    async fn upsert(&self, agent: &WaitingAgent) -> Result<(), RepositoryError> {
        let store = self.store.clone();
        let agent = agent.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.get().map_err(RepositoryError::storage)?;
            let capabilities = agent
                .capabilities
                .as_ref()
                .map(|v| serde_json::to_string(v).unwrap_or_default());
            conn.execute(
                "INSERT INTO waiting_agents
                    (agent_id, agent_type, capabilities, status, current_task_id, waiting_since,
                     heartbeat, is_online, last_disconnect)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(agent_id) DO UPDATE SET
                    agent_type = excluded.agent_type,
                    capabilities = excluded.capabilities,
                    status = excluded.status,
                    current_task_id = excluded.current_task_id,
                    waiting_since = excluded.waiting_since,
                    heartbeat = excluded.heartbeat,
                    is_online = excluded.is_online,
                    last_disconnect = excluded.last_disconnect",
                params![
                    agent.agent_id,
                    agent.agent_type,
                    capabilities,
                    agent.status.as_str(),
                    agent.current_task_id.map(|id| id.to_string()),
                    agent.waiting_since.timestamp(),
                    agent.heartbeat.timestamp(),
                    i64::from(agent.is_online),
                    agent.last_disconnect.map(|t| t.timestamp()),
                ],
            )
            .map_err(RepositoryError::storage)?;
            Ok(())
        })
        .await
        .map_err(RepositoryError::storage)?
    }

    async fn find(&self, agent_id: &str) -> Result<Option<WaitingAgent>, RepositoryError> {
        let store = self.store.clone();
        let agent_id = agent_id.to_owned();
        tokio::task::spawn_blocking(move || {
            let conn = store.get().map_err(RepositoryError::storage)?;
            conn.query_row(
                "SELECT * FROM waiting_agents WHERE agent_id = ?1",
                params![agent_id],
                row_to_agent,
            )
            .optional()
            .map_err(RepositoryError::storage)
        })
        .await
        .map_err(RepositoryError::storage)?
    }

    async fn remove(&self, agent_id: &str) -> Result<(), RepositoryError> {
        let store = self.store.clone();
        let agent_id = agent_id.to_owned();
        tokio::task::spawn_blocking(move || {
            let conn = store.get().map_err(RepositoryError::storage)?;
            conn.execute("DELETE FROM waiting_agents WHERE agent_id = ?1", params![agent_id])
                .map_err(RepositoryError::storage)?;
            Ok(())
        })
        .await
        .map_err(RepositoryError::storage)?
    }

    async fn list(&self, agent_type: Option<&str>) -> Result<Vec<WaitingAgent>, RepositoryError> {
        let store = self.store.clone();
        let agent_type = agent_type.map(str::to_owned);
        tokio::task::spawn_blocking(move || {
            let conn = store.get().map_err(RepositoryError::storage)?;
            let rows = if let Some(agent_type) = agent_type {
                let mut stmt = conn
                    .prepare("SELECT * FROM waiting_agents WHERE agent_type = ?1 ORDER BY waiting_since ASC")
                    .map_err(RepositoryError::storage)?;
                stmt.query_map(params![agent_type], row_to_agent)
                    .map_err(RepositoryError::storage)?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(RepositoryError::storage)?
            } else {
                let mut stmt = conn
                    .prepare("SELECT * FROM waiting_agents ORDER BY waiting_since ASC")
                    .map_err(RepositoryError::storage)?;
                stmt.query_map([], row_to_agent)
                    .map_err(RepositoryError::storage)?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(RepositoryError::storage)?
            };
            Ok(rows)
        })
        .await
        .map_err(RepositoryError::storage)?
    }
}
