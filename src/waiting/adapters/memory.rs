//! In-memory implementation of the `WaitingRegistryRepository` port.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::waiting::{domain::WaitingAgent, error::RepositoryError, ports::repository::WaitingRegistryRepository};

/// Thread-safe in-memory [`WaitingRegistryRepository`], suitable for tests
/// only.
#[derive(Debug, Default, Clone)]
pub struct InMemoryWaitingRegistryRepository {
    agents: Arc<RwLock<Vec<WaitingAgent>>>,
}

impl InMemoryWaitingRegistryRepository {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WaitingRegistryRepository for InMemoryWaitingRegistryRepository {
    async fn upsert(&self, agent: &WaitingAgent) -> Result<(), RepositoryError> {
        let mut guard = self.agents.write().unwrap_or_else(|poison| poison.into_inner());
        if let Some(existing) = guard.iter_mut().find(|a| a.agent_id == agent.agent_id) {
            *existing = agent.clone();
        } else {
            guard.push(agent.clone());
        }
        Ok(())
    }

    async fn find(&self, agent_id: &str) -> Result<Option<WaitingAgent>, RepositoryError> {
        let guard = self.agents.read().unwrap_or_else(|poison| poison.into_inner());
        Ok(guard.iter().find(|a| a.agent_id == agent_id).cloned())
    }

    async fn remove(&self, agent_id: &str) -> Result<(), RepositoryError> {
        let mut guard = self.agents.write().unwrap_or_else(|poison| poison.into_inner());
        guard.retain(|a| a.agent_id != agent_id);
        Ok(())
    }

    async fn list(&self, agent_type: Option<&str>) -> Result<Vec<WaitingAgent>, RepositoryError> {
        let guard = self.agents.read().unwrap_or_else(|poison| poison.into_inner());
        let mut matching: Vec<WaitingAgent> = guard
            .iter()
            .filter(|a| agent_type.is_none_or(|t| t == a.agent_type))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.waiting_since.cmp(&b.waiting_since));
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waiting::domain::AgentStatus;
    use mockable::DefaultClock;

    fn agent(id: &str) -> WaitingAgent {
        WaitingAgent::new(id, "worker", None, AgentStatus::Idle, None, &DefaultClock)
    }

    #[tokio::test]
    async fn upsert_then_find_round_trips() {
        let repo = InMemoryWaitingRegistryRepository::new();
        repo.upsert(&agent("bob")).await.expect("upsert succeeds");
        let found = repo.find("bob").await.expect("find succeeds");
        assert_eq!(found.map(|a| a.agent_id), Some("bob".to_owned()));
    }

    #[tokio::test]
    async fn upsert_replaces_existing_record_for_the_same_identity() {
        let repo = InMemoryWaitingRegistryRepository::new();
        repo.upsert(&agent("bob")).await.expect("upsert succeeds");
        let mut again = agent("bob");
        again.status = AgentStatus::Working;
        repo.upsert(&again).await.expect("upsert succeeds");

        let all = repo.list(None).await.expect("list succeeds");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, AgentStatus::Working);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let repo = InMemoryWaitingRegistryRepository::new();
        repo.remove("nobody").await.expect("remove on absent row succeeds");
        repo.upsert(&agent("bob")).await.expect("upsert succeeds");
        repo.remove("bob").await.expect("remove succeeds");
        repo.remove("bob").await.expect("second remove succeeds");
        assert!(repo.find("bob").await.expect("find succeeds").is_none());
    }
}
