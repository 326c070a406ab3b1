//! SQLite-backed implementation of the `TaskRepository` port.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rusqlite::{OptionalExtension, Row, params};

use crate::store::Store;
use crate::task::{
    domain::{Task, TaskId, TaskPriority, TaskStatus},
    error::RepositoryError,
    ports::repository::{TaskFilter, TaskRepository, TaskRepositoryResult},
};

/// Production [`TaskRepository`] backed by the shared [`Store`].
#[derive(Clone)]
pub struct SqliteTaskRepository {
    store: Store,
}

impl SqliteTaskRepository {
    /// Wraps `store`.
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    let id: String = row.get("id")?;
    let status: String = row.get("status")?;
    let priority: String = row.get("priority")?;
    let created_at: i64 = row.get("created_at")?;
    let updated_at: i64 = row.get("updated_at")?;
    let started_at: Option<i64> = row.get("started_at")?;
    let completed_at: Option<i64> = row.get("completed_at")?;
    let progress: i64 = row.get("progress")?;

    Ok(Task {
        id: TaskId::parse(&id).unwrap_or_else(|_| TaskId::new()),
        title: row.get("title")?,
        description: row.get("description")?,
        status: status.parse().unwrap_or(TaskStatus::Pending),
        assigned_to: row.get("assigned_to")?,
        created_by: row.get("created_by")?,
        priority: priority.parse().unwrap_or(TaskPriority::Normal),
        progress: u8::try_from(progress).unwrap_or(0),
        created_at: Utc.timestamp_opt(created_at, 0).single().unwrap_or_else(Utc::now),
        updated_at: Utc.timestamp_opt(updated_at, 0).single().unwrap_or_else(Utc::now),
        started_at: started_at.and_then(|t| Utc.timestamp_opt(t, 0).single()),
        completed_at: completed_at.and_then(|t| Utc.timestamp_opt(t, 0).single()),
        error_message: row.get("error_message")?,
        result: row.get("result")?,
    })
}

fn bind(task: &Task) -> Vec<(&'static str, Box<dyn rusqlite::ToSql>)> {
    vec![
        ("id", Box::new(task.id.to_string())),
        ("title", Box::new(task.title.clone())),
        ("description", Box::new(task.description.clone())),
        ("status", Box::new(task.status.as_str())),
        ("assigned_to", Box::new(task.assigned_to.clone())),
        ("created_by", Box::new(task.created_by.clone())),
        ("priority", Box::new(task.priority.as_str())),
        ("progress", Box::new(i64::from(task.progress))),
        ("created_at", Box::new(task.created_at.timestamp())),
        ("updated_at", Box::new(task.updated_at.timestamp())),
        ("started_at", Box::new(task.started_at.map(|t| t.timestamp()))),
        ("completed_at", Box::new(task.completed_at.map(|t| t.timestamp()))),
        ("error_message", Box::new(task.error_message.clone())),
        ("result", Box::new(task.result.clone())),
    ]
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn insert(&self, task: &Task) -> TaskRepositoryResult<()> {
        let store = self.store.clone();
        let task = task.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.get().map_err(RepositoryError::storage)?;
            let bound = bind(&task);
            let refs: Vec<&dyn rusqlite::ToSql> = bound.iter().map(|(_, v)| v.as_ref()).collect();
            let result = conn.execute(
                "INSERT INTO tasks (id, title, description, status, assigned_to, created_by, priority,
                                     progress, created_at, updated_at, started_at, completed_at, error_message, result)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                refs.as_slice(),
            );
            match result {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Err(RepositoryError::DuplicateTask(task.id))
                }
                Err(err) => Err(RepositoryError::storage(err)),
            }
        })
        .await
        .map_err(RepositoryError::storage)?
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.get().map_err(RepositoryError::storage)?;
            conn.query_row("SELECT * FROM tasks WHERE id = ?1", params![id.to_string()], row_to_task)
                .optional()
                .map_err(RepositoryError::storage)
        })
        .await
        .map_err(RepositoryError::storage)?
    }

    async fn save(&self, task: &Task) -> TaskRepositoryResult<()> {
        let store = self.store.clone();
        let task = task.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.get().map_err(RepositoryError::storage)?;
            conn.execute(
                "UPDATE tasks SET title = ?2, description = ?3, status = ?4, assigned_to = ?5,
                    created_by = ?6, priority = ?7, progress = ?8, created_at = ?9, updated_at = ?10,
                    started_at = ?11, completed_at = ?12, error_message = ?13, result = ?14
                 WHERE id = ?1",
                params![
                    task.id.to_string(),
                    task.title,
                    task.description,
                    task.status.as_str(),
                    task.assigned_to,
                    task.created_by,
                    task.priority.as_str(),
                    i64::from(task.progress),
                    task.created_at.timestamp(),
                    task.updated_at.timestamp(),
                    task.started_at.map(|t| t.timestamp()),
                    task.completed_at.map(|t| t.timestamp()),
                    task.error_message,
                    task.result,
                ],
            )
            .map_err(RepositoryError::storage)?;
            Ok(())
        })
        .await
        .map_err(RepositoryError::storage)?
    }

    async fn list(&self, filter: &TaskFilter) -> TaskRepositoryResult<Vec<Task>> {
        let store = self.store.clone();
        let filter = filter.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.get().map_err(RepositoryError::storage)?;
            let mut sql = String::from("SELECT * FROM tasks WHERE 1=1");
            let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
            if let Some(assigned_to) = &filter.assigned_to {
                values.push(Box::new(assigned_to.clone()));
                sql.push_str(&format!(" AND assigned_to = ?{}", values.len()));
            }
            if let Some(status) = filter.status {
                values.push(Box::new(status.as_str()));
                sql.push_str(&format!(" AND status = ?{}", values.len()));
            }
            sql.push_str(" ORDER BY created_at DESC");
            if let Some(limit) = filter.limit {
                sql.push_str(&format!(" LIMIT {limit}"));
            }

            let mut stmt = conn.prepare(&sql).map_err(RepositoryError::storage)?;
            let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(std::convert::AsRef::as_ref).collect();
            let rows = stmt
                .query_map(refs.as_slice(), row_to_task)
                .map_err(RepositoryError::storage)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(RepositoryError::storage)?;
            Ok(rows)
        })
        .await
        .map_err(RepositoryError::storage)?
    }

    async fn find_running_for_agent(&self, agent_id: &str) -> TaskRepositoryResult<Vec<Task>> {
        let store = self.store.clone();
        let agent_id = agent_id.to_owned();
        tokio::task::spawn_blocking(move || {
            let conn = store.get().map_err(RepositoryError::storage)?;
            let mut stmt = conn
                .prepare("SELECT * FROM tasks WHERE assigned_to = ?1 AND status = 'running'")
                .map_err(RepositoryError::storage)?;
            let rows = stmt
                .query_map(params![agent_id], row_to_task)
                .map_err(RepositoryError::storage)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(RepositoryError::storage)?;
            Ok(rows)
        })
        .await
        .map_err(RepositoryError::storage)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::domain::{TaskPriority, TaskStatus};
    use mockable::DefaultClock;

    fn repo() -> SqliteTaskRepository {
        let store = Store::open_in_memory().expect("open in-memory store");
        SqliteTaskRepository::new(store)
    }

    fn task() -> Task {
        Task::new("analyse", None, "worker", "iflow", TaskPriority::Normal, &DefaultClock)
    }

    #[tokio::test]
    async fn insert_then_find_round_trips() {
        let repo = repo();
        let task = task();
        repo.insert(&task).await.expect("insert succeeds");
        let found = repo.find_by_id(task.id).await.expect("find succeeds");
        assert_eq!(found, Some(task));
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_ids() {
        let repo = repo();
        let task = task();
        repo.insert(&task).await.expect("first insert succeeds");
        let err = repo.insert(&task).await.expect_err("duplicate rejected");
        assert!(matches!(err, RepositoryError::DuplicateTask(_)));
    }

    #[tokio::test]
    async fn save_persists_status_transitions() {
        let repo = repo();
        let mut task = task();
        repo.insert(&task).await.expect("insert succeeds");

        task.status = TaskStatus::Running;
        task.started_at = Some(task.created_at);
        repo.save(&task).await.expect("save succeeds");

        let found = repo.find_by_id(task.id).await.expect("find succeeds").expect("task exists");
        assert_eq!(found.status, TaskStatus::Running);
        assert!(found.started_at.is_some());
    }

    #[tokio::test]
    async fn list_filters_by_assignee_and_status() {
        let repo = repo();
        let mut running = task();
        running.status = TaskStatus::Running;
        let pending = task();
        repo.insert(&running).await.expect("insert");
        repo.insert(&pending).await.expect("insert");

        let filter = TaskFilter {
            assigned_to: Some("worker".to_owned()),
            status: Some(TaskStatus::Pending),
            limit: None,
        };
        let results = repo.list(&filter).await.expect("list succeeds");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, pending.id);
    }

    #[tokio::test]
    async fn find_running_for_agent_excludes_other_statuses() {
        let repo = repo();
        let mut running = task();
        running.status = TaskStatus::Running;
        let pending = task();
        repo.insert(&running).await.expect("insert");
        repo.insert(&pending).await.expect("insert");

        let found = repo.find_running_for_agent("worker").await.expect("list succeeds");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, running.id);
    }
}
