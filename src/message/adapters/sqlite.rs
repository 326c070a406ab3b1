//! SQLite-backed implementation of the `MessageRepository` port.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Row, params};

use crate::message::{
    domain::{Message, MessageId, Priority},
    error::RepositoryError,
    ports::repository::{MessageFilter, MessageRepository, RepositoryResult, SearchFilter, WaitFilter},
};
use crate::retention::RetentionPolicy;
use crate::session::{self, SessionTag};
use crate::store::Store;

/// Production [`MessageRepository`] backed by the shared [`Store`].
#[derive(Clone)]
pub struct SqliteMessageRepository {
    store: Store,
    retention: RetentionPolicy,
}

impl SqliteMessageRepository {
    /// Wraps `store`, applying `retention` before every `read`.
    #[must_use]
    pub fn new(store: Store, retention: RetentionPolicy) -> Self {
        Self { store, retention }
    }
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    let id: String = row.get("id")?;
    let timestamp: i64 = row.get("timestamp")?;
    let read: bool = row.get("read")?;
    let reply_to: Option<String> = row.get("reply_to")?;
    let priority: String = row.get("priority")?;
    let metadata: Option<String> = row.get("metadata")?;
    let raw_content: String = row.get("content")?;
    let session_id: Option<String> = row.get("session_id")?;

    let (decoded_tag, decoded_content) = session::decode(&raw_content);
    let session = session_id.map(SessionTag::new).or(decoded_tag);

    Ok(Message {
        id: MessageId::parse(&id).unwrap_or_else(|_| MessageId::new()),
        sender: row.get("sender")?,
        content: decoded_content.to_owned(),
        timestamp: Utc.timestamp_opt(timestamp, 0).single().unwrap_or_else(Utc::now),
        read,
        reply_to: reply_to.and_then(|r| MessageId::parse(&r).ok()),
        priority: priority.parse().unwrap_or(Priority::Normal),
        metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
        session,
    })
}

#[async_trait]
impl MessageRepository for SqliteMessageRepository {
    async fn insert(&self, message: &Message) -> RepositoryResult<()> {
        let store = self.store.clone();
        let message = message.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.get().map_err(RepositoryError::storage)?;
            let metadata = message.metadata.as_ref().map(std::string::ToString::to_string);
            let result = conn.execute(
                "INSERT INTO messages (id, sender, content, timestamp, read, reply_to, priority, metadata, session_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    message.id.to_string(),
                    message.sender,
                    message.content,
                    message.timestamp.timestamp(),
                    message.read,
                    message.reply_to.map(|id| id.to_string()),
                    message.priority.as_str(),
                    metadata,
                    message.session.as_ref().map(SessionTag::as_str),
                ],
            );
            match result {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Err(RepositoryError::DuplicateMessage(message.id))
                }
                Err(err) => Err(RepositoryError::storage(err)),
            }
        })
        .await
        .map_err(RepositoryError::storage)?
    }

    async fn insert_batch(&self, batch: &[Message]) -> RepositoryResult<()> {
        let store = self.store.clone();
        let batch = batch.to_vec();
        tokio::task::spawn_blocking(move || {
            let mut conn = store.get().map_err(RepositoryError::storage)?;
            let tx = conn.transaction().map_err(RepositoryError::storage)?;
            for message in &batch {
                let metadata = message.metadata.as_ref().map(std::string::ToString::to_string);
                let result = tx.execute(
                    "INSERT INTO messages (id, sender, content, timestamp, read, reply_to, priority, metadata, session_id)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        message.id.to_string(),
                        message.sender,
                        message.content,
                        message.timestamp.timestamp(),
                        message.read,
                        message.reply_to.map(|id| id.to_string()),
                        message.priority.as_str(),
                        metadata,
                        message.session.as_ref().map(SessionTag::as_str),
                    ],
                );
                match result {
                    Ok(_) => {}
                    Err(rusqlite::Error::SqliteFailure(err, _))
                        if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                    {
                        return Err(RepositoryError::DuplicateMessage(message.id));
                    }
                    Err(err) => return Err(RepositoryError::storage(err)),
                }
            }
            tx.commit().map_err(RepositoryError::storage)?;
            Ok(())
        })
        .await
        .map_err(RepositoryError::storage)?
    }

    async fn read(&self, filter: &MessageFilter) -> RepositoryResult<Vec<Message>> {
        let store = self.store.clone();
        let retention = self.retention;
        let filter = filter.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = store.get().map_err(RepositoryError::storage)?;
            retention
                .sweep(&mut conn, &mockable::DefaultClock)
                .map_err(RepositoryError::storage)?;

            let mut sql = String::from("SELECT * FROM messages WHERE 1=1");
            if filter.unread_only {
                sql.push_str(" AND read = 0");
            }
            if filter.sender.is_some() {
                sql.push_str(" AND sender = ?1");
            }
            sql.push_str(" ORDER BY timestamp DESC");
            if let Some(limit) = filter.limit {
                sql.push_str(&format!(" LIMIT {limit}"));
            }

            let mut stmt = conn.prepare(&sql).map_err(RepositoryError::storage)?;
            let rows: Vec<Message> = if let Some(sender) = &filter.sender {
                stmt.query_map(params![sender], row_to_message)
                    .map_err(RepositoryError::storage)?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(RepositoryError::storage)?
            } else {
                stmt.query_map([], row_to_message)
                    .map_err(RepositoryError::storage)?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(RepositoryError::storage)?
            };

            Ok(rows
                .into_iter()
                .filter(|m| {
                    filter.session.as_ref().is_none_or(|tag| m.session.as_ref() == Some(tag))
                })
                .collect())
        })
        .await
        .map_err(RepositoryError::storage)?
    }

    async fn mark_read(&self, ids: &[MessageId]) -> RepositoryResult<u64> {
        let store = self.store.clone();
        let ids: Vec<String> = ids.iter().map(std::string::ToString::to_string).collect();
        tokio::task::spawn_blocking(move || {
            let conn = store.get().map_err(RepositoryError::storage)?;
            let mut updated = 0u64;
            for id in ids {
                let count = conn
                    .execute("UPDATE messages SET read = 1 WHERE id = ?1 AND read = 0", params![id])
                    .map_err(RepositoryError::storage)?;
                updated += u64::try_from(count).unwrap_or(0);
            }
            Ok(updated)
        })
        .await
        .map_err(RepositoryError::storage)?
    }

    async fn search(&self, filter: &SearchFilter) -> RepositoryResult<Vec<Message>> {
        let store = self.store.clone();
        let filter = filter.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.get().map_err(RepositoryError::storage)?;
            let mut sql = String::from("SELECT * FROM messages WHERE content LIKE ?1 ESCAPE '\\'");
            let pattern = format!("%{}%", escape_like(&filter.keyword));
            let mut sender_idx = None;
            let mut start_idx = None;
            let mut end_idx = None;
            let mut next_idx = 2;
            if filter.sender.is_some() {
                sql.push_str(&format!(" AND sender = ?{next_idx}"));
                sender_idx = Some(next_idx);
                next_idx += 1;
            }
            if filter.start.is_some() {
                sql.push_str(&format!(" AND timestamp >= ?{next_idx}"));
                start_idx = Some(next_idx);
                next_idx += 1;
            }
            if filter.end.is_some() {
                sql.push_str(&format!(" AND timestamp < ?{next_idx}"));
                end_idx = Some(next_idx);
            }
            sql.push_str(" ORDER BY timestamp DESC");
            if let Some(limit) = filter.limit {
                sql.push_str(&format!(" LIMIT {limit}"));
            }

            let mut stmt = conn.prepare(&sql).map_err(RepositoryError::storage)?;
            let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(pattern)];
            if sender_idx.is_some() {
                values.push(Box::new(filter.sender.clone()));
            }
            if start_idx.is_some() {
                values.push(Box::new(filter.start.map(|t: DateTime<Utc>| t.timestamp())));
            }
            if end_idx.is_some() {
                values.push(Box::new(filter.end.map(|t: DateTime<Utc>| t.timestamp())));
            }
            let params_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(std::convert::AsRef::as_ref).collect();

            let rows = stmt
                .query_map(params_refs.as_slice(), row_to_message)
                .map_err(RepositoryError::storage)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(RepositoryError::storage)?;
            Ok(rows)
        })
        .await
        .map_err(RepositoryError::storage)?
    }

    async fn poll_candidate(&self, waiter: &WaitFilter) -> RepositoryResult<Option<Message>> {
        let store = self.store.clone();
        let waiter = waiter.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.get().map_err(RepositoryError::storage)?;
            let mut sql = String::from(
                "SELECT * FROM messages WHERE read = 0 AND sender != ?1",
            );
            let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(waiter.client_id.clone())];
            if let Some(last_seen) = waiter.last_seen {
                sql.push_str(&format!(" AND timestamp > ?{}", values.len() + 1));
                values.push(Box::new(last_seen.timestamp()));
            }
            sql.push_str(" ORDER BY timestamp ASC");

            let mut stmt = conn.prepare(&sql).map_err(RepositoryError::storage)?;
            let params_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(std::convert::AsRef::as_ref).collect();
            let rows = stmt
                .query_map(params_refs.as_slice(), row_to_message)
                .map_err(RepositoryError::storage)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(RepositoryError::storage)?;

            let first = rows.into_iter().find(|m| {
                !waiter.exclude_ids.contains(&m.id)
                    && waiter.session.as_ref().is_none_or(|tag| {
                        m.session.as_ref() == Some(tag) || session::content_matches_tag(&m.content, tag)
                    })
            });
            Ok(first)
        })
        .await
        .map_err(RepositoryError::storage)?
    }
}

/// Escapes `%` and `_` for use inside a SQL `LIKE` pattern with `ESCAPE '\'`.
fn escape_like(input: &str) -> String {
    input.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}
