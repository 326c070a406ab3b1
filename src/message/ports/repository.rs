//! Repository port for message persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::message::{domain::Message, domain::MessageId, error::RepositoryError};
use crate::session::SessionTag;

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Filters applied by [`MessageRepository::read`].
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    /// Only return messages with `read = false`.
    pub unread_only: bool,
    /// Only return messages from this sender.
    pub sender: Option<String>,
    /// Only return messages addressed to this session.
    pub session: Option<SessionTag>,
    /// Maximum number of rows to return.
    pub limit: Option<u32>,
}

/// Filters applied by [`MessageRepository::search`].
#[derive(Debug, Clone)]
pub struct SearchFilter {
    /// Substring to match against `content`.
    pub keyword: String,
    /// Restrict results to this sender.
    pub sender: Option<String>,
    /// Half-open time range start (inclusive), if any.
    pub start: Option<DateTime<Utc>>,
    /// Half-open time range end (exclusive), if any.
    pub end: Option<DateTime<Utc>>,
    /// Maximum number of rows to return.
    pub limit: Option<u32>,
}

/// Port for message persistence operations.
///
/// Implementations provide the actual storage mechanism (SQLite in
/// production, in-memory for tests) while the service layer remains
/// storage-agnostic. `read` and `search` run retention (see
/// [`crate::retention`]) as a side effect before querying, mirroring the
/// documented "prune before every read" contract; adapters that have no
/// physical rows to prune (the in-memory adapter) implement retention
/// in-process instead of delegating to SQL.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Inserts a new message.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::DuplicateMessage`] if `message.id`
    /// already exists, or a storage error for any other backend failure.
    async fn insert(&self, message: &Message) -> RepositoryResult<()>;

    /// Inserts every message in `batch` as one atomic store operation: if
    /// any element fails to insert, none of the batch is persisted.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::DuplicateMessage`] if any element's `id`
    /// already exists, or a storage error for any other backend failure.
    async fn insert_batch(&self, batch: &[Message]) -> RepositoryResult<()>;

    /// Lists messages matching `filter`, applying retention first and
    /// ordering by timestamp descending.
    ///
    /// # Errors
    ///
    /// Returns a storage error on backend failure.
    async fn read(&self, filter: &MessageFilter) -> RepositoryResult<Vec<Message>>;

    /// Flips `read = true` for every id in `ids` that exists.
    ///
    /// Returns the number of rows actually updated; unknown ids are
    /// silently ignored.
    ///
    /// # Errors
    ///
    /// Returns a storage error on backend failure.
    async fn mark_read(&self, ids: &[MessageId]) -> RepositoryResult<u64>;

    /// Substring-searches `content`, honouring the optional sender and
    /// half-open time range in `filter`.
    ///
    /// # Errors
    ///
    /// Returns a storage error on backend failure.
    async fn search(&self, filter: &SearchFilter) -> RepositoryResult<Vec<Message>>;

    /// Polls for the first undelivered candidate visible to `waiter`,
    /// ordered by timestamp ascending. Used by the blocking wait loop;
    /// does not apply retention (a wait must not race its own pruning
    /// against messages that just arrived).
    ///
    /// # Errors
    ///
    /// Returns a storage error on backend failure.
    async fn poll_candidate(&self, waiter: &WaitFilter) -> RepositoryResult<Option<Message>>;
}

/// Filter describing what counts as a delivery candidate for one waiter,
/// per §4.8 step 3 of the design.
#[derive(Debug, Clone)]
pub struct WaitFilter {
    /// The waiting agent; never receives its own messages.
    pub client_id: String,
    /// Only consider messages strictly newer than this, if set.
    pub last_seen: Option<DateTime<Utc>>,
    /// Only consider messages addressed to this session, if set.
    pub session: Option<SessionTag>,
    /// Ids already inspected and rejected earlier in this same wait call.
    pub exclude_ids: Vec<MessageId>,
}
