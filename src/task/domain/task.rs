//! Task aggregate root.

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

use super::{TaskId, TaskPriority, TaskStatus};

/// A unit of work assigned to one agent.
///
/// Invariants: `status` transitions follow the DAG documented on
/// [`TaskStatus`]; `completed_at` is set exactly when `status` enters
/// `completed` or `failed`; `progress` is non-decreasing while `status`
/// is `running`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier.
    pub id: TaskId,
    /// Human-readable title.
    pub title: String,
    /// Optional longer description.
    pub description: Option<String>,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// Agent identity this task is assigned to.
    pub assigned_to: String,
    /// Agent identity that created this task.
    pub created_by: String,
    /// Priority level.
    pub priority: TaskPriority,
    /// Completion percentage, `0..=100`.
    pub progress: u8,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the most recent update.
    pub updated_at: DateTime<Utc>,
    /// When the task entered `running`, if it has.
    pub started_at: Option<DateTime<Utc>>,
    /// When the task entered a terminal status, if it has.
    pub completed_at: Option<DateTime<Utc>>,
    /// Diagnostic message set on failure or cancellation.
    pub error_message: Option<String>,
    /// Free-form result payload set on completion.
    pub result: Option<String>,
}

impl Task {
    /// Constructs a new, `pending` task with zero progress.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        description: Option<String>,
        assigned_to: impl Into<String>,
        created_by: impl Into<String>,
        priority: TaskPriority,
        clock: &impl Clock,
    ) -> Self {
        let now = clock.utc();
        Self {
            id: TaskId::new(),
            title: title.into(),
            description,
            status: TaskStatus::Pending,
            assigned_to: assigned_to.into(),
            created_by: created_by.into(),
            priority,
            progress: 0,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            error_message: None,
            result: None,
        }
    }
}
