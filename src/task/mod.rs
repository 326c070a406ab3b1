//! Task lifecycle management: creation, status transitions, cancellation,
//! and per-agent querying.
//!
//! The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]
//!
//! ```
//! # use board::task::{domain::TaskPriority, services::TaskService, adapters::memory::InMemoryTaskRepository};
//! # use std::sync::Arc;
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let service = TaskService::new(Arc::new(InMemoryTaskRepository::new()), mockable::DefaultClock);
//! let id = service.create_task("analyse", None, "worker", "iflow", TaskPriority::Normal).await?;
//! let task = service.get_task_details(id).await?;
//! assert_eq!(task.progress, 0);
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod services;
