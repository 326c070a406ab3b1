//! Port contracts for task lifecycle management.

pub mod repository;

pub use repository::{TaskFilter, TaskRepository, TaskRepositoryResult};
