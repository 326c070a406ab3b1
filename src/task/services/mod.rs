//! Application services for task lifecycle orchestration.

mod task_service;

pub use task_service::{TaskService, TaskServiceError, TaskUpdate};
