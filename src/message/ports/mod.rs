//! Port trait definitions for the message subsystem.

pub mod repository;

pub use repository::{MessageFilter, MessageRepository, RepositoryResult, SearchFilter};
