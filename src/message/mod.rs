//! Message send, read, mark-read, and search.
//!
//! # Architecture
//!
//! - **Domain**: pure types ([`domain::Message`], [`domain::Priority`])
//! - **Ports**: the storage contract ([`ports::repository::MessageRepository`])
//! - **Adapters**: [`adapters::memory::InMemoryMessageRepository`] for tests,
//!   [`adapters::sqlite::SqliteMessageRepository`] for production
//! - **Services**: [`services::MessageService`] orchestrates validation,
//!   session tagging, and repository calls
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use board::message::adapters::memory::InMemoryMessageRepository;
//! use board::message::domain::Priority;
//! use board::message::services::MessageService;
//! use board::retention::RetentionPolicy;
//! use mockable::DefaultClock;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let repo = InMemoryMessageRepository::new(RetentionPolicy {
//!     min_length: 0,
//!     max_age: Duration::from_secs(3_600),
//!     grace: Duration::from_secs(30),
//!     legacy_lossy: false,
//! });
//! let service = MessageService::new(Arc::new(repo), DefaultClock);
//! let outcome = service
//!     .send("alice", "hello", Priority::Normal, None, None, None)
//!     .await
//!     .expect("valid message");
//! assert!(!outcome.id.to_string().is_empty());
//! # }
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod services;
