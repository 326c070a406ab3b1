//! Application services for the message subsystem.

mod message_service;

pub use message_service::{MessageService, SendError};
