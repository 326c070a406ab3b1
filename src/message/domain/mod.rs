//! Domain types for the message subsystem: pure, storage-agnostic values
//! with no infrastructure dependencies.

mod ids;
mod message;
mod priority;

pub use ids::MessageId;
pub use message::Message;
pub use priority::{ParsePriorityError, Priority};
