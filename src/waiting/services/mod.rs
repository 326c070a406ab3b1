//! Waiting-registry orchestration.

mod registry;

pub use registry::{WaitingAgentView, WaitingRegistryService};
