//! Port contract for the waiting registry.

pub mod repository;

pub use repository::{WaitingRegistryRepository, WaitingRegistryResult};
