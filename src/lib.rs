//! board: a local, persistent message-and-task broker for autonomous CLI agents.
//!
//! Multiple independent agent processes exchange messages, queue and execute
//! tasks, and observe each other's liveness through this crate's services,
//! all backed by a single embedded relational store. The broker itself is
//! exposed to agents over a line-delimited JSON-RPC (Model Context Protocol)
//! surface; see [`rpc`].
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture throughout:
//!
//! - **Domain**: pure types with no infrastructure dependencies
//! - **Ports**: abstract trait interfaces for persistence
//! - **Adapters**: concrete implementations (in-memory for tests, SQLite for production)
//! - **Services**: orchestration logic that composes ports into the behaviour described below
//!
//! # Modules
//!
//! - [`message`]: sending, reading, searching, and acknowledging messages
//! - [`task`]: task creation, assignment, and lifecycle tracking
//! - [`waiting`]: the waiting-agent registry (who is blocked, since when, how recently alive)
//! - [`session`]: the session-tag codec that multiplexes one agent identity across instances
//! - [`retention`]: the lazy cleanup policy applied before reads
//! - [`wait`]: the blocking `wait_for_message` primitive
//! - [`sweeper`]: liveness detection and stale-task failure
//! - [`store`]: the shared SQLite connection pool and schema
//! - [`config`]: environment-derived runtime configuration
//! - [`rpc`]: the JSON-RPC/MCP dispatcher

pub mod config;
pub mod message;
pub mod retention;
pub mod rpc;
pub mod session;
pub mod store;
pub mod sweeper;
pub mod task;
pub mod wait;
pub mod waiting;
