//! The JSON-RPC dispatcher: reads line-delimited requests from standard
//! input, routes them to the service layer, and writes one response per
//! line.
//!
//! The wire protocol is JSON-RPC 2.0 with three method families mirroring
//! the Model Context Protocol's shape (`initialize`, `tools/list`,
//! `tools/call`, `resources/list`, `resources/read`) without depending on
//! an MCP server crate: no example in the retrieval pack grounds a
//! server-side MCP implementation, so the dispatcher is hand-rolled on top
//! of `serde_json` and `tokio`'s stdio primitives, in the same spirit as
//! the teacher crate's own hexagonal service boundaries.

mod board_server;
mod protocol;
mod tools;

pub use board_server::BoardServer;
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
