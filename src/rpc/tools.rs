//! Static tool catalogue served by `tools/list`.

use serde_json::{Value, json};

/// One entry in the `tools/list` response, mirroring the shape the Model
/// Context Protocol uses for tool discovery.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolDefinition {
    /// Tool name, passed as `tools/call`'s `name` argument.
    pub name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// JSON Schema describing `arguments`.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

fn tool(name: &'static str, description: &'static str, input_schema: Value) -> ToolDefinition {
    ToolDefinition { name, description, input_schema }
}

/// Returns the full catalogue of callable operations.
#[must_use]
pub fn catalogue() -> Vec<ToolDefinition> {
    vec![
        tool(
            "send",
            "Send a message to the board.",
            json!({
                "type": "object",
                "properties": {
                    "sender": {"type": "string"},
                    "content": {"type": "string"},
                    "priority": {"type": "string", "enum": ["normal", "high", "urgent"]},
                    "reply_to": {"type": ["string", "null"]},
                    "session": {"type": ["string", "null"]},
                    "metadata": {}
                },
                "required": ["sender", "content"]
            }),
        ),
        tool(
            "read",
            "List messages matching a filter.",
            json!({
                "type": "object",
                "properties": {
                    "unread_only": {"type": "boolean"},
                    "sender": {"type": ["string", "null"]},
                    "session": {"type": ["string", "null"]},
                    "limit": {"type": ["integer", "null"]}
                }
            }),
        ),
        tool(
            "mark_read",
            "Mark the given message ids as read.",
            json!({
                "type": "object",
                "properties": {"ids": {"type": "array", "items": {"type": "string"}}},
                "required": ["ids"]
            }),
        ),
        tool(
            "search",
            "Substring-search message content.",
            json!({
                "type": "object",
                "properties": {
                    "keyword": {"type": "string"},
                    "sender": {"type": ["string", "null"]},
                    "start": {"type": ["string", "null"]},
                    "end": {"type": ["string", "null"]},
                    "limit": {"type": ["integer", "null"]}
                },
                "required": ["keyword"]
            }),
        ),
        tool(
            "send_batch",
            "Send several messages as one atomic operation.",
            json!({
                "type": "object",
                "properties": {
                    "messages": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "sender": {"type": "string"},
                                "content": {"type": "string"},
                                "priority": {"type": "string", "enum": ["normal", "high", "urgent"]},
                                "reply_to": {"type": ["string", "null"]},
                                "session": {"type": ["string", "null"]}
                            },
                            "required": ["sender", "content"]
                        }
                    }
                },
                "required": ["messages"]
            }),
        ),
        tool(
            "create_task",
            "Create a new pending task.",
            json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "description": {"type": ["string", "null"]},
                    "assigned_to": {"type": "string"},
                    "created_by": {"type": "string"},
                    "priority": {"type": "string", "enum": ["urgent", "high", "normal", "low"]}
                },
                "required": ["title", "assigned_to", "created_by"]
            }),
        ),
        tool(
            "update_task",
            "Apply a partial update to a task.",
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string"},
                    "status": {"type": ["string", "null"], "enum": ["pending", "running", "completed", "failed", null]},
                    "progress": {"type": ["integer", "null"]},
                    "result": {"type": ["string", "null"]},
                    "error_message": {"type": ["string", "null"]}
                },
                "required": ["id"]
            }),
        ),
        tool(
            "cancel_task",
            "Cancel a task; idempotent.",
            json!({"type": "object", "properties": {"id": {"type": "string"}}, "required": ["id"]}),
        ),
        tool(
            "get_tasks",
            "List tasks matching a filter.",
            json!({
                "type": "object",
                "properties": {
                    "assigned_to": {"type": ["string", "null"]},
                    "status": {"type": ["string", "null"]},
                    "limit": {"type": ["integer", "null"]}
                }
            }),
        ),
        tool(
            "get_my_tasks",
            "List tasks assigned to one agent.",
            json!({
                "type": "object",
                "properties": {
                    "agent_id": {"type": "string"},
                    "status": {"type": ["string", "null"]},
                    "limit": {"type": ["integer", "null"]}
                },
                "required": ["agent_id"]
            }),
        ),
        tool(
            "get_task_details",
            "Fetch full detail for one task.",
            json!({"type": "object", "properties": {"id": {"type": "string"}}, "required": ["id"]}),
        ),
        tool(
            "register_waiting",
            "Register or refresh a waiting-agent record.",
            json!({
                "type": "object",
                "properties": {
                    "agent_id": {"type": "string"},
                    "agent_type": {"type": ["string", "null"]},
                    "capabilities": {},
                    "status": {"type": "string", "enum": ["idle", "working", "waiting"]},
                    "task_id": {"type": ["string", "null"]},
                    "progress": {"type": ["integer", "null"]}
                },
                "required": ["agent_id"]
            }),
        ),
        tool(
            "unregister_waiting",
            "Remove a waiting-agent record.",
            json!({"type": "object", "properties": {"agent_id": {"type": "string"}}, "required": ["agent_id"]}),
        ),
        tool(
            "heartbeat",
            "Refresh an agent's heartbeat, optionally syncing task progress.",
            json!({
                "type": "object",
                "properties": {
                    "agent_id": {"type": "string"},
                    "task_id": {"type": ["string", "null"]},
                    "progress": {"type": ["integer", "null"]}
                },
                "required": ["agent_id"]
            }),
        ),
        tool(
            "report_status",
            "Report an agent's activity status.",
            json!({
                "type": "object",
                "properties": {
                    "agent_id": {"type": "string"},
                    "status": {"type": "string", "enum": ["idle", "working", "waiting"]},
                    "task_id": {"type": ["string", "null"]},
                    "progress": {"type": ["integer", "null"]}
                },
                "required": ["agent_id", "status"]
            }),
        ),
        tool(
            "get_waiting_agents",
            "List waiting agents with derived liveness fields.",
            json!({"type": "object", "properties": {"agent_type": {"type": ["string", "null"]}}}),
        ),
        tool(
            "wait_for_message",
            "Block until a matching message arrives or the timeout elapses.",
            json!({
                "type": "object",
                "properties": {
                    "timeout": {"type": "number"},
                    "client_id": {"type": "string"},
                    "session": {"type": ["string", "null"]},
                    "last_seen": {"type": ["string", "null"]},
                    "agent_type": {"type": ["string", "null"]},
                    "capabilities": {},
                    "status": {"type": "string", "enum": ["idle", "working", "waiting"]},
                    "task_id": {"type": ["string", "null"]},
                    "progress": {"type": ["integer", "null"]}
                },
                "required": ["timeout", "client_id"]
            }),
        ),
        tool(
            "check_offline_agents",
            "Mark stale waiters offline and fail their running tasks.",
            json!({"type": "object", "properties": {"timeout_seconds": {"type": ["integer", "null"]}}}),
        ),
    ]
}
