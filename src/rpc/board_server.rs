//! `BoardServer`: wires the service layer to the JSON-RPC surface and
//! serves it over standard input/output.

use std::sync::Arc;
use std::time::Duration;

use mockable::Clock;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::message::domain::{MessageId, Priority};
use crate::message::ports::repository::{MessageFilter, SearchFilter};
use crate::message::services::{MessageService, SendError};
use crate::session::SessionTag;
use crate::sweeper::LivenessSweeper;
use crate::task::domain::{TaskId, TaskPriority, TaskStatus};
use crate::task::ports::repository::TaskFilter;
use crate::task::services::{TaskService, TaskServiceError, TaskUpdate};
use crate::wait::{WaitCoordinator, WaitOutcome, WaitRequest};
use crate::waiting::domain::AgentStatus;
use crate::waiting::services::WaitingRegistryService;

use super::protocol::{INTERNAL_ERROR, INVALID_PARAMS, JsonRpcError, JsonRpcRequest, JsonRpcResponse, METHOD_NOT_FOUND};
use super::tools;

const PROTOCOL_DOC: &str = include_str!("../../docs/protocol.md");
const SERVER_NAME: &str = "board";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The broker's request-handling engine, wired to one set of services.
pub struct BoardServer<C: Clock + Clone + Send + Sync + 'static> {
    messages: Arc<MessageService<C>>,
    tasks: Arc<TaskService<C>>,
    waiting: Arc<WaitingRegistryService<C>>,
    wait: Arc<WaitCoordinator<C>>,
    sweeper: Arc<LivenessSweeper<C>>,
    default_sweeper_timeout: u64,
}

impl<C: Clock + Clone + Send + Sync + 'static> BoardServer<C> {
    /// Wires already-constructed services into one dispatcher.
    pub fn new(
        messages: MessageService<C>,
        tasks: TaskService<C>,
        waiting: WaitingRegistryService<C>,
        wait: WaitCoordinator<C>,
        sweeper: LivenessSweeper<C>,
        default_sweeper_timeout: Duration,
    ) -> Self {
        Self {
            messages: Arc::new(messages),
            tasks: Arc::new(tasks),
            waiting: Arc::new(waiting),
            wait: Arc::new(wait),
            sweeper: Arc::new(sweeper),
            default_sweeper_timeout: default_sweeper_timeout.as_secs(),
        }
    }

    /// Serves line-delimited JSON-RPC requests from `input`, writing
    /// responses to `output`, until `input` reaches end-of-file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if reading from `input` or writing to `output`
    /// fails.
    pub async fn serve(
        &self,
        input: impl tokio::io::AsyncRead + Unpin,
        mut output: impl tokio::io::AsyncWrite + Unpin,
    ) -> std::io::Result<()> {
        let mut lines = BufReader::new(input).lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let response = self.handle_line(&line).await;
            let encoded = serde_json::to_string(&response).unwrap_or_else(|_| {
                "{\"jsonrpc\":\"2.0\",\"id\":null,\"error\":{\"code\":-32603,\"message\":\"response encoding failed\"}}"
                    .to_owned()
            });
            output.write_all(encoded.as_bytes()).await?;
            output.write_all(b"\n").await?;
            output.flush().await?;
        }
        Ok(())
    }

    async fn handle_line(&self, line: &str) -> JsonRpcResponse {
        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(err) => {
                return JsonRpcResponse::failure(
                    Value::Null,
                    JsonRpcError::new(super::protocol::PARSE_ERROR, format!("invalid JSON-RPC request: {err}")),
                );
            }
        };
        let id = request.id.clone();
        match self.dispatch(&request).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        }
    }

    async fn dispatch(&self, request: &JsonRpcRequest) -> Result<Value, JsonRpcError> {
        match request.method.as_str() {
            "initialize" => Ok(json!({
                "name": SERVER_NAME,
                "version": SERVER_VERSION,
                "capabilities": {"tools": {}, "resources": {}},
            })),
            "tools/list" => Ok(json!({"tools": tools::catalogue()})),
            "resources/list" => {
                Ok(json!({"resources": [{"uri": "board://protocol", "name": "protocol", "mimeType": "text/markdown"}]}))
            }
            "resources/read" => self.read_resource(&request.params),
            "tools/call" => self.call_tool(&request.params).await,
            other => Err(JsonRpcError::new(METHOD_NOT_FOUND, format!("unknown method: {other}"))),
        }
    }

    fn read_resource(&self, params: &Value) -> Result<Value, JsonRpcError> {
        let uri = params.get("uri").and_then(Value::as_str).unwrap_or_default();
        if uri == "board://protocol" {
            Ok(json!({"contents": [{"uri": uri, "mimeType": "text/markdown", "text": PROTOCOL_DOC}]}))
        } else {
            Err(JsonRpcError::new(INVALID_PARAMS, format!("unknown resource: {uri}")))
        }
    }

    async fn call_tool(&self, params: &Value) -> Result<Value, JsonRpcError> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| JsonRpcError::new(INVALID_PARAMS, "missing tool name"))?;
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        let result = self.invoke(name, arguments).await?;
        Ok(json!({"content": [{"type": "text", "text": result.to_string()}]}))
    }

    async fn invoke(&self, name: &str, arguments: Value) -> Result<Value, JsonRpcError> {
        match name {
            "send" => self.handle_send(arguments).await,
            "read" => self.handle_read(arguments).await,
            "mark_read" => self.handle_mark_read(arguments).await,
            "search" => self.handle_search(arguments).await,
            "send_batch" => self.handle_send_batch(arguments).await,
            "create_task" => self.handle_create_task(arguments).await,
            "update_task" => self.handle_update_task(arguments).await,
            "cancel_task" => self.handle_cancel_task(arguments).await,
            "get_tasks" => self.handle_get_tasks(arguments).await,
            "get_my_tasks" => self.handle_get_my_tasks(arguments).await,
            "get_task_details" => self.handle_get_task_details(arguments).await,
            "register_waiting" => self.handle_register_waiting(arguments).await,
            "unregister_waiting" => self.handle_unregister_waiting(arguments).await,
            "heartbeat" => self.handle_heartbeat(arguments).await,
            "report_status" => self.handle_report_status(arguments).await,
            "get_waiting_agents" => self.handle_get_waiting_agents(arguments).await,
            "wait_for_message" => self.handle_wait_for_message(arguments).await,
            "check_offline_agents" => self.handle_check_offline_agents(arguments).await,
            other => Err(JsonRpcError::new(METHOD_NOT_FOUND, format!("unknown tool: {other}"))),
        }
    }

    async fn handle_send(&self, arguments: Value) -> Result<Value, JsonRpcError> {
        let sender = required_str(&arguments, "sender")?;
        let content = required_str(&arguments, "content")?;
        let priority = optional_priority(&arguments)?;
        let reply_to = optional_message_id(&arguments, "reply_to")?;
        let session = optional_session(&arguments, "session");
        let metadata = arguments.get("metadata").cloned();

        let outcome = self
            .messages
            .send(sender, content, priority, reply_to, session, metadata)
            .await
            .map_err(send_error)?;
        Ok(json!({"id": outcome.id, "timestamp": outcome.timestamp, "session": outcome.session}))
    }

    async fn handle_read(&self, arguments: Value) -> Result<Value, JsonRpcError> {
        let filter = MessageFilter {
            unread_only: arguments.get("unread_only").and_then(Value::as_bool).unwrap_or(false),
            sender: optional_string(&arguments, "sender"),
            session: optional_session(&arguments, "session"),
            limit: optional_u32(&arguments, "limit"),
        };
        let messages = self.messages.read(filter).await.map_err(storage_error)?;
        Ok(json!({"messages": messages}))
    }

    async fn handle_mark_read(&self, arguments: Value) -> Result<Value, JsonRpcError> {
        let ids = arguments
            .get("ids")
            .and_then(Value::as_array)
            .ok_or_else(|| JsonRpcError::new(INVALID_PARAMS, "missing ids"))?
            .iter()
            .map(|v| v.as_str().ok_or_else(|| JsonRpcError::new(INVALID_PARAMS, "ids must be strings")))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|s| MessageId::parse(s).map_err(|err| JsonRpcError::new(INVALID_PARAMS, err.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        let updated = self.messages.mark_read(&ids).await.map_err(storage_error)?;
        Ok(json!({"updated": updated}))
    }

    async fn handle_search(&self, arguments: Value) -> Result<Value, JsonRpcError> {
        let keyword = required_str(&arguments, "keyword")?;
        let filter = SearchFilter {
            keyword,
            sender: optional_string(&arguments, "sender"),
            start: optional_timestamp(&arguments, "start")?,
            end: optional_timestamp(&arguments, "end")?,
            limit: optional_u32(&arguments, "limit"),
        };
        let messages = self.messages.search(filter).await.map_err(send_error)?;
        Ok(json!({"messages": messages}))
    }

    async fn handle_send_batch(&self, arguments: Value) -> Result<Value, JsonRpcError> {
        let entries = arguments
            .get("messages")
            .and_then(Value::as_array)
            .ok_or_else(|| JsonRpcError::new(INVALID_PARAMS, "missing messages"))?;
        let mut batch = Vec::with_capacity(entries.len());
        for entry in entries {
            let sender = required_str(entry, "sender")?;
            let content = required_str(entry, "content")?;
            let priority = optional_priority(entry)?;
            let reply_to = optional_message_id(entry, "reply_to")?;
            let session = optional_session(entry, "session");
            batch.push((sender, content, priority, reply_to, session));
        }
        let ids = self.messages.send_batch(batch).await.map_err(send_error)?;
        Ok(json!({"ids": ids}))
    }

    async fn handle_create_task(&self, arguments: Value) -> Result<Value, JsonRpcError> {
        let title = required_str(&arguments, "title")?;
        let description = optional_string(&arguments, "description");
        let assigned_to = required_str(&arguments, "assigned_to")?;
        let created_by = required_str(&arguments, "created_by")?;
        let priority = arguments
            .get("priority")
            .and_then(Value::as_str)
            .map(str::parse::<TaskPriority>)
            .transpose()
            .map_err(|err| JsonRpcError::new(INVALID_PARAMS, err.to_string()))?
            .unwrap_or_default();
        let id = self
            .tasks
            .create_task(title, description, assigned_to, created_by, priority)
            .await
            .map_err(task_service_error)?;
        Ok(json!({"id": id}))
    }

    async fn handle_update_task(&self, arguments: Value) -> Result<Value, JsonRpcError> {
        let id = required_task_id(&arguments)?;
        let status = arguments
            .get("status")
            .and_then(Value::as_str)
            .map(str::parse::<TaskStatus>)
            .transpose()
            .map_err(|err| JsonRpcError::new(INVALID_PARAMS, err.to_string()))?;
        let update = TaskUpdate {
            status,
            progress: optional_u8(&arguments, "progress"),
            result: optional_string(&arguments, "result"),
            error_message: optional_string(&arguments, "error_message"),
        };
        let updated = self.tasks.update_task(id, update).await.map_err(task_service_error)?;
        Ok(json!({"updated": updated}))
    }

    async fn handle_cancel_task(&self, arguments: Value) -> Result<Value, JsonRpcError> {
        let id = required_task_id(&arguments)?;
        let cancelled = self.tasks.cancel_task(id).await.map_err(task_service_error)?;
        Ok(json!({"cancelled": cancelled}))
    }

    async fn handle_get_tasks(&self, arguments: Value) -> Result<Value, JsonRpcError> {
        let filter = TaskFilter {
            assigned_to: optional_string(&arguments, "assigned_to"),
            status: optional_task_status(&arguments)?,
            limit: optional_u32(&arguments, "limit"),
        };
        let tasks = self.tasks.get_tasks(filter).await.map_err(storage_error)?;
        Ok(json!({"tasks": tasks}))
    }

    async fn handle_get_my_tasks(&self, arguments: Value) -> Result<Value, JsonRpcError> {
        let agent_id = required_str(&arguments, "agent_id")?;
        let status = optional_task_status(&arguments)?;
        let limit = optional_u32(&arguments, "limit");
        let tasks = self.tasks.get_my_tasks(agent_id, status, limit).await.map_err(storage_error)?;
        Ok(json!({"tasks": tasks}))
    }

    async fn handle_get_task_details(&self, arguments: Value) -> Result<Value, JsonRpcError> {
        let id = required_task_id(&arguments)?;
        match self.tasks.get_task_details(id).await {
            Ok(task) => Ok(json!({"success": true, "task": task})),
            Err(TaskServiceError::NotFound(_)) => Ok(json!({"success": false, "error": "task not found"})),
            Err(err) => Err(task_service_error(err)),
        }
    }

    async fn handle_register_waiting(&self, arguments: Value) -> Result<Value, JsonRpcError> {
        let agent_id = required_str(&arguments, "agent_id")?;
        let agent_type = optional_string(&arguments, "agent_type");
        let capabilities = arguments.get("capabilities").cloned();
        let status = optional_agent_status(&arguments)?.unwrap_or_default();
        let task_id = optional_task_id(&arguments, "task_id")?;
        let progress = optional_u8(&arguments, "progress");
        self.waiting
            .register_waiting(agent_id, agent_type, capabilities, status, task_id, progress)
            .await
            .map_err(|err| JsonRpcError::new(INTERNAL_ERROR, err.to_string()))?;
        Ok(json!({"registered": true}))
    }

    async fn handle_unregister_waiting(&self, arguments: Value) -> Result<Value, JsonRpcError> {
        let agent_id = required_str(&arguments, "agent_id")?;
        self.waiting.unregister_waiting(&agent_id).await.map_err(storage_error)?;
        Ok(json!({"unregistered": true}))
    }

    async fn handle_heartbeat(&self, arguments: Value) -> Result<Value, JsonRpcError> {
        let agent_id = required_str(&arguments, "agent_id")?;
        let task_id = optional_task_id(&arguments, "task_id")?;
        let progress = optional_u8(&arguments, "progress");
        self.waiting
            .heartbeat(&agent_id, task_id, progress)
            .await
            .map_err(|err| JsonRpcError::new(INTERNAL_ERROR, err.to_string()))?;
        Ok(json!({"success": true}))
    }

    async fn handle_report_status(&self, arguments: Value) -> Result<Value, JsonRpcError> {
        let agent_id = required_str(&arguments, "agent_id")?;
        let status = optional_agent_status(&arguments)?.ok_or_else(|| JsonRpcError::new(INVALID_PARAMS, "missing status"))?;
        let task_id = optional_task_id(&arguments, "task_id")?;
        let progress = optional_u8(&arguments, "progress");
        self.waiting
            .report_status(&agent_id, status, task_id, progress)
            .await
            .map_err(|err| JsonRpcError::new(INTERNAL_ERROR, err.to_string()))?;
        Ok(json!({"success": true}))
    }

    async fn handle_get_waiting_agents(&self, arguments: Value) -> Result<Value, JsonRpcError> {
        let agent_type = optional_string(&arguments, "agent_type");
        let views = self.waiting.get_waiting_agents(agent_type.as_deref()).await.map_err(storage_error)?;
        let serialised: Vec<Value> = views
            .into_iter()
            .map(|view| {
                json!({
                    "agent": view.agent,
                    "waiting_duration": view.waiting_duration.as_secs_f64(),
                    "heartbeat_age": view.heartbeat_age.as_secs_f64(),
                    "is_timeout": view.is_timeout,
                })
            })
            .collect();
        Ok(json!({"agents": serialised}))
    }

    async fn handle_wait_for_message(&self, arguments: Value) -> Result<Value, JsonRpcError> {
        let timeout_secs = arguments
            .get("timeout")
            .and_then(Value::as_f64)
            .ok_or_else(|| JsonRpcError::new(INVALID_PARAMS, "missing timeout"))?;
        let client_id = required_str(&arguments, "client_id")?;
        let request = WaitRequest {
            timeout: Duration::from_secs_f64(timeout_secs.max(0.0)),
            client_id,
            session: optional_session(&arguments, "session"),
            last_seen: optional_timestamp(&arguments, "last_seen")?,
            agent_type: optional_string(&arguments, "agent_type"),
            capabilities: arguments.get("capabilities").cloned(),
            status: optional_agent_status(&arguments)?.unwrap_or(AgentStatus::Waiting),
            task_id: optional_task_id(&arguments, "task_id")?,
            progress: optional_u8(&arguments, "progress"),
        };
        match self.wait.wait_for_message(request).await {
            Ok(WaitOutcome::Delivered { message, wait_time }) => {
                Ok(json!({"success": true, "message": message, "wait_time": wait_time.as_secs_f64()}))
            }
            Ok(WaitOutcome::TimedOut { wait_time }) => {
                Ok(json!({"success": false, "timeout": true, "wait_time": wait_time.as_secs_f64()}))
            }
            Err(err) => Err(JsonRpcError::new(INTERNAL_ERROR, err.to_string())),
        }
    }

    async fn handle_check_offline_agents(&self, arguments: Value) -> Result<Value, JsonRpcError> {
        let timeout_seconds = arguments.get("timeout_seconds").and_then(Value::as_u64).unwrap_or(self.default_sweeper_timeout);
        let report = self
            .sweeper
            .check_offline_agents(timeout_seconds)
            .await
            .map_err(|err| JsonRpcError::new(INTERNAL_ERROR, err.to_string()))?;
        Ok(json!({
            "detached_agents": report.detached_agents,
            "reassignable_tasks": report.reassignable_tasks,
        }))
    }
}

fn storage_error(err: impl std::fmt::Display) -> JsonRpcError {
    JsonRpcError::new(INTERNAL_ERROR, err.to_string())
}

fn task_service_error(err: TaskServiceError) -> JsonRpcError {
    match err {
        TaskServiceError::Validation(_) => JsonRpcError::new(INVALID_PARAMS, err.to_string()),
        TaskServiceError::NotFound(_) => JsonRpcError::new(INVALID_PARAMS, err.to_string()),
        TaskServiceError::Repository(_) => JsonRpcError::new(INTERNAL_ERROR, err.to_string()),
    }
}

fn send_error(err: SendError) -> JsonRpcError {
    match err {
        SendError::Validation(_) => JsonRpcError::new(INVALID_PARAMS, err.to_string()),
        SendError::Repository(_) => JsonRpcError::new(INTERNAL_ERROR, err.to_string()),
    }
}

fn required_str(value: &Value, field: &str) -> Result<String, JsonRpcError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| JsonRpcError::new(INVALID_PARAMS, format!("missing required field: {field}")))
}

fn optional_string(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(str::to_owned)
}

fn optional_u32(value: &Value, field: &str) -> Option<u32> {
    value.get(field).and_then(Value::as_u64).and_then(|n| u32::try_from(n).ok())
}

fn optional_u8(value: &Value, field: &str) -> Option<u8> {
    value.get(field).and_then(Value::as_u64).and_then(|n| u8::try_from(n).ok())
}

fn optional_priority(value: &Value) -> Result<Priority, JsonRpcError> {
    value
        .get("priority")
        .and_then(Value::as_str)
        .map(str::parse::<Priority>)
        .transpose()
        .map_err(|err| JsonRpcError::new(INVALID_PARAMS, err.to_string()))
        .map(Option::unwrap_or_default)
}

fn optional_task_status(value: &Value) -> Result<Option<TaskStatus>, JsonRpcError> {
    value
        .get("status")
        .and_then(Value::as_str)
        .map(str::parse::<TaskStatus>)
        .transpose()
        .map_err(|err| JsonRpcError::new(INVALID_PARAMS, err.to_string()))
}

fn optional_agent_status(value: &Value) -> Result<Option<AgentStatus>, JsonRpcError> {
    value
        .get("status")
        .and_then(Value::as_str)
        .map(str::parse::<AgentStatus>)
        .transpose()
        .map_err(|err| JsonRpcError::new(INVALID_PARAMS, err.to_string()))
}

fn optional_session(value: &Value, field: &str) -> Option<SessionTag> {
    value.get(field).and_then(Value::as_str).map(SessionTag::new)
}

fn optional_message_id(value: &Value, field: &str) -> Result<Option<MessageId>, JsonRpcError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(MessageId::parse)
        .transpose()
        .map_err(|err| JsonRpcError::new(INVALID_PARAMS, err.to_string()))
}

fn optional_task_id(value: &Value, field: &str) -> Result<Option<TaskId>, JsonRpcError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(TaskId::parse)
        .transpose()
        .map_err(|err| JsonRpcError::new(INVALID_PARAMS, err.to_string()))
}

fn required_task_id(value: &Value) -> Result<TaskId, JsonRpcError> {
    let raw = required_str(value, "id")?;
    TaskId::parse(&raw).map_err(|err| JsonRpcError::new(INVALID_PARAMS, err.to_string()))
}

fn optional_timestamp(value: &Value, field: &str) -> Result<Option<chrono::DateTime<chrono::Utc>>, JsonRpcError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(|s| chrono::DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&chrono::Utc)))
        .transpose()
        .map_err(|err| JsonRpcError::new(INVALID_PARAMS, err.to_string()))
}
