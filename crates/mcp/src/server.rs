// MCP server: JSON-RPC dispatch over the tool registry

use crate::protocol::{
    negotiate_protocol_version, CallToolParams, InitializeParams, InitializeResult, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, ListToolsResult, ServerCapabilities, ServerInfo,
    ToolsCapability, JSONRPC_VERSION,
};
use crate::tools::{CheckLicensesTool, GetTimeTool, ToolError, ToolRegistry};
use anyhow::{Context, Result};
use licenseguard_backend::BackendClient;
use licenseguard_core::BackendConfig;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

pub const SERVER_NAME: &str = "licenseguard-mcp";

const DEFAULT_INSTRUCTIONS: &str = "Call check_licenses with the raw contents of a requirements.txt \
file to get the detected license and a confidence score for each dependency.";

/// Transport-independent MCP request handler
pub struct McpServer {
    registry: ToolRegistry,
    info: ServerInfo,
    instructions: Option<String>,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(DEFAULT_INSTRUCTIONS.to_string()),
        }
    }

    /// Server exposing the license tools against the given backend.
    pub fn for_backend(config: Arc<BackendConfig>) -> Result<Self> {
        let backend = BackendClient::new(config).context("Failed to create backend client")?;

        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(CheckLicensesTool::new(Arc::new(backend))));
        registry.register(Arc::new(GetTimeTool));

        Ok(Self::new(registry))
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handle a raw payload: one message or a batch.
    /// Returns `None` when nothing needs to be sent back.
    pub async fn handle_payload(&self, payload: &[u8]) -> Option<Value> {
        match serde_json::from_slice::<Value>(payload) {
            Ok(value) => self.handle_value(value).await,
            Err(e) => {
                debug!(error = %e, "Failed to parse JSON-RPC payload");
                Some(to_json(JsonRpcResponse::error(
                    Value::Null,
                    JsonRpcError::parse_error(),
                )))
            }
        }
    }

    /// Handle an already-parsed message or batch.
    pub async fn handle_value(&self, value: Value) -> Option<Value> {
        match value {
            Value::Array(messages) if messages.is_empty() => Some(to_json(JsonRpcResponse::error(
                Value::Null,
                JsonRpcError::invalid_request(),
            ))),
            Value::Array(messages) => {
                let responses: Vec<Value> =
                    futures::future::join_all(messages.into_iter().map(|m| self.handle_message(m)))
                        .await
                        .into_iter()
                        .flatten()
                        .collect();
                if responses.is_empty() {
                    None
                } else {
                    Some(Value::Array(responses))
                }
            }
            message => self.handle_message(message).await,
        }
    }

    async fn handle_message(&self, message: Value) -> Option<Value> {
        // Responses from the peer need no answer
        if message.get("method").is_none()
            && (message.get("result").is_some() || message.get("error").is_some())
        {
            return None;
        }

        let id = message.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<JsonRpcRequest>(message) {
            Ok(request) => self.handle_request(request).await.map(to_json),
            Err(e) => {
                debug!(error = %e, "Malformed JSON-RPC request");
                Some(to_json(JsonRpcResponse::error(id, JsonRpcError::invalid_request())))
            }
        }
    }

    /// Handle one request. Notifications yield `None`.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id else {
            self.handle_notification(&request.method);
            return None;
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(id, JsonRpcError::invalid_request()));
        }

        let result = match request.method.as_str() {
            "initialize" => self.initialize(request.params),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => serde_json::to_value(ListToolsResult {
                tools: self.registry.list_schemas(),
            })
            .map_err(|e| JsonRpcError::internal_error(e.to_string())),
            "tools/call" => self.call_tool(request.params).await,
            other => {
                debug!(method = other, "Unknown method");
                Err(JsonRpcError::method_not_found(other))
            }
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(error) => JsonRpcResponse::error(id, error),
        })
    }

    fn handle_notification(&self, method: &str) {
        match method {
            "notifications/initialized" => debug!("Client finished initialization"),
            "notifications/cancelled" => debug!("Cancellation is handled by the transport"),
            other => debug!(method = other, "Ignoring notification"),
        }
    }

    fn initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: InitializeParams = match params {
            Some(params) => serde_json::from_value(params).map_err(|e| {
                JsonRpcError::invalid_params(format!("Invalid initialize params: {}", e))
            })?,
            None => InitializeParams::default(),
        };

        let protocol_version = negotiate_protocol_version(&params.protocol_version);
        match &params.client_info {
            Some(client) => info!(
                client = %client.name,
                client_version = %client.version,
                protocol_version,
                "MCP client initialized"
            ),
            None => info!(protocol_version, "MCP client initialized"),
        }

        serde_json::to_value(InitializeResult {
            protocol_version: protocol_version.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: self.info.clone(),
            instructions: self.instructions.clone(),
        })
        .map_err(|e| JsonRpcError::internal_error(e.to_string()))
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = params
            .ok_or_else(|| JsonRpcError::invalid_params("Missing tools/call params"))
            .and_then(|p| {
                serde_json::from_value(p).map_err(|e| {
                    JsonRpcError::invalid_params(format!("Invalid tools/call params: {}", e))
                })
            })?;

        let tool = self
            .registry
            .get(&params.name)
            .ok_or_else(|| JsonRpcError::invalid_params(format!("Unknown tool: {}", params.name)))?;

        let started = Instant::now();
        let result = match tool.execute(params.arguments).await {
            Ok(result) => result,
            Err(e) => {
                error!(tool = %params.name, error = %format!("{:#}", e), "Tool execution failed");
                ToolError::new("INTERNAL_ERROR", format!("{:#}", e)).into_result()
            }
        };

        debug!(
            tool = %params.name,
            is_error = result.is_error(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Tool call finished"
        );

        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
    }
}

fn to_json(response: JsonRpcResponse) -> Value {
    serde_json::to_value(response).unwrap_or_else(|e| {
        serde_json::json!({
            "jsonrpc": JSONRPC_VERSION,
            "id": Value::Null,
            "error": { "code": -32603, "message": e.to_string() }
        })
    })
}
