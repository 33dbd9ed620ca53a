//! MCP Server implementation
//!
//! The session layer: parses JSON-RPC messages, routes them to the tool
//! registry, resource reader and prompt providers, and renders responses.
//! Transports only move strings in and out of [`AtestMcpServer::respond`].

use std::sync::Arc;

use serde_json::{Value, json};

use crate::backend::GrpcBackend;
use crate::config::{ServerConfig, TransportMode};
use crate::launcher::Launcher;
use crate::prompts::{complete, get_prompt, get_prompt_definitions};
use crate::protocol::{
    CompleteParams, CompleteReference, GetPromptParams, InitializeParams, InitializeResult,
    JsonRpcRequest, JsonRpcResponse, PromptsCapability, ReadResourceParams, ResourcesCapability,
    ServerCapabilities, ServerInfo, ToolCallParams, ToolsCapability, negotiate_protocol_version,
};
use crate::registry::{ToolContext, ToolRegistry};
use crate::resource_handlers::ResourceReader;
use crate::resources::get_resource_definitions;
use crate::tools::{ToolDefinition, ToolResult, default_registry};
use crate::{Error, Result, transport};

/// Name reported in `serverInfo`
pub const SERVER_NAME: &str = "atest-mcp-server";

/// MCP Server for the api-testing runner
///
/// # Example
///
/// ```ignore
/// use atest_mcp::{AtestMcpServer, ServerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut server = AtestMcpServer::connect(ServerConfig::new("localhost:7070"));
///     server.initialize()?;
///     server.run().await?;
///     Ok(())
/// }
/// ```
pub struct AtestMcpServer {
    config: ServerConfig,

    /// State shared by tool handlers
    context: Arc<ToolContext>,

    /// Whether the tool registry has been built
    initialized: bool,

    registry: ToolRegistry,

    resources: ResourceReader,
}

impl AtestMcpServer {
    /// Create a server around an existing tool context
    pub fn new(config: ServerConfig, context: Arc<ToolContext>) -> Self {
        let resources = ResourceReader::new(config.docs_base_url.clone());
        Self {
            config,
            context,
            initialized: false,
            registry: ToolRegistry::new(),
            resources,
        }
    }

    /// Create a server talking gRPC to `config.runner_address`
    pub fn connect(config: ServerConfig) -> Self {
        let backend = Arc::new(GrpcBackend::new(config.runner_address.clone()));
        let launcher = Launcher::system();
        tracing::debug!(runner = backend.address(), os = launcher.os(), "Created tool context");
        let context = Arc::new(ToolContext::new(backend, launcher));
        Self::new(config, context)
    }

    /// Build the tool registry
    pub fn initialize(&mut self) -> Result<()> {
        tracing::info!(runner = %self.config.runner_address, "Initializing MCP server");
        self.registry = default_registry()?;
        self.initialized = true;
        Ok(())
    }

    /// Serve on the configured transport until it closes
    pub async fn run(mut self) -> Result<()> {
        if !self.initialized {
            self.initialize()?;
        }
        let mode = self.config.mode;
        let port = self.config.port;
        let server = Arc::new(self);

        match mode {
            TransportMode::Stdio => transport::serve_stdio(server).await,
            TransportMode::Http => transport::serve_http(server, port).await,
            TransportMode::Sse => transport::serve_sse(server, port).await,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn context(&self) -> &Arc<ToolContext> {
        &self.context
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn tools(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    /// Handle a raw message and produce the text to send back, if any
    ///
    /// Unlike [`handle_message`](Self::handle_message) this never fails: an
    /// unparseable message becomes a JSON-RPC error response.
    pub async fn respond(&self, message: &str) -> Option<String> {
        match self.handle_message(message).await {
            Ok(response) if response.is_empty() => None,
            Ok(response) => Some(response),
            Err(e) => {
                tracing::debug!(error = %e, "Rejecting message");
                let message = match &e {
                    Error::Json(_) => format!("Parse error: {e}"),
                    _ => format!("Internal error: {e}"),
                };
                let response = JsonRpcResponse::error(None, e.rpc_code(), message);
                serde_json::to_string(&response).ok()
            }
        }
    }

    /// Handle a single MCP message
    ///
    /// Returns the JSON-RPC response as a string, or an empty string for
    /// notifications.
    pub async fn handle_message(&self, message: &str) -> Result<String> {
        let request: JsonRpcRequest = serde_json::from_str(message)?;
        tracing::debug!(method = %request.method, id = ?request.id, "Received message");

        if request.method.starts_with("notifications/") || request.method == "initialized" {
            return Ok(String::new());
        }

        if request.id == Some(Value::Null) {
            let response = JsonRpcResponse::error(
                Some(Value::Null),
                -32600,
                "Invalid Request: id must not be null".to_string(),
            );
            return serde_json::to_string(&response).map_err(Error::from);
        }

        let is_notification = request.is_notification();
        let response = self.handle_request(request).await?;
        if is_notification {
            return Ok(String::new());
        }
        serde_json::to_string(&response).map_err(Error::from)
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse> {
        let id = request.id;
        let params = request.params;

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id, params),
            "ping" => Ok(JsonRpcResponse::success(id, json!({}))),
            "tools/list" | "tools/call" if !self.initialized => {
                let e = Error::NotInitialized;
                Ok(JsonRpcResponse::error(id, e.rpc_code(), e.to_string()))
            }
            "tools/list" => Ok(JsonRpcResponse::success(
                id,
                json!({ "tools": self.registry.definitions() }),
            )),
            "tools/call" => self.handle_tools_call(id, params).await,
            "resources/list" => Ok(JsonRpcResponse::success(
                id,
                json!({ "resources": get_resource_definitions() }),
            )),
            "resources/read" => self.handle_resources_read(id, params).await,
            "prompts/list" => Ok(JsonRpcResponse::success(
                id,
                json!({ "prompts": get_prompt_definitions() }),
            )),
            "prompts/get" => self.handle_prompts_get(id, params),
            "completion/complete" => self.handle_complete(id, params).await,
            method => Ok(JsonRpcResponse::error(
                id,
                -32601,
                format!("Method not found: {method}"),
            )),
        }
    }

    fn handle_initialize(&self, id: Option<Value>, params: Value) -> Result<JsonRpcResponse> {
        let params: InitializeParams = serde_json::from_value(params).unwrap_or_default();
        if let Some(client) = &params.client_info {
            tracing::info!(client = %client.name, version = %client.version, "Client connected");
        }

        let result = InitializeResult {
            protocol_version: negotiate_protocol_version(params.protocol_version.as_deref())
                .to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
                resources: Some(ResourcesCapability {
                    subscribe: Some(false),
                    list_changed: Some(false),
                }),
                prompts: Some(PromptsCapability {
                    list_changed: Some(false),
                }),
                completions: Some(json!({})),
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some("ATest Server".to_string()),
        };

        Ok(JsonRpcResponse::success(id, serde_json::to_value(result)?))
    }

    /// Tool failures are reported inside the result envelope
    async fn handle_tools_call(&self, id: Option<Value>, params: Value) -> Result<JsonRpcResponse> {
        let params: ToolCallParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => return Ok(invalid_params(id, e)),
        };

        let result = match self
            .registry
            .dispatch(Arc::clone(&self.context), &params.name, params.arguments)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!(tool = %params.name, error = %e, "Tool call failed");
                ToolResult::error(e.to_string())
            }
        };
        Ok(JsonRpcResponse::success(id, serde_json::to_value(result)?))
    }

    async fn handle_resources_read(
        &self,
        id: Option<Value>,
        params: Value,
    ) -> Result<JsonRpcResponse> {
        let params: ReadResourceParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => return Ok(invalid_params(id, e)),
        };

        match self.resources.read(&params.uri).await {
            Ok(content) => Ok(JsonRpcResponse::success(
                id,
                json!({ "contents": [content] }),
            )),
            Err(e) => Ok(JsonRpcResponse::error(
                id,
                e.rpc_code(),
                format!("Resource error: {e}"),
            )),
        }
    }

    fn handle_prompts_get(&self, id: Option<Value>, params: Value) -> Result<JsonRpcResponse> {
        let params: GetPromptParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => return Ok(invalid_params(id, e)),
        };

        match get_prompt(&params.name, &params.arguments) {
            Ok(prompt) => Ok(JsonRpcResponse::success(id, serde_json::to_value(prompt)?)),
            Err(e) => Ok(JsonRpcResponse::error(id, e.rpc_code(), e.to_string())),
        }
    }

    async fn handle_complete(&self, id: Option<Value>, params: Value) -> Result<JsonRpcResponse> {
        let params: CompleteParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => return Ok(invalid_params(id, e)),
        };

        let completion = match params.reference {
            CompleteReference::Prompt { .. } => {
                complete(
                    self.context.backend.as_ref(),
                    &params.argument.name,
                    &params.argument.value,
                )
                .await
            }
            CompleteReference::Resource { .. } => Default::default(),
        };
        Ok(JsonRpcResponse::success(
            id,
            json!({ "completion": completion }),
        ))
    }
}

fn invalid_params(id: Option<Value>, e: serde_json::Error) -> JsonRpcResponse {
    JsonRpcResponse::error(id, -32602, format!("Invalid params: {e}"))
}
