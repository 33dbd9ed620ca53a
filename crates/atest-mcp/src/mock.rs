//! Local mock server
//!
//! An in-process HTTP server that answers requests from a YAML list of canned
//! responses. At most one instance runs at a time; it lives in the
//! [`MockServerSlot`] owned by the tool context.
//!
//! ```yaml
//! items:
//! - name: list-users
//!   request:
//!     path: /users
//!     method: GET
//!   response:
//!     statusCode: 200
//!     header:
//!       Content-Type: application/json
//!     body: '[{"name": "alice"}]'
//! ```
//!
//! With the default prefix the item above is served at `GET /mock/users`.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, RwLock, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::handlers::NoArgs;
use crate::registry::ToolContext;
use crate::resources::MOCK_CONFIG_SCHEMA;
use crate::tools::ToolResult;
use crate::{Error, Result};

/// Prefix used when the caller does not give one
pub const DEFAULT_PREFIX: &str = "/mock";

/// Port used when the caller does not give one
pub const DEFAULT_PORT: u16 = 9080;

// ============================================================================
// Configuration
// ============================================================================

/// Parsed mock configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockDocument {
    #[serde(default)]
    pub items: Vec<MockItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockItem {
    pub name: String,
    pub request: MockRequest,
    #[serde(default)]
    pub response: MockResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockRequest {
    pub path: String,
    #[serde(default = "default_method")]
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockResponse {
    #[serde(default = "default_status")]
    pub status_code: u16,
    #[serde(default)]
    pub header: BTreeMap<String, String>,
    #[serde(default)]
    pub body: String,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            status_code: default_status(),
            header: BTreeMap::new(),
            body: String::new(),
        }
    }
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_status() -> u16 {
    200
}

impl MockDocument {
    /// Parse a YAML config
    pub fn parse(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Find the item for `method` and a prefix-stripped `path`
    pub fn find(&self, method: &str, path: &str) -> Option<&MockItem> {
        self.items.iter().find(|item| {
            item.request.path == path && item.request.method.eq_ignore_ascii_case(method)
        })
    }
}

/// Normalize a prefix to `/segment` form; empty means the root
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Strip `prefix` from `path`, keeping a leading `/`
fn strip_prefix<'a>(prefix: &str, path: &'a str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() {
        Some("/")
    } else if rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

// ============================================================================
// Server
// ============================================================================

/// Mutable routing state shared with the serve task
#[derive(Debug, Clone, Default)]
struct Routes {
    prefix: String,
    document: MockDocument,
}

#[derive(Clone)]
struct MockState {
    routes: Arc<RwLock<Routes>>,
}

async fn serve_mock(State(state): State<MockState>, method: Method, uri: Uri) -> Response {
    let routes = state.routes.read().await;
    let item = strip_prefix(&routes.prefix, uri.path())
        .and_then(|path| routes.document.find(method.as_str(), path));

    let Some(item) = item else {
        tracing::debug!(%method, path = uri.path(), "No mock item matched");
        return StatusCode::NOT_FOUND.into_response();
    };

    let status = StatusCode::from_u16(item.response.status_code).unwrap_or(StatusCode::OK);
    let mut response = Response::new(Body::from(item.response.body.clone()));
    *response.status_mut() = status;
    for (name, value) in &item.response.header {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().insert(name, value);
            }
            _ => warn!(item = %item.name, header = %name, "Skipping invalid mock header"),
        }
    }
    response
}

/// Lifecycle of the serve task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServeState {
    Running,
    Stopped,
    Failed(String),
}

/// A started mock server
#[derive(Debug)]
pub struct MockServerHandle {
    port: u16,
    routes: Arc<RwLock<Routes>>,
    shutdown: Option<oneshot::Sender<()>>,
    state: watch::Receiver<ServeState>,
    task: JoinHandle<()>,
}

impl MockServerHandle {
    /// Bind `port` and start serving `document` under `prefix`
    pub async fn start(prefix: &str, port: u16, document: MockDocument) -> Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port))
            .await
            .map_err(|e| Error::MockServer(format!("failed to bind port {port}: {e}")))?;
        let port = listener.local_addr()?.port();

        let routes = Arc::new(RwLock::new(Routes {
            prefix: normalize_prefix(prefix),
            document,
        }));
        let app = Router::new().fallback(serve_mock).with_state(MockState {
            routes: Arc::clone(&routes),
        });

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (state_tx, state_rx) = watch::channel(ServeState::Running);
        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            let outcome = match served {
                Ok(()) => ServeState::Stopped,
                Err(e) => {
                    warn!(port, error = %e, "Mock server stopped with error");
                    ServeState::Failed(e.to_string())
                }
            };
            let _ = state_tx.send(outcome);
        });

        info!(port, "Mock server started");
        Ok(Self {
            port,
            routes,
            shutdown: Some(shutdown_tx),
            state: state_rx,
            task,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> ServeState {
        self.state.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.state() == ServeState::Running && !self.task.is_finished()
    }

    /// Swap in a new prefix and config without rebinding
    pub async fn reload(&self, prefix: &str, document: MockDocument) {
        let mut routes = self.routes.write().await;
        routes.prefix = normalize_prefix(prefix);
        routes.document = document;
    }

    /// Signal shutdown and wait for the serve task
    pub async fn stop(mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        (&mut self.task)
            .await
            .map_err(|e| Error::MockServer(format!("serve task failed: {e}")))?;
        match self.state() {
            ServeState::Failed(message) => Err(Error::MockServer(message)),
            _ => {
                info!(port = self.port, "Mock server stopped");
                Ok(())
            }
        }
    }
}

/// Outcome of [`MockServerSlot::start`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockStart {
    pub port: u16,
    /// An already running instance was reused
    pub reused: bool,
}

/// Status reported by `get-mock-server-status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MockStatus {
    pub running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Holder for the single local mock server
#[derive(Debug, Default)]
pub struct MockServerSlot {
    inner: Mutex<Option<MockServerHandle>>,
}

impl MockServerSlot {
    /// Start a server, or reload the running one in place
    pub async fn start(
        &self,
        prefix: &str,
        port: u16,
        document: MockDocument,
    ) -> Result<MockStart> {
        let mut slot = self.inner.lock().await;

        if let Some(handle) = slot.as_ref() {
            if handle.is_running() {
                handle.reload(prefix, document).await;
                info!(port = handle.port(), "Mock server config reloaded");
                return Ok(MockStart {
                    port: handle.port(),
                    reused: true,
                });
            }
        }
        // A dead instance is replaced
        if let Some(stale) = slot.take() {
            let _ = stale.stop().await;
        }

        let handle = MockServerHandle::start(prefix, port, document).await?;
        let port = handle.port();
        *slot = Some(handle);
        Ok(MockStart {
            port,
            reused: false,
        })
    }

    /// Stop the running server; `Ok(false)` if none was started
    pub async fn stop(&self) -> Result<bool> {
        let handle = self.inner.lock().await.take();
        match handle {
            Some(handle) => handle.stop().await.map(|()| true),
            None => Ok(false),
        }
    }

    pub async fn status(&self) -> MockStatus {
        let slot = self.inner.lock().await;
        let Some(handle) = slot.as_ref() else {
            return MockStatus {
                running: false,
                port: None,
                prefix: None,
                items: None,
                error: None,
            };
        };

        let routes = handle.routes.read().await;
        let error = match handle.state() {
            ServeState::Failed(message) => Some(message),
            _ => None,
        };
        MockStatus {
            running: handle.is_running(),
            port: Some(handle.port()),
            prefix: Some(routes.prefix.clone()),
            items: Some(routes.document.items.len()),
            error,
        }
    }
}

// ============================================================================
// Tool Handlers
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StartMockArgs {
    /// The mock config content in YAML format
    pub mock_config: String,
    /// The prefix of mock server, default is /mock
    #[serde(default)]
    pub prefix: Option<String>,
    /// The port of the mock server, default is 9080
    #[serde(default)]
    pub server_port: Option<u16>,
}

/// Handle start-mock-server
pub async fn start_mock_server(ctx: Arc<ToolContext>, args: StartMockArgs) -> Result<ToolResult> {
    let document = MockDocument::parse(&args.mock_config)?;
    let prefix = args.prefix.as_deref().unwrap_or(DEFAULT_PREFIX);
    let port = args.server_port.unwrap_or(DEFAULT_PORT);

    let started = ctx.mock.start(prefix, port, document).await?;
    let text = if started.reused {
        let mut text = format!("Mock Server reloaded on port: {}", started.port);
        // A running instance keeps its port
        if let Some(requested) = args.server_port.filter(|&p| p != 0 && p != started.port) {
            text.push_str(&format!(
                " (requested port {requested} ignored while running; stop the server to change ports)"
            ));
        }
        text
    } else {
        format!("Mock Server started on port: {}", started.port)
    };
    Ok(ToolResult::text(text))
}

/// Handle stop-mock-server
pub async fn stop_mock_server(ctx: Arc<ToolContext>, _args: NoArgs) -> Result<ToolResult> {
    if ctx.mock.stop().await? {
        Ok(ToolResult::text("Mock Server stopped"))
    } else {
        Ok(ToolResult::text("Mock Server not started"))
    }
}

/// Handle get-mock-server-status
pub async fn get_mock_server_status(ctx: Arc<ToolContext>, _args: NoArgs) -> Result<ToolResult> {
    ToolResult::json(&ctx.mock.status().await)
}

/// Handle get-mock-config-schema
pub async fn get_mock_config_schema(_ctx: Arc<ToolContext>, _args: NoArgs) -> Result<ToolResult> {
    Ok(ToolResult::text(MOCK_CONFIG_SCHEMA))
}
