//! MCP transports
//!
//! - **stdio**: newline-delimited JSON-RPC. Every line is handled on its own
//!   task; responses are written by a single writer task in completion order.
//! - **http** (streamable HTTP): `POST /` or `POST /mcp` carries one message;
//!   the response is the JSON body, notifications are answered `202`.
//! - **sse** (legacy): `GET /sse` opens an event stream whose first `endpoint`
//!   event names `/message?sessionId=<id>`. Messages POSTed there are
//!   acknowledged with `202` and answered as `message` events on the stream.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, PoisonError, RwLock};

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use futures::Stream;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::server::AtestMcpServer;
use crate::{Error, Result};

/// Buffered responses per SSE session
const SSE_CHANNEL_CAPACITY: usize = 32;

// ============================================================================
// stdio
// ============================================================================

/// Serve over the process's stdin/stdout
pub async fn serve_stdio(server: Arc<AtestMcpServer>) -> Result<()> {
    info!("MCP server ready, listening on stdio");
    serve_lines(server, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Serve newline-delimited messages from `reader`, writing responses to `writer`
///
/// Returns once `reader` reaches end of input and every in-flight message
/// has been answered.
pub async fn serve_lines<R, W>(server: Arc<AtestMcpServer>, reader: R, writer: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let writer_task = tokio::spawn(async move {
        let mut writer = writer;
        while let Some(response) = rx.recv().await {
            writer.write_all(response.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        Ok::<(), std::io::Error>(())
    });

    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let server = Arc::clone(&server);
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Some(response) = server.respond(&line).await {
                let _ = tx.send(response);
            }
        });
    }
    drop(tx);

    writer_task
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))??;
    Ok(())
}

// ============================================================================
// Streamable HTTP
// ============================================================================

/// Router for the streamable HTTP transport
pub fn http_router(server: Arc<AtestMcpServer>) -> Router {
    Router::new()
        .route("/", post(handle_http))
        .route("/mcp", post(handle_http))
        .with_state(server)
}

/// Serve streamable HTTP on `port`
pub async fn serve_http(server: Arc<AtestMcpServer>, port: u16) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "MCP server ready, listening on streamable HTTP");
    axum::serve(listener, http_router(server)).await?;
    Ok(())
}

async fn handle_http(State(server): State<Arc<AtestMcpServer>>, body: String) -> Response {
    match server.respond(&body).await {
        Some(response) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            response,
        )
            .into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

// ============================================================================
// SSE
// ============================================================================

type Sessions = Arc<RwLock<HashMap<String, mpsc::Sender<String>>>>;

#[derive(Clone)]
struct SseState {
    server: Arc<AtestMcpServer>,
    sessions: Sessions,
}

impl SseState {
    fn new(server: Arc<AtestMcpServer>) -> Self {
        Self {
            server,
            sessions: Arc::default(),
        }
    }

    fn insert(&self, session_id: String, sender: mpsc::Sender<String>) {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session_id, sender);
    }

    fn sender(&self, session_id: &str) -> Option<mpsc::Sender<String>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
    }

    fn remove(&self, session_id: &str) {
        remove_session(&self.sessions, session_id);
    }
}

fn remove_session(sessions: &Sessions, session_id: &str) {
    sessions
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(session_id);
}

/// Drops the session entry when the event stream holding it is dropped
struct SessionGuard {
    session_id: String,
    sessions: Sessions,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        remove_session(&self.sessions, &self.session_id);
        tracing::debug!(session = %self.session_id, "SSE session closed");
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionQuery {
    session_id: String,
}

/// Router for the SSE transport
pub fn sse_router(server: Arc<AtestMcpServer>) -> Router {
    sse_routes(SseState::new(server))
}

fn sse_routes(state: SseState) -> Router {
    Router::new()
        .route("/sse", get(handle_sse_connect))
        .route("/message", post(handle_sse_message))
        .with_state(state)
}

/// Serve the SSE transport on `port`
pub async fn serve_sse(server: Arc<AtestMcpServer>, port: u16) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "MCP server ready, listening on SSE");
    axum::serve(listener, sse_router(server)).await?;
    Ok(())
}

async fn handle_sse_connect(
    State(state): State<SseState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let session_id = uuid::Uuid::new_v4().to_string();
    let (tx, rx) = mpsc::channel::<String>(SSE_CHANNEL_CAPACITY);
    state.insert(session_id.clone(), tx);
    tracing::debug!(session = %session_id, "SSE session opened");

    let guard = SessionGuard {
        session_id: session_id.clone(),
        sessions: Arc::clone(&state.sessions),
    };

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/message?sessionId={session_id}"));
    // The guard lives as long as the stream; axum drops the stream on disconnect
    let messages = ReceiverStream::new(rx).map(move |message| {
        let _session = &guard;
        Ok::<_, Infallible>(Event::default().event("message").data(message))
    });
    let stream = tokio_stream::once(Ok(endpoint)).chain(messages);

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn handle_sse_message(
    State(state): State<SseState>,
    Query(query): Query<SessionQuery>,
    body: String,
) -> StatusCode {
    let Some(sender) = state.sender(&query.session_id) else {
        return StatusCode::NOT_FOUND;
    };

    tokio::spawn(async move {
        let Some(response) = state.server.respond(&body).await else {
            return;
        };
        if sender.send(response).await.is_err() {
            warn!(session = %query.session_id, "SSE session closed, dropping response");
            state.remove(&query.session_id);
        }
    });

    StatusCode::ACCEPTED
}
