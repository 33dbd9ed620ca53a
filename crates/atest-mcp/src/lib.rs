//! MCP Server for the api-testing runner
//!
//! This crate exposes the api-testing runner via the Model Context Protocol
//! (MCP), so agents can create, inspect and run HTTP test suites and drive
//! mock servers.
//!
//! # Architecture
//!
//! ```text
//! [ MCP Client (agent/IDE) ]
//!        | (JSON-RPC over stdio / SSE / streamable HTTP)
//!        v
//! [ atest-mcp: session -> tool registry -> handlers ]
//!        | (unary gRPC)                 |
//!        v                              +--> [ local mock server ]
//! [ api-testing runner ]                +--> [ desktop launcher ]
//! ```
//!
//! # Tools
//!
//! The server exposes tools for:
//! - Test execution (inline suites, stored cases)
//! - Test suite and test case management
//! - Mock servers (local in-process and the runner's own)
//! - Opening the desktop application
//!
//! # Resources
//!
//! - `embedded:mock-schema` - Mock config JSON schema
//! - `embedded:sample-suite` - Example test suite
//! - `file:///<path>` - Documentation fetched from the docs host
//!
//! # Prompts
//!
//! - `create-http-test`
//! - `run-test-suite`

pub mod backend;
pub mod config;
pub mod error;
pub mod handlers;
pub mod launcher;
pub mod mock;
pub mod prompts;
pub mod protocol;
pub mod registry;
pub mod resource_handlers;
pub mod resources;
pub mod server;
pub mod tools;
pub mod transport;

pub use backend::{Backend, GrpcBackend};
pub use config::{ServerConfig, TransportMode};
pub use error::{Error, Result};
pub use launcher::{CommandRunner, Launcher};
pub use registry::{ToolContext, ToolRegistry};
pub use server::AtestMcpServer;
pub use tools::{ToolContent, ToolDefinition, ToolName, ToolResult, default_registry};
