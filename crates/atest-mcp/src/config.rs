//! Server configuration
//!
//! The binary builds a [`ServerConfig`] from command-line flags; the library
//! only ever sees this struct.

use std::fmt;

use clap::ValueEnum;

/// Default port for the HTTP and SSE transports
pub const DEFAULT_PORT: u16 = 7845;

/// Default base URL used to resolve `file:` resources
pub const DEFAULT_DOCS_BASE_URL: &str =
    "https://raw.githubusercontent.com/LinuxSuRen/api-testing/master";

/// Transport used to carry MCP messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Streamable HTTP endpoint
    #[default]
    Http,
    /// Newline-delimited JSON-RPC over stdin/stdout
    Stdio,
    /// Server-Sent Events stream with a POST message endpoint
    Sse,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportMode::Http => "http",
            TransportMode::Stdio => "stdio",
            TransportMode::Sse => "sse",
        };
        f.write_str(name)
    }
}

/// Runtime configuration for [`crate::AtestMcpServer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Port for the HTTP/SSE transports
    pub port: u16,
    /// `host:port` of the api-testing runner
    pub runner_address: String,
    /// Selected transport
    pub mode: TransportMode,
    /// Base URL that `file:` resources are fetched from
    pub docs_base_url: String,
}

impl ServerConfig {
    /// Create a config with default port, mode and docs host
    pub fn new(runner_address: impl Into<String>) -> Self {
        Self {
            port: DEFAULT_PORT,
            runner_address: runner_address.into(),
            mode: TransportMode::default(),
            docs_base_url: DEFAULT_DOCS_BASE_URL.to_string(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_mode(mut self, mode: TransportMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_docs_base_url(mut self, url: impl Into<String>) -> Self {
        self.docs_base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}
