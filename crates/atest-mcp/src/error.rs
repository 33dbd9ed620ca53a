//! Error types for the MCP server

use thiserror::Error;

/// Result type alias for MCP operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during MCP server operations
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown tool requested
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// A tool with the same name was registered twice
    #[error("duplicate tool registration: {0}")]
    DuplicateTool(String),

    /// Tool arguments could not be decoded into the declared shape
    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    /// A handler produced an envelope without any content
    #[error("tool {0} returned no content")]
    EmptyResult(String),

    /// Could not open a connection to the backend
    #[error("backend unreachable at {address}: {message}")]
    BackendUnreachable { address: String, message: String },

    /// The backend answered with an error status or an error reply
    #[error("backend call {method} failed: {message}")]
    BackendCallFailed { method: String, message: String },

    /// The host operating system has no launch command
    #[error("unsupported platform: {os}")]
    UnsupportedPlatform { os: String },

    /// The launch command ran but reported failure
    #[error("failed to launch {program}: {message}")]
    LaunchFailed { program: String, message: String },

    /// Local mock server failure
    #[error("mock server error: {0}")]
    MockServer(String),

    /// Resource not found
    #[error("resource not found: {uri}")]
    ResourceNotFound { uri: String },

    /// Resource URI uses a scheme other than `file:` or `embedded:`
    #[error("unsupported resource scheme in {uri}: expected file: or embedded:")]
    SchemeMismatch { uri: String },

    /// Unknown prompt requested
    #[error("unknown prompt: {0}")]
    UnknownPrompt(String),

    /// Server not initialized
    #[error("server not initialized")]
    NotInitialized,

    /// Error during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// JSON-RPC error code used when this error escapes to the protocol layer
    pub fn rpc_code(&self) -> i32 {
        match self {
            Error::Json(_) => -32700,
            Error::UnknownTool(_) => -32601,
            Error::InvalidArguments { .. }
            | Error::UnknownPrompt(_)
            | Error::ResourceNotFound { .. }
            | Error::SchemeMismatch { .. } => -32602,
            Error::NotInitialized => -32002,
            _ => -32603,
        }
    }

    /// Build a `BackendCallFailed` error from a gRPC status
    pub fn call_failed(method: &str, status: tonic::Status) -> Self {
        Error::BackendCallFailed {
            method: method.to_string(),
            message: format!("{:?}: {}", status.code(), status.message()),
        }
    }

    /// Build an `InvalidArguments` error for `tool`
    pub fn invalid_arguments(tool: impl Into<String>, message: impl ToString) -> Self {
        Error::InvalidArguments {
            tool: tool.into(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_codes() {
        assert_eq!(Error::UnknownTool("x".into()).rpc_code(), -32601);
        assert_eq!(Error::invalid_arguments("run", "missing").rpc_code(), -32602);
        assert_eq!(
            Error::SchemeMismatch {
                uri: "http://x".into()
            }
            .rpc_code(),
            -32602
        );
        assert_eq!(Error::UnknownPrompt("x".into()).rpc_code(), -32602);
        assert_eq!(Error::NotInitialized.rpc_code(), -32002);
        assert_eq!(Error::MockServer("boom".into()).rpc_code(), -32603);
    }

    #[test]
    fn test_unsupported_platform_names_os() {
        let err = Error::UnsupportedPlatform {
            os: "plan9".to_string(),
        };
        assert_eq!(err.to_string(), "unsupported platform: plan9");
    }

    #[test]
    fn test_status_becomes_backend_call_failed() {
        let err = Error::call_failed("GetTestSuite", tonic::Status::not_found("suite missing"));
        match err {
            Error::BackendCallFailed { method, message } => {
                assert_eq!(method, "GetTestSuite");
                assert!(message.contains("NotFound"));
                assert!(message.contains("suite missing"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
