//! MCP tool definitions
//!
//! This module names every tool the server exposes and builds the registry
//! that binds each name to its handler.
//!
//! # Tool Categories
//!
//! ## Test Execution
//! - `run` - Run inline test suite content
//! - `run-test-case` - Run a stored test case
//!
//! ## Test Suites
//! - `get-suites` - List all suites with their case names
//! - `create-test-suite` / `get-test-suite` / `update-test-suite` / `delete-test-suite`
//! - `get-suggested-apis` - Suggest test cases from a suite's API spec
//!
//! ## Test Cases
//! - `list-test-case` / `get-test-case`
//! - `create-test-case` / `update-test-case` / `delete-test-case`
//!
//! ## Mock Server
//! - `start-mock-server` / `stop-mock-server` / `get-mock-server-status` - Local in-process server
//! - `get-mock-config-schema` - JSON schema of the mock config
//! - `reload-remote-mock-server` / `get-remote-mock-config` - The runner's mock server
//!
//! ## Desktop
//! - `start-atest-desktop` - Open the companion desktop app

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::handlers;
use crate::launcher;
use crate::mock;
use crate::registry::{ToolDescriptor, ToolRegistry};
use crate::{Error, Result};

/// Tool definition for MCP protocol
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Result from a tool invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

/// Content types for tool results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
}

impl ToolResult {
    /// Create a successful text result
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: content.into(),
            }],
            is_error: None,
        }
    }

    /// Create a successful result holding pretty-printed JSON
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self::text(serde_json::to_string_pretty(value)?))
    }

    /// Create an error result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: Some(true),
        }
    }

    /// Text of the first content item
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|c| match c {
            ToolContent::Text { text } => text.as_str(),
        })
    }
}

/// The closed set of tool identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ToolName {
    Run,
    GetSuites,
    CreateTestSuite,
    GetTestSuite,
    UpdateTestSuite,
    DeleteTestSuite,
    ListTestCase,
    GetSuggestedApis,
    GetTestCase,
    CreateTestCase,
    UpdateTestCase,
    DeleteTestCase,
    RunTestCase,
    StartMockServer,
    StopMockServer,
    GetMockServerStatus,
    GetMockConfigSchema,
    ReloadRemoteMockServer,
    GetRemoteMockConfig,
    StartAtestDesktop,
}

impl ToolName {
    pub const ALL: [ToolName; 20] = [
        ToolName::Run,
        ToolName::GetSuites,
        ToolName::CreateTestSuite,
        ToolName::GetTestSuite,
        ToolName::UpdateTestSuite,
        ToolName::DeleteTestSuite,
        ToolName::ListTestCase,
        ToolName::GetSuggestedApis,
        ToolName::GetTestCase,
        ToolName::CreateTestCase,
        ToolName::UpdateTestCase,
        ToolName::DeleteTestCase,
        ToolName::RunTestCase,
        ToolName::StartMockServer,
        ToolName::StopMockServer,
        ToolName::GetMockServerStatus,
        ToolName::GetMockConfigSchema,
        ToolName::ReloadRemoteMockServer,
        ToolName::GetRemoteMockConfig,
        ToolName::StartAtestDesktop,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::Run => "run",
            ToolName::GetSuites => "get-suites",
            ToolName::CreateTestSuite => "create-test-suite",
            ToolName::GetTestSuite => "get-test-suite",
            ToolName::UpdateTestSuite => "update-test-suite",
            ToolName::DeleteTestSuite => "delete-test-suite",
            ToolName::ListTestCase => "list-test-case",
            ToolName::GetSuggestedApis => "get-suggested-apis",
            ToolName::GetTestCase => "get-test-case",
            ToolName::CreateTestCase => "create-test-case",
            ToolName::UpdateTestCase => "update-test-case",
            ToolName::DeleteTestCase => "delete-test-case",
            ToolName::RunTestCase => "run-test-case",
            ToolName::StartMockServer => "start-mock-server",
            ToolName::StopMockServer => "stop-mock-server",
            ToolName::GetMockServerStatus => "get-mock-server-status",
            ToolName::GetMockConfigSchema => "get-mock-config-schema",
            ToolName::ReloadRemoteMockServer => "reload-remote-mock-server",
            ToolName::GetRemoteMockConfig => "get-remote-mock-config",
            ToolName::StartAtestDesktop => "start-atest-desktop",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ToolName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| Error::UnknownTool(s.to_string()))
    }
}

/// Build the registry with every tool the server exposes
pub fn default_registry() -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    // Test Execution
    registry.register(ToolDescriptor::new(
        ToolName::Run,
        "Run test suite content (YAML) directly, optionally limited to a single case",
        handlers::run,
    ))?;
    registry.register(ToolDescriptor::new(
        ToolName::RunTestCase,
        "Run a stored test case",
        handlers::run_test_case,
    ))?;

    // Test Suites
    registry.register(ToolDescriptor::new(
        ToolName::GetSuites,
        "Get all test suites",
        handlers::get_suites,
    ))?;
    registry.register(ToolDescriptor::new(
        ToolName::CreateTestSuite,
        "Create a test suite for HTTP testing",
        handlers::create_test_suite,
    ))?;
    registry.register(ToolDescriptor::new(
        ToolName::GetTestSuite,
        "Get a test suite for HTTP testing",
        handlers::get_test_suite,
    ))?;
    registry.register(ToolDescriptor::new(
        ToolName::UpdateTestSuite,
        "Update a test suite for HTTP testing",
        handlers::update_test_suite,
    ))?;
    registry.register(ToolDescriptor::new(
        ToolName::DeleteTestSuite,
        "Delete a test suite for HTTP testing",
        handlers::delete_test_suite,
    ))?;
    registry.register(ToolDescriptor::new(
        ToolName::GetSuggestedApis,
        "Get suggested API test cases from the suite's API spec document",
        handlers::get_suggested_apis,
    ))?;

    // Test Cases
    registry.register(ToolDescriptor::new(
        ToolName::ListTestCase,
        "List all test cases of a test suite",
        handlers::list_test_case,
    ))?;
    registry.register(ToolDescriptor::new(
        ToolName::GetTestCase,
        "Get a test case for HTTP testing",
        handlers::get_test_case,
    ))?;
    registry.register(ToolDescriptor::new(
        ToolName::CreateTestCase,
        "Create a test case for HTTP testing",
        handlers::create_test_case,
    ))?;
    registry.register(ToolDescriptor::new(
        ToolName::UpdateTestCase,
        "Update a test case for HTTP testing",
        handlers::update_test_case,
    ))?;
    registry.register(ToolDescriptor::new(
        ToolName::DeleteTestCase,
        "Delete a test case for HTTP testing",
        handlers::delete_test_case,
    ))?;

    // Mock Server
    registry.register(ToolDescriptor::new(
        ToolName::StartMockServer,
        "Start a local mock server (reuses the running one and reloads its config)",
        mock::start_mock_server,
    ))?;
    registry.register(ToolDescriptor::new(
        ToolName::StopMockServer,
        "Stop the local mock server",
        mock::stop_mock_server,
    ))?;
    registry.register(ToolDescriptor::new(
        ToolName::GetMockServerStatus,
        "Report whether the local mock server is running, its port and any serve error",
        mock::get_mock_server_status,
    ))?;
    registry.register(ToolDescriptor::new(
        ToolName::GetMockConfigSchema,
        "Get the mock config schema",
        mock::get_mock_config_schema,
    ))?;
    registry.register(ToolDescriptor::new(
        ToolName::ReloadRemoteMockServer,
        "Load a mock config into the runner's mock server",
        handlers::reload_remote_mock_server,
    ))?;
    registry.register(ToolDescriptor::new(
        ToolName::GetRemoteMockConfig,
        "Get the mock config currently loaded by the runner's mock server",
        handlers::get_remote_mock_config,
    ))?;

    // Desktop
    registry.register(ToolDescriptor::new(
        ToolName::StartAtestDesktop,
        "Open the atest desktop application",
        launcher::start_atest_desktop,
    ))?;

    Ok(registry)
}
