//! Shared fixtures for atest-mcp integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use atest_mcp::launcher::{CommandOutput, LaunchCommand};
use atest_mcp::{AtestMcpServer, Backend, CommandRunner, Launcher, Result, ServerConfig, ToolContext};
use atest_proto::{
    HelloReply, Items, MockConfig, Suite, Suites, TestCase, TestCaseIdentity, TestCaseResult,
    TestCaseWithSuite, TestCases, TestResult, TestSuite, TestSuiteIdentity, TestTask,
};
use serde::Serialize;
use serde_json::Value;

/// Backend that records every request as `(method, request JSON)` and
/// answers with canned replies
#[derive(Default)]
pub struct RecordingBackend {
    calls: Mutex<Vec<(String, Value)>>,
}

impl RecordingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn record<T: Serialize>(&self, method: &str, request: &T) {
        let request = serde_json::to_value(request).unwrap();
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), request));
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    /// The only recorded request; panics unless exactly one call was made
    pub fn single_call(&self) -> (String, Value) {
        let calls = self.calls();
        assert_eq!(calls.len(), 1, "expected one backend call, got {calls:?}");
        calls.into_iter().next().unwrap()
    }
}

fn hello(message: &str) -> HelloReply {
    HelloReply {
        message: message.to_string(),
        error: String::new(),
    }
}

#[async_trait]
impl Backend for RecordingBackend {
    async fn run(&self, task: TestTask) -> Result<TestResult> {
        self.record("Run", &task);
        Ok(TestResult {
            message: "done".to_string(),
            error: String::new(),
            test_case_result: vec![TestCaseResult {
                status_code: 200,
                body: "{}".to_string(),
                id: "1".to_string(),
                ..Default::default()
            }],
        })
    }

    async fn get_suites(&self) -> Result<Suites> {
        self.record("GetSuites", &serde_json::json!({}));
        let mut data = HashMap::new();
        for (name, cases) in [
            ("petstore", vec!["list-pets", "get-pet"]),
            ("pets-v2", vec![]),
            ("github", vec!["user"]),
        ] {
            data.insert(
                name.to_string(),
                Items {
                    data: cases.into_iter().map(String::from).collect(),
                    kind: "http".to_string(),
                },
            );
        }
        Ok(Suites { data })
    }

    async fn create_test_suite(&self, suite: TestSuiteIdentity) -> Result<HelloReply> {
        self.record("CreateTestSuite", &suite);
        Ok(hello(""))
    }

    async fn get_test_suite(&self, suite: TestSuiteIdentity) -> Result<TestSuite> {
        self.record("GetTestSuite", &suite);
        Ok(TestSuite {
            name: suite.name,
            api: "http://localhost:8080".to_string(),
            ..Default::default()
        })
    }

    async fn update_test_suite(&self, suite: TestSuite) -> Result<HelloReply> {
        self.record("UpdateTestSuite", &suite);
        Ok(hello("updated"))
    }

    async fn delete_test_suite(&self, suite: TestSuiteIdentity) -> Result<HelloReply> {
        self.record("DeleteTestSuite", &suite);
        Ok(hello("deleted"))
    }

    async fn list_test_case(&self, suite: TestSuiteIdentity) -> Result<Suite> {
        self.record("ListTestCase", &suite);
        Ok(Suite {
            name: suite.name,
            api: String::new(),
            items: vec![TestCase {
                name: "list-pets".to_string(),
                ..Default::default()
            }],
        })
    }

    async fn get_suggested_apis(&self, suite: TestSuiteIdentity) -> Result<TestCases> {
        self.record("GetSuggestedAPIs", &suite);
        Ok(TestCases {
            data: vec![TestCase {
                name: "suggested".to_string(),
                ..Default::default()
            }],
        })
    }

    async fn get_test_case(&self, case: TestCaseIdentity) -> Result<TestCase> {
        self.record("GetTestCase", &case);
        Ok(TestCase {
            name: case.testcase,
            suite_name: case.suite,
            ..Default::default()
        })
    }

    async fn create_test_case(&self, case: TestCaseWithSuite) -> Result<HelloReply> {
        self.record("CreateTestCase", &case);
        Ok(hello("created"))
    }

    async fn update_test_case(&self, case: TestCaseWithSuite) -> Result<HelloReply> {
        self.record("UpdateTestCase", &case);
        Ok(hello("updated"))
    }

    async fn delete_test_case(&self, case: TestCaseIdentity) -> Result<HelloReply> {
        self.record("DeleteTestCase", &case);
        Ok(hello("deleted"))
    }

    async fn run_test_case(&self, case: TestCaseIdentity) -> Result<TestCaseResult> {
        self.record("RunTestCase", &case);
        Ok(TestCaseResult {
            status_code: 201,
            body: "created".to_string(),
            ..Default::default()
        })
    }

    async fn reload_mock(&self, config: MockConfig) -> Result<()> {
        self.record("Reload", &config);
        Ok(())
    }

    async fn get_mock_config(&self) -> Result<MockConfig> {
        self.record("GetConfig", &serde_json::json!({}));
        Ok(MockConfig {
            prefix: "/mock".to_string(),
            config: String::new(),
            port: 6060,
        })
    }
}

/// Command runner that records commands and always succeeds
#[derive(Default)]
pub struct NoopRunner {
    pub commands: Mutex<Vec<LaunchCommand>>,
}

#[async_trait]
impl CommandRunner for NoopRunner {
    async fn run(&self, command: &LaunchCommand) -> Result<CommandOutput> {
        self.commands.lock().unwrap().push(command.clone());
        Ok(CommandOutput {
            code: Some(0),
            stderr: String::new(),
        })
    }
}

pub fn context(backend: Arc<RecordingBackend>) -> Arc<ToolContext> {
    Arc::new(ToolContext::new(
        backend,
        Launcher::new("linux", Arc::new(NoopRunner::default())),
    ))
}

/// An initialized server over `backend`
pub fn server(backend: Arc<RecordingBackend>) -> AtestMcpServer {
    let config = ServerConfig::new("127.0.0.1:1").with_docs_base_url("http://127.0.0.1:1");
    let mut server = AtestMcpServer::new(config, context(backend));
    server.initialize().unwrap();
    server
}

/// Send `request` and parse the response
pub async fn call(server: &AtestMcpServer, request: Value) -> Value {
    let response = server.handle_message(&request.to_string()).await.unwrap();
    serde_json::from_str(&response).unwrap()
}

/// Call tool `name` and return the result envelope
pub async fn call_tool(server: &AtestMcpServer, name: &str, arguments: Value) -> Value {
    let response = call(
        server,
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {"name": name, "arguments": arguments}
        }),
    )
    .await;
    response["result"].clone()
}

/// Text of the first content item of a tool result envelope
pub fn text(result: &Value) -> &str {
    result["content"][0]["text"].as_str().unwrap()
}
