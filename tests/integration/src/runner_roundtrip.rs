//! End-to-end tests against an in-process runner
//!
//! A fake api-testing runner (Runner and Mock gRPC services) is served on an
//! ephemeral port, and the MCP server talks to it through `GrpcBackend`
//! exactly as it would to the real one.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use atest_mcp::{AtestMcpServer, GrpcBackend, Launcher, ServerConfig, ToolContext};
use atest_proto::mock_server::{Mock, MockServer};
use atest_proto::runner_server::{Runner, RunnerServer};
use atest_proto::{
    Empty, HelloReply, Items, MockConfig, Suite, Suites, TestCase, TestCaseIdentity,
    TestCaseResult, TestCaseWithSuite, TestCases, TestResult, TestSuite, TestSuiteIdentity,
    TestTask,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{Status, async_trait};

type RpcResult<T> = Result<tonic::Response<T>, Status>;

// =============================================================================
// Fake runner
// =============================================================================

#[derive(Default)]
struct RunnerState {
    suites: BTreeMap<String, (String, Vec<TestCase>)>,
    mock: MockConfig,
}

#[derive(Clone, Default)]
struct FakeRunner {
    state: Arc<Mutex<RunnerState>>,
}

fn reply(message: String) -> RpcResult<HelloReply> {
    Ok(tonic::Response::new(HelloReply {
        message,
        error: String::new(),
    }))
}

fn refused(error: String) -> RpcResult<HelloReply> {
    Ok(tonic::Response::new(HelloReply {
        message: String::new(),
        error,
    }))
}

impl FakeRunner {
    fn with_suite<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut (String, Vec<TestCase>)) -> T,
    ) -> Result<T, Status> {
        let mut state = self.state.lock().unwrap();
        state
            .suites
            .get_mut(name)
            .map(f)
            .ok_or_else(|| Status::not_found(format!("suite {name} not found")))
    }
}

#[async_trait]
impl Runner for FakeRunner {
    async fn run(&self, request: tonic::Request<TestTask>) -> RpcResult<TestResult> {
        let task = request.into_inner();
        if task.data.is_empty() {
            return Ok(tonic::Response::new(TestResult {
                message: String::new(),
                error: "no suite content".to_string(),
                test_case_result: vec![],
            }));
        }
        Ok(tonic::Response::new(TestResult {
            message: "ok".to_string(),
            error: String::new(),
            test_case_result: vec![TestCaseResult {
                status_code: 200,
                id: task.case_name,
                ..Default::default()
            }],
        }))
    }

    async fn get_suites(&self, _: tonic::Request<Empty>) -> RpcResult<Suites> {
        let state = self.state.lock().unwrap();
        let data = state
            .suites
            .iter()
            .map(|(name, (_, cases))| {
                let items = Items {
                    data: cases.iter().map(|c| c.name.clone()).collect(),
                    kind: "http".to_string(),
                };
                (name.clone(), items)
            })
            .collect();
        Ok(tonic::Response::new(Suites { data }))
    }

    async fn create_test_suite(
        &self,
        request: tonic::Request<TestSuiteIdentity>,
    ) -> RpcResult<HelloReply> {
        let suite = request.into_inner();
        let mut state = self.state.lock().unwrap();
        if state.suites.contains_key(&suite.name) {
            return refused(format!("suite {} already exists", suite.name));
        }
        state
            .suites
            .insert(suite.name.clone(), (suite.api, Vec::new()));
        reply(format!("suite {} created", suite.name))
    }

    async fn get_test_suite(
        &self,
        request: tonic::Request<TestSuiteIdentity>,
    ) -> RpcResult<TestSuite> {
        let name = request.into_inner().name;
        let api = self.with_suite(&name, |(api, _)| api.clone())?;
        Ok(tonic::Response::new(TestSuite {
            name,
            api,
            ..Default::default()
        }))
    }

    async fn update_test_suite(&self, request: tonic::Request<TestSuite>) -> RpcResult<HelloReply> {
        let suite = request.into_inner();
        self.with_suite(&suite.name, |(api, _)| *api = suite.api.clone())?;
        reply(String::new())
    }

    async fn delete_test_suite(
        &self,
        request: tonic::Request<TestSuiteIdentity>,
    ) -> RpcResult<HelloReply> {
        let name = request.into_inner().name;
        let removed = self.state.lock().unwrap().suites.remove(&name);
        match removed {
            Some(_) => reply(format!("suite {name} deleted")),
            None => Err(Status::not_found(format!("suite {name} not found"))),
        }
    }

    async fn list_test_case(&self, request: tonic::Request<TestSuiteIdentity>) -> RpcResult<Suite> {
        let name = request.into_inner().name;
        let (api, items) = self.with_suite(&name, |(api, cases)| (api.clone(), cases.clone()))?;
        Ok(tonic::Response::new(Suite { name, api, items }))
    }

    async fn get_suggested_ap_is(
        &self,
        request: tonic::Request<TestSuiteIdentity>,
    ) -> RpcResult<TestCases> {
        let name = request.into_inner().name;
        self.with_suite(&name, |_| ())?;
        Ok(tonic::Response::new(TestCases { data: vec![] }))
    }

    async fn get_test_case(&self, request: tonic::Request<TestCaseIdentity>) -> RpcResult<TestCase> {
        let id = request.into_inner();
        let found = self.with_suite(&id.suite, |(_, cases)| {
            cases.iter().find(|c| c.name == id.testcase).cloned()
        })?;
        found
            .map(tonic::Response::new)
            .ok_or_else(|| Status::not_found(format!("case {} not found", id.testcase)))
    }

    async fn create_test_case(
        &self,
        request: tonic::Request<TestCaseWithSuite>,
    ) -> RpcResult<HelloReply> {
        let case = request.into_inner();
        let data = case.data.unwrap_or_default();
        let name = data.name.clone();
        self.with_suite(&case.suite_name, |(_, cases)| cases.push(data))?;
        reply(format!("case {name} created"))
    }

    async fn update_test_case(
        &self,
        request: tonic::Request<TestCaseWithSuite>,
    ) -> RpcResult<HelloReply> {
        let case = request.into_inner();
        let data = case.data.unwrap_or_default();
        self.with_suite(&case.suite_name, |(_, cases)| {
            if let Some(existing) = cases.iter_mut().find(|c| c.name == data.name) {
                *existing = data;
            }
        })?;
        reply(String::new())
    }

    async fn delete_test_case(
        &self,
        request: tonic::Request<TestCaseIdentity>,
    ) -> RpcResult<HelloReply> {
        let id = request.into_inner();
        self.with_suite(&id.suite, |(_, cases)| cases.retain(|c| c.name != id.testcase))?;
        reply(format!("case {} deleted", id.testcase))
    }

    async fn run_test_case(
        &self,
        request: tonic::Request<TestCaseIdentity>,
    ) -> RpcResult<TestCaseResult> {
        let id = request.into_inner();
        let case = self
            .with_suite(&id.suite, |(_, cases)| {
                cases.iter().find(|c| c.name == id.testcase).cloned()
            })?
            .ok_or_else(|| Status::not_found(format!("case {} not found", id.testcase)))?;
        let status_code = case.response.map(|r| r.status_code).unwrap_or(200);
        Ok(tonic::Response::new(TestCaseResult {
            status_code,
            body: "{}".to_string(),
            id: case.name,
            ..Default::default()
        }))
    }
}

#[async_trait]
impl Mock for FakeRunner {
    async fn reload(&self, request: tonic::Request<MockConfig>) -> RpcResult<Empty> {
        self.state.lock().unwrap().mock = request.into_inner();
        Ok(tonic::Response::new(Empty {}))
    }

    async fn get_config(&self, _: tonic::Request<Empty>) -> RpcResult<MockConfig> {
        let config = self.state.lock().unwrap().mock.clone();
        Ok(tonic::Response::new(config))
    }
}

/// Serve a fresh fake runner on an ephemeral port and return its address
async fn spawn_runner() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let runner = FakeRunner::default();

    tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(RunnerServer::new(runner.clone()))
            .add_service(MockServer::new(runner))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    address
}

// =============================================================================
// MCP client helpers
// =============================================================================

fn mcp_server(runner_address: &str) -> AtestMcpServer {
    let context = Arc::new(ToolContext::new(
        Arc::new(GrpcBackend::new(runner_address)),
        Launcher::system(),
    ));
    let mut server = AtestMcpServer::new(ServerConfig::new(runner_address), context);
    server.initialize().unwrap();
    server
}

async fn call_tool(server: &AtestMcpServer, name: &str, arguments: Value) -> Value {
    let request = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    });
    let response = server.handle_message(&request.to_string()).await.unwrap();
    let response: Value = serde_json::from_str(&response).unwrap();
    response["result"].clone()
}

fn text(result: &Value) -> String {
    result["content"][0]["text"].as_str().unwrap().to_string()
}

fn is_error(result: &Value) -> bool {
    result["isError"] == true
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_suite_and_case_lifecycle() {
    let address = spawn_runner().await;
    let server = mcp_server(&address);

    let created = call_tool(
        &server,
        "create-test-suite",
        json!({"name": "petstore", "api": "http://localhost:8080"}),
    )
    .await;
    assert!(!is_error(&created));
    assert_eq!(text(&created), "suite petstore created");

    let created = call_tool(
        &server,
        "create-test-case",
        json!({
            "suiteName": "petstore",
            "caseName": "create-pet",
            "api": "/pets",
            "method": "POST",
            "headers": {"Content-Type": "application/json"},
            "expectStatusCode": 201
        }),
    )
    .await;
    assert_eq!(text(&created), "case create-pet created");

    let suites: Value = serde_json::from_str(&text(
        &call_tool(&server, "get-suites", json!({})).await,
    ))
    .unwrap();
    assert_eq!(
        suites,
        json!({"petstore": {"data": ["create-pet"], "kind": "http"}})
    );

    let case: Value = serde_json::from_str(&text(
        &call_tool(
            &server,
            "get-test-case",
            json!({"suite": "petstore", "testcase": "create-pet"}),
        )
        .await,
    ))
    .unwrap();
    assert_eq!(case["request"]["method"], "POST");
    assert_eq!(case["request"]["header"][0]["key"], "Content-Type");
    assert_eq!(case["response"]["statusCode"], 201);

    let ran: Value = serde_json::from_str(&text(
        &call_tool(
            &server,
            "run-test-case",
            json!({"suite": "petstore", "testcase": "create-pet"}),
        )
        .await,
    ))
    .unwrap();
    assert_eq!(ran["statusCode"], 201);
    assert_eq!(ran["id"], "create-pet");

    let updated = call_tool(
        &server,
        "update-test-suite",
        json!({"name": "petstore", "api": "http://pets.local"}),
    )
    .await;
    assert_eq!(text(&updated), "ok");
    let suite: Value = serde_json::from_str(&text(
        &call_tool(&server, "get-test-suite", json!({"name": "petstore"})).await,
    ))
    .unwrap();
    assert_eq!(suite["api"], "http://pets.local");

    let deleted = call_tool(
        &server,
        "delete-test-case",
        json!({"suite": "petstore", "testcase": "create-pet"}),
    )
    .await;
    assert_eq!(text(&deleted), "case create-pet deleted");

    let deleted = call_tool(&server, "delete-test-suite", json!({"name": "petstore"})).await;
    assert_eq!(text(&deleted), "suite petstore deleted");

    let suites = call_tool(&server, "get-suites", json!({})).await;
    assert_eq!(text(&suites), "{}");
}

#[tokio::test]
async fn test_error_reply_becomes_error_envelope() {
    let address = spawn_runner().await;
    let server = mcp_server(&address);

    call_tool(&server, "create-test-suite", json!({"name": "dup"})).await;
    let again = call_tool(&server, "create-test-suite", json!({"name": "dup"})).await;

    assert!(is_error(&again));
    assert!(text(&again).contains("already exists"));
}

#[tokio::test]
async fn test_error_status_becomes_error_envelope() {
    let address = spawn_runner().await;
    let server = mcp_server(&address);

    let result = call_tool(&server, "get-test-suite", json!({"name": "missing"})).await;

    assert!(is_error(&result));
    let message = text(&result);
    assert!(message.contains("GetTestSuite"), "{message}");
    assert!(message.contains("suite missing not found"), "{message}");
}

#[tokio::test]
async fn test_run_inline_suite() {
    let address = spawn_runner().await;
    let server = mcp_server(&address);

    let result = call_tool(
        &server,
        "run",
        json!({"data": "name: inline", "caseName": "only"}),
    )
    .await;
    assert!(!is_error(&result));
    let cases: Value = serde_json::from_str(&text(&result)).unwrap();
    assert_eq!(cases[0]["id"], "only");

    let failed = call_tool(&server, "run", json!({})).await;
    assert!(is_error(&failed));
    assert!(text(&failed).contains("no suite content"));
}

#[tokio::test]
async fn test_remote_mock_round_trip() {
    let address = spawn_runner().await;
    let server = mcp_server(&address);

    let empty = call_tool(&server, "get-remote-mock-config", json!({})).await;
    assert_eq!(text(&empty), "no mock config loaded");

    let reloaded = call_tool(
        &server,
        "reload-remote-mock-server",
        json!({"mockConfig": "items: []", "prefix": "/api", "serverPort": 6060}),
    )
    .await;
    assert_eq!(text(&reloaded), "success");

    let config = call_tool(&server, "get-remote-mock-config", json!({})).await;
    assert_eq!(text(&config), "items: []");
}

#[tokio::test]
async fn test_suite_completion_uses_runner() {
    let address = spawn_runner().await;
    let server = mcp_server(&address);
    for name in ["petstore", "pets-v2", "github"] {
        call_tool(&server, "create-test-suite", json!({"name": name})).await;
    }

    let request = json!({
        "jsonrpc": "2.0", "id": 3, "method": "completion/complete",
        "params": {
            "ref": {"type": "ref/prompt", "name": "run-test-suite"},
            "argument": {"name": "suite", "value": "pet"}
        }
    });
    let response: Value =
        serde_json::from_str(&server.handle_message(&request.to_string()).await.unwrap())
            .unwrap();

    assert_eq!(
        response["result"]["completion"]["values"],
        json!(["pets-v2", "petstore"])
    );
}

#[tokio::test]
async fn test_runner_down_is_error_envelope() {
    // Bind then drop to get a port nothing listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);

    let server = mcp_server(&address);
    let result = call_tool(&server, "get-suites", json!({})).await;

    assert!(is_error(&result));
    assert!(text(&result).starts_with("backend unreachable"));
}
