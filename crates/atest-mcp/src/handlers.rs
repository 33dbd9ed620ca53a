//! MCP Tool Handlers
//!
//! Handlers for the tools that forward to the api-testing runner. Each one
//! maps its argument struct into the runner's request message, makes a
//! single unary call through [`Backend`](crate::backend::Backend) and renders
//! the reply: acknowledgement replies become their `message` text, structured
//! replies become pretty-printed JSON.

use std::collections::BTreeMap;
use std::sync::Arc;

use atest_proto::{
    ApiSpec, HelloReply, MockConfig, Pair, Request, Response, TestCase, TestCaseIdentity,
    TestCaseWithSuite, TestSuite, TestSuiteIdentity, TestTask,
};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::Result;
use crate::registry::ToolContext;
use crate::tools::ToolResult;

/// Suite kind used when creating or fetching suites through the adapter
pub const HTTP_SUITE_KIND: &str = "http";

/// Reply text for a successful remote mock reload
pub const RELOAD_CONFIRMATION: &str = "success";

// ============================================================================
// Arguments
// ============================================================================

/// Tools that take no arguments
#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct NoArgs {}

/// A key/value parameter
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PairArg {
    /// Parameter name
    pub key: String,
    /// Parameter value
    #[serde(default)]
    pub value: String,
    /// Optional human readable description
    #[serde(default)]
    pub description: String,
}

impl From<PairArg> for Pair {
    fn from(arg: PairArg) -> Self {
        Pair {
            key: arg.key,
            value: arg.value,
            description: arg.description,
        }
    }
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RunArgs {
    /// Test suite content in YAML format
    #[serde(default)]
    pub data: String,
    /// Kind of the content, leave empty for a test suite
    #[serde(default)]
    pub kind: String,
    /// Run only the test case with this name
    #[serde(default)]
    pub case_name: String,
    /// Log level for the run
    #[serde(default)]
    pub level: String,
    /// Environment variables available to the run
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Parameters passed to the run
    #[serde(default)]
    pub parameters: Vec<PairArg>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SuiteIdentityArgs {
    /// The name of test suite
    pub name: String,
    /// The API base URL of test suite
    #[serde(default)]
    pub api: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ApiSpecArgs {
    /// The kind of API spec, e.g. swagger
    #[serde(default)]
    pub kind: String,
    /// The URL of the API spec document
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateTestSuiteArgs {
    /// The name of test suite
    pub name: String,
    /// The API base URL of test suite
    #[serde(default)]
    pub api: String,
    /// Suite level parameters
    #[serde(default)]
    pub param: Vec<PairArg>,
    /// The API spec of test suite
    #[serde(default)]
    pub spec: Option<ApiSpecArgs>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CaseIdentityArgs {
    /// The name of test suite
    pub suite: String,
    /// The name of test case
    pub testcase: String,
    /// Parameters for the test case
    #[serde(default)]
    pub parameters: Vec<PairArg>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TestCaseArgs {
    /// The name of test suite
    pub suite_name: String,
    /// The name of test case
    pub case_name: String,
    /// The API path for test case
    #[serde(default)]
    pub api: String,
    /// The HTTP method for test case
    #[serde(default)]
    pub method: String,
    /// The request body
    #[serde(default)]
    pub body: String,
    /// Request headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Request query parameters
    #[serde(default)]
    pub query_params: BTreeMap<String, String>,
    /// Request cookies
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,
    /// Request form parameters
    #[serde(default)]
    pub form: BTreeMap<String, String>,
    /// Expected response status code
    #[serde(default)]
    pub expect_status_code: Option<i32>,
    /// Expected response body
    #[serde(default)]
    pub expect_body: String,
    /// Expected response headers
    #[serde(default)]
    pub expect_headers: BTreeMap<String, String>,
    /// Expected values of response body fields
    #[serde(default)]
    pub expect_body_fields: BTreeMap<String, String>,
    /// Verify expressions evaluated against the response
    #[serde(default)]
    pub verify: Vec<String>,
    /// Expected JSON schema of the response body
    #[serde(default)]
    pub expect_schema: String,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RemoteMockArgs {
    /// The mock config content in YAML format
    pub mock_config: String,
    /// The prefix of mock server, default is /mock
    #[serde(default)]
    pub prefix: String,
    /// The port of the mock server
    #[serde(default)]
    pub server_port: Option<u16>,
}

// ============================================================================
// Request mapping
// ============================================================================

/// Map-shaped arguments become pairs ordered by key
fn pairs(map: BTreeMap<String, String>) -> Vec<Pair> {
    map.into_iter()
        .map(|(key, value)| Pair {
            key,
            value,
            description: String::new(),
        })
        .collect()
}

fn pair_list(args: Vec<PairArg>) -> Vec<Pair> {
    args.into_iter().map(Pair::from).collect()
}

fn test_task(args: RunArgs) -> TestTask {
    TestTask {
        data: args.data,
        kind: args.kind,
        case_name: args.case_name,
        level: args.level,
        env: args.env.into_iter().collect(),
        parameters: pair_list(args.parameters),
    }
}

fn suite_identity(args: SuiteIdentityArgs, kind: &str) -> TestSuiteIdentity {
    TestSuiteIdentity {
        name: args.name,
        api: args.api,
        kind: kind.to_string(),
    }
}

fn test_suite(args: UpdateTestSuiteArgs) -> TestSuite {
    TestSuite {
        name: args.name,
        api: args.api,
        param: pair_list(args.param),
        spec: args.spec.map(|spec| ApiSpec {
            kind: spec.kind,
            url: spec.url,
        }),
    }
}

fn case_identity(args: CaseIdentityArgs) -> TestCaseIdentity {
    TestCaseIdentity {
        suite: args.suite,
        testcase: args.testcase,
        parameters: pair_list(args.parameters),
    }
}

fn test_case_with_suite(args: TestCaseArgs) -> TestCaseWithSuite {
    TestCaseWithSuite {
        suite_name: args.suite_name.clone(),
        data: Some(TestCase {
            name: args.case_name,
            suite_name: args.suite_name,
            request: Some(Request {
                api: args.api,
                method: args.method,
                header: pairs(args.headers),
                query: pairs(args.query_params),
                cookie: pairs(args.cookies),
                form: pairs(args.form),
                body: args.body,
            }),
            response: Some(Response {
                status_code: args.expect_status_code.unwrap_or_default(),
                body: args.expect_body,
                header: pairs(args.expect_headers),
                body_fields_expect: pairs(args.expect_body_fields),
                verify: args.verify,
                schema: args.expect_schema,
            }),
        }),
    }
}

fn mock_config(args: RemoteMockArgs) -> MockConfig {
    MockConfig {
        prefix: args.prefix,
        config: args.mock_config,
        port: args.server_port.map(i32::from).unwrap_or_default(),
    }
}

/// Acknowledgement replies carry their outcome in `message`
fn acknowledge(reply: HelloReply) -> ToolResult {
    if reply.message.is_empty() {
        ToolResult::text("ok")
    } else {
        ToolResult::text(reply.message)
    }
}

// ============================================================================
// Test Execution
// ============================================================================

/// Handle run - Run inline suite content
pub async fn run(ctx: Arc<ToolContext>, args: RunArgs) -> Result<ToolResult> {
    let reply = ctx.backend.run(test_task(args)).await?;
    ToolResult::json(&reply.test_case_result)
}

/// Handle run-test-case - Run a stored test case
pub async fn run_test_case(ctx: Arc<ToolContext>, args: CaseIdentityArgs) -> Result<ToolResult> {
    let reply = ctx.backend.run_test_case(case_identity(args)).await?;
    ToolResult::json(&reply)
}

// ============================================================================
// Test Suite Handlers
// ============================================================================

/// Handle get-suites - Suite names mapped to their case names
pub async fn get_suites(ctx: Arc<ToolContext>, _args: NoArgs) -> Result<ToolResult> {
    let reply = ctx.backend.get_suites().await?;
    let suites: BTreeMap<_, _> = reply.data.into_iter().collect();
    ToolResult::json(&suites)
}

pub async fn create_test_suite(
    ctx: Arc<ToolContext>,
    args: SuiteIdentityArgs,
) -> Result<ToolResult> {
    let reply = ctx
        .backend
        .create_test_suite(suite_identity(args, HTTP_SUITE_KIND))
        .await?;
    Ok(acknowledge(reply))
}

pub async fn get_test_suite(
    ctx: Arc<ToolContext>,
    args: SuiteIdentityArgs,
) -> Result<ToolResult> {
    let reply = ctx
        .backend
        .get_test_suite(suite_identity(args, HTTP_SUITE_KIND))
        .await?;
    ToolResult::json(&reply)
}

pub async fn update_test_suite(
    ctx: Arc<ToolContext>,
    args: UpdateTestSuiteArgs,
) -> Result<ToolResult> {
    let reply = ctx.backend.update_test_suite(test_suite(args)).await?;
    Ok(acknowledge(reply))
}

pub async fn delete_test_suite(
    ctx: Arc<ToolContext>,
    args: SuiteIdentityArgs,
) -> Result<ToolResult> {
    let reply = ctx
        .backend
        .delete_test_suite(suite_identity(args, ""))
        .await?;
    Ok(acknowledge(reply))
}

/// Handle get-suggested-apis - Cases generated from the suite's API spec
pub async fn get_suggested_apis(
    ctx: Arc<ToolContext>,
    args: SuiteIdentityArgs,
) -> Result<ToolResult> {
    let reply = ctx
        .backend
        .get_suggested_apis(suite_identity(args, ""))
        .await?;
    ToolResult::json(&reply.data)
}

// ============================================================================
// Test Case Handlers
// ============================================================================

pub async fn list_test_case(
    ctx: Arc<ToolContext>,
    args: SuiteIdentityArgs,
) -> Result<ToolResult> {
    let reply = ctx.backend.list_test_case(suite_identity(args, "")).await?;
    ToolResult::json(&reply)
}

pub async fn get_test_case(ctx: Arc<ToolContext>, args: CaseIdentityArgs) -> Result<ToolResult> {
    let reply = ctx.backend.get_test_case(case_identity(args)).await?;
    ToolResult::json(&reply)
}

pub async fn create_test_case(ctx: Arc<ToolContext>, args: TestCaseArgs) -> Result<ToolResult> {
    let reply = ctx
        .backend
        .create_test_case(test_case_with_suite(args))
        .await?;
    Ok(acknowledge(reply))
}

pub async fn update_test_case(ctx: Arc<ToolContext>, args: TestCaseArgs) -> Result<ToolResult> {
    let reply = ctx
        .backend
        .update_test_case(test_case_with_suite(args))
        .await?;
    Ok(acknowledge(reply))
}

pub async fn delete_test_case(
    ctx: Arc<ToolContext>,
    args: CaseIdentityArgs,
) -> Result<ToolResult> {
    let reply = ctx.backend.delete_test_case(case_identity(args)).await?;
    Ok(acknowledge(reply))
}

// ============================================================================
// Remote Mock Server Handlers
// ============================================================================

/// Handle reload-remote-mock-server - Load a config into the runner's mock server
pub async fn reload_remote_mock_server(
    ctx: Arc<ToolContext>,
    args: RemoteMockArgs,
) -> Result<ToolResult> {
    ctx.backend.reload_mock(mock_config(args)).await?;
    Ok(ToolResult::text(RELOAD_CONFIRMATION))
}

/// Handle get-remote-mock-config - Config text the runner's mock server holds
pub async fn get_remote_mock_config(ctx: Arc<ToolContext>, _args: NoArgs) -> Result<ToolResult> {
    let config = ctx.backend.get_mock_config().await?;
    if config.config.is_empty() {
        return Ok(ToolResult::text("no mock config loaded"));
    }
    Ok(ToolResult::text(config.config))
}
