//! Client for the api-testing runner
//!
//! [`Backend`] is the seam between tool handlers and the remote service: one
//! method per unary RPC the adapter forwards. [`GrpcBackend`] opens a fresh
//! plaintext channel for every call (single attempt, no pooling) and maps
//! transport failures to [`Error::BackendUnreachable`] and error statuses to
//! [`Error::BackendCallFailed`].

use async_trait::async_trait;
use atest_proto::mock_client::MockClient;
use atest_proto::runner_client::RunnerClient;
use atest_proto::{
    Empty, HelloReply, MockConfig, Suite, Suites, TestCase, TestCaseIdentity, TestCaseResult,
    TestCaseWithSuite, TestCases, TestResult, TestSuite, TestSuiteIdentity, TestTask,
};
use tonic::transport::{Channel, Endpoint};

use crate::{Error, Result};

/// Unary calls forwarded to the runner
#[async_trait]
pub trait Backend: Send + Sync {
    async fn run(&self, task: TestTask) -> Result<TestResult>;
    async fn get_suites(&self) -> Result<Suites>;
    async fn create_test_suite(&self, suite: TestSuiteIdentity) -> Result<HelloReply>;
    async fn get_test_suite(&self, suite: TestSuiteIdentity) -> Result<TestSuite>;
    async fn update_test_suite(&self, suite: TestSuite) -> Result<HelloReply>;
    async fn delete_test_suite(&self, suite: TestSuiteIdentity) -> Result<HelloReply>;
    async fn list_test_case(&self, suite: TestSuiteIdentity) -> Result<Suite>;
    async fn get_suggested_apis(&self, suite: TestSuiteIdentity) -> Result<TestCases>;
    async fn get_test_case(&self, case: TestCaseIdentity) -> Result<TestCase>;
    async fn create_test_case(&self, case: TestCaseWithSuite) -> Result<HelloReply>;
    async fn update_test_case(&self, case: TestCaseWithSuite) -> Result<HelloReply>;
    async fn delete_test_case(&self, case: TestCaseIdentity) -> Result<HelloReply>;
    async fn run_test_case(&self, case: TestCaseIdentity) -> Result<TestCaseResult>;
    async fn reload_mock(&self, config: MockConfig) -> Result<()>;
    async fn get_mock_config(&self) -> Result<MockConfig>;
}

/// gRPC implementation of [`Backend`]
#[derive(Debug, Clone)]
pub struct GrpcBackend {
    address: String,
}

impl GrpcBackend {
    /// `address` is `host:port`; an explicit `http://` prefix is accepted too
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn endpoint_uri(&self) -> String {
        if self.address.starts_with("http://") || self.address.starts_with("https://") {
            self.address.clone()
        } else {
            format!("http://{}", self.address)
        }
    }

    async fn connect(&self) -> Result<Channel> {
        let unreachable = |e: tonic::transport::Error| Error::BackendUnreachable {
            address: self.address.clone(),
            message: e.to_string(),
        };
        let endpoint = Endpoint::from_shared(self.endpoint_uri()).map_err(unreachable)?;
        tracing::debug!(address = %self.address, "Connecting to runner");
        endpoint.connect().await.map_err(unreachable)
    }

    async fn runner(&self) -> Result<RunnerClient<Channel>> {
        Ok(RunnerClient::new(self.connect().await?))
    }

    async fn mock(&self) -> Result<MockClient<Channel>> {
        Ok(MockClient::new(self.connect().await?))
    }
}

/// Treat a non-empty `error` field on an acknowledgement as a failed call
fn check_reply(method: &str, reply: HelloReply) -> Result<HelloReply> {
    if reply.error.is_empty() {
        Ok(reply)
    } else {
        Err(Error::BackendCallFailed {
            method: method.to_string(),
            message: reply.error,
        })
    }
}

#[async_trait]
impl Backend for GrpcBackend {
    async fn run(&self, task: TestTask) -> Result<TestResult> {
        let reply = self
            .runner()
            .await?
            .run(task)
            .await
            .map_err(|s| Error::call_failed("Run", s))?
            .into_inner();
        if reply.error.is_empty() {
            Ok(reply)
        } else {
            Err(Error::BackendCallFailed {
                method: "Run".to_string(),
                message: reply.error,
            })
        }
    }

    async fn get_suites(&self) -> Result<Suites> {
        let reply = self
            .runner()
            .await?
            .get_suites(Empty {})
            .await
            .map_err(|s| Error::call_failed("GetSuites", s))?;
        Ok(reply.into_inner())
    }

    async fn create_test_suite(&self, suite: TestSuiteIdentity) -> Result<HelloReply> {
        let reply = self
            .runner()
            .await?
            .create_test_suite(suite)
            .await
            .map_err(|s| Error::call_failed("CreateTestSuite", s))?;
        check_reply("CreateTestSuite", reply.into_inner())
    }

    async fn get_test_suite(&self, suite: TestSuiteIdentity) -> Result<TestSuite> {
        let reply = self
            .runner()
            .await?
            .get_test_suite(suite)
            .await
            .map_err(|s| Error::call_failed("GetTestSuite", s))?;
        Ok(reply.into_inner())
    }

    async fn update_test_suite(&self, suite: TestSuite) -> Result<HelloReply> {
        let reply = self
            .runner()
            .await?
            .update_test_suite(suite)
            .await
            .map_err(|s| Error::call_failed("UpdateTestSuite", s))?;
        check_reply("UpdateTestSuite", reply.into_inner())
    }

    async fn delete_test_suite(&self, suite: TestSuiteIdentity) -> Result<HelloReply> {
        let reply = self
            .runner()
            .await?
            .delete_test_suite(suite)
            .await
            .map_err(|s| Error::call_failed("DeleteTestSuite", s))?;
        check_reply("DeleteTestSuite", reply.into_inner())
    }

    async fn list_test_case(&self, suite: TestSuiteIdentity) -> Result<Suite> {
        let reply = self
            .runner()
            .await?
            .list_test_case(suite)
            .await
            .map_err(|s| Error::call_failed("ListTestCase", s))?;
        Ok(reply.into_inner())
    }

    async fn get_suggested_apis(&self, suite: TestSuiteIdentity) -> Result<TestCases> {
        let reply = self
            .runner()
            .await?
            .get_suggested_ap_is(suite)
            .await
            .map_err(|s| Error::call_failed("GetSuggestedAPIs", s))?;
        Ok(reply.into_inner())
    }

    async fn get_test_case(&self, case: TestCaseIdentity) -> Result<TestCase> {
        let reply = self
            .runner()
            .await?
            .get_test_case(case)
            .await
            .map_err(|s| Error::call_failed("GetTestCase", s))?;
        Ok(reply.into_inner())
    }

    async fn create_test_case(&self, case: TestCaseWithSuite) -> Result<HelloReply> {
        let reply = self
            .runner()
            .await?
            .create_test_case(case)
            .await
            .map_err(|s| Error::call_failed("CreateTestCase", s))?;
        check_reply("CreateTestCase", reply.into_inner())
    }

    async fn update_test_case(&self, case: TestCaseWithSuite) -> Result<HelloReply> {
        let reply = self
            .runner()
            .await?
            .update_test_case(case)
            .await
            .map_err(|s| Error::call_failed("UpdateTestCase", s))?;
        check_reply("UpdateTestCase", reply.into_inner())
    }

    async fn delete_test_case(&self, case: TestCaseIdentity) -> Result<HelloReply> {
        let reply = self
            .runner()
            .await?
            .delete_test_case(case)
            .await
            .map_err(|s| Error::call_failed("DeleteTestCase", s))?;
        check_reply("DeleteTestCase", reply.into_inner())
    }

    async fn run_test_case(&self, case: TestCaseIdentity) -> Result<TestCaseResult> {
        let reply = self
            .runner()
            .await?
            .run_test_case(case)
            .await
            .map_err(|s| Error::call_failed("RunTestCase", s))?;
        Ok(reply.into_inner())
    }

    async fn reload_mock(&self, config: MockConfig) -> Result<()> {
        self.mock()
            .await?
            .reload(config)
            .await
            .map_err(|s| Error::call_failed("Reload", s))?;
        Ok(())
    }

    async fn get_mock_config(&self) -> Result<MockConfig> {
        let reply = self
            .mock()
            .await?
            .get_config(Empty {})
            .await
            .map_err(|s| Error::call_failed("GetConfig", s))?;
        Ok(reply.into_inner())
    }
}
