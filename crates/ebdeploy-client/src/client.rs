//! Named control-plane operations.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use ebdeploy_auth::RequestDescriptor;
use ebdeploy_auth::sigv4::AMZ_DATE_FORMAT;
use ebdeploy_core::truncate_description;
use ebdeploy_model::Operation;
use ebdeploy_model::operations::API_VERSION;
use http::Method;

use crate::config::ClientConfig;
use crate::endpoint::{
    ORCHESTRATION_SERVICE, STORAGE_SERVICE, object_location, orchestration_endpoint,
};
use crate::error::ClientResult;
use crate::response::ApiResult;
use crate::retry::RetryPolicy;
use crate::sender::{HttpSender, ReqwestSender};
use crate::transport::HttpTransport;

/// Severity filter sent with event queries; `TRACE` returns everything.
const EVENT_SEVERITY: &str = "TRACE";

/// One method per control-plane operation.
///
/// Every call is signed, sent, re-signed across redirects, and retried while
/// throttled. The returned [`ApiResult`] is not checked: "success" differs
/// per operation (a `HEAD` 404 is an answer, not a failure), so callers use
/// [`ApiResult::ensure_success`] or [`ApiResult::parse`].
#[derive(Debug)]
pub struct ApiClient<S = ReqwestSender> {
    config: ClientConfig,
    transport: HttpTransport<S>,
    retry: RetryPolicy,
}

impl ApiClient<ReqwestSender> {
    /// Create a client sending over HTTPS with `reqwest`.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        Ok(Self::with_sender(config, ReqwestSender::new()?))
    }
}

impl<S: HttpSender> ApiClient<S> {
    /// Create a client sending through `sender`.
    pub fn with_sender(config: ClientConfig, sender: S) -> Self {
        let transport = HttpTransport::new(sender, config.max_redirects);
        let retry = RetryPolicy::new(config.max_retries);
        Self {
            config,
            transport,
            retry,
        }
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The underlying sender.
    pub fn sender(&self) -> &S {
        self.transport.sender()
    }

    /// `CreateStorageLocation`: provision or look up the platform bucket.
    pub async fn create_storage_location(&self) -> ClientResult<ApiResult> {
        let op = Operation::CreateStorageLocation;
        self.call(op, self.orchestration(op)?).await
    }

    /// `HEAD` an object; 200 means it exists, 404 that it does not.
    pub async fn head_object(&self, bucket: &str, key: &str) -> ClientResult<ApiResult> {
        let op = Operation::HeadObject;
        self.call(op, self.object(Method::HEAD, bucket, key)?).await
    }

    /// `PUT` an object with an octet-stream body.
    pub async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> ClientResult<ApiResult> {
        let op = Operation::PutObject;
        let descriptor = self
            .object(Method::PUT, bucket, key)?
            .with_header("content-type", "application/octet-stream")
            .with_payload(body);
        self.call(op, descriptor).await
    }

    /// `CreateApplicationVersion` from an uploaded bundle.
    ///
    /// The description is truncated to the platform limit; the key is sent
    /// without a leading slash.
    pub async fn create_application_version(
        &self,
        application: &str,
        version_label: &str,
        description: Option<&str>,
        bucket: &str,
        key: &str,
    ) -> ClientResult<ApiResult> {
        let op = Operation::CreateApplicationVersion;
        let mut descriptor = self
            .orchestration(op)?
            .with_query("ApplicationName", application)
            .with_query("VersionLabel", version_label)
            .with_query("SourceBundle.S3Bucket", bucket)
            .with_query("SourceBundle.S3Key", key.trim_start_matches('/'));
        if let Some(description) = description.filter(|d| !d.is_empty()) {
            descriptor = descriptor.with_query("Description", truncate_description(description));
        }
        self.call(op, descriptor).await
    }

    /// `UpdateEnvironment`: point `environment` at `version_label`.
    pub async fn update_environment(
        &self,
        application: &str,
        environment: &str,
        version_label: &str,
    ) -> ClientResult<ApiResult> {
        let op = Operation::UpdateEnvironment;
        let descriptor = self
            .orchestration(op)?
            .with_query("ApplicationName", application)
            .with_query("EnvironmentName", environment)
            .with_query("VersionLabel", version_label);
        self.call(op, descriptor).await
    }

    /// `DescribeEvents` since `start_time` (sent with second precision).
    pub async fn describe_events(
        &self,
        application: &str,
        environment: &str,
        start_time: DateTime<Utc>,
    ) -> ClientResult<ApiResult> {
        let op = Operation::DescribeEvents;
        let descriptor = self
            .orchestration(op)?
            .with_query("ApplicationName", application)
            .with_query("EnvironmentName", environment)
            .with_query("Severity", EVENT_SEVERITY)
            .with_query("StartTime", start_time.format(AMZ_DATE_FORMAT).to_string());
        self.call(op, descriptor).await
    }

    /// `DescribeEnvironments` for a single environment.
    pub async fn describe_environment(
        &self,
        application: &str,
        environment: &str,
    ) -> ClientResult<ApiResult> {
        let op = Operation::DescribeEnvironments;
        let descriptor = self
            .orchestration(op)?
            .with_query("ApplicationName", application)
            .with_query("EnvironmentNames.member.1", environment);
        self.call(op, descriptor).await
    }

    /// `DescribeApplicationVersions` for a single label.
    pub async fn describe_application_versions(
        &self,
        application: &str,
        version_label: &str,
    ) -> ClientResult<ApiResult> {
        let op = Operation::DescribeApplicationVersions;
        let descriptor = self
            .orchestration(op)?
            .with_query("ApplicationName", application)
            .with_query("VersionLabels.member.1", version_label);
        self.call(op, descriptor).await
    }

    async fn call(&self, op: Operation, descriptor: RequestDescriptor) -> ClientResult<ApiResult> {
        let transport = &self.transport;
        self.retry
            .run(op, move || transport.execute(op, descriptor.clone()))
            .await
    }

    fn orchestration(&self, op: Operation) -> ClientResult<RequestDescriptor> {
        let endpoint =
            orchestration_endpoint(&self.config.region, self.config.endpoint_override.as_ref())?;
        Ok(RequestDescriptor::new(
            ORCHESTRATION_SERVICE,
            Method::GET,
            endpoint.authority(),
            "/",
            self.config.region.clone(),
            self.config.credentials.clone(),
        )
        .with_scheme(endpoint.scheme().clone())
        .with_header("accept", "application/json")
        .with_query("Action", op.as_str())
        .with_query("Version", API_VERSION))
    }

    fn object(&self, method: Method, bucket: &str, key: &str) -> ClientResult<RequestDescriptor> {
        let location = object_location(
            &self.config.region,
            self.config.endpoint_override.as_ref(),
            bucket,
            key,
        )?;
        Ok(RequestDescriptor::new(
            STORAGE_SERVICE,
            method,
            location.endpoint.authority(),
            location.path,
            self.config.region.clone(),
            self.config.credentials.clone(),
        )
        .with_scheme(location.endpoint.scheme().clone()))
    }
}
