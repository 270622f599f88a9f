//! Result envelopes of the orchestration service.
//!
//! Every query-style call answers with
//! `{"<Op>Response": {"<Op>Result": { ... }, "ResponseMetadata": {...}}}`.
//! [`parse_result`] unwraps that envelope and decodes the payload.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::ModelError;
use crate::operations::Operation;
use crate::types::{ApplicationVersion, EnvironmentSnapshot, EventRecord, null_as_default};

/// Unwrap the `<Op>Response.<Op>Result` envelope and decode it as `T`.
///
/// # Examples
///
/// ```
/// use ebdeploy_model::Operation;
/// use ebdeploy_model::output::{CreateStorageLocationOutput, parse_result};
///
/// let body = serde_json::json!({
///     "CreateStorageLocationResponse": {
///         "CreateStorageLocationResult": { "S3Bucket": "elasticbeanstalk-us-east-1-123" }
///     }
/// });
/// let out: CreateStorageLocationOutput =
///     parse_result(Operation::CreateStorageLocation, &body).unwrap();
/// assert_eq!(out.s3_bucket, "elasticbeanstalk-us-east-1-123");
/// ```
pub fn parse_result<T: DeserializeOwned>(
    operation: Operation,
    body: &serde_json::Value,
) -> Result<T, ModelError> {
    let response_key = format!("{operation}Response");
    let result_key = format!("{operation}Result");

    let result = body
        .get(&response_key)
        .and_then(|response| response.get(&result_key))
        .ok_or_else(|| ModelError::MissingEnvelope {
            operation,
            path: format!("{response_key}.{result_key}"),
        })?;

    serde_json::from_value(result.clone())
        .map_err(|source| ModelError::Decode { operation, source })
}

/// Result of `CreateStorageLocation`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateStorageLocationOutput {
    /// The platform-managed bucket.
    pub s3_bucket: String,
}

/// Result of `CreateApplicationVersion`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateApplicationVersionOutput {
    /// The version that was registered.
    pub application_version: ApplicationVersion,
}

/// Result of `DescribeEvents`; events arrive newest first.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeEventsOutput {
    /// Event records, newest first.
    #[serde(default, deserialize_with = "null_as_default")]
    pub events: Vec<EventRecord>,
}

/// Result of `DescribeEnvironments`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeEnvironmentsOutput {
    /// Matching environments.
    #[serde(default, deserialize_with = "null_as_default")]
    pub environments: Vec<EnvironmentSnapshot>,
}

/// Result of `DescribeApplicationVersions`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeApplicationVersionsOutput {
    /// Matching versions.
    #[serde(default, deserialize_with = "null_as_default")]
    pub application_versions: Vec<ApplicationVersion>,
}

/// Result of `UpdateEnvironment`: the environment description after the
/// update was accepted.
pub type UpdateEnvironmentOutput = EnvironmentSnapshot;
