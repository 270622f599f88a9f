//! Decoded results of one request attempt.

use std::io::Read;

use bytes::Bytes;
use ebdeploy_model::error::THROTTLING_CODE;
use ebdeploy_model::output::parse_result;
use ebdeploy_model::{ApiErrorBody, ApiErrorDetail, ModelError, Operation};
use flate2::read::GzDecoder;
use http::HeaderMap;
use http::header::{CONTENT_ENCODING, CONTENT_TYPE};
use serde::de::DeserializeOwned;

use crate::error::{ClientError, ClientResult};

/// Response body, structured when the content type says so.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiBody {
    /// Parsed JSON.
    Json(serde_json::Value),
    /// Anything else, as received (after decompression).
    Raw(Bytes),
}

impl ApiBody {
    /// The body as text, lossily decoded.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Json(value) => value.to_string(),
            Self::Raw(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

/// Status, headers and decoded body of one attempt. Never mutated.
#[derive(Debug, Clone)]
pub struct ApiResult {
    /// Operation that produced this result.
    pub operation: Operation,
    /// HTTP status code.
    pub status: u16,
    /// Response headers; lookups are case-insensitive.
    pub headers: HeaderMap,
    /// Decoded body.
    pub body: ApiBody,
}

impl ApiResult {
    /// Decode a raw response: gunzip when the response declares gzip, then
    /// parse JSON when the content type is structured.
    pub fn from_response(
        operation: Operation,
        response: http::Response<Bytes>,
    ) -> ClientResult<Self> {
        let (parts, raw) = response.into_parts();
        let status = parts.status.as_u16();
        let headers = parts.headers;

        let raw = if is_gzip(&headers) {
            gunzip(&raw).map_err(|source| ClientError::Body { operation, source })?
        } else {
            raw
        };

        let body = if is_json(&headers) && !raw.is_empty() {
            match serde_json::from_slice(&raw) {
                Ok(value) => ApiBody::Json(value),
                Err(source) if (200..300).contains(&status) => {
                    return Err(ClientError::Json { operation, source });
                }
                // An unparsable error body is still a usable message.
                Err(_) => ApiBody::Raw(raw),
            }
        } else {
            ApiBody::Raw(raw)
        };

        Ok(Self {
            operation,
            status,
            headers,
            body,
        })
    }

    /// Whether the status is the expected success status (200).
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// Parsed JSON body, if any.
    #[must_use]
    pub fn json(&self) -> Option<&serde_json::Value> {
        match &self.body {
            ApiBody::Json(value) => Some(value),
            ApiBody::Raw(_) => None,
        }
    }

    /// Structured error detail, when the body carries one.
    #[must_use]
    pub fn error_detail(&self) -> Option<ApiErrorDetail> {
        self.json()
            .and_then(ApiErrorBody::from_json)
            .map(|body| body.error)
    }

    /// Structured error code, when the body carries one.
    #[must_use]
    pub fn error_code(&self) -> Option<String> {
        self.error_detail().and_then(|detail| detail.code)
    }

    /// Error message: the structured message, or the raw body.
    #[must_use]
    pub fn error_message(&self) -> String {
        self.error_detail()
            .and_then(|detail| detail.message)
            .unwrap_or_else(|| self.body.text())
    }

    /// Whether this is a rate-limit rejection.
    #[must_use]
    pub fn is_throttled(&self) -> bool {
        self.status == 400 && self.error_code().as_deref() == Some(THROTTLING_CODE)
    }

    /// Convert a non-success result into [`ClientError::Api`].
    pub fn ensure_success(self) -> ClientResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(self.into_error())
        }
    }

    /// The [`ClientError::Api`] describing this result.
    #[must_use]
    pub fn into_error(self) -> ClientError {
        ClientError::Api {
            operation: self.operation,
            status: self.status,
            code: self.error_code(),
            message: self.error_message(),
        }
    }

    /// Require success, then unwrap the `<Op>Response.<Op>Result` envelope.
    pub fn parse<T: DeserializeOwned>(self) -> ClientResult<T> {
        let result = self.ensure_success()?;
        let operation = result.operation;
        let value = result
            .json()
            .ok_or(ModelError::NotJson { operation })?;
        Ok(parse_result(operation, value)?)
    }
}

fn is_gzip(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("gzip"))
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().contains("json"))
}

fn gunzip(raw: &[u8]) -> std::io::Result<Bytes> {
    let mut decoded = Vec::new();
    GzDecoder::new(raw).read_to_end(&mut decoded)?;
    Ok(Bytes::from(decoded))
}
