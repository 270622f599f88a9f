//! Error body shapes and model decoding errors.
//!
//! A failed orchestration call answers with:
//!
//! ```json
//! { "Error": { "Code": "Throttling", "Message": "Rate exceeded", "Type": "Sender" } }
//! ```

use serde::{Deserialize, Serialize};

use crate::operations::Operation;

/// Code the platform uses for rate-limit rejections.
pub const THROTTLING_CODE: &str = "Throttling";

/// Structured error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// The error detail.
    #[serde(rename = "Error")]
    pub error: ApiErrorDetail,
}

/// Code and message of a structured error.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiErrorDetail {
    /// Machine-readable error code.
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
    /// Fault side (`Sender` / `Receiver`).
    #[serde(default, rename = "Type")]
    pub kind: Option<String>,
}

impl ApiErrorBody {
    /// Try to read a structured error out of a JSON body.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

/// Errors raised while reading a successful response body.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The body was not structured data.
    #[error("{operation} response is not JSON")]
    NotJson {
        /// The operation whose response was read.
        operation: Operation,
    },

    /// The `<Op>Response.<Op>Result` envelope was missing.
    #[error("{operation} response is missing the {path} envelope")]
    MissingEnvelope {
        /// The operation whose response was read.
        operation: Operation,
        /// Envelope path that was not found.
        path: String,
    },

    /// The result did not match the expected shape.
    #[error("failed to decode {operation} result: {source}")]
    Decode {
        /// The operation whose response was read.
        operation: Operation,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}
