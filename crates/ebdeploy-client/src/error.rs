//! Client error types.

use std::fmt;

use ebdeploy_core::ConfigError;
use ebdeploy_model::{ModelError, Operation};

/// Result alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Boxed error source accepted by [`TransportError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A failure below HTTP: DNS, connect, TLS, or a broken stream.
#[derive(Debug)]
pub struct TransportError {
    message: String,
    source: Option<BoxError>,
}

impl TransportError {
    /// An error with a message only.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// An error wrapping an underlying cause.
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {source}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Errors raised by [`ApiClient`](crate::ApiClient).
///
/// A non-2xx answer is not an error at the transport level; it is only turned
/// into [`ClientError::Api`] when a caller asks for success.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The request never produced an HTTP response.
    #[error("{operation} transport failure: {source}")]
    Transport {
        /// Operation being performed.
        operation: Operation,
        /// Underlying failure.
        #[source]
        source: TransportError,
    },

    /// The service answered with a failure status.
    #[error("{operation} failed with status {status}{}: {message}", code_suffix(.code))]
    Api {
        /// Operation being performed.
        operation: Operation,
        /// HTTP status code.
        status: u16,
        /// Structured error code, when present.
        code: Option<String>,
        /// Error message or raw body.
        message: String,
    },

    /// The request could not be assembled.
    #[error("invalid {operation} request: {reason}")]
    InvalidRequest {
        /// Operation being performed.
        operation: Operation,
        /// Why the request was rejected.
        reason: String,
    },

    /// The response body could not be decompressed.
    #[error("failed to read {operation} response body: {source}")]
    Body {
        /// Operation being performed.
        operation: Operation,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A JSON response body was malformed.
    #[error("malformed {operation} response: {source}")]
    Json {
        /// Operation being performed.
        operation: Operation,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// A successful body did not match the expected result shape.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The service kept redirecting past the hop limit.
    #[error("{operation} exceeded {hops} redirects")]
    TooManyRedirects {
        /// Operation being performed.
        operation: Operation,
        /// Hops followed before giving up.
        hops: u8,
    },
}

impl ClientError {
    /// Whether this is a rate-limit rejection.
    #[must_use]
    pub fn is_throttling(&self) -> bool {
        matches!(
            self,
            Self::Api { status: 400, code: Some(code), .. }
                if code == ebdeploy_model::error::THROTTLING_CODE
        )
    }

    /// Operation the error belongs to, when known.
    #[must_use]
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::Transport { operation, .. }
            | Self::Api { operation, .. }
            | Self::InvalidRequest { operation, .. }
            | Self::Body { operation, .. }
            | Self::Json { operation, .. }
            | Self::TooManyRedirects { operation, .. } => Some(*operation),
            Self::Config(_) | Self::Model(_) => None,
        }
    }
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default()
}
