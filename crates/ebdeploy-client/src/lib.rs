//! Signed HTTP transport and control-plane operations for ebdeploy.
//!
//! The crate composes three layers into [`ApiClient`]:
//!
//! - [`transport::HttpTransport`] signs a [`RequestDescriptor`], sends it
//!   through an [`HttpSender`], re-signs on redirects, and decodes the body
//!   into an [`ApiResult`].
//! - [`retry::RetryPolicy`] retries throttled results with exponential
//!   backoff and jitter, up to a configurable ceiling.
//! - [`client::ApiClient`] exposes one method per control-plane operation.
//!
//! Every operation returns an [`ApiResult`]; callers decide what "success"
//! means for their operation via [`ApiResult::ensure_success`] or
//! [`ApiResult::parse`].
//!
//! [`RequestDescriptor`]: ebdeploy_auth::RequestDescriptor

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod response;
pub mod retry;
pub mod sender;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod transport;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult, TransportError};
pub use response::{ApiBody, ApiResult};
pub use retry::RetryPolicy;
pub use sender::{HttpSender, ReqwestSender};
