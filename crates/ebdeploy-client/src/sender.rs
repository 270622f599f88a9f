//! The seam between signed requests and the network.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use ebdeploy_core::{ConfigError, ConfigResult};

use crate::error::TransportError;

/// Sends one fully-formed HTTP request and returns the raw response.
///
/// Implementations must not follow redirects or decompress bodies; the
/// transport re-signs redirected requests and decodes bodies itself.
#[async_trait]
pub trait HttpSender: Send + Sync + 'static {
    /// Send `request` and collect the full response body.
    async fn send(&self, request: http::Request<Bytes>)
    -> Result<http::Response<Bytes>, TransportError>;
}

#[async_trait]
impl<T: HttpSender> HttpSender for Arc<T> {
    async fn send(
        &self,
        request: http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>, TransportError> {
        (**self).send(request).await
    }
}

/// [`HttpSender`] backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestSender {
    http: reqwest::Client,
}

impl ReqwestSender {
    /// Build a sender with automatic redirects disabled.
    pub fn new() -> ConfigResult<Self> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ConfigError::Invalid {
                name: "http_client",
                reason: e.to_string(),
            })?;
        Ok(Self { http })
    }
}

#[async_trait]
impl HttpSender for ReqwestSender {
    async fn send(
        &self,
        request: http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>, TransportError> {
        let request = reqwest::Request::try_from(request)
            .map_err(|e| TransportError::with_source("invalid request", e))?;

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| TransportError::with_source("request failed", e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::with_source("failed to read response body", e))?;

        let mut out = http::Response::new(body);
        *out.status_mut() = status;
        *out.headers_mut() = headers;
        Ok(out)
    }
}
