//! Signs, sends, and decodes one request, re-signing across redirects.

use bytes::Bytes;
use chrono::Utc;
use ebdeploy_auth::{RequestDescriptor, SignedRequest, sign_request};
use ebdeploy_model::Operation;
use http::header::{CONTENT_LENGTH, LOCATION};
use tracing::debug;

use crate::endpoint::redirect_host;
use crate::error::{ClientError, ClientResult};
use crate::response::ApiResult;
use crate::sender::HttpSender;

/// Executes signed requests through an [`HttpSender`].
#[derive(Debug)]
pub struct HttpTransport<S> {
    sender: S,
    max_redirects: u8,
}

impl<S: HttpSender> HttpTransport<S> {
    /// Create a transport allowing `max_redirects` hops per call.
    pub fn new(sender: S, max_redirects: u8) -> Self {
        Self {
            sender,
            max_redirects,
        }
    }

    /// The underlying sender.
    pub fn sender(&self) -> &S {
        &self.sender
    }

    /// Sign and send `descriptor`, returning the decoded result.
    ///
    /// A 3xx answer carrying a `location` with a host is re-issued against
    /// that host with a fresh signature, since the host is part of what is
    /// signed. Any other status is returned as-is.
    pub async fn execute(
        &self,
        operation: Operation,
        descriptor: RequestDescriptor,
    ) -> ClientResult<ApiResult> {
        let mut descriptor = descriptor;
        let mut hops = 0u8;

        loop {
            let signed = sign_request(&descriptor, Utc::now());
            let request = to_http_request(operation, &signed)?;
            debug!(
                operation = %operation,
                method = %descriptor.method,
                host = %descriptor.host,
                path = %descriptor.path,
                "sending request"
            );

            let response = self
                .sender
                .send(request)
                .await
                .map_err(|source| ClientError::Transport { operation, source })?;

            let status = response.status();
            if status.is_redirection() {
                let next_host = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(redirect_host);

                if let Some(host) = next_host {
                    if hops >= self.max_redirects {
                        return Err(ClientError::TooManyRedirects { operation, hops });
                    }
                    hops += 1;
                    debug!(operation = %operation, status = status.as_u16(), host = %host, hops, "following redirect");
                    descriptor = descriptor.with_host(host);
                    continue;
                }
            }

            let result = ApiResult::from_response(operation, response)?;
            debug!(operation = %operation, status = result.status, "received response");
            return Ok(result);
        }
    }
}

/// Assemble the wire request. `content-length` is attached here, after
/// signing, so it is sent but not part of the signed header set.
fn to_http_request(
    operation: Operation,
    signed: &SignedRequest,
) -> ClientResult<http::Request<Bytes>> {
    let descriptor = &signed.descriptor;
    let mut builder = http::Request::builder()
        .method(descriptor.method.clone())
        .uri(signed.url());
    for (name, value) in &signed.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
        .header(CONTENT_LENGTH, descriptor.payload.len())
        .body(descriptor.payload.clone())
        .map_err(|e| ClientError::InvalidRequest {
            operation,
            reason: e.to_string(),
        })
}
