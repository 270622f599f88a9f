//! Request descriptor and signed request values.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use ebdeploy_core::AwsRegion;
use http::Method;
use http::uri::Scheme;

use crate::canonical::{build_canonical_query_string, build_canonical_uri};
use crate::credentials::Credentials;

/// Everything needed to sign and send one request attempt.
///
/// A descriptor is immutable once built for an attempt; a redirect produces a
/// new descriptor via [`RequestDescriptor::with_host`] and is signed again.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// Service name used in the credential scope (e.g. `s3`).
    pub service: String,
    /// HTTP method.
    pub method: Method,
    /// URI scheme used on the wire.
    pub scheme: Scheme,
    /// Host (with port when non-default).
    pub host: String,
    /// Raw, unencoded path.
    pub path: String,
    /// Query parameters; keys are unique.
    pub query: Vec<(String, String)>,
    /// Extra request headers, signed along with the computed ones.
    pub headers: Vec<(String, String)>,
    /// Raw payload.
    pub payload: Bytes,
    /// Region used in the credential scope.
    pub region: AwsRegion,
    /// Credentials used to derive the signature.
    pub credentials: Credentials,
}

impl RequestDescriptor {
    /// Create a descriptor with an empty query, no extra headers, and no payload.
    #[must_use]
    pub fn new(
        service: impl Into<String>,
        method: Method,
        host: impl Into<String>,
        path: impl Into<String>,
        region: AwsRegion,
        credentials: Credentials,
    ) -> Self {
        Self {
            service: service.into(),
            method,
            scheme: Scheme::HTTPS,
            host: host.into(),
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            payload: Bytes::new(),
            region,
            credentials,
        }
    }

    /// Add or replace a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.query.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.query.push((key, value)),
        }
        self
    }

    /// Add a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the request payload.
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Set the URI scheme.
    #[must_use]
    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Copy of this descriptor targeting another host.
    #[must_use]
    pub fn with_host(&self, host: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.host = host.into();
        next
    }

    /// The encoded path, exactly as signed and sent.
    #[must_use]
    pub fn encoded_path(&self) -> String {
        build_canonical_uri(&self.path)
    }

    /// The encoded, sorted query string, exactly as signed and sent.
    #[must_use]
    pub fn encoded_query(&self) -> String {
        build_canonical_query_string(&self.query)
    }

    /// Full URL for this request.
    #[must_use]
    pub fn url(&self) -> String {
        let query = self.encoded_query();
        if query.is_empty() {
            format!("{}://{}{}", self.scheme, self.host, self.encoded_path())
        } else {
            format!(
                "{}://{}{}?{query}",
                self.scheme,
                self.host,
                self.encoded_path()
            )
        }
    }
}

/// A descriptor plus the headers that authenticate it.
///
/// Valid only for the timestamp it was built with.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    /// The request that was signed.
    pub descriptor: RequestDescriptor,
    /// Instant the signature was computed for (second precision).
    pub timestamp: DateTime<Utc>,
    /// Every header to send, including `authorization`.
    pub headers: Vec<(String, String)>,
}

impl SignedRequest {
    /// Look up a header by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The `authorization` header value.
    #[must_use]
    pub fn authorization(&self) -> &str {
        self.header("authorization").unwrap_or_default()
    }

    /// Full URL to send the request to.
    #[must_use]
    pub fn url(&self) -> String {
        self.descriptor.url()
    }
}
