//! Host resolution for the orchestration and object storage services.

use ebdeploy_core::{AwsRegion, ConfigError, ConfigResult};
use http::uri::{Authority, Scheme};

/// Service name of the orchestration API in the credential scope.
pub const ORCHESTRATION_SERVICE: &str = "elasticbeanstalk";

/// Service name of the object storage API in the credential scope.
pub const STORAGE_SERVICE: &str = "s3";

/// A scheme plus authority a request is sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    scheme: Scheme,
    authority: Authority,
}

impl Endpoint {
    /// An HTTPS endpoint for `host`.
    pub fn https(host: &str) -> ConfigResult<Self> {
        Ok(Self {
            scheme: Scheme::HTTPS,
            authority: parse_authority(host)?,
        })
    }

    /// Parse an `http(s)://host[:port]` URL. Any path is ignored.
    pub fn parse(url: &str) -> ConfigResult<Self> {
        let uri: http::Uri = url.parse().map_err(|e| ConfigError::Invalid {
            name: "endpoint_url",
            reason: format!("{url}: {e}"),
        })?;

        let scheme = uri.scheme().cloned().ok_or_else(|| ConfigError::Invalid {
            name: "endpoint_url",
            reason: format!("{url} has no scheme"),
        })?;
        if scheme != Scheme::HTTP && scheme != Scheme::HTTPS {
            return Err(ConfigError::Invalid {
                name: "endpoint_url",
                reason: format!("unsupported scheme {scheme}"),
            });
        }
        let authority = uri.authority().cloned().ok_or_else(|| ConfigError::Invalid {
            name: "endpoint_url",
            reason: format!("{url} has no host"),
        })?;

        Ok(Self { scheme, authority })
    }

    /// The URI scheme.
    #[must_use]
    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    /// Host and optional port, as sent in the `host` header.
    #[must_use]
    pub fn authority(&self) -> &str {
        self.authority.as_str()
    }
}

/// Where an object lives: the endpoint to call and the raw path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    /// Endpoint serving the bucket.
    pub endpoint: Endpoint,
    /// Raw (unencoded) request path.
    pub path: String,
}

/// Orchestration endpoint for `region`, honouring an override.
///
/// China-partition regions resolve to the `.com.cn` domain.
pub fn orchestration_endpoint(
    region: &AwsRegion,
    override_endpoint: Option<&Endpoint>,
) -> ConfigResult<Endpoint> {
    match override_endpoint {
        Some(endpoint) => Ok(endpoint.clone()),
        None => Endpoint::https(&region.service_host(ORCHESTRATION_SERVICE)),
    }
}

/// Location of `key` inside `bucket`.
///
/// Without an override this is virtual-hosted style,
/// `https://<bucket>.s3.<region>.<suffix>/<key>`; with an override it is
/// path style, `<override>/<bucket>/<key>`.
pub fn object_location(
    region: &AwsRegion,
    override_endpoint: Option<&Endpoint>,
    bucket: &str,
    key: &str,
) -> ConfigResult<ObjectLocation> {
    let key = key.trim_start_matches('/');
    match override_endpoint {
        Some(endpoint) => Ok(ObjectLocation {
            endpoint: endpoint.clone(),
            path: format!("/{bucket}/{key}"),
        }),
        None => Ok(ObjectLocation {
            endpoint: Endpoint::https(&format!(
                "{bucket}.{}",
                region.service_host(STORAGE_SERVICE)
            ))?,
            path: format!("/{key}"),
        }),
    }
}

/// Host to re-issue a request against after a redirect, read from a
/// `location` header value. `None` when the location carries no host.
#[must_use]
pub fn redirect_host(location: &str) -> Option<String> {
    let uri: http::Uri = location.parse().ok()?;
    uri.authority().map(|a| a.as_str().to_owned())
}

fn parse_authority(host: &str) -> ConfigResult<Authority> {
    host.parse().map_err(|e| ConfigError::Invalid {
        name: "host",
        reason: format!("{host}: {e}"),
    })
}
