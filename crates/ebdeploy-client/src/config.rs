//! Client configuration.

use ebdeploy_auth::Credentials;
use ebdeploy_core::{AwsRegion, ConfigError, ConfigResult, DEFAULT_MAX_RETRIES, DeployConfig};

use crate::endpoint::Endpoint;

/// Default bound on redirect hops for one call.
pub const DEFAULT_MAX_REDIRECTS: u8 = 5;

/// Immutable configuration shared by every request the client makes.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Region used for host resolution and the credential scope.
    pub region: AwsRegion,
    /// Credentials used to sign requests.
    pub credentials: Credentials,
    /// Ceiling for throttling retries per call.
    pub max_retries: u32,
    /// Redirect hops allowed per call.
    pub max_redirects: u8,
    /// Endpoint override; when set, every service is reached through it and
    /// object storage uses path-style addressing.
    pub endpoint_override: Option<Endpoint>,
}

impl ClientConfig {
    /// Create a configuration, rejecting an empty region.
    pub fn new(region: AwsRegion, credentials: Credentials) -> ConfigResult<Self> {
        if region.is_empty() {
            return Err(ConfigError::MissingRegion);
        }
        Ok(Self {
            region,
            credentials,
            max_retries: DEFAULT_MAX_RETRIES,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            endpoint_override: None,
        })
    }

    /// Build the client configuration out of a deployment configuration.
    pub fn from_deploy_config(config: &DeployConfig) -> ConfigResult<Self> {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            config.session_token.clone(),
        )?;
        let mut client = Self::new(config.region.clone(), credentials)?;
        client.max_retries = config.max_retries;
        if let Some(url) = &config.endpoint_url {
            client = client.with_endpoint_url(url)?;
        }
        Ok(client)
    }

    /// Set the throttling retry ceiling.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Route every call through `url` (e.g. `http://localhost:4566`).
    pub fn with_endpoint_url(mut self, url: &str) -> ConfigResult<Self> {
        self.endpoint_override = Some(Endpoint::parse(url)?);
        Ok(self)
    }
}
