//! Deployment configuration supplied by the caller.
//!
//! [`DeployConfig`] is an immutable value handed to the rollout orchestrator.
//! The binary fills it from command-line flags and environment variables; the
//! library crates never read the process environment themselves.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::{ConfigError, ConfigResult};
use crate::types::AwsRegion;

/// Default grace window, in seconds, for health to return to Green.
pub const DEFAULT_RECOVERY_WAIT_SECS: u64 = 30;

/// Default ceiling for throttling retries.
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Longest version description the platform accepts.
pub const MAX_DESCRIPTION_LEN: usize = 200;

const TRUNCATED_MARKER: &str = "[...TRUNCATED]";

/// Everything needed to create (or reuse) an application version and roll it
/// out to an environment.
///
/// # Examples
///
/// ```
/// use ebdeploy_core::{AwsRegion, DeployConfig};
///
/// let config = DeployConfig::builder()
///     .application_name("shop".to_owned())
///     .version_label("v42".to_owned())
///     .region(AwsRegion::new("us-east-1"))
///     .access_key_id("AKID".to_owned())
///     .secret_access_key("secret".to_owned())
///     .artifact_path(Some("build/app.zip".into()))
///     .build();
///
/// assert!(config.wait_for_deployment);
/// assert_eq!(config.recovery_wait_secs, 30);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct DeployConfig {
    /// Application name.
    pub application_name: String,

    /// Target environment. `None` means "create the version only, do not deploy".
    #[builder(default)]
    pub environment_name: Option<String>,

    /// Version label to create or reuse.
    pub version_label: String,

    /// Free-form version description.
    #[builder(default)]
    pub version_description: Option<String>,

    /// Region hosting the application.
    pub region: AwsRegion,

    /// Access key ID.
    pub access_key_id: String,

    /// Secret access key.
    #[serde(skip)]
    pub secret_access_key: String,

    /// Optional session token for temporary credentials.
    #[serde(skip)]
    #[builder(default)]
    pub session_token: Option<String>,

    /// Artifact to upload when a new version is created.
    #[builder(default)]
    pub artifact_path: Option<PathBuf>,

    /// Use this bucket instead of asking the platform for its storage location.
    #[builder(default)]
    pub existing_bucket: Option<String>,

    /// Wait for the environment to finish updating before returning.
    #[builder(default = true)]
    pub wait_for_deployment: bool,

    /// Seconds health may stay below Green after an otherwise successful update.
    #[builder(default = DEFAULT_RECOVERY_WAIT_SECS)]
    pub recovery_wait_secs: u64,

    /// Ceiling for throttling retries per call.
    #[builder(default = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Deploy an already existing version instead of failing.
    #[builder(default = false)]
    pub use_existing_version_if_available: bool,

    /// Endpoint override (e.g. `http://localhost:4566`).
    #[builder(default)]
    pub endpoint_url: Option<String>,
}

impl DeployConfig {
    /// Check that every required setting is present.
    ///
    /// Credentials and region are reported as their dedicated
    /// [`ConfigError`] variants so callers can tell them apart.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.application_name.trim().is_empty() {
            return Err(ConfigError::MissingSetting("application_name"));
        }
        if self.version_label.trim().is_empty() {
            return Err(ConfigError::MissingSetting("version_label"));
        }
        if self.region.is_empty() {
            return Err(ConfigError::MissingRegion);
        }
        if self.access_key_id.trim().is_empty() {
            return Err(ConfigError::MissingAccessKey);
        }
        if self.secret_access_key.trim().is_empty() {
            return Err(ConfigError::MissingSecretKey);
        }
        if self.artifact_path.is_none() && !self.use_existing_version_if_available {
            return Err(ConfigError::MissingSetting("artifact_path"));
        }
        if let Some(endpoint) = &self.endpoint_url {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(ConfigError::Invalid {
                    name: "endpoint_url",
                    reason: format!("{endpoint} is not an http(s) URL"),
                });
            }
        }
        Ok(())
    }

    /// The version description, truncated to what the platform accepts.
    #[must_use]
    pub fn description(&self) -> Option<String> {
        self.version_description
            .as_deref()
            .filter(|d| !d.is_empty())
            .map(truncate_description)
    }
}

impl fmt::Debug for DeployConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployConfig")
            .field("application_name", &self.application_name)
            .field("environment_name", &self.environment_name)
            .field("version_label", &self.version_label)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .field("artifact_path", &self.artifact_path)
            .field("existing_bucket", &self.existing_bucket)
            .field("wait_for_deployment", &self.wait_for_deployment)
            .field("recovery_wait_secs", &self.recovery_wait_secs)
            .field("max_retries", &self.max_retries)
            .field(
                "use_existing_version_if_available",
                &self.use_existing_version_if_available,
            )
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}

/// Truncate a version description to [`MAX_DESCRIPTION_LEN`] characters,
/// ending it with a `[...TRUNCATED]` marker when it was cut.
///
/// # Examples
///
/// ```
/// use ebdeploy_core::truncate_description;
///
/// assert_eq!(truncate_description("short"), "short");
/// let long = "x".repeat(500);
/// let cut = truncate_description(&long);
/// assert_eq!(cut.chars().count(), 200);
/// assert!(cut.ends_with("[...TRUNCATED]"));
/// ```
#[must_use]
pub fn truncate_description(description: &str) -> String {
    if description.chars().count() <= MAX_DESCRIPTION_LEN {
        return description.to_owned();
    }
    let keep = MAX_DESCRIPTION_LEN - TRUNCATED_MARKER.len();
    let mut out: String = description.chars().take(keep).collect();
    out.push_str(TRUNCATED_MARKER);
    out
}
