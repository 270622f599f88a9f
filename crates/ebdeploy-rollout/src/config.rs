//! Monitor configuration.

use std::time::Duration;

use ebdeploy_core::{DEFAULT_RECOVERY_WAIT_SECS, DeployConfig};
use typed_builder::TypedBuilder;

/// Event messages that mark a deployment as failed.
pub const DEFAULT_FAILURE_SIGNATURES: &[&str] = &[
    "Failed to deploy application",
    "Failed to deploy configuration",
    "Environment update completed unsuccessfully",
];

/// Consecutive throttled environment checks tolerated before giving up.
pub const DEFAULT_MAX_ENVIRONMENT_THROTTLES: u32 = 5;

/// Every how many polls a heartbeat line is emitted while converging.
pub const DEFAULT_HEARTBEAT_EVERY: u64 = 6;

/// What to watch and how patiently.
#[derive(Debug, Clone, TypedBuilder)]
pub struct MonitorConfig {
    /// Application name.
    #[builder(setter(into))]
    pub application_name: String,
    /// Environment being updated.
    #[builder(setter(into))]
    pub environment_name: String,
    /// Version the environment should end up running.
    #[builder(setter(into))]
    pub version_label: String,
    /// Grace window for health to return to Green once the update is done.
    #[builder(default = Duration::from_secs(DEFAULT_RECOVERY_WAIT_SECS))]
    pub recovery_wait: Duration,
    /// Substrings of event messages that signal a failed deployment.
    #[builder(default = default_failure_signatures())]
    pub failure_signatures: Vec<String>,
    /// Consecutive throttled environment checks tolerated.
    #[builder(default = DEFAULT_MAX_ENVIRONMENT_THROTTLES)]
    pub max_environment_throttles: u32,
    /// Heartbeat period, in polls.
    #[builder(default = DEFAULT_HEARTBEAT_EVERY)]
    pub heartbeat_every: u64,
}

impl MonitorConfig {
    /// Monitor settings for deploying `config` to `environment`.
    #[must_use]
    pub fn for_deployment(config: &DeployConfig, environment: &str) -> Self {
        Self::builder()
            .application_name(config.application_name.clone())
            .environment_name(environment)
            .version_label(config.version_label.clone())
            .recovery_wait(Duration::from_secs(config.recovery_wait_secs))
            .build()
    }
}

fn default_failure_signatures() -> Vec<String> {
    DEFAULT_FAILURE_SIGNATURES
        .iter()
        .map(|s| (*s).to_owned())
        .collect()
}
