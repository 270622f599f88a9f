//! Rollout error types.

use std::path::PathBuf;

use ebdeploy_client::ClientError;
use ebdeploy_core::ConfigError;

use crate::state::FailureReason;

/// Errors that end a deployment monitor run.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// A failure event was seen and the next snapshot did not show the
    /// target version ready.
    #[error(
        "deployment failed: environment runs {}, status {status}, health {health}",
        .version_label.as_deref().unwrap_or("no version")
    )]
    DeploymentFailed {
        /// Version the environment reports.
        version_label: Option<String>,
        /// Lifecycle status at failure time.
        status: String,
        /// Health at failure time.
        health: String,
    },

    /// The update finished but health did not return to Green in time.
    #[error(
        "health stayed {health} ({health_status}) for {waited_secs}s after the update finished"
    )]
    RecoveryTimeout {
        /// Last observed health.
        health: String,
        /// Last observed detailed health status.
        health_status: String,
        /// Length of the grace window, in seconds.
        waited_secs: u64,
    },

    /// Too many consecutive throttled environment checks.
    #[error("environment check throttled {attempts} times in a row")]
    EnvironmentThrottled {
        /// Consecutive throttled checks.
        attempts: u32,
    },

    /// The platform returned no environment with the monitored name.
    #[error("environment {environment} not found")]
    EnvironmentNotFound {
        /// Environment name that was queried.
        environment: String,
    },

    /// A control-plane call failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The run was cancelled.
    #[error("monitoring cancelled")]
    Cancelled,
}

impl From<FailureReason> for MonitorError {
    fn from(reason: FailureReason) -> Self {
        match reason {
            FailureReason::DeploymentFailed {
                version_label,
                status,
                health,
            } => Self::DeploymentFailed {
                version_label,
                status,
                health,
            },
            FailureReason::RecoveryTimeout {
                health,
                health_status,
                waited,
            } => Self::RecoveryTimeout {
                health,
                health_status,
                waited_secs: waited.as_secs(),
            },
            FailureReason::EnvironmentThrottled { attempts } => {
                Self::EnvironmentThrottled { attempts }
            }
        }
    }
}

/// Errors that end a deployment.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Invalid configuration, detected before any network call.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The version (or its bundle) is already registered.
    #[error("version {version_label} of {application} already exists")]
    VersionExists {
        /// Application name.
        application: String,
        /// Version label.
        version_label: String,
    },

    /// A new version has to be created but no artifact was given.
    #[error("no artifact to upload for version {version_label}")]
    MissingArtifact {
        /// Version label.
        version_label: String,
    },

    /// The artifact could not be read.
    #[error("failed to read artifact {}: {source}", .path.display())]
    Artifact {
        /// Artifact path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A control-plane call failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Monitoring ended in failure.
    #[error(transparent)]
    Monitor(#[from] MonitorError),
}

impl DeployError {
    /// Process exit code for this failure: 1 when the deployment finished
    /// but health never recovered, 2 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Monitor(MonitorError::RecoveryTimeout { .. }) => 1,
            _ => 2,
        }
    }
}
