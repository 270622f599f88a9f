//! ebdeploy - deploy an application bundle to Elastic Beanstalk.
//!
//! Creates (or reuses) an application version, points an environment at it,
//! and waits until the environment runs the new version with Green health.
//!
//! # Usage
//!
//! ```text
//! ebdeploy --application-name shop --environment-name shop-prod \
//!     --version-label v42 --deployment-package build/app.zip
//! ```
//!
//! # Environment Variables
//!
//! Every flag can also be supplied through the environment, following the
//! CI-action `INPUT_*` convention:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `INPUT_APPLICATION_NAME` | *(required)* | Application name |
//! | `INPUT_ENVIRONMENT_NAME` | *(unset)* | Environment to update; unset creates the version only |
//! | `INPUT_VERSION_LABEL` | *(required)* | Version label |
//! | `INPUT_VERSION_DESCRIPTION` | *(unset)* | Version description |
//! | `INPUT_DEPLOYMENT_PACKAGE` | *(unset)* | Bundle to upload |
//! | `INPUT_EXISTING_BUCKET_NAME` | *(unset)* | Upload here instead of the storage location |
//! | `INPUT_WAIT_FOR_DEPLOYMENT` | `true` | Wait for the rollout to finish |
//! | `INPUT_WAIT_FOR_ENVIRONMENT_RECOVERY` | `30` | Seconds health may stay below Green |
//! | `INPUT_MAX_BACKOFF_RETRIES` | `10` | Throttling retries per call |
//! | `INPUT_USE_EXISTING_VERSION_IF_AVAILABLE` | `false` | Deploy an existing version |
//! | `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` / `AWS_SESSION_TOKEN` | | Credentials |
//! | `AWS_REGION` | *(required)* | Region |
//! | `AWS_ENDPOINT_URL` | *(unset)* | Endpoint override, e.g. LocalStack |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |
//!
//! # Exit codes
//!
//! `0` on success, `1` when the update finished but health did not return to
//! Green in time, `2` on any other failure.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use ebdeploy_core::{AwsRegion, DEFAULT_MAX_RETRIES, DEFAULT_RECOVERY_WAIT_SECS, DeployConfig};
use ebdeploy_rollout::{DeployOutcome, Deployer, TracingReporter, VersionSource};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Exit code for failures that happen before a deployment starts.
const SETUP_FAILURE: u8 = 2;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    /// Human readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Command-line interface.
#[derive(Debug, Parser)]
#[command(name = "ebdeploy", version, about)]
struct Cli {
    /// Application name.
    #[arg(long, env = "INPUT_APPLICATION_NAME")]
    application_name: String,

    /// Environment to deploy to. Leave unset to only create the version.
    #[arg(long, env = "INPUT_ENVIRONMENT_NAME")]
    environment_name: Option<String>,

    /// Version label to create or reuse.
    #[arg(long, env = "INPUT_VERSION_LABEL")]
    version_label: String,

    /// Version description, truncated to 200 characters.
    #[arg(long, env = "INPUT_VERSION_DESCRIPTION")]
    version_description: Option<String>,

    /// Bundle to upload when a new version is created.
    #[arg(long, env = "INPUT_DEPLOYMENT_PACKAGE")]
    deployment_package: Option<PathBuf>,

    /// Upload to this bucket instead of the platform storage location.
    #[arg(long, env = "INPUT_EXISTING_BUCKET_NAME")]
    existing_bucket_name: Option<String>,

    /// Wait for the environment to finish updating.
    #[arg(long, env = "INPUT_WAIT_FOR_DEPLOYMENT", default_value_t = true, action = ArgAction::Set)]
    wait_for_deployment: bool,

    /// Seconds health may stay below Green after the update finished.
    #[arg(
        long,
        env = "INPUT_WAIT_FOR_ENVIRONMENT_RECOVERY",
        default_value_t = DEFAULT_RECOVERY_WAIT_SECS
    )]
    wait_for_environment_recovery: u64,

    /// Throttling retries per call.
    #[arg(long, env = "INPUT_MAX_BACKOFF_RETRIES", default_value_t = DEFAULT_MAX_RETRIES)]
    max_backoff_retries: u32,

    /// Deploy the version if it is already registered.
    #[arg(
        long,
        env = "INPUT_USE_EXISTING_VERSION_IF_AVAILABLE",
        default_value_t = false,
        action = ArgAction::Set
    )]
    use_existing_version_if_available: bool,

    /// Region hosting the application.
    #[arg(long, env = "AWS_REGION")]
    region: String,

    /// Access key ID.
    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    access_key_id: String,

    /// Secret access key.
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    secret_access_key: String,

    /// Session token for temporary credentials.
    #[arg(long, env = "AWS_SESSION_TOKEN", hide_env_values = true)]
    session_token: Option<String>,

    /// Endpoint override, e.g. `http://localhost:4566`.
    #[arg(long, env = "AWS_ENDPOINT_URL")]
    endpoint_url: Option<String>,

    /// Log level filter.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

impl Cli {
    /// Build the deployment configuration. Empty strings count as unset, since
    /// CI runners export every declared input.
    fn into_config(self) -> DeployConfig {
        DeployConfig::builder()
            .application_name(self.application_name)
            .environment_name(non_empty(self.environment_name))
            .version_label(self.version_label)
            .version_description(non_empty(self.version_description))
            .region(AwsRegion::new(self.region))
            .access_key_id(self.access_key_id)
            .secret_access_key(self.secret_access_key)
            .session_token(non_empty(self.session_token))
            .artifact_path(self.deployment_package.filter(|p| !p.as_os_str().is_empty()))
            .existing_bucket(non_empty(self.existing_bucket_name))
            .wait_for_deployment(self.wait_for_deployment)
            .recovery_wait_secs(self.wait_for_environment_recovery)
            .max_retries(self.max_backoff_retries)
            .use_existing_version_if_available(self.use_existing_version_if_available)
            .endpoint_url(non_empty(self.endpoint_url))
            .build()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `--log-level` value.
fn init_tracing(log_level: &str, format: LogFormat) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }

    Ok(())
}

/// Cancel `token` on the first Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("received interrupt, cancelling deployment");
            token.cancel();
        }
    });
}

fn summarize(outcome: &DeployOutcome) {
    match &outcome.source {
        VersionSource::Created { bucket, key } => {
            info!(
                version_label = %outcome.version_label,
                bucket = %bucket,
                key = %key,
                "application version created"
            );
        }
        VersionSource::Reused => {
            info!(version_label = %outcome.version_label, "reused existing application version");
        }
    }
    match (&outcome.environment, &outcome.stats) {
        (Some(environment), Some(stats)) => {
            info!(environment = %environment, %stats, "deployment finished");
        }
        (Some(environment), None) => {
            info!(environment = %environment, "deployment started, not waiting for completion");
        }
        (None, _) => info!("no environment given, version created only"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(&cli.log_level, cli.log_format) {
        eprintln!("{e:#}");
        return ExitCode::from(SETUP_FAILURE);
    }

    let deployer = match Deployer::new(cli.into_config(), Arc::new(TracingReporter)) {
        Ok(deployer) => deployer,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::from(SETUP_FAILURE);
        }
    };

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    match deployer.run(&cancel).await {
        Ok(outcome) => {
            summarize(&outcome);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "deployment failed");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(SETUP_FAILURE))
        }
    }
}
