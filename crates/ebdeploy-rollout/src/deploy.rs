//! End-to-end deployment: upload, register, update, and supervise.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use ebdeploy_client::{ApiClient, ClientConfig, HttpSender, ReqwestSender};
use ebdeploy_core::DeployConfig;
use ebdeploy_model::EnvironmentSnapshot;
use ebdeploy_model::output::{
    CreateApplicationVersionOutput, CreateStorageLocationOutput,
    DescribeApplicationVersionsOutput,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::MonitorConfig;
use crate::error::DeployError;
use crate::monitor::{DeploymentMonitor, RunStats};
use crate::reporter::Reporter;

/// Bundle extension used when the artifact path has none.
const DEFAULT_BUNDLE_EXTENSION: &str = "zip";

/// How the deployed version came to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSource {
    /// A bundle was uploaded and a new version registered.
    Created {
        /// Bucket holding the bundle.
        bucket: String,
        /// Object key of the bundle.
        key: String,
    },
    /// An already registered version was reused.
    Reused,
}

/// What a successful deployment did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOutcome {
    /// Version label that was deployed or registered.
    pub version_label: String,
    /// Whether the version was created or reused.
    pub source: VersionSource,
    /// Environment that was updated, if any.
    pub environment: Option<String>,
    /// Final snapshot, when the deployment was waited for.
    pub snapshot: Option<EnvironmentSnapshot>,
    /// Monitor counters, when the deployment was waited for.
    pub stats: Option<RunStats>,
}

/// Runs one deployment described by a [`DeployConfig`].
pub struct Deployer<S = ReqwestSender> {
    config: DeployConfig,
    client: ApiClient<S>,
    reporter: Arc<dyn Reporter>,
}

impl<S: fmt::Debug> fmt::Debug for Deployer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deployer")
            .field("config", &self.config)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl Deployer<ReqwestSender> {
    /// Validate `config` and build a deployer talking to the real services.
    pub fn new(config: DeployConfig, reporter: Arc<dyn Reporter>) -> Result<Self, DeployError> {
        config.validate()?;
        let client = ApiClient::new(ClientConfig::from_deploy_config(&config)?)?;
        Ok(Self::with_client(config, client, reporter))
    }
}

impl<S: HttpSender> Deployer<S> {
    /// Build a deployer around an existing client.
    pub fn with_client(config: DeployConfig, client: ApiClient<S>, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            config,
            client,
            reporter,
        }
    }

    /// The client used for every call.
    pub fn client(&self) -> &ApiClient<S> {
        &self.client
    }

    /// Run the deployment.
    ///
    /// With `use_existing_version_if_available`, an already registered version
    /// is deployed as-is. Otherwise the artifact is uploaded (refusing to
    /// overwrite an existing bundle) and registered as a new version. When an
    /// environment is configured it is updated and, if requested, monitored
    /// until it settles.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<DeployOutcome, DeployError> {
        let config = &self.config;
        let started_at = Utc::now();

        let source = if config.use_existing_version_if_available && self.version_exists().await? {
            if config.environment_name.is_none() {
                return Err(self.version_exists_error());
            }
            self.reporter.info(&format!(
                "Deploying existing version {}",
                config.version_label
            ));
            VersionSource::Reused
        } else {
            self.create_version().await?
        };

        let Some(environment) = config.environment_name.as_deref() else {
            self.reporter
                .info("No environment set, so the version was created but not deployed");
            return Ok(self.outcome(source, None, None, None));
        };

        self.reporter.info(&format!(
            "Starting deployment of version {} to environment {environment}",
            config.version_label
        ));
        self.client
            .update_environment(&config.application_name, environment, &config.version_label)
            .await?
            .ensure_success()?;
        self.reporter.info("Deployment started");

        if !config.wait_for_deployment {
            self.reporter
                .info("Not waiting for the deployment to finish; check its status in the console");
            return Ok(self.outcome(source, Some(environment), None, None));
        }

        let monitor = DeploymentMonitor::new(
            &self.client,
            MonitorConfig::for_deployment(config, environment),
            self.reporter.clone(),
        );
        let outcome = monitor.run(started_at, cancel).await?;
        Ok(self.outcome(
            source,
            Some(environment),
            Some(outcome.snapshot),
            Some(outcome.stats),
        ))
    }

    async fn version_exists(&self) -> Result<bool, DeployError> {
        let out: DescribeApplicationVersionsOutput = self
            .client
            .describe_application_versions(&self.config.application_name, &self.config.version_label)
            .await?
            .parse()?;
        let exists = out
            .application_versions
            .iter()
            .any(|v| v.version_label == self.config.version_label);
        debug!(version_label = %self.config.version_label, exists, "looked up application version");
        Ok(exists)
    }

    async fn create_version(&self) -> Result<VersionSource, DeployError> {
        let config = &self.config;
        let path = config
            .artifact_path
            .as_deref()
            .ok_or_else(|| DeployError::MissingArtifact {
                version_label: config.version_label.clone(),
            })?;
        let artifact = read_artifact(path).await?;

        let bucket = match &config.existing_bucket {
            Some(bucket) => bucket.clone(),
            None => {
                let out: CreateStorageLocationOutput =
                    self.client.create_storage_location().await?.parse()?;
                out.s3_bucket
            }
        };
        let key = bundle_key(&config.application_name, &config.version_label, path);

        let head = self.client.head_object(&bucket, &key).await?;
        match head.status {
            200 => return Err(self.version_exists_error()),
            404 => {}
            _ => return Err(head.into_error().into()),
        }

        self.reporter
            .info(&format!("Uploading {} to bucket {bucket}", path.display()));
        let size = artifact.len();
        self.client
            .put_object(&bucket, &key, artifact)
            .await?
            .ensure_success()?;
        info!(bucket = %bucket, key = %key, size, "uploaded bundle");
        self.reporter.info(&format!(
            "Uploaded new build: bucket={bucket}, key={key}"
        ));

        let description = config.description();
        let created: CreateApplicationVersionOutput = self
            .client
            .create_application_version(
                &config.application_name,
                &config.version_label,
                description.as_deref(),
                &bucket,
                &key,
            )
            .await?
            .parse()?;
        self.reporter.info(&format!(
            "Created new application version {}",
            created.application_version.version_label
        ));

        Ok(VersionSource::Created { bucket, key })
    }

    fn version_exists_error(&self) -> DeployError {
        DeployError::VersionExists {
            application: self.config.application_name.clone(),
            version_label: self.config.version_label.clone(),
        }
    }

    fn outcome(
        &self,
        source: VersionSource,
        environment: Option<&str>,
        snapshot: Option<EnvironmentSnapshot>,
        stats: Option<RunStats>,
    ) -> DeployOutcome {
        DeployOutcome {
            version_label: self.config.version_label.clone(),
            source,
            environment: environment.map(str::to_owned),
            snapshot,
            stats,
        }
    }
}

/// Object key of a bundle: `<application>/<version label>.<extension>`.
#[must_use]
pub fn bundle_key(application: &str, version_label: &str, artifact: &Path) -> String {
    let extension = artifact
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .unwrap_or(DEFAULT_BUNDLE_EXTENSION);
    format!("{application}/{version_label}.{extension}")
}

async fn read_artifact(path: &Path) -> Result<Bytes, DeployError> {
    tokio::fs::read(path)
        .await
        .map(Bytes::from)
        .map_err(|source| DeployError::Artifact {
            path: path.to_path_buf(),
            source,
        })
}
