//! Full deployment runs over real HTTP.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ebdeploy_rollout::{DeployError, Deployer, MonitorError, RecordingReporter, VersionSource};
    use http::Method;
    use tokio_util::sync::CancellationToken;

    use crate::{
        APPLICATION, FakeControlPlane, INITIAL_VERSION, Rollout, STORAGE_BUCKET, deploy_config,
        write_bundle,
    };

    #[tokio::test]
    async fn test_should_upload_register_and_deploy_new_version() {
        let plane = FakeControlPlane::start(crate::ENVIRONMENT, Rollout::Healthy)
            .await
            .unwrap();
        let bundle = write_bundle(b"PK\x03\x04 bundle bytes");
        let reporter = Arc::new(RecordingReporter::new());

        let deployer =
            Deployer::new(deploy_config(&plane, "v1", Some(&bundle)), reporter.clone()).unwrap();
        let outcome = deployer.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(
            outcome.source,
            VersionSource::Created {
                bucket: STORAGE_BUCKET.to_owned(),
                key: "shop/v1.zip".to_owned(),
            }
        );
        let snapshot = outcome.snapshot.expect("deployment was waited for");
        assert_eq!(snapshot.version_label.as_deref(), Some("v1"));
        assert_eq!(snapshot.health, "Green");
        assert_eq!(outcome.stats.map(|s| s.polls), Some(1));

        assert_eq!(
            plane.object(STORAGE_BUCKET, "shop/v1.zip").as_deref(),
            Some(&b"PK\x03\x04 bundle bytes"[..])
        );
        let version = plane.version("v1").unwrap();
        assert_eq!(version["Description"], "integration build");
        assert_eq!(version["ApplicationName"], APPLICATION);
        assert_eq!(plane.environment_version(), "v1");

        let upload = reporter.position("Uploaded new build").unwrap();
        let started = reporter.position("Deployment started").unwrap();
        assert!(upload < started);
        assert!(reporter.contains("Environment update completed successfully."));
    }

    #[tokio::test]
    async fn test_should_sign_each_service_with_its_own_scope() {
        let plane = FakeControlPlane::start(crate::ENVIRONMENT, Rollout::Healthy)
            .await
            .unwrap();
        let bundle = write_bundle(b"bundle");

        let deployer = Deployer::new(
            deploy_config(&plane, "v1", Some(&bundle)),
            Arc::new(RecordingReporter::new()),
        )
        .unwrap();
        deployer.run(&CancellationToken::new()).await.unwrap();

        for request in plane.requests() {
            let authorization = request.authorization.expect("every request is signed");
            let service = if request.action.is_some() { "elasticbeanstalk" } else { "s3" };
            assert!(
                authorization.starts_with("AWS4-HMAC-SHA256 Credential=test/"),
                "{authorization}"
            );
            assert!(
                authorization.contains(&format!("/us-east-1/{service}/aws4_request")),
                "{authorization}"
            );
        }
    }

    #[tokio::test]
    async fn test_should_fail_when_deployment_reports_failure() {
        let plane = FakeControlPlane::start(crate::ENVIRONMENT, Rollout::Failing)
            .await
            .unwrap();
        let bundle = write_bundle(b"bundle");
        let reporter = Arc::new(RecordingReporter::new());

        let deployer =
            Deployer::new(deploy_config(&plane, "v1", Some(&bundle)), reporter.clone()).unwrap();
        let err = deployer.run(&CancellationToken::new()).await.unwrap_err();

        assert!(
            matches!(err, DeployError::Monitor(MonitorError::DeploymentFailed { .. })),
            "{err:?}"
        );
        assert_eq!(err.exit_code(), 2);
        assert_eq!(plane.environment_version(), INITIAL_VERSION);
        assert!(reporter.contains("Failed to deploy application."));
    }

    #[tokio::test]
    async fn test_should_refuse_to_overwrite_existing_bundle() {
        let plane = FakeControlPlane::start(crate::ENVIRONMENT, Rollout::Healthy)
            .await
            .unwrap();
        plane.seed_object(STORAGE_BUCKET, "shop/v1.zip", b"already there");
        let bundle = write_bundle(b"bundle");

        let deployer = Deployer::new(
            deploy_config(&plane, "v1", Some(&bundle)),
            Arc::new(RecordingReporter::new()),
        )
        .unwrap();
        let err = deployer.run(&CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, DeployError::VersionExists { .. }), "{err:?}");
        assert!(plane.requests().iter().all(|r| r.method != Method::PUT));
        assert_eq!(plane.calls("CreateApplicationVersion"), 0);
        assert_eq!(
            plane.object(STORAGE_BUCKET, "shop/v1.zip").as_deref(),
            Some(&b"already there"[..])
        );
    }

    #[tokio::test]
    async fn test_should_reuse_registered_version() {
        let plane = FakeControlPlane::start(crate::ENVIRONMENT, Rollout::Healthy)
            .await
            .unwrap();
        plane.register_version(APPLICATION, "v3");

        let mut config = deploy_config(&plane, "v3", None);
        config.use_existing_version_if_available = true;
        let deployer = Deployer::new(config, Arc::new(RecordingReporter::new())).unwrap();
        let outcome = deployer.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.source, VersionSource::Reused);
        assert_eq!(plane.calls("DescribeApplicationVersions"), 1);
        assert_eq!(plane.calls("CreateStorageLocation"), 0);
        assert_eq!(plane.calls("CreateApplicationVersion"), 0);
        assert!(plane.requests().iter().all(|r| r.action.is_some()));
        assert_eq!(plane.environment_version(), "v3");
    }

    #[tokio::test]
    async fn test_should_create_version_only_without_environment() {
        let plane = FakeControlPlane::start(crate::ENVIRONMENT, Rollout::Healthy)
            .await
            .unwrap();
        let bundle = write_bundle(b"bundle");

        let mut config = deploy_config(&plane, "v1", Some(&bundle));
        config.environment_name = None;
        let deployer = Deployer::new(config, Arc::new(RecordingReporter::new())).unwrap();
        let outcome = deployer.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.environment, None);
        assert!(plane.version("v1").is_some());
        assert_eq!(plane.calls("UpdateEnvironment"), 0);
        assert_eq!(plane.environment_version(), INITIAL_VERSION);
    }

    #[tokio::test]
    async fn test_should_upload_to_existing_bucket() {
        let plane = FakeControlPlane::start(crate::ENVIRONMENT, Rollout::Healthy)
            .await
            .unwrap();
        let bundle = write_bundle(b"bundle");

        let mut config = deploy_config(&plane, "v1", Some(&bundle));
        config.existing_bucket = Some("team-builds".to_owned());
        let deployer = Deployer::new(config, Arc::new(RecordingReporter::new())).unwrap();
        deployer.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(plane.calls("CreateStorageLocation"), 0);
        assert!(plane.object("team-builds", "shop/v1.zip").is_some());
        assert_eq!(plane.version("v1").unwrap()["SourceBundle"]["S3Bucket"], "team-builds");
    }

    #[tokio::test]
    async fn test_should_return_without_waiting_when_disabled() {
        let plane = FakeControlPlane::start(crate::ENVIRONMENT, Rollout::Healthy)
            .await
            .unwrap();
        let bundle = write_bundle(b"bundle");

        let mut config = deploy_config(&plane, "v1", Some(&bundle));
        config.wait_for_deployment = false;
        let deployer = Deployer::new(config, Arc::new(RecordingReporter::new())).unwrap();
        let outcome = deployer.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.environment.as_deref(), Some(crate::ENVIRONMENT));
        assert!(outcome.snapshot.is_none());
        assert_eq!(plane.calls("UpdateEnvironment"), 1);
        assert_eq!(plane.calls("DescribeEnvironments"), 0);
    }
}
