//! Retry, redirect, and decoding behaviour against a live socket.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ebdeploy_client::{ApiClient, ClientConfig, ClientError};
    use ebdeploy_rollout::{DeployError, Deployer, RecordingReporter};
    use http::Method;
    use tokio_util::sync::CancellationToken;

    use crate::{APPLICATION, FakeControlPlane, Rollout, STORAGE_BUCKET, deploy_config, write_bundle};

    #[tokio::test]
    async fn test_should_retry_throttled_calls() {
        let plane = FakeControlPlane::start(crate::ENVIRONMENT, Rollout::Healthy)
            .await
            .unwrap();
        plane.throttle("CreateStorageLocation", 2);
        let bundle = write_bundle(b"bundle");

        let deployer = Deployer::new(
            deploy_config(&plane, "v1", Some(&bundle)),
            Arc::new(RecordingReporter::new()),
        )
        .unwrap();
        deployer.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(plane.calls("CreateStorageLocation"), 3);
        assert_eq!(plane.environment_version(), "v1");
    }

    #[tokio::test]
    async fn test_should_give_up_after_retry_ceiling() {
        let plane = FakeControlPlane::start(crate::ENVIRONMENT, Rollout::Healthy)
            .await
            .unwrap();
        plane.throttle("UpdateEnvironment", 100);
        let bundle = write_bundle(b"bundle");

        let mut config = deploy_config(&plane, "v1", Some(&bundle));
        config.max_retries = 2;
        let deployer = Deployer::new(config, Arc::new(RecordingReporter::new())).unwrap();
        let err = deployer.run(&CancellationToken::new()).await.unwrap_err();

        let DeployError::Client(client_err) = &err else {
            panic!("expected a client error, got {err:?}");
        };
        assert!(client_err.is_throttling());
        assert_eq!(err.exit_code(), 2);
        assert_eq!(plane.calls("UpdateEnvironment"), 3);
    }

    #[tokio::test]
    async fn test_should_resign_upload_after_redirect() {
        let plane = FakeControlPlane::start(crate::ENVIRONMENT, Rollout::Healthy)
            .await
            .unwrap();
        plane.redirect_uploads(1);
        let bundle = write_bundle(b"bundle");

        let deployer = Deployer::new(
            deploy_config(&plane, "v1", Some(&bundle)),
            Arc::new(RecordingReporter::new()),
        )
        .unwrap();
        deployer.run(&CancellationToken::new()).await.unwrap();

        let puts: Vec<_> = plane
            .requests()
            .into_iter()
            .filter(|r| r.method == Method::PUT)
            .collect();
        assert_eq!(puts.len(), 2);
        assert!(puts[0].host.as_deref().unwrap().starts_with("127.0.0.1:"));
        assert!(puts[1].host.as_deref().unwrap().starts_with("localhost:"));
        assert_ne!(puts[0].authorization, puts[1].authorization);
        assert!(plane.object(STORAGE_BUCKET, "shop/v1.zip").is_some());
    }

    #[tokio::test]
    async fn test_should_decode_gzip_responses() {
        let plane = FakeControlPlane::start(crate::ENVIRONMENT, Rollout::Healthy)
            .await
            .unwrap();
        plane.gzip_responses();
        let bundle = write_bundle(b"bundle");

        let deployer = Deployer::new(
            deploy_config(&plane, "v1", Some(&bundle)),
            Arc::new(RecordingReporter::new()),
        )
        .unwrap();
        let outcome = deployer.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.snapshot.unwrap().health, "Green");
    }

    #[tokio::test]
    async fn test_should_surface_api_error_code_and_message() {
        let plane = FakeControlPlane::start(crate::ENVIRONMENT, Rollout::Healthy)
            .await
            .unwrap();
        let config = deploy_config(&plane, "v9", None);
        let client = ApiClient::new(ClientConfig::from_deploy_config(&config).unwrap()).unwrap();

        let result = client
            .update_environment(APPLICATION, crate::ENVIRONMENT, "v9")
            .await
            .unwrap();
        assert_eq!(result.status, 400);
        assert_eq!(result.error_code().as_deref(), Some("InvalidParameterValue"));

        let err = result.ensure_success().unwrap_err();
        assert!(
            matches!(&err, ClientError::Api { status: 400, message, .. } if message.contains("'v9'")),
            "{err:?}"
        );
        assert!(!err.is_throttling());
    }
}
