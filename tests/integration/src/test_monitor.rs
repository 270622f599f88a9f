//! Monitor runs against a live environment.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use ebdeploy_client::{ApiClient, ClientConfig, ReqwestSender};
    use ebdeploy_rollout::{DeploymentMonitor, MonitorConfig, MonitorError, RecordingReporter};
    use tokio_util::sync::CancellationToken;

    use crate::{APPLICATION, FakeControlPlane, INITIAL_VERSION, Rollout, deploy_config};

    fn client(plane: &FakeControlPlane) -> ApiClient<ReqwestSender> {
        let config = deploy_config(plane, INITIAL_VERSION, None);
        ApiClient::new(ClientConfig::from_deploy_config(&config).unwrap()).unwrap()
    }

    fn monitor_config(environment: &str) -> MonitorConfig {
        MonitorConfig::builder()
            .application_name(APPLICATION)
            .environment_name(environment)
            .version_label(INITIAL_VERSION)
            .build()
    }

    #[tokio::test]
    async fn test_should_finish_on_first_poll_when_already_green() {
        let plane = FakeControlPlane::start(crate::ENVIRONMENT, Rollout::Healthy)
            .await
            .unwrap();
        let client = client(&plane);
        let reporter = Arc::new(RecordingReporter::new());

        let monitor = DeploymentMonitor::new(&client, monitor_config(crate::ENVIRONMENT), reporter.clone());
        let outcome = monitor
            .run(Utc::now(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.snapshot.version_label.as_deref(), Some(INITIAL_VERSION));
        assert_eq!(outcome.stats.polls, 1);
        assert_eq!(outcome.stats.event_calls, 1);
        assert_eq!(outcome.stats.environment_calls, 1);
        assert_eq!(plane.calls("DescribeEvents"), 1);
        assert_eq!(plane.calls("DescribeEnvironments"), 1);
    }

    #[tokio::test]
    async fn test_should_report_missing_environment() {
        let plane = FakeControlPlane::start(crate::ENVIRONMENT, Rollout::Healthy)
            .await
            .unwrap();
        let client = client(&plane);

        let monitor = DeploymentMonitor::new(
            &client,
            monitor_config("no-such-env"),
            Arc::new(RecordingReporter::new()),
        );
        let err = monitor
            .run(Utc::now(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(
            matches!(&err, MonitorError::EnvironmentNotFound { environment } if environment == "no-such-env"),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn test_should_stop_before_polling_when_cancelled() {
        let plane = FakeControlPlane::start(crate::ENVIRONMENT, Rollout::Healthy)
            .await
            .unwrap();
        let client = client(&plane);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let monitor = DeploymentMonitor::new(
            &client,
            monitor_config(crate::ENVIRONMENT),
            Arc::new(RecordingReporter::new()),
        );
        let err = monitor.run(Utc::now(), &cancel).await.unwrap_err();

        assert!(matches!(err, MonitorError::Cancelled), "{err:?}");
        assert_eq!(plane.calls("DescribeEnvironments"), 0);
    }
}
