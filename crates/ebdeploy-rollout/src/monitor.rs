//! The async driver around [`MonitorMachine`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ebdeploy_client::{ApiClient, ApiResult, ClientResult, HttpSender};
use ebdeploy_model::EnvironmentSnapshot;
use ebdeploy_model::output::{DescribeEnvironmentsOutput, DescribeEventsOutput};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cadence::poll_interval;
use crate::config::MonitorConfig;
use crate::error::MonitorError;
use crate::reporter::Reporter;
use crate::state::{MonitorMachine, Progress, Step};

/// Counters of one monitor run, attached to every failure line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Poll cycles completed.
    pub polls: u64,
    /// Event log calls made.
    pub event_calls: u64,
    /// Environment calls made.
    pub environment_calls: u64,
    /// Calls that ended throttled after retries.
    pub throttled_calls: u64,
    /// Wall time since monitoring began.
    pub elapsed: Duration,
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "elapsed {}s, {} polls, {} event calls, {} environment calls, {} throttled",
            self.elapsed.as_secs(),
            self.polls,
            self.event_calls,
            self.environment_calls,
            self.throttled_calls
        )
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorOutcome {
    /// The final, ready and Green, snapshot.
    pub snapshot: EnvironmentSnapshot,
    /// Run counters.
    pub stats: RunStats,
}

/// Polls an environment until the target version is ready and healthy.
///
/// Each cycle reads the event log and the environment concurrently, feeds the
/// events first and the snapshot second into the [`MonitorMachine`], narrates
/// through the [`Reporter`], then sleeps for the adaptive cadence.
pub struct DeploymentMonitor<'a, S> {
    client: &'a ApiClient<S>,
    config: MonitorConfig,
    reporter: Arc<dyn Reporter>,
}

impl<S> fmt::Debug for DeploymentMonitor<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentMonitor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<'a, S: HttpSender> DeploymentMonitor<'a, S> {
    /// Create a monitor.
    pub fn new(client: &'a ApiClient<S>, config: MonitorConfig, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            client,
            config,
            reporter,
        }
    }

    /// Run until done, failed, or cancelled. Events older than `since` are
    /// not reported.
    pub async fn run(
        &self,
        since: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<MonitorOutcome, MonitorError> {
        let started = Instant::now();
        let mut machine = MonitorMachine::new(&self.config, since);
        let mut stats = RunStats::default();
        let application = self.config.application_name.as_str();
        let environment = self.config.environment_name.as_str();

        self.reporter.info(&format!(
            "Waiting for {environment} to run version {}",
            self.config.version_label
        ));

        loop {
            let cursor = machine.cursor();
            let (events, snapshot) = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(self.cancelled(&stats)),
                results = async {
                    tokio::join!(
                        self.client.describe_events(application, environment, cursor),
                        self.client.describe_environment(application, environment),
                    )
                } => results,
            };
            stats.event_calls += 1;
            stats.environment_calls += 1;
            stats.elapsed = started.elapsed();

            if let Err(err) = self.handle_events(&mut machine, &mut stats, events) {
                return Err(self.fail(err, &stats));
            }

            let step = match self.environment_step(&mut machine, &mut stats, snapshot) {
                Ok(step) => step,
                Err(err) => return Err(self.fail(err, &stats)),
            };
            stats.polls = machine.polls();

            match step {
                Step::Done(snapshot) => {
                    self.reporter.info(&format!(
                        "Deployment finished: {environment} runs {} ({}, health {}) after {}s",
                        self.config.version_label,
                        snapshot.status,
                        snapshot.health,
                        stats.elapsed.as_secs()
                    ));
                    return Ok(MonitorOutcome { snapshot, stats });
                }
                Step::Failed(reason) => return Err(self.fail(reason.into(), &stats)),
                Step::Continue(progress) => self.narrate(&progress),
            }

            let wait = poll_interval(started.elapsed());
            debug!(wait_secs = wait.as_secs(), polls = stats.polls, "waiting for next poll");
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(self.cancelled(&stats)),
                () = tokio::time::sleep(wait) => {}
            }
        }
    }

    fn handle_events(
        &self,
        machine: &mut MonitorMachine,
        stats: &mut RunStats,
        events: ClientResult<ApiResult>,
    ) -> Result<(), MonitorError> {
        let result = events?;
        if result.is_throttled() {
            stats.throttled_calls += 1;
            self.reporter
                .warn("Event log request throttled; skipping events this cycle");
            return Ok(());
        }

        let out: DescribeEventsOutput = result.parse()?;
        for event in machine.apply_events(out.events) {
            self.reporter.event(&event);
        }
        Ok(())
    }

    fn environment_step(
        &self,
        machine: &mut MonitorMachine,
        stats: &mut RunStats,
        snapshot: ClientResult<ApiResult>,
    ) -> Result<Step, MonitorError> {
        let result = snapshot?;
        if result.is_throttled() {
            stats.throttled_calls += 1;
            return Ok(machine.on_environment_throttled());
        }

        let out: DescribeEnvironmentsOutput = result.parse()?;
        let snapshot = out.environments.into_iter().next().ok_or_else(|| {
            MonitorError::EnvironmentNotFound {
                environment: self.config.environment_name.clone(),
            }
        })?;
        Ok(machine.on_environment(snapshot, Instant::now().into_std()))
    }

    fn narrate(&self, progress: &Progress) {
        match progress {
            Progress::Converging {
                snapshot,
                heartbeat: true,
            } => self.reporter.info(&format!(
                "Still updating: status {}, health {}, version {}",
                snapshot.status,
                snapshot.health,
                snapshot.version_label.as_deref().unwrap_or("-")
            )),
            Progress::Converging { .. } => {}
            Progress::Degraded {
                snapshot,
                remaining,
                entered: true,
            } => self.reporter.info(&format!(
                "Update finished but health is {} ({}); waiting up to {}s for it to recover",
                snapshot.health,
                snapshot.health_detail(),
                remaining.as_secs()
            )),
            Progress::Degraded {
                snapshot,
                remaining,
                entered: false,
            } => self.reporter.info(&format!(
                "Health is {} ({}); {}s left before giving up",
                snapshot.health,
                snapshot.health_detail(),
                remaining.as_secs()
            )),
            Progress::Throttled { consecutive } => self.reporter.warn(&format!(
                "Environment request throttled ({consecutive} in a row)"
            )),
        }
    }

    fn fail(&self, err: MonitorError, stats: &RunStats) -> MonitorError {
        self.reporter.error(&format!("{err} [{stats}]"));
        err
    }

    fn cancelled(&self, stats: &RunStats) -> MonitorError {
        self.reporter
            .warn(&format!("Monitoring cancelled [{stats}]"));
        MonitorError::Cancelled
    }
}
