//! The deployment monitor as a pure state machine.
//!
//! [`MonitorMachine`] holds everything a monitor run mutates: the state, the
//! event cursor, the failure flag, and the counters. It is advanced by poll
//! results and the current instant, and answers with a [`Step`] telling the
//! driver what to do next. It never sleeps, sends, or logs, so every
//! transition can be tested without timers.
//!
//! ```text
//! Polling ──ready+green──────────────▶ Done
//!    │
//!    └─ready, not green──▶ Degraded ──green──▶ Done
//!                             │
//!                             └─threshold passed──▶ Failed
//! any ──failure event, then not ready──▶ Failed
//! ```

use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};
use ebdeploy_model::{EnvironmentSnapshot, EventRecord};

use crate::config::MonitorConfig;

/// Where a monitor run stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorState {
    /// Waiting for the target version to become ready.
    Polling,
    /// Ready but not Green; waiting until `threshold` for health to recover.
    Degraded {
        /// Instant after which a non-Green snapshot fails the run.
        threshold: Instant,
    },
    /// The target version is ready and Green.
    Done(EnvironmentSnapshot),
    /// The run failed.
    Failed(FailureReason),
}

impl MonitorState {
    /// Whether no further polling happens.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Failed(_))
    }
}

/// Why a run failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// A failure event was confirmed by a snapshot not showing the target
    /// version ready.
    DeploymentFailed {
        /// Version the environment reports.
        version_label: Option<String>,
        /// Lifecycle status.
        status: String,
        /// Health grade.
        health: String,
    },
    /// Health did not return to Green within the grace window.
    RecoveryTimeout {
        /// Last health grade.
        health: String,
        /// Last detailed health status.
        health_status: String,
        /// Grace window length.
        waited: Duration,
    },
    /// Too many consecutive throttled environment checks.
    EnvironmentThrottled {
        /// Consecutive throttled checks.
        attempts: u32,
    },
}

/// Non-terminal outcome of a poll, for narration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// The target version is not ready yet.
    Converging {
        /// The snapshot just observed.
        snapshot: EnvironmentSnapshot,
        /// Whether this poll is due a heartbeat line.
        heartbeat: bool,
    },
    /// Ready but not Green; waiting for recovery.
    Degraded {
        /// The snapshot just observed.
        snapshot: EnvironmentSnapshot,
        /// Time left in the grace window.
        remaining: Duration,
        /// Whether the grace window was opened by this poll.
        entered: bool,
    },
    /// The environment check was throttled.
    Throttled {
        /// Consecutive throttled checks so far.
        consecutive: u32,
    },
}

/// What the driver does after a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Wait and poll again.
    Continue(Progress),
    /// Stop: the deployment succeeded.
    Done(EnvironmentSnapshot),
    /// Stop: the deployment failed.
    Failed(FailureReason),
}

/// State of one monitor run.
#[derive(Debug, Clone)]
pub struct MonitorMachine {
    state: MonitorState,
    version_label: String,
    recovery_wait: Duration,
    failure_signatures: Vec<String>,
    max_environment_throttles: u32,
    heartbeat_every: u64,
    cursor: DateTime<Utc>,
    deployment_failed: bool,
    polls: u64,
    consecutive_throttles: u32,
}

impl MonitorMachine {
    /// Start in [`MonitorState::Polling`], reading events from `since`.
    #[must_use]
    pub fn new(config: &MonitorConfig, since: DateTime<Utc>) -> Self {
        Self {
            state: MonitorState::Polling,
            version_label: config.version_label.clone(),
            recovery_wait: config.recovery_wait,
            failure_signatures: config.failure_signatures.clone(),
            max_environment_throttles: config.max_environment_throttles,
            heartbeat_every: config.heartbeat_every.max(1),
            cursor: since,
            deployment_failed: false,
            polls: 0,
            consecutive_throttles: 0,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    /// Earliest event time still to be read.
    #[must_use]
    pub fn cursor(&self) -> DateTime<Utc> {
        self.cursor
    }

    /// Whether a failure event has been seen.
    #[must_use]
    pub fn deployment_failed(&self) -> bool {
        self.deployment_failed
    }

    /// Environment results handled so far, throttled ones included.
    #[must_use]
    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// Take in an event batch (newest first, as the platform returns it).
    ///
    /// Returns the events not seen before, oldest first. The cursor moves to
    /// one millisecond past the newest event and never moves back.
    pub fn apply_events(&mut self, mut events: Vec<EventRecord>) -> Vec<EventRecord> {
        if self.state.is_terminal() {
            return Vec::new();
        }

        events.reverse();
        // Queries are sent with second precision; drop what was already seen.
        events.retain(|e| e.event_date >= self.cursor);
        events.sort_by_key(|e| e.event_date);

        for event in &events {
            if self.is_failure_event(event) {
                self.deployment_failed = true;
            }
        }
        if let Some(newest) = events.last() {
            let next = newest.event_date + TimeDelta::milliseconds(1);
            if next > self.cursor {
                self.cursor = next;
            }
        }
        events
    }

    /// Take in an environment snapshot observed at `now`.
    pub fn on_environment(&mut self, snapshot: EnvironmentSnapshot, now: Instant) -> Step {
        if let Some(step) = self.terminal_step() {
            return step;
        }
        self.polls += 1;
        self.consecutive_throttles = 0;

        if snapshot.runs_version(&self.version_label) && snapshot.is_ready() {
            return self.on_ready(snapshot, now);
        }

        if self.deployment_failed {
            let reason = FailureReason::DeploymentFailed {
                version_label: snapshot.version_label,
                status: snapshot.status,
                health: snapshot.health,
            };
            self.state = MonitorState::Failed(reason.clone());
            return Step::Failed(reason);
        }

        Step::Continue(Progress::Converging {
            heartbeat: self.polls % self.heartbeat_every == 0,
            snapshot,
        })
    }

    /// Record a throttled environment check.
    pub fn on_environment_throttled(&mut self) -> Step {
        if let Some(step) = self.terminal_step() {
            return step;
        }
        self.polls += 1;
        self.consecutive_throttles += 1;

        if self.consecutive_throttles >= self.max_environment_throttles {
            let reason = FailureReason::EnvironmentThrottled {
                attempts: self.consecutive_throttles,
            };
            self.state = MonitorState::Failed(reason.clone());
            return Step::Failed(reason);
        }
        Step::Continue(Progress::Throttled {
            consecutive: self.consecutive_throttles,
        })
    }

    fn on_ready(&mut self, snapshot: EnvironmentSnapshot, now: Instant) -> Step {
        if snapshot.is_green() {
            self.state = MonitorState::Done(snapshot.clone());
            return Step::Done(snapshot);
        }

        match self.state {
            MonitorState::Degraded { threshold } if now >= threshold => {
                let reason = FailureReason::RecoveryTimeout {
                    health_status: snapshot.health_detail().to_owned(),
                    health: snapshot.health,
                    waited: self.recovery_wait,
                };
                self.state = MonitorState::Failed(reason.clone());
                Step::Failed(reason)
            }
            MonitorState::Degraded { threshold } => Step::Continue(Progress::Degraded {
                snapshot,
                remaining: threshold - now,
                entered: false,
            }),
            _ => {
                self.state = MonitorState::Degraded {
                    threshold: now + self.recovery_wait,
                };
                Step::Continue(Progress::Degraded {
                    snapshot,
                    remaining: self.recovery_wait,
                    entered: true,
                })
            }
        }
    }

    fn terminal_step(&self) -> Option<Step> {
        match &self.state {
            MonitorState::Done(snapshot) => Some(Step::Done(snapshot.clone())),
            MonitorState::Failed(reason) => Some(Step::Failed(reason.clone())),
            MonitorState::Polling | MonitorState::Degraded { .. } => None,
        }
    }

    fn is_failure_event(&self, event: &EventRecord) -> bool {
        self.failure_signatures
            .iter()
            .any(|signature| event.message.contains(signature.as_str()))
    }
}
