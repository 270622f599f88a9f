//! Deployment orchestration and rollout supervision for ebdeploy.
//!
//! - [`Deployer`] runs a whole deployment: reuse or upload and register a
//!   version, update the environment, and optionally wait for it.
//! - [`DeploymentMonitor`] polls the event log and the environment until the
//!   new version is ready and healthy, driving a [`MonitorMachine`].
//! - [`MonitorMachine`] is the pure state machine behind the monitor:
//!   `Polling → Degraded → Done | Failed`.
//! - [`Reporter`] is the narration sink every component writes progress to.

pub mod cadence;
pub mod config;
pub mod deploy;
pub mod error;
pub mod monitor;
pub mod reporter;
pub mod state;

pub use config::MonitorConfig;
pub use deploy::{DeployOutcome, Deployer, VersionSource};
pub use error::{DeployError, MonitorError};
pub use monitor::{DeploymentMonitor, MonitorOutcome, RunStats};
pub use reporter::{RecordingReporter, ReportLevel, Reporter, TracingReporter};
pub use state::{FailureReason, MonitorMachine, MonitorState, Progress, Step};
