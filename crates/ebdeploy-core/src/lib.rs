//! Core types, configuration, and errors for ebdeploy.
//!
//! This crate provides the foundational building blocks shared across the
//! signing, transport, and rollout crates: the region/partition model, the
//! deployment configuration supplied by the caller, and the configuration
//! error type reported before any network call is attempted.

mod config;
mod error;
mod types;

pub use config::{
    DEFAULT_MAX_RETRIES, DEFAULT_RECOVERY_WAIT_SECS, DeployConfig, MAX_DESCRIPTION_LEN,
    truncate_description,
};
pub use error::{ConfigError, ConfigResult};
pub use types::{AwsRegion, Partition};
