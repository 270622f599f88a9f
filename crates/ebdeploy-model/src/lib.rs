//! Control-plane data model for ebdeploy.
//!
//! This crate holds the read-only records the deployment monitor works with
//! ([`EventRecord`], [`EnvironmentSnapshot`], [`ApplicationVersion`]), the
//! [`Operation`] names, and the JSON envelopes the orchestration service wraps
//! its results in.

pub mod error;
pub mod operations;
pub mod output;
pub mod types;

pub use error::{ApiErrorBody, ApiErrorDetail, ModelError};
pub use operations::Operation;
pub use types::{ApplicationVersion, EnvironmentSnapshot, EventRecord, SourceBundle};
