//! Error types for ebdeploy configuration.

/// Configuration error, reported before any request leaves the process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No access key ID was supplied.
    #[error("missing AWS access key id")]
    MissingAccessKey,

    /// No secret access key was supplied.
    #[error("missing AWS secret access key")]
    MissingSecretKey,

    /// No region was supplied.
    #[error("missing AWS region")]
    MissingRegion,

    /// A required deployment setting is empty.
    #[error("missing required setting: {0}")]
    MissingSetting(&'static str),

    /// A setting has a value that cannot be used.
    #[error("invalid value for {name}: {reason}")]
    Invalid {
        /// Setting name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Convenience result type for configuration checks.
pub type ConfigResult<T> = Result<T, ConfigError>;
