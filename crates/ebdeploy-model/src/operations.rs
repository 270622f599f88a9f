//! Named control-plane operations.

use std::fmt;

/// Orchestration API version sent with every query-style call.
pub const API_VERSION: &str = "2010-12-01";

/// A control-plane operation, used for routing, logging, and envelope lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Operation {
    /// Provision (or look up) the platform-managed storage bucket.
    CreateStorageLocation,
    /// Register a new application version from an uploaded bundle.
    CreateApplicationVersion,
    /// Point an environment at a version.
    UpdateEnvironment,
    /// Read the environment event log.
    DescribeEvents,
    /// Read the environment status.
    DescribeEnvironments,
    /// Look up existing application versions.
    DescribeApplicationVersions,
    /// Check whether an object exists in storage.
    HeadObject,
    /// Upload an object to storage.
    PutObject,
}

impl Operation {
    /// Returns the operation name as sent on the wire (`Action=` for query calls).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateStorageLocation => "CreateStorageLocation",
            Self::CreateApplicationVersion => "CreateApplicationVersion",
            Self::UpdateEnvironment => "UpdateEnvironment",
            Self::DescribeEvents => "DescribeEvents",
            Self::DescribeEnvironments => "DescribeEnvironments",
            Self::DescribeApplicationVersions => "DescribeApplicationVersions",
            Self::HeadObject => "HeadObject",
            Self::PutObject => "PutObject",
        }
    }

    /// Whether this operation goes to the object storage service rather than
    /// the orchestration service.
    #[must_use]
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::HeadObject | Self::PutObject)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
