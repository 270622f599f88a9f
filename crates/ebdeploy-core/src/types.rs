//! Common AWS type definitions shared across crates.

use std::fmt;

/// AWS partition a region belongs to.
///
/// The partition decides the DNS suffix used when resolving service hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    /// The standard commercial partition (`amazonaws.com`).
    Aws,
    /// The China partition (`amazonaws.com.cn`).
    AwsCn,
}

impl Partition {
    /// DNS suffix for service endpoints in this partition.
    #[must_use]
    pub fn dns_suffix(self) -> &'static str {
        match self {
            Self::Aws => "amazonaws.com",
            Self::AwsCn => "amazonaws.com.cn",
        }
    }
}

/// AWS Region identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AwsRegion(String);

impl AwsRegion {
    /// Region prefix used by the China partition.
    const CHINA_PREFIX: &str = "cn-";

    /// Create a new region.
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        Self(region.into())
    }

    /// Get the region as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the region string is empty (an unusable region).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// The partition this region belongs to.
    ///
    /// # Examples
    ///
    /// ```
    /// use ebdeploy_core::{AwsRegion, Partition};
    ///
    /// assert_eq!(AwsRegion::new("cn-north-1").partition(), Partition::AwsCn);
    /// assert_eq!(AwsRegion::new("eu-west-1").partition(), Partition::Aws);
    /// ```
    #[must_use]
    pub fn partition(&self) -> Partition {
        if self.0.starts_with(Self::CHINA_PREFIX) {
            Partition::AwsCn
        } else {
            Partition::Aws
        }
    }

    /// Resolve the host for `service` in this region, e.g.
    /// `elasticbeanstalk.us-east-1.amazonaws.com`.
    #[must_use]
    pub fn service_host(&self, service: &str) -> String {
        format!("{service}.{}.{}", self.0, self.partition().dns_suffix())
    }
}

impl fmt::Display for AwsRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
