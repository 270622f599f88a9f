//! Records read from the orchestration service.
//!
//! Field names follow the service's JSON protocol (`PascalCase`). Fields the
//! service may send as `null` are optional or defaulted.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Status reported once an environment has finished applying an update.
pub const STATUS_READY: &str = "Ready";

/// Best health grade.
pub const HEALTH_GREEN: &str = "Green";

/// One entry of the environment event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventRecord {
    /// Platform-assigned event time.
    #[serde(deserialize_with = "deserialize_event_date")]
    pub event_date: DateTime<Utc>,
    /// Severity (`TRACE` .. `FATAL`).
    #[serde(default, deserialize_with = "null_as_default")]
    pub severity: String,
    /// Human-readable message.
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    /// Environment the event belongs to.
    #[serde(default)]
    pub environment_name: Option<String>,
    /// Version the event refers to.
    #[serde(default)]
    pub version_label: Option<String>,
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.event_date.format("%Y-%m-%d %H:%M:%S"),
            self.severity,
            self.message
        )
    }
}

/// The platform's view of an environment at one poll instant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EnvironmentSnapshot {
    /// Environment name.
    #[serde(default)]
    pub environment_name: Option<String>,
    /// Version currently deployed (or being deployed).
    #[serde(default)]
    pub version_label: Option<String>,
    /// Lifecycle status (`Launching`, `Updating`, `Ready`, ...).
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    /// Health grade (`Green`, `Yellow`, `Red`, `Grey`).
    #[serde(default, deserialize_with = "null_as_default")]
    pub health: String,
    /// Detailed health status (`Ok`, `Warning`, `Degraded`, ...).
    #[serde(default)]
    pub health_status: Option<String>,
}

impl EnvironmentSnapshot {
    /// Whether the environment runs `version_label`.
    #[must_use]
    pub fn runs_version(&self, version_label: &str) -> bool {
        self.version_label.as_deref() == Some(version_label)
    }

    /// Whether the environment has finished applying changes.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status == STATUS_READY
    }

    /// Whether health is at its best grade.
    #[must_use]
    pub fn is_green(&self) -> bool {
        self.health == HEALTH_GREEN
    }

    /// Detailed health status, or `-` when the platform did not report one.
    #[must_use]
    pub fn health_detail(&self) -> &str {
        self.health_status.as_deref().unwrap_or("-")
    }
}

/// Where an application version's bundle lives in storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceBundle {
    /// Bucket name.
    #[serde(rename = "S3Bucket")]
    pub bucket: String,
    /// Object key.
    #[serde(rename = "S3Key")]
    pub key: String,
}

/// A registered application version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApplicationVersion {
    /// Application name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub application_name: String,
    /// Version label.
    pub version_label: String,
    /// Version description.
    #[serde(default)]
    pub description: Option<String>,
    /// Processing status.
    #[serde(default)]
    pub status: Option<String>,
    /// Source bundle location.
    #[serde(default)]
    pub source_bundle: Option<SourceBundle>,
}

/// Deserialize a value, mapping an explicit `null` to its default.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Event dates arrive as fractional epoch seconds in the JSON protocol; some
/// emulators send RFC 3339 strings instead.
fn deserialize_event_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDate {
        Epoch(f64),
        Text(String),
    }

    match RawDate::deserialize(deserializer)? {
        RawDate::Epoch(secs) => {
            #[allow(clippy::cast_possible_truncation)]
            let millis = (secs * 1000.0).round() as i64;
            DateTime::from_timestamp_millis(millis)
                .ok_or_else(|| serde::de::Error::custom(format!("event date out of range: {secs}")))
        }
        RawDate::Text(text) => DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom),
    }
}
