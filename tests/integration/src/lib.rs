//! End-to-end tests for ebdeploy.
//!
//! Each test starts a [`FakeControlPlane`] on an ephemeral port and points
//! the real reqwest-backed client at it through the endpoint override, so
//! requests are signed, sent, and decoded exactly as in production.
//!
//! ```text
//! cargo test -p ebdeploy-integration
//! ```

use std::path::PathBuf;
use std::sync::Once;

use ebdeploy_core::{AwsRegion, DeployConfig};
use tempfile::TempDir;

pub mod fake;

pub use fake::{FakeControlPlane, INITIAL_VERSION, Rollout, STORAGE_BUCKET, SeenRequest};

static INIT: Once = Once::new();

/// Application used by every test.
pub const APPLICATION: &str = "shop";

/// Environment served by the fake.
pub const ENVIRONMENT: &str = "shop-prod";

/// Initialize tracing (once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// A bundle on disk that lives as long as the returned directory.
pub struct Bundle {
    /// Holds the file.
    pub dir: TempDir,
    /// Path to the bundle.
    pub path: PathBuf,
}

impl std::fmt::Debug for Bundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bundle").field("path", &self.path).finish()
    }
}

/// Write `contents` to `app.zip` in a fresh temporary directory.
pub fn write_bundle(contents: &[u8]) -> Bundle {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("failed to create temp dir: {e}"));
    let path = dir.path().join("app.zip");
    std::fs::write(&path, contents).unwrap_or_else(|e| panic!("failed to write bundle: {e}"));
    Bundle { dir, path }
}

/// Deployment of `label` to [`ENVIRONMENT`] through `plane`, waiting for it
/// to settle.
#[must_use]
pub fn deploy_config(plane: &FakeControlPlane, label: &str, bundle: Option<&Bundle>) -> DeployConfig {
    init_tracing();

    DeployConfig::builder()
        .application_name(APPLICATION.to_owned())
        .environment_name(Some(ENVIRONMENT.to_owned()))
        .version_label(label.to_owned())
        .version_description(Some("integration build".to_owned()))
        .region(AwsRegion::new("us-east-1"))
        .access_key_id("test".to_owned())
        .secret_access_key("test".to_owned())
        .artifact_path(bundle.map(|b| b.path.clone()))
        .endpoint_url(Some(plane.endpoint_url()))
        .build()
}

mod test_deploy;
mod test_monitor;
mod test_transport;
