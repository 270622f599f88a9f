//! Long-term credentials used to derive request signatures.

use std::fmt;

use ebdeploy_core::{ConfigError, ConfigResult};

/// The credential triple: access key ID, secret access key, and an optional
/// session token for temporary credentials.
///
/// Construction validates that both keys are present, so a [`Credentials`]
/// value can always sign.
///
/// # Examples
///
/// ```
/// use ebdeploy_auth::Credentials;
/// use ebdeploy_core::ConfigError;
///
/// let creds = Credentials::new("AKIDEXAMPLE", "secret", Some("token".to_owned())).unwrap();
/// assert_eq!(creds.access_key_id(), "AKIDEXAMPLE");
///
/// assert_eq!(
///     Credentials::new("", "secret", None).unwrap_err(),
///     ConfigError::MissingAccessKey
/// );
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl Credentials {
    /// Create credentials, rejecting empty keys.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> ConfigResult<Self> {
        let access_key_id = access_key_id.into();
        let secret_access_key = secret_access_key.into();

        if access_key_id.trim().is_empty() {
            return Err(ConfigError::MissingAccessKey);
        }
        if secret_access_key.trim().is_empty() {
            return Err(ConfigError::MissingSecretKey);
        }

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token: session_token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// The access key ID.
    #[must_use]
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// The secret access key.
    #[must_use]
    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    /// The session token, if these are temporary credentials.
    #[must_use]
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .finish()
    }
}
