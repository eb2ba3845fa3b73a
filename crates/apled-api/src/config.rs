// Controller connection descriptor
//
// Describes *which* controller to talk to and with what credentials.
// The password lives only in memory (and in the vault); it is never
// written into the serialized configuration document.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::session::SessionKey;

/// Connection settings for a single controller.
///
/// Two configs with the same `(base_url, username)` pair map to the same
/// [`SessionKey`] and therefore share a cached session inside one
/// [`ControllerClient`](crate::ControllerClient).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Controller root, e.g. `https://192.168.1.1`. `None` means unconfigured.
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Site to operate on.
    #[serde(default = "default_site")]
    pub site: String,
    #[serde(default)]
    pub username: String,
    /// Never serialized; resolved from the vault or environment at load time.
    #[serde(skip, default = "empty_secret")]
    pub password: SecretString,
    /// Optional cached bearer/session token.
    #[serde(default)]
    pub token: Option<String>,
    /// Use the relaxed transport profile (self-signed controllers).
    #[serde(default)]
    pub accept_invalid_certificates: bool,
}

fn default_site() -> String {
    "default".into()
}

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            site: default_site(),
            username: String::new(),
            password: empty_secret(),
            token: None,
            accept_invalid_certificates: false,
        }
    }
}

impl ControllerConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url: Some(base_url),
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: SecretString) -> Self {
        self.username = username.into();
        self.password = password;
        self
    }

    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site = site.into();
        self
    }

    pub fn with_insecure(mut self, accept_invalid_certificates: bool) -> Self {
        self.accept_invalid_certificates = accept_invalid_certificates;
        self
    }

    /// `true` once a base URL is set.
    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    /// Session-cache identity for this config.
    pub fn session_key(&self) -> SessionKey {
        SessionKey::new(self.base_url.as_ref(), &self.username)
    }

    /// Vault account key for the password. Same shape as the session key.
    pub fn account_key(&self) -> String {
        self.session_key().into_string()
    }
}
