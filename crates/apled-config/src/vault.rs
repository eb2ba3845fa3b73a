use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use apled_core::{CoreError, Vault};

/// Keyring service name passwords are stored under.
pub const KEYRING_SERVICE: &str = "apled";

/// Passwords in the OS keyring (Keychain, Secret Service, Credential
/// Manager), one entry per account key.
#[derive(Debug, Clone)]
pub struct KeyringVault {
    service: String,
}

impl Default for KeyringVault {
    fn default() -> Self {
        Self::new(KEYRING_SERVICE)
    }
}

impl KeyringVault {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, account_key: &str) -> Result<keyring::Entry, CoreError> {
        keyring::Entry::new(&self.service, account_key).map_err(|e| CoreError::vault(e.to_string()))
    }
}

impl Vault for KeyringVault {
    fn save(&self, account_key: &str, secret: &SecretString) -> Result<(), CoreError> {
        self.entry(account_key)?
            .set_password(secret.expose_secret())
            .map_err(|e| CoreError::vault(e.to_string()))?;
        debug!(account = account_key, "password stored in keyring");
        Ok(())
    }

    fn get(&self, account_key: &str) -> Result<Option<SecretString>, CoreError> {
        match self.entry(account_key)?.get_password() {
            Ok(pw) => Ok(Some(SecretString::from(pw))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(CoreError::vault(e.to_string())),
        }
    }

    fn delete(&self, account_key: &str) -> Result<(), CoreError> {
        match self.entry(account_key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(CoreError::vault(e.to_string())),
        }
    }
}
