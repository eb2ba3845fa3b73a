// ── Collaborator seams ──
//
// Where passwords and persisted state live is a platform decision. The
// controller talks to these traits; `apled-config` provides the keyring
// and file-backed implementations, and the in-memory ones here back tests
// and ephemeral runs.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use secrecy::{ExposeSecret, SecretString};

use apled_api::ControllerConfig;

use crate::error::CoreError;
use crate::model::Schedule;

/// Secret storage keyed by account (`"{base_url}_{username}"`).
pub trait Vault: Send + Sync {
    fn save(&self, account_key: &str, secret: &SecretString) -> Result<(), CoreError>;
    fn get(&self, account_key: &str) -> Result<Option<SecretString>, CoreError>;
    fn delete(&self, account_key: &str) -> Result<(), CoreError>;
}

/// Durable storage for the controller document and the schedule list.
///
/// Missing documents load as defaults. The password is never written.
pub trait Persistence: Send + Sync {
    fn save_config(&self, config: &ControllerConfig) -> Result<(), CoreError>;
    fn load_config(&self) -> Result<ControllerConfig, CoreError>;
    fn save_schedules(&self, schedules: &[Schedule]) -> Result<(), CoreError>;
    fn load_schedules(&self) -> Result<Vec<Schedule>, CoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryVault {
    secrets: Mutex<HashMap<String, String>>,
}

impl Vault for MemoryVault {
    fn save(&self, account_key: &str, secret: &SecretString) -> Result<(), CoreError> {
        self.secrets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(account_key.to_owned(), secret.expose_secret().to_owned());
        Ok(())
    }

    fn get(&self, account_key: &str) -> Result<Option<SecretString>, CoreError> {
        Ok(self
            .secrets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(account_key)
            .map(|s| SecretString::from(s.clone())))
    }

    fn delete(&self, account_key: &str) -> Result<(), CoreError> {
        self.secrets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(account_key);
        Ok(())
    }
}

/// Keeps the serialized documents in memory, so it round-trips through
/// serde exactly like a file would.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    config: Mutex<Option<String>>,
    schedules: Mutex<Option<String>>,
}

impl Persistence for MemoryPersistence {
    fn save_config(&self, config: &ControllerConfig) -> Result<(), CoreError> {
        let doc = serde_json::to_string(config).map_err(|e| CoreError::persistence(e.to_string()))?;
        *self.config.lock().unwrap_or_else(PoisonError::into_inner) = Some(doc);
        Ok(())
    }

    fn load_config(&self) -> Result<ControllerConfig, CoreError> {
        match self.config.lock().unwrap_or_else(PoisonError::into_inner).as_deref() {
            Some(doc) => serde_json::from_str(doc).map_err(|e| CoreError::persistence(e.to_string())),
            None => Ok(ControllerConfig::default()),
        }
    }

    fn save_schedules(&self, schedules: &[Schedule]) -> Result<(), CoreError> {
        let doc =
            serde_json::to_string(schedules).map_err(|e| CoreError::persistence(e.to_string()))?;
        *self.schedules.lock().unwrap_or_else(PoisonError::into_inner) = Some(doc);
        Ok(())
    }

    fn load_schedules(&self) -> Result<Vec<Schedule>, CoreError> {
        match self.schedules.lock().unwrap_or_else(PoisonError::into_inner).as_deref() {
            Some(doc) => serde_json::from_str(doc).map_err(|e| CoreError::persistence(e.to_string())),
            None => Ok(Vec::new()),
        }
    }
}
