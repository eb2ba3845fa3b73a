//! Configuration for apled.
//!
//! TOML settings merged with `APLED_` environment variables, password
//! resolution (env, then keyring), and the keyring/file-backed
//! collaborators `apled-core` persists through.

pub mod persistence;
pub mod vault;

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use apled_api::ControllerConfig;
use apled_core::{RuntimeSettings, Vault};

pub use persistence::FilePersistence;
pub use vault::KeyringVault;

/// Environment variable holding the controller password.
pub const PASSWORD_ENV: &str = "APLED_PASSWORD";

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "APLED_CONFIG";

/// Environment variable overriding the state directory.
pub const DATA_DIR_ENV: &str = "APLED_DATA_DIR";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no password found for '{account}' (set APLED_PASSWORD or run `apled config set-password`)")]
    NoCredentials { account: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("state document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl From<tempfile::PersistError> for ConfigError {
    fn from(err: tempfile::PersistError) -> Self {
        Self::Io(err.error)
    }
}

// ── TOML config structs ─────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub controller: ControllerSection,

    #[serde(default)]
    pub daemon: DaemonSection,
}

/// `[controller]`: which controller, which site, which account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ControllerSection {
    /// Controller base URL. A bare host gets `https://` prepended.
    pub url: Option<String>,

    #[serde(default = "default_site")]
    pub site: String,

    pub username: Option<String>,

    /// Accept self-signed certificates.
    #[serde(default)]
    pub insecure: bool,
}

impl Default for ControllerSection {
    fn default() -> Self {
        Self {
            url: None,
            site: default_site(),
            username: None,
            insecure: false,
        }
    }
}

fn default_site() -> String {
    "default".into()
}

/// `[daemon]`: background task timing for `apled run`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DaemonSection {
    /// Device refresh period; 0 disables auto-refresh.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    #[serde(default = "default_startup_delay")]
    pub startup_delay_ms: u64,

    /// Clock-jump sampling period; 0 disables wake detection.
    #[serde(default = "default_wake_check_interval")]
    pub wake_check_interval_secs: u64,

    #[serde(default = "default_clock_jump_threshold")]
    pub clock_jump_threshold_secs: u64,

    /// How often the schedule document is re-read for edits made by other
    /// `apled` invocations; 0 disables polling.
    #[serde(default = "default_schedule_reload_interval")]
    pub schedule_reload_interval_secs: u64,
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
            startup_delay_ms: default_startup_delay(),
            wake_check_interval_secs: default_wake_check_interval(),
            clock_jump_threshold_secs: default_clock_jump_threshold(),
            schedule_reload_interval_secs: default_schedule_reload_interval(),
        }
    }
}

fn default_refresh_interval() -> u64 {
    300
}
fn default_startup_delay() -> u64 {
    1000
}
fn default_wake_check_interval() -> u64 {
    30
}
fn default_clock_jump_threshold() -> u64 {
    10
}
fn default_schedule_reload_interval() -> u64 {
    5
}

impl DaemonSection {
    pub fn runtime_settings(&self) -> RuntimeSettings {
        RuntimeSettings {
            refresh_interval: Duration::from_secs(self.refresh_interval_secs),
            startup_delay: Duration::from_millis(self.startup_delay_ms),
            wake_check_interval: Duration::from_secs(self.wake_check_interval_secs),
            clock_jump_threshold: Duration::from_secs(self.clock_jump_threshold_secs),
            schedule_reload_interval: Duration::from_secs(self.schedule_reload_interval_secs),
        }
    }
}

impl Config {
    /// Build the connection descriptor (without password) from `[controller]`.
    pub fn controller_config(&self) -> Result<ControllerConfig, ConfigError> {
        let section = &self.controller;
        let base_url = match section.url.as_deref() {
            Some(raw) => normalize_url(raw)?,
            None => None,
        };
        Ok(ControllerConfig {
            base_url,
            site: section.site.clone(),
            username: section.username.clone().unwrap_or_default(),
            accept_invalid_certificates: section.insecure,
            ..ControllerConfig::default()
        })
    }
}

// ── URL normalization ───────────────────────────────────────────────

/// Normalize user-entered controller URLs.
///
/// Whitespace is removed anywhere in the input, `https://` is prepended
/// when no scheme is given, and empty input means "unconfigured".
pub fn normalize_url(raw: &str) -> Result<Option<Url>, ConfigError> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Ok(None);
    }
    let with_scheme = if cleaned.contains("://") {
        cleaned
    } else {
        format!("https://{cleaned}")
    };
    Url::parse(&with_scheme)
        .map(Some)
        .map_err(|e| ConfigError::Validation {
            field: "controller.url".into(),
            reason: format!("'{raw}' is not a valid URL: {e}"),
        })
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "apled", "apled")
}

fn home_fallback(parts: &[&str]) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.extend(parts);
    p
}

/// Config file path: `$APLED_CONFIG`, else the platform config dir.
pub fn config_path() -> PathBuf {
    if let Ok(p) = std::env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(p);
    }
    project_dirs().map_or_else(
        || home_fallback(&[".config", "apled", "config.toml"]),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Directory holding the persisted state documents: `$APLED_DATA_DIR`,
/// else the platform data dir.
pub fn data_dir() -> PathBuf {
    if let Ok(p) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(p);
    }
    project_dirs().map_or_else(
        || home_fallback(&[".local", "share", "apled"]),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

// ── Loading & saving ────────────────────────────────────────────────

/// Load from the default path merged with `APLED_` env variables.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` merged with `APLED_` env variables.
///
/// Nested keys use a double underscore: `APLED_CONTROLLER__URL`,
/// `APLED_DAEMON__REFRESH_INTERVAL_SECS`. Flat `APLED_*` variables belong
/// to the CLI flags and are not read here.
pub fn load_config_from(path: &std::path::Path) -> Result<Config, ConfigError> {
    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(
            Env::prefixed("APLED_")
                .split("__")
                .filter(|key| key.as_str().contains('.')),
        )
        .extract()?;
    Ok(config)
}

pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &std::path::Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(cfg)?)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the controller password: `APLED_PASSWORD`, then the vault.
pub fn resolve_password(
    config: &ControllerConfig,
    vault: &dyn Vault,
) -> Result<SecretString, ConfigError> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(pw));
    }

    let account = config.account_key();
    match vault.get(&account) {
        Ok(Some(secret)) => Ok(secret),
        Ok(None) => Err(ConfigError::NoCredentials { account }),
        Err(e) => {
            tracing::debug!(error = %e, "vault lookup failed");
            Err(ConfigError::NoCredentials { account })
        }
    }
}
