//! CLI configuration: the shared `apled_config` file with `GlobalOpts`
//! flag overrides applied on top.

use std::sync::Arc;

use tracing::debug;

use apled_api::TransportConfig;
use apled_config::{Config, FilePersistence, KeyringVault};
use apled_core::{Controller, ControllerClient, ControllerConfig, RuntimeSettings, Vault};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Load the config file and apply `--controller`, `--site`, `--username`
/// and `--insecure`.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = apled_config::load_config()?;
    apply_overrides(&mut cfg, global);
    Ok(cfg)
}

fn apply_overrides(cfg: &mut Config, global: &GlobalOpts) {
    if let Some(ref url) = global.controller {
        cfg.controller.url = Some(url.clone());
    }
    if let Some(ref site) = global.site {
        cfg.controller.site.clone_from(site);
    }
    if let Some(ref username) = global.username {
        cfg.controller.username = Some(username.clone());
    }
    if global.insecure {
        cfg.controller.insecure = true;
    }
}

/// Collaborators shared by every command.
pub struct Runtime {
    pub controller: Controller,
    pub vault: Arc<KeyringVault>,
}

/// Wire up a controller backed by the keyring and the state directory.
pub fn build_runtime(settings: RuntimeSettings) -> Result<Runtime, CliError> {
    let client = ControllerClient::new(&TransportConfig::default()).map_err(|e| {
        CliError::RequestFailed {
            message: e.to_string(),
        }
    })?;
    let vault = Arc::new(KeyringVault::default());
    let persistence = FilePersistence::default();
    debug!(dir = %persistence.dir().display(), "state directory");

    let controller = Controller::builder(Arc::new(client))
        .settings(settings)
        .persistence(Arc::new(persistence))
        .vault(Arc::clone(&vault) as Arc<dyn Vault>)
        .build();

    Ok(Runtime { controller, vault })
}

/// The connection the commands should use.
///
/// The config file (with flag overrides) wins; without a URL there, the
/// last persisted controller document is used. The password comes from
/// `APLED_PASSWORD` or the keyring; a missing one only matters to
/// commands that talk to the controller.
pub fn effective_controller_config(
    cfg: &Config,
    persisted: &ControllerConfig,
    vault: &dyn Vault,
) -> Result<ControllerConfig, CliError> {
    let mut effective = cfg.controller_config()?;
    if !effective.is_configured() {
        effective = persisted.clone();
    }
    if effective.is_configured() {
        match apled_config::resolve_password(&effective, vault) {
            Ok(password) => effective.password = password,
            Err(e) => debug!(error = %e, "no password resolved"),
        }
    }
    Ok(effective)
}
