//! Config subcommand handlers. None of these talk to the controller.

use std::io::{self, BufRead, IsTerminal};

use dialoguer::{Confirm, Input};
use secrecy::SecretString;
use serde::Serialize;

use apled_config::{Config, KeyringVault, PASSWORD_ENV};
use apled_core::Vault;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn interactive() -> bool {
    io::stdin().is_terminal()
}

/// Flag value, else an interactive prompt, else an error naming the flag.
fn value_or_prompt(
    given: Option<String>,
    prompt: &str,
    default: Option<&str>,
    flag: &str,
) -> Result<String, CliError> {
    if let Some(value) = given {
        return Ok(value);
    }
    if !interactive() {
        return default.map(str::to_owned).ok_or_else(|| CliError::Validation {
            field: flag.into(),
            reason: format!("required when not running interactively (pass --{flag})"),
        });
    }
    let mut input = Input::<String>::new().with_prompt(prompt);
    if let Some(default) = default {
        input = input.default(default.into());
    }
    input.interact_text().map_err(prompt_err)
}

/// Password from the terminal, or one line of piped stdin.
fn read_password() -> Result<SecretString, CliError> {
    let raw = if interactive() {
        rpassword::prompt_password("Password: ").map_err(prompt_err)?
    } else {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        line.trim_end_matches(['\r', '\n']).to_owned()
    };
    if raw.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "value cannot be empty".into(),
        });
    }
    Ok(SecretString::from(raw))
}

/// Where the password would come from right now.
fn password_source(cfg: &Config, vault: &dyn Vault) -> &'static str {
    if std::env::var(PASSWORD_ENV).is_ok() {
        return "environment (APLED_PASSWORD)";
    }
    let Ok(controller) = cfg.controller_config() else {
        return "unavailable";
    };
    if !controller.is_configured() {
        return "unavailable";
    }
    match vault.get(&controller.account_key()) {
        Ok(Some(_)) => "keyring",
        Ok(None) => "not set",
        Err(_) => "keyring unavailable",
    }
}

#[derive(Serialize)]
struct ConfigView<'a> {
    config_path: String,
    data_dir: String,
    password: &'static str,
    #[serde(flatten)]
    config: &'a Config,
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(global.color);

    match args.command {
        // ── Init ────────────────────────────────────────────────────
        ConfigCommand::Init {
            url,
            username,
            site,
            insecure,
            force,
        } => {
            let path = apled_config::config_path();
            if path.exists() && !force {
                return Err(CliError::Validation {
                    field: "config".into(),
                    reason: format!(
                        "{} already exists (pass --force to overwrite)",
                        path.display()
                    ),
                });
            }

            let url = value_or_prompt(
                url.or_else(|| global.controller.clone()),
                "Controller URL",
                None,
                "url",
            )?;
            if apled_config::normalize_url(&url)?.is_none() {
                return Err(CliError::Validation {
                    field: "url".into(),
                    reason: "controller URL cannot be empty".into(),
                });
            }
            let username = value_or_prompt(
                username.or_else(|| global.username.clone()),
                "Username",
                None,
                "username",
            )?;
            let site = value_or_prompt(
                site.or_else(|| global.site.clone()),
                "Site name",
                Some("default"),
                "site",
            )?;

            let mut cfg = Config::default();
            cfg.controller.url = Some(url);
            cfg.controller.username = Some(username);
            cfg.controller.site = site;
            cfg.controller.insecure = insecure || global.insecure;
            apled_config::save_config_to(&cfg, &path)?;
            output::print_status(
                &format!("Config written to {}", path.display()),
                global.quiet,
                color,
            );

            if interactive()
                && Confirm::new()
                    .with_prompt("Store the controller password in the system keyring now?")
                    .default(true)
                    .interact()
                    .map_err(prompt_err)?
            {
                let account = cfg.controller_config()?.account_key();
                KeyringVault::default().save(&account, &read_password()?)?;
                output::print_status("Password stored in system keyring", global.quiet, color);
            } else if !global.quiet {
                eprintln!("Store the password later with: apled config set-password");
            }
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            let view = ConfigView {
                config_path: apled_config::config_path().display().to_string(),
                data_dir: apled_config::data_dir().display().to_string(),
                password: password_source(&cfg, &KeyringVault::default()),
                config: &cfg,
            };
            let out = match global.output {
                OutputFormat::Table | OutputFormat::Plain => {
                    let body = toml::to_string_pretty(&cfg).map_err(apled_config::ConfigError::from)?;
                    format!(
                        "# {}\n# password: {}\n\n{body}",
                        view.config_path, view.password
                    )
                }
                format => output::render_single(format, &view, |_| String::new(), |_| String::new())?,
            };
            output::print_output(out.trim_end(), global.quiet);
            Ok(())
        }

        // ── SetPassword ─────────────────────────────────────────────
        ConfigCommand::SetPassword => {
            let cfg = config::load(global)?;
            let controller = cfg.controller_config()?;
            if !controller.is_configured() || controller.username.is_empty() {
                return Err(CliError::NoController {
                    path: apled_config::config_path().display().to_string(),
                });
            }
            let password = read_password()?;
            KeyringVault::default().save(&controller.account_key(), &password)?;
            output::print_status(
                &format!(
                    "Password stored in system keyring for {}",
                    controller.account_key()
                ),
                global.quiet,
                color,
            );
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            let lines = format!(
                "config: {}\ndata:   {}",
                apled_config::config_path().display(),
                apled_config::data_dir().display()
            );
            output::print_output(&lines, global.quiet);
            Ok(())
        }
    }
}
