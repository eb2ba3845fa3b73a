//! Shared helpers for command handlers.

use secrecy::ExposeSecret;
use uuid::Uuid;

use apled_core::{Controller, Schedule, ScheduleRule};

use crate::error::CliError;

/// Fail early when a command needs the controller but has no URL or
/// password to reach it with.
pub fn require_login(controller: &Controller) -> Result<(), CliError> {
    let config = controller.config();
    if !config.is_configured() {
        return Err(CliError::NoController {
            path: apled_config::config_path().display().to_string(),
        });
    }
    if config.password.expose_secret().is_empty() {
        return Err(CliError::NoCredentials {
            account: config.account_key(),
        });
    }
    Ok(())
}

/// Resolve a schedule by full id, exact name (case-insensitive), or id prefix.
pub fn resolve_schedule(controller: &Controller, identifier: &str) -> Result<Schedule, CliError> {
    if let Ok(id) = Uuid::parse_str(identifier) {
        return Ok(controller.schedule(id)?);
    }

    let schedules = controller.schedules_snapshot();
    let by_name: Vec<&Schedule> = schedules
        .iter()
        .filter(|s| s.name.eq_ignore_ascii_case(identifier))
        .collect();
    let matches = if by_name.is_empty() {
        let prefix = identifier.to_ascii_lowercase();
        schedules
            .iter()
            .filter(|s| s.id.to_string().starts_with(&prefix))
            .collect()
    } else {
        by_name
    };

    match matches.as_slice() {
        [single] => Ok((*single).clone()),
        [] => Err(CliError::NotFound {
            resource_type: "schedule".into(),
            identifier: identifier.into(),
            list_command: "schedules list".into(),
        }),
        many => Err(CliError::Ambiguous {
            resource_type: "schedule".into(),
            identifier: identifier.into(),
            candidates: many
                .iter()
                .map(|s| format!("{} ({})", short_id(s.id), s.name))
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

/// Index of the rule whose id starts with `identifier`.
pub fn resolve_rule(schedule: &Schedule, identifier: &str) -> Result<usize, CliError> {
    let prefix = identifier.to_ascii_lowercase();
    let matches: Vec<(usize, &ScheduleRule)> = schedule
        .rules
        .iter()
        .enumerate()
        .filter(|(_, r)| r.id.to_string().starts_with(&prefix))
        .collect();

    match matches.as_slice() {
        [(index, _)] => Ok(*index),
        [] => Err(CliError::NotFound {
            resource_type: "rule".into(),
            identifier: identifier.into(),
            list_command: format!("schedules show {}", short_id(schedule.id)),
        }),
        many => Err(CliError::Ambiguous {
            resource_type: "rule".into(),
            identifier: identifier.into(),
            candidates: many
                .iter()
                .map(|(_, r)| short_id(r.id))
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

/// First eight hex digits, enough to address a schedule or rule.
pub fn short_id(id: Uuid) -> String {
    id.simple().to_string().chars().take(8).collect()
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}
