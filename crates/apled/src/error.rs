//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a stable exit code.

use miette::Diagnostic;
use thiserror::Error;

use apled_config::ConfigError;
use apled_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Controller ───────────────────────────────────────────────────
    #[error("No controller configured")]
    #[diagnostic(
        code(apled::no_controller),
        help(
            "Create a config with: apled config init\n\
             Or pass --controller <url> (APLED_CONTROLLER).\n\
             Expected config at: {path}"
        )
    )]
    NoController { path: String },

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(apled::auth_failed),
        help(
            "Check the account name and password.\n\
             Update the stored password with: apled config set-password"
        )
    )]
    AuthFailed { message: String },

    #[error("No password found for '{account}'")]
    #[diagnostic(
        code(apled::no_credentials),
        help(
            "Store one with: apled config set-password\n\
             Or set the APLED_PASSWORD environment variable."
        )
    )]
    NoCredentials { account: String },

    #[error("Request to the controller failed: {message}")]
    #[diagnostic(
        code(apled::request_failed),
        help("Check that the controller is reachable. Self-signed certificate? Try --insecure (-k).")
    )]
    RequestFailed { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(apled::not_found),
        help("Run: apled {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("'{identifier}' matches more than one {resource_type}")]
    #[diagnostic(
        code(apled::ambiguous),
        help("Use a longer id prefix. Matches: {candidates}")
    )]
    Ambiguous {
        resource_type: String,
        identifier: String,
        candidates: String,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(apled::validation))]
    Validation { field: String, reason: String },

    #[error("'{action}' requires confirmation")]
    #[diagnostic(
        code(apled::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Configuration & state ────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(apled::config))]
    Config(#[from] ConfigError),

    #[error("Could not read or write local state: {message}")]
    #[diagnostic(code(apled::state))]
    State { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON output failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML output failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::RequestFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. }
            | Self::NoCredentials { .. }
            | Self::Config(ConfigError::NoCredentials { .. }) => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. }
            | Self::Ambiguous { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::NoController { .. }
            | Self::Config(ConfigError::Validation { .. }) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidConfiguration => CliError::NoController {
                path: apled_config::config_path().display().to_string(),
            },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::RequestFailed { message } => CliError::RequestFailed { message },

            CoreError::ScheduleNotFound { id } => CliError::NotFound {
                resource_type: "schedule".into(),
                identifier: id.to_string(),
                list_command: "schedules list".into(),
            },

            CoreError::DeviceNotFound { identifier } => CliError::NotFound {
                resource_type: "device".into(),
                identifier,
                list_command: "devices list".into(),
            },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            other @ (CoreError::Persistence { .. }
            | CoreError::Vault { .. }
            | CoreError::ControllerStopped) => CliError::State {
                message: other.to_string(),
            },
        }
    }
}
