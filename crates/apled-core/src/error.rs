// ── Core error types ──
//
// User-facing errors from apled-core. Consumers never see HTTP status
// codes or JSON parse failures directly; the `From<apled_api::Error>` impl
// folds transport-layer errors into the three request-level kinds.

use thiserror::Error;
use uuid::Uuid;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Controller access ────────────────────────────────────────────
    #[error("No controller configured")]
    InvalidConfiguration,

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request failed: {message}")]
    RequestFailed { message: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Schedule not found: {id}")]
    ScheduleNotFound { id: Uuid },

    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── Collaborators ────────────────────────────────────────────────
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    #[error("Credential vault error: {message}")]
    Vault { message: String },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Controller is not running")]
    ControllerStopped,
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    pub fn vault(message: impl Into<String>) -> Self {
        Self::Vault {
            message: message.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<apled_api::Error> for CoreError {
    fn from(err: apled_api::Error) -> Self {
        match err {
            apled_api::Error::InvalidConfiguration => Self::InvalidConfiguration,
            apled_api::Error::AuthenticationFailed { message } => {
                Self::AuthenticationFailed { message }
            }
            apled_api::Error::RequestFailed { message } => Self::RequestFailed { message },
            other => Self::RequestFailed {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_keep_their_kind() {
        assert!(matches!(
            CoreError::from(apled_api::Error::InvalidConfiguration),
            CoreError::InvalidConfiguration
        ));

        let auth = apled_api::Error::AuthenticationFailed {
            message: "bad password".into(),
        };
        assert!(matches!(
            CoreError::from(auth),
            CoreError::AuthenticationFailed { .. }
        ));

        let decode = apled_api::Error::Deserialization {
            message: "expected value".into(),
            body: "<html>".into(),
        };
        match CoreError::from(decode) {
            CoreError::RequestFailed { message } => assert!(message.contains("expected value")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
