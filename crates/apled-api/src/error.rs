use thiserror::Error;

/// Top-level error type for the `apled-api` crate.
///
/// Every public operation collapses into one of three caller-facing kinds
/// (see [`ErrorKind`]); the extra variants keep the underlying cause around
/// for diagnostics. `apled-core` maps these into user-facing errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Configuration ───────────────────────────────────────────────
    /// No controller base URL has been configured.
    #[error("Invalid configuration: no controller URL set")]
    InvalidConfiguration,

    // ── Authentication ──────────────────────────────────────────────
    /// Every login path was rejected, or the 401 re-login budget is spent.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    // ── Requests ────────────────────────────────────────────────────
    /// Non-2xx (other than 401/404) on every candidate path, all paths
    /// returned 404, or the retry after a re-login was rejected again.
    #[error("Request failed: {message}")]
    RequestFailed { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Failed to build one of the HTTP transport profiles.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

/// The three failure kinds callers are expected to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidConfiguration,
    AuthenticationFailed,
    RequestFailed,
}

impl Error {
    /// Collapse this error into its caller-facing kind.
    ///
    /// Transport, URL and decode faults all count as request failures.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfiguration => ErrorKind::InvalidConfiguration,
            Self::AuthenticationFailed { .. } => ErrorKind::AuthenticationFailed,
            Self::RequestFailed { .. }
            | Self::Transport(_)
            | Self::InvalidUrl(_)
            | Self::Tls(_)
            | Self::Deserialization { .. } => ErrorKind::RequestFailed,
        }
    }

    /// Returns `true` if this error means the credentials were rejected.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }

    /// Returns `true` if this is a transient error worth retrying later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    pub(crate) fn request_failed(message: impl Into<String>) -> Self {
        Self::RequestFailed {
            message: message.into(),
        }
    }

    pub(crate) fn auth_failed(message: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            message: message.into(),
        }
    }
}
