// Session authentication
//
// Login walks the known login endpoints in order and keeps the first
// session the controller hands out. Logins are single-flight per session
// key: concurrent callers queue on a per-key mutex and re-check the cache
// once they hold it.

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::client::{ControllerClient, attach_session, join_url, require_base_url};
use crate::config::ControllerConfig;
use crate::error::Error;
use crate::paths::{LOGIN_PATHS, LOGOUT_PATHS};
use crate::session::SessionState;

/// Login body. Field order is the wire order.
#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

impl ControllerClient {
    /// Make sure a session is cached for this config, logging in if needed.
    pub async fn ensure_authenticated(&self, config: &ControllerConfig) -> Result<(), Error> {
        require_base_url(config)?;
        let key = config.session_key();
        if self.session(&key).is_some() {
            return Ok(());
        }

        let lock = self.login_lock(&key);
        let _guard = lock.lock().await;
        if self.session(&key).is_some() {
            debug!(key = %key, "session established by a concurrent login");
            return Ok(());
        }
        self.login(config).await
    }

    /// Log in unconditionally, replacing any cached session on success.
    ///
    /// Each login path is tried in turn; the first 2xx wins. If none does,
    /// the last recorded failure is returned.
    pub async fn login(&self, config: &ControllerConfig) -> Result<(), Error> {
        let base = require_base_url(config)?;
        let key = config.session_key();
        let body = serde_json::to_vec(&LoginRequest {
            username: &config.username,
            password: config.password.expose_secret(),
        })
        .map_err(|e| Error::request_failed(format!("failed to encode login body: {e}")))?;

        let mut last_error: Option<Error> = None;
        for path in LOGIN_PATHS {
            let url = join_url(base, path)?;
            debug!(%url, username = %config.username, "attempting login");

            let result = self
                .http(config)
                .post(url)
                .header(CONTENT_TYPE, "application/json")
                .header(ACCEPT, "*/*")
                .body(body.clone())
                .send()
                .await;

            let response = match result {
                Ok(r) => r,
                Err(e) => {
                    warn!(path, error = %e, "login transport error");
                    last_error = Some(Error::Transport(e));
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                debug!(path, status = status.as_u16(), "login rejected");
                last_error = Some(Error::auth_failed(format!(
                    "login via {path} returned HTTP {}",
                    status.as_u16()
                )));
                continue;
            }

            let state = SessionState::from_login(base, response.headers());
            if state.cookie_header(base).is_none() {
                warn!(path, "login succeeded without session cookies");
            }
            info!(key = %key, path, csrf = state.csrf_token.is_some(), "logged in");
            self.store_session(key, state);
            return Ok(());
        }

        Err(last_error.unwrap_or_else(|| Error::auth_failed("no login path accepted the credentials")))
    }

    /// End the session for this config, best effort.
    ///
    /// The cached session is dropped first, so a failed logout still leaves
    /// the client logged out locally.
    pub async fn logout(&self, config: &ControllerConfig) -> Result<(), Error> {
        let Some(base) = config.base_url.as_ref() else {
            return Ok(());
        };
        let key = config.session_key();
        let Some(session) = self.take_session(&key) else {
            return Ok(());
        };

        let mut last_error: Option<Error> = None;
        for path in LOGOUT_PATHS {
            let url = join_url(base, path)?;
            let builder = attach_session(self.http(config).post(url.clone()), Some(&session), &url);
            match builder.send().await {
                Ok(r) if r.status().is_success() => {
                    info!(key = %key, path, "logged out");
                    return Ok(());
                }
                Ok(r) if r.status() == StatusCode::NOT_FOUND => {}
                Ok(r) => debug!(path, status = r.status().as_u16(), "logout rejected"),
                Err(e) => last_error = Some(Error::Transport(e)),
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => {
                debug!(key = %key, "no logout endpoint accepted the request");
                Ok(())
            }
        }
    }

    /// Drop the cached session without contacting the controller.
    pub fn invalidate(&self, config: &ControllerConfig) {
        if self.take_session(&config.session_key()).is_some() {
            debug!(key = %config.session_key(), "session invalidated");
        }
    }

    /// `true` if a session is cached for this config.
    pub fn has_session(&self, config: &ControllerConfig) -> bool {
        self.session(&config.session_key()).is_some()
    }
}
