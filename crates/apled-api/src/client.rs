// Controller session client
//
// One `ControllerClient` serves any number of controllers. Sessions are
// cached per `(base_url, username)` and every authenticated call runs
// through `execute`, which walks the candidate paths, attaches the cookies
// the session's jar holds for each URL plus the CSRF token, and re-logs in
// at most once on a 401. Endpoint operations (auth, devices, led) live in
// sibling modules as inherent methods so this file stays focused on
// transport mechanics.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use dashmap::DashMap;
use reqwest::header::{COOKIE, HeaderMap};
use reqwest::{Method, RequestBuilder, StatusCode};
use tracing::{debug, trace, warn};
use url::Url;

use crate::config::ControllerConfig;
use crate::error::Error;
use crate::session::{SessionKey, SessionState, rotated_csrf};
use crate::transport::{TransportConfig, TransportProfiles};

/// Header carrying the CSRF token on authenticated requests.
pub(crate) const CSRF_HEADER: &str = "X-Csrf-Token";

/// One logical controller call: a method, an optional JSON body and the
/// candidate paths to try in order.
#[derive(Debug)]
pub(crate) struct ApiRequest {
    pub method: Method,
    pub paths: Vec<String>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn get(paths: Vec<String>) -> Self {
        Self {
            method: Method::GET,
            paths,
            body: None,
        }
    }

    pub fn with_body(method: Method, paths: Vec<String>, body: serde_json::Value) -> Self {
        Self {
            method,
            paths,
            body: Some(body),
        }
    }
}

/// Async client for the controller's session-authenticated endpoints.
///
/// Cheap to share behind an `Arc`; all state is interior. Concurrent
/// callers for the same session key share a single in-flight login.
pub struct ControllerClient {
    transport: TransportProfiles,
    sessions: RwLock<HashMap<SessionKey, Arc<SessionState>>>,
    login_locks: DashMap<SessionKey, Arc<tokio::sync::Mutex<()>>>,
}

impl std::fmt::Debug for ControllerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerClient")
            .field("sessions", &self.session_count())
            .finish_non_exhaustive()
    }
}

impl ControllerClient {
    /// Build a client with both transport profiles.
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self::with_profiles(TransportProfiles::new(transport)?))
    }

    pub fn with_profiles(transport: TransportProfiles) -> Self {
        Self {
            transport,
            sessions: RwLock::new(HashMap::new()),
            login_locks: DashMap::new(),
        }
    }

    // ── Session cache ────────────────────────────────────────────────

    pub(crate) fn session(&self, key: &SessionKey) -> Option<Arc<SessionState>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub(crate) fn store_session(&self, key: SessionKey, state: SessionState) {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::new(state));
    }

    pub(crate) fn take_session(&self, key: &SessionKey) -> Option<Arc<SessionState>> {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    fn session_count(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Per-key lock serializing logins.
    pub(crate) fn login_lock(&self, key: &SessionKey) -> Arc<tokio::sync::Mutex<()>> {
        self.login_locks.entry(key.clone()).or_default().clone()
    }

    /// Swap in a rotated CSRF token, if the response carried one and the
    /// session is still cached.
    fn apply_csrf_rotation(&self, key: &SessionKey, headers: &HeaderMap) {
        let Some(token) = rotated_csrf(headers) else {
            return;
        };
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = sessions.get_mut(key) {
            if current.csrf_token.as_deref() != Some(token.as_str()) {
                trace!("CSRF token rotated");
                *current = Arc::new(current.with_csrf_token(token));
            }
        }
    }

    // ── Request plumbing ─────────────────────────────────────────────

    pub(crate) fn http(&self, config: &ControllerConfig) -> &reqwest::Client {
        self.transport.for_config(config)
    }

    /// Run an authenticated request across its candidate paths.
    ///
    /// Per path: 404 moves on, 401 drops the session and restarts the whole
    /// walk after one fresh login, other non-2xx and transport errors are
    /// recorded and move on, and a 2xx body is handed to `decode`. A decode
    /// error also counts as a failed path. If every path fails, the last
    /// recorded error is returned.
    pub(crate) async fn execute<T, F>(
        &self,
        config: &ControllerConfig,
        request: &ApiRequest,
        mut decode: F,
    ) -> Result<T, Error>
    where
        F: FnMut(&str, &[u8]) -> Result<T, Error>,
    {
        let base = require_base_url(config)?;
        let key = config.session_key();
        let mut reauthenticated = false;

        'walk: loop {
            self.ensure_authenticated(config).await?;
            let session = self.session(&key);
            let mut last_error: Option<Error> = None;

            for path in &request.paths {
                let url = join_url(base, path)?;
                debug!(method = %request.method, %url, "controller request");

                let mut builder = self.http(config).request(request.method.clone(), url.clone());
                if let Some(body) = &request.body {
                    builder = builder.json(body);
                }
                let builder = attach_session(builder, session.as_deref(), &url);

                let response = match builder.send().await {
                    Ok(r) => r,
                    Err(e) => {
                        warn!(path = %path, error = %e, "transport error, trying next path");
                        last_error = Some(Error::Transport(e));
                        continue;
                    }
                };

                let status = response.status();
                self.apply_csrf_rotation(&key, response.headers());

                match status {
                    StatusCode::NOT_FOUND => {
                        trace!(path = %path, "404, trying next path");
                        last_error = Some(Error::request_failed(format!("HTTP 404 at {path}")));
                    }
                    StatusCode::UNAUTHORIZED => {
                        self.take_session(&key);
                        if reauthenticated {
                            return Err(Error::request_failed(format!(
                                "HTTP 401 at {path} after re-authentication"
                            )));
                        }
                        debug!(path = %path, "session rejected, re-authenticating");
                        reauthenticated = true;
                        continue 'walk;
                    }
                    s if !s.is_success() => {
                        let body = response.text().await.unwrap_or_default();
                        warn!(path = %path, status = s.as_u16(), "request rejected");
                        last_error = Some(Error::request_failed(format!(
                            "HTTP {} at {path}: {}",
                            s.as_u16(),
                            truncate(&body, 200)
                        )));
                    }
                    _ => match response.bytes().await {
                        Ok(bytes) => match decode(path, &bytes) {
                            Ok(value) => return Ok(value),
                            Err(e) => {
                                warn!(path = %path, error = %e, "unusable response, trying next path");
                                last_error = Some(e);
                            }
                        },
                        Err(e) => {
                            warn!(path = %path, error = %e, "failed reading body");
                            last_error = Some(Error::Transport(e));
                        }
                    },
                }
            }

            return Err(last_error
                .unwrap_or_else(|| Error::request_failed("no candidate paths to try")));
        }
    }
}

/// Base URL or `InvalidConfiguration`.
pub(crate) fn require_base_url(config: &ControllerConfig) -> Result<&Url, Error> {
    config.base_url.as_ref().ok_or(Error::InvalidConfiguration)
}

/// `{base}{path}` with the base's trailing slash dropped.
pub(crate) fn join_url(base: &Url, path: &str) -> Result<Url, Error> {
    let root = base.as_str().trim_end_matches('/');
    Ok(Url::parse(&format!("{root}{path}"))?)
}

/// Attach the session's cookies for `url` and its CSRF token.
pub(crate) fn attach_session(
    builder: RequestBuilder,
    session: Option<&SessionState>,
    url: &Url,
) -> RequestBuilder {
    let Some(session) = session else {
        return builder;
    };
    let builder = match session.cookie_header(url) {
        Some(cookies) => builder.header(COOKIE, cookies),
        None => builder,
    };
    match session.csrf_token.as_deref() {
        Some(token) => builder.header(CSRF_HEADER, token),
        None => builder,
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
