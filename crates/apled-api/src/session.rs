// Session state for cookie-authenticated controllers
//
// A session is the cookie jar filled by the login endpoint plus the
// optional CSRF token. Sessions are immutable once built: every change
// (login, token rotation, invalidation) swaps in a whole new value.

use std::fmt;
use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderValue, SET_COOKIE};
use url::Url;

/// Cache identity for a session: `"{base_url}_{username}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(base_url: Option<&Url>, username: &str) -> Self {
        let base = base_url.map(Url::as_str).unwrap_or_default();
        Self(format!("{base}_{username}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Authenticated session material for one [`SessionKey`].
///
/// Cookies live in their own `reqwest` jar so expiry and path scoping are
/// honored. A re-login builds a new state with a new jar.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    jar: Arc<Jar>,
    pub csrf_token: Option<String>,
}

impl SessionState {
    /// Build session state from a successful login response.
    ///
    /// Cookies are stored as if set by `origin`, the controller root, so a
    /// cookie without a `Path` is not scoped to the login endpoint's
    /// directory.
    pub(crate) fn from_login(origin: &Url, headers: &HeaderMap) -> Self {
        let jar = Jar::default();
        jar.set_cookies(&mut headers.get_all(SET_COOKIE).iter(), origin);
        Self {
            jar: Arc::new(jar),
            csrf_token: csrf_from_headers(headers),
        }
    }

    /// Same cookies, different CSRF token.
    pub(crate) fn with_csrf_token(&self, token: String) -> Self {
        Self {
            jar: Arc::clone(&self.jar),
            csrf_token: Some(token),
        }
    }

    /// Value for the `Cookie` header on a request to `url`, if any cookie
    /// applies there.
    pub fn cookie_header(&self, url: &Url) -> Option<HeaderValue> {
        self.jar.cookies(url)
    }
}

/// Read the login CSRF token.
///
/// Exact-case lookup first, then a case-insensitive sweep for proxies that
/// hand back odd casings. (`HeaderMap` already folds case, so the sweep is
/// only a fallback for non-standard header names.)
pub(crate) fn csrf_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-csrf-token")
        .or_else(|| headers.get("X-Csrf-Token"))
        .or_else(|| {
            headers
                .iter()
                .find(|(name, _)| name.as_str().eq_ignore_ascii_case("x-csrf-token"))
                .map(|(_, v)| v)
        })
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

/// CSRF rotation header sent by UniFi OS on authenticated responses.
pub(crate) fn rotated_csrf(headers: &HeaderMap) -> Option<String> {
    headers
        .get("X-Updated-CSRF-Token")
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}
