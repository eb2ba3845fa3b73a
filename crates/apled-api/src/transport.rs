// HTTP transport profiles
//
// The controller is reached through one of two `reqwest::Client`s: a
// strict one that verifies certificates and a relaxed one for controllers
// with self-signed certs. Both are tuned the same way: one idle connection
// per host, HTTP/1.1 only, and bounded request/resource timeouts.

use std::time::Duration;

use crate::config::ControllerConfig;
use crate::error::Error;

/// User agent sent on every request (login included).
pub const USER_AGENT: &str = concat!("apled/", env!("CARGO_PKG_VERSION"));

/// Timeout and pooling knobs shared by both profiles.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-request bound: connect and read.
    pub request_timeout: Duration,
    /// Whole-resource bound, from send to last body byte.
    pub resource_timeout: Duration,
    pub max_idle_per_host: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(15),
            resource_timeout: Duration::from_secs(30),
            max_idle_per_host: 1,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self, accept_invalid_certs: bool) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.request_timeout)
            .read_timeout(self.request_timeout)
            .timeout(self.resource_timeout)
            .pool_max_idle_per_host(self.max_idle_per_host)
            .http1_only()
            .user_agent(USER_AGENT);

        if accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}

/// The pair of clients a [`ControllerClient`](crate::ControllerClient) picks from.
#[derive(Debug, Clone)]
pub struct TransportProfiles {
    verified: reqwest::Client,
    relaxed: reqwest::Client,
}

impl TransportProfiles {
    pub fn new(config: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            verified: config.build_client(false)?,
            relaxed: config.build_client(true)?,
        })
    }

    /// Select the profile matching the config's certificate policy.
    pub fn for_config(&self, config: &ControllerConfig) -> &reqwest::Client {
        if config.accept_invalid_certificates {
            &self.relaxed
        } else {
            &self.verified
        }
    }
}
