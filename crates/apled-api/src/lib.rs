//! Async session client for a UniFi controller's access-point LED endpoints.
//!
//! - **[`ControllerClient`]**: cookie + CSRF session cache keyed by
//!   `(base_url, username)`, with single-flight login and a one-shot
//!   re-login on 401.
//! - **Device directory**: [`ControllerClient::fetch_devices`] returns the
//!   site's [`AccessPoint`]s with their effective LED state.
//! - **LED control**: [`ControllerClient::toggle_led`] (site-wide) and
//!   [`ControllerClient::toggle_device_led`] (per-device override).
//!
//! Every endpoint exists under two prefixes (`/proxy/network/api/...` on
//! UniFi OS, `/api/...` on the standalone application); calls try both and
//! treat 404 as "wrong platform, try the next one".

pub mod auth;
pub mod client;
pub mod config;
pub mod devices;
pub mod error;
pub mod led;
pub mod models;
pub mod paths;
pub mod session;
pub mod transport;

pub use client::ControllerClient;
pub use config::ControllerConfig;
pub use error::{Error, ErrorKind};
pub use led::led_override_value;
pub use models::{AccessPoint, RawDevice};
pub use session::{SessionKey, SessionState};
pub use transport::{TransportConfig, TransportProfiles, USER_AGENT};
