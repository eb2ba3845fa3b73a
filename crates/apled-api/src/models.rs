// Device directory wire types
//
// `stat/device` returns 100+ fields per device and is inconsistent about
// field presence across firmware versions, so everything except the MAC
// is optional. Records are normalized into `AccessPoint` and everything
// that is not an access point is dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Device type string the controller uses for access points.
pub const AP_DEVICE_TYPE: &str = "uap";

/// Model-name prefix that also marks a record as an access point.
pub const AP_MODEL_PREFIX: &str = "U";

/// Controller state code for a connected device.
pub const STATE_CONNECTED: i32 = 1;

/// `{ "data": [...] }` envelope around the device list. `meta` is ignored.
#[derive(Debug, Deserialize)]
pub struct DeviceEnvelope {
    pub data: Vec<RawDevice>,
}

/// Raw device record from `stat/device`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDevice {
    #[serde(default, rename = "_id")]
    pub id: Option<String>,
    pub mac: String,
    #[serde(default, rename = "type")]
    pub device_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// `"on"`, `"off"` or `"default"`.
    #[serde(default)]
    pub led_override: Option<String>,
    #[serde(default)]
    pub led_enabled: Option<bool>,
    /// Seconds since the epoch.
    #[serde(default)]
    pub last_seen: Option<i64>,
    /// 0=offline, 1=connected, 2=pending, 4=upgrading, 5=provisioning
    #[serde(default)]
    pub state: Option<i32>,
}

impl RawDevice {
    /// `true` for access points: type `uap`, or any typed record whose model
    /// carries the AP prefix. Untyped records never qualify.
    pub fn is_access_point(&self) -> bool {
        let Some(device_type) = self.device_type.as_deref() else {
            return false;
        };
        device_type == AP_DEVICE_TYPE
            || self
                .model
                .as_deref()
                .is_some_and(|m| m.starts_with(AP_MODEL_PREFIX))
    }

    /// Effective LED state.
    ///
    /// An explicit `"on"`/`"off"` override wins; anything else (absent,
    /// `"default"`) falls back to the native flag, which defaults to on.
    pub fn effective_led_enabled(&self) -> bool {
        match self.led_override.as_deref() {
            Some("on") => true,
            Some("off") => false,
            _ => self.led_enabled.unwrap_or(true),
        }
    }

    /// Normalize into an [`AccessPoint`], or `None` if the record is not an
    /// AP or has no controller-assigned id (needed for control calls).
    pub fn into_access_point(self) -> Option<AccessPoint> {
        if !self.is_access_point() {
            return None;
        }
        let led_enabled = self.effective_led_enabled();
        let device_id = self.id?;

        Some(AccessPoint {
            id: Uuid::new_v4(),
            device_id,
            name: self
                .name
                .or_else(|| self.model.clone())
                .unwrap_or_else(|| self.mac.clone()),
            ip_address: self.ip.unwrap_or_default(),
            led_enabled,
            last_seen: self
                .last_seen
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .unwrap_or(DateTime::UNIX_EPOCH),
            is_online: self.state.unwrap_or(0) == STATE_CONNECTED,
            tags: Vec::new(),
            mac_address: self.mac,
        })
    }
}

/// A managed access point, rebuilt from scratch on every directory fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPoint {
    /// Local identifier, fresh per fetch.
    pub id: Uuid,
    /// Controller-assigned `_id`, used in control calls.
    pub device_id: String,
    pub name: String,
    pub ip_address: String,
    pub mac_address: String,
    pub led_enabled: bool,
    pub last_seen: DateTime<Utc>,
    pub is_online: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}
