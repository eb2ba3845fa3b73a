use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A manual LED override with an expiry.
///
/// Carried in persisted state for compatibility; nothing acts on it yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideState {
    pub id: Uuid,
    pub device_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub led_enabled: bool,
}

impl OverrideState {
    pub fn new(device_id: Uuid, expires_at: DateTime<Utc>, led_enabled: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            device_id,
            expires_at,
            led_enabled,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
