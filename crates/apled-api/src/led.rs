// LED control
//
// Two knobs: the site-wide management setting and the per-device override.
// Both are no-ops when no controller is configured.

use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};

use crate::client::{ApiRequest, ControllerClient};
use crate::config::ControllerConfig;
use crate::error::Error;
use crate::paths::site_paths;

/// Per-device override value for a desired LED state.
pub fn led_override_value(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

impl ControllerClient {
    /// Set the site-wide LED setting for every device.
    pub async fn toggle_led(&self, config: &ControllerConfig, enabled: bool) -> Result<(), Error> {
        if !config.is_configured() {
            debug!("no controller configured, skipping fleet LED toggle");
            return Ok(());
        }

        let request = ApiRequest::with_body(
            Method::POST,
            site_paths(&config.site, "set/setting/mgmt"),
            json!({ "led_enabled": enabled }),
        );
        self.execute(config, &request, |_, _| Ok(())).await?;
        info!(site = %config.site, enabled, "fleet LED setting applied");
        Ok(())
    }

    /// Override the LED on one device, by controller device id.
    pub async fn toggle_device_led(
        &self,
        config: &ControllerConfig,
        device_id: &str,
        enabled: bool,
    ) -> Result<(), Error> {
        if !config.is_configured() {
            debug!(device_id, "no controller configured, skipping device LED toggle");
            return Ok(());
        }

        let request = ApiRequest::with_body(
            Method::PUT,
            site_paths(&config.site, &format!("rest/device/{device_id}")),
            json!({ "led_override": led_override_value(enabled) }),
        );
        self.execute(config, &request, |_, _| Ok(())).await?;
        info!(device_id, enabled, "device LED override applied");
        Ok(())
    }
}
