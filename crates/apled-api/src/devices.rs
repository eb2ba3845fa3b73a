use tracing::{debug, warn};

use crate::client::{ApiRequest, ControllerClient};
use crate::config::ControllerConfig;
use crate::error::Error;
use crate::models::{AccessPoint, DeviceEnvelope};
use crate::paths::site_paths;

impl ControllerClient {
    /// Fetch the site's access points.
    ///
    /// Returns an empty list when no controller is configured. A body that
    /// does not decode on one path is logged and the next path is tried.
    pub async fn fetch_devices(&self, config: &ControllerConfig) -> Result<Vec<AccessPoint>, Error> {
        if !config.is_configured() {
            debug!("no controller configured, device list is empty");
            return Ok(Vec::new());
        }

        let request = ApiRequest::get(site_paths(&config.site, "stat/device"));
        let devices = self
            .execute(config, &request, |path, body| {
                serde_json::from_slice::<DeviceEnvelope>(body).map_err(|e| {
                    warn!(path, error = %e, "device list did not decode");
                    Error::Deserialization {
                        message: e.to_string(),
                        body: String::from_utf8_lossy(body).into_owned(),
                    }
                })
            })
            .await?;

        let total = devices.data.len();
        let aps: Vec<AccessPoint> = devices
            .data
            .into_iter()
            .filter_map(|d| d.into_access_point())
            .collect();
        debug!(total, access_points = aps.len(), "device directory fetched");
        Ok(aps)
    }
}
