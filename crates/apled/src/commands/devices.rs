//! Device command handlers.

use chrono::{DateTime, Local, Utc};
use tabled::Tabled;

use apled_core::{AccessPoint, Controller};

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "LED")]
    led: String,
    #[tabled(rename = "Online")]
    online: String,
    #[tabled(rename = "Last Seen")]
    last_seen: String,
    #[tabled(rename = "Device ID")]
    device_id: String,
}

impl DeviceRow {
    fn new(ap: &AccessPoint, color: bool) -> Self {
        Self {
            name: ap.name.clone(),
            mac: ap.mac_address.clone(),
            ip: ap.ip_address.clone(),
            led: output::led_state(ap.led_enabled, color),
            online: output::yes_no(ap.is_online, color),
            last_seen: format_last_seen(ap.last_seen),
            device_id: ap.device_id.clone(),
        }
    }
}

fn format_last_seen(at: DateTime<Utc>) -> String {
    if at == DateTime::<Utc>::UNIX_EPOCH {
        return "-".into();
    }
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List => {
            util::require_login(controller)?;
            controller.refresh_devices().await?;

            let devices = controller.devices_snapshot();
            let color = output::should_color(global.color);
            let out = output::render_list(
                global.output,
                devices.as_slice(),
                |ap| DeviceRow::new(ap, color),
                |ap| ap.mac_address.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
