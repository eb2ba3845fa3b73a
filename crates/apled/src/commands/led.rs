//! Immediate LED switching, site-wide or for one access point.

use apled_core::Controller;

use crate::cli::{GlobalOpts, LedArgs, LedCommand, LedTarget};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(
    controller: &Controller,
    args: LedArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let (enabled, target) = match args.command {
        LedCommand::On(target) => (true, target),
        LedCommand::Off(target) => (false, target),
    };
    util::require_login(controller)?;
    let color = output::should_color(global.color);
    let state = output::led_state(enabled, color);

    match target {
        LedTarget { device: None } => {
            controller.set_all_leds(enabled).await?;
            output::print_status(&format!("Site LEDs switched {state}"), global.quiet, color);
        }
        LedTarget {
            device: Some(needle),
        } => {
            controller.refresh_devices().await?;
            let ap = controller.find_device(&needle)?;
            controller.set_device_led(&ap.device_id, enabled).await?;
            output::print_status(
                &format!("LED on {} ({}) switched {state}", ap.name, ap.mac_address),
                global.quiet,
                color,
            );
        }
    }
    Ok(())
}
