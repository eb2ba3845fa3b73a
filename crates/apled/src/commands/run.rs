//! `apled run`: keep the scheduler and auto-refresh alive until Ctrl-C.
//!
//! Schedule edits made by other `apled` invocations are picked up by the
//! controller's reload task, on wake, and on `SIGHUP`.

use std::time::Duration;

#[cfg(unix)]
use tokio::task::JoinHandle;
use tracing::{info, warn};

use apled_config::Config;
use apled_core::{Controller, RuntimeSettings};

use crate::cli::{GlobalOpts, RunArgs};
use crate::error::CliError;
use crate::output;

use super::util;

/// Daemon timing from `[daemon]`, with `--refresh-interval` applied.
pub fn settings(args: &RunArgs, cfg: &Config) -> Result<RuntimeSettings, CliError> {
    let mut settings = cfg.daemon.runtime_settings();
    if let Some(ref raw) = args.refresh_interval {
        settings.refresh_interval = parse_interval(raw)?;
    }
    Ok(settings)
}

fn parse_interval(raw: &str) -> Result<Duration, CliError> {
    humantime::parse_duration(raw).map_err(|e| CliError::Validation {
        field: "refresh-interval".into(),
        reason: format!("'{raw}': {e}"),
    })
}

pub async fn handle(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    util::require_login(controller)?;

    let timers = controller.armed_timers().await?;
    let color = output::should_color(global.color);
    output::print_status(
        &format!(
            "Watching {} schedule(s), {} timer(s) armed. Press Ctrl-C to stop.",
            controller.schedules_snapshot().len(),
            timers.len()
        ),
        global.quiet,
        color,
    );
    if let Some(next) = timers.first() {
        info!(
            schedule = %next.schedule_name,
            edge = %next.edge,
            at = %next.next_fire.format("%a %H:%M:%S"),
            "next LED change"
        );
    }

    #[cfg(unix)]
    let hangup = reload_on_hangup(controller)?;

    let mut devices = controller.subscribe_devices();
    let mut schedules = controller.subscribe_schedules();
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "could not listen for Ctrl-C");
                }
                break;
            }
            changed = devices.changed() => {
                if changed.is_err() {
                    break;
                }
                let count = devices.borrow_and_update().len();
                info!(access_points = count, "device list updated");
            }
            changed = schedules.changed() => {
                if changed.is_err() {
                    break;
                }
                let count = schedules.borrow_and_update().len();
                info!(schedules = count, "schedule list updated");
            }
        }
    }

    #[cfg(unix)]
    hangup.abort();
    info!("shutting down");
    Ok(())
}

/// Re-read the schedule document whenever the process gets `SIGHUP`.
#[cfg(unix)]
fn reload_on_hangup(controller: &Controller) -> Result<JoinHandle<()>, CliError> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup())?;
    let controller = controller.clone();
    Ok(tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            match controller.reload_schedules().await {
                Ok(changed) => info!(changed, "schedules reloaded on SIGHUP"),
                Err(e) => warn!(error = %e, "schedule reload on SIGHUP failed"),
            }
        }
    }))
}
