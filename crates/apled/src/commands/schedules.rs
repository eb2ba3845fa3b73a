//! Schedule command handlers.

use std::fmt::Write as _;
use std::str::FromStr;
use std::time::Duration;

use chrono::Local;
use tabled::Tabled;

use apled_core::{
    ArmedTimer, Controller, DayOfWeek, MacAddress, Schedule, ScheduleRule, format_time_of_day,
    parse_time_of_day,
};

use crate::cli::{GlobalOpts, SchedulesArgs, SchedulesCommand};
use crate::error::CliError;
use crate::output;

use super::util::{self, short_id};

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct ScheduleRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "Rules")]
    rules: usize,
    #[tabled(rename = "Devices")]
    devices: usize,
}

impl ScheduleRow {
    fn new(s: &Schedule, color: bool) -> Self {
        Self {
            id: short_id(s.id),
            name: s.name.clone(),
            enabled: output::yes_no(s.enabled, color),
            rules: s.rules.len(),
            devices: s.assignments.len(),
        }
    }
}

#[derive(Tabled)]
struct TimerRow {
    #[tabled(rename = "When")]
    when: String,
    #[tabled(rename = "In")]
    remaining: String,
    #[tabled(rename = "LED")]
    edge: String,
    #[tabled(rename = "Schedule")]
    schedule: String,
    #[tabled(rename = "Rule")]
    rule: String,
}

impl TimerRow {
    fn new(t: &ArmedTimer, color: bool) -> Self {
        Self {
            when: t.next_fire.format("%a %Y-%m-%d %H:%M:%S").to_string(),
            remaining: until(t),
            edge: output::led_state(t.edge.led_enabled(), color),
            schedule: t.schedule_name.clone(),
            rule: short_id(t.rule_id),
        }
    }
}

/// Time left until the timer fires, to the second.
fn until(t: &ArmedTimer) -> String {
    let secs = (t.next_fire - Local::now()).num_seconds().max(0);
    humantime::format_duration(Duration::from_secs(secs.unsigned_abs())).to_string()
}

fn detail(s: &Schedule) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "ID:       {}", s.id);
    let _ = writeln!(out, "Name:     {}", s.name);
    let _ = writeln!(out, "Enabled:  {}", if s.enabled { "yes" } else { "no" });
    if s.assignments.is_empty() {
        let _ = writeln!(out, "Devices:  (none)");
    } else {
        let macs: Vec<&str> = s.assignments.iter().map(MacAddress::as_str).collect();
        let _ = writeln!(out, "Devices:  {}", macs.join(", "));
    }
    if s.rules.is_empty() {
        let _ = write!(out, "Rules:    (none)");
    } else {
        let _ = write!(out, "Rules:");
        for rule in &s.rules {
            let _ = write!(
                out,
                "\n  {}  {:<9} on {}  off {}",
                short_id(rule.id),
                rule.day,
                format_time_of_day(rule.on_time),
                format_time_of_day(rule.off_time),
            );
        }
    }
    out
}

// ── Argument parsing ────────────────────────────────────────────────

fn parse_day(raw: &str) -> Result<DayOfWeek, CliError> {
    DayOfWeek::from_str(raw.trim()).map_err(|_| CliError::Validation {
        field: "day".into(),
        reason: format!("'{raw}' is not a day of the week (monday..sunday)"),
    })
}

fn parse_time(field: &str, raw: &str) -> Result<u32, CliError> {
    parse_time_of_day(raw).map_err(|e| CliError::Validation {
        field: field.into(),
        reason: e.to_string(),
    })
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub async fn handle(
    controller: &Controller,
    args: SchedulesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(global.color);

    match args.command {
        SchedulesCommand::List => {
            let schedules = controller.schedules_snapshot();
            let out = output::render_list(
                global.output,
                schedules.as_slice(),
                |s| ScheduleRow::new(s, color),
                |s| s.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SchedulesCommand::Show { schedule } => {
            let schedule = util::resolve_schedule(controller, &schedule)?;
            let out = output::render_single(global.output, &schedule, detail, |s| {
                s.id.to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SchedulesCommand::Add {
            name,
            devices,
            disabled,
        } => {
            let mut schedule = Schedule::new(name);
            schedule.enabled = !disabled;
            schedule.assignments = devices.iter().map(MacAddress::new).collect();
            let created = controller.upsert_schedule(schedule).await?;

            let out = output::render_single(global.output, &created, detail, |s| {
                s.id.to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SchedulesCommand::Remove { schedule } => {
            let schedule = util::resolve_schedule(controller, &schedule)?;
            if !util::confirm(&format!("Delete schedule '{}'?", schedule.name), global.yes)? {
                return Ok(());
            }
            controller.delete_schedule(schedule.id).await?;
            output::print_status(
                &format!("Deleted schedule '{}'", schedule.name),
                global.quiet,
                color,
            );
            Ok(())
        }

        SchedulesCommand::Enable { schedule } => {
            set_enabled(controller, &schedule, true, global, color).await
        }

        SchedulesCommand::Disable { schedule } => {
            set_enabled(controller, &schedule, false, global, color).await
        }

        SchedulesCommand::AddRule {
            schedule,
            day,
            on,
            off,
        } => {
            let mut schedule = util::resolve_schedule(controller, &schedule)?;
            let rule = ScheduleRule::new(
                parse_day(&day)?,
                parse_time("on", &on)?,
                parse_time("off", &off)?,
            )?;
            let rule_id = rule.id;
            schedule.rules.push(rule);
            let updated = controller.upsert_schedule(schedule).await?;

            if global.output == crate::cli::OutputFormat::Plain {
                output::print_output(&rule_id.to_string(), global.quiet);
            } else {
                let out = output::render_single(global.output, &updated, detail, |s| {
                    s.id.to_string()
                })?;
                output::print_output(&out, global.quiet);
            }
            Ok(())
        }

        SchedulesCommand::RemoveRule { schedule, rule } => {
            let mut schedule = util::resolve_schedule(controller, &schedule)?;
            let index = util::resolve_rule(&schedule, &rule)?;
            let removed = schedule.rules.remove(index);
            let name = schedule.name.clone();
            controller.upsert_schedule(schedule).await?;
            output::print_status(
                &format!("Removed rule {} from '{name}'", short_id(removed.id)),
                global.quiet,
                color,
            );
            Ok(())
        }

        SchedulesCommand::Assign { schedule, mac } => {
            let mut schedule = util::resolve_schedule(controller, &schedule)?;
            let mac = MacAddress::new(&mac);
            if !schedule.assignments.contains(&mac) {
                schedule.assignments.push(mac.clone());
            }
            let name = schedule.name.clone();
            controller.upsert_schedule(schedule).await?;
            output::print_status(&format!("Assigned {mac} to '{name}'"), global.quiet, color);
            Ok(())
        }

        SchedulesCommand::Unassign { schedule, mac } => {
            let mut schedule = util::resolve_schedule(controller, &schedule)?;
            let mac = MacAddress::new(&mac);
            let before = schedule.assignments.len();
            schedule.assignments.retain(|m| *m != mac);
            if schedule.assignments.len() == before {
                return Err(CliError::NotFound {
                    resource_type: "assignment".into(),
                    identifier: mac.to_string(),
                    list_command: format!("schedules show {}", short_id(schedule.id)),
                });
            }
            let name = schedule.name.clone();
            controller.upsert_schedule(schedule).await?;
            output::print_status(
                &format!("Unassigned {mac} from '{name}'"),
                global.quiet,
                color,
            );
            Ok(())
        }

        SchedulesCommand::Next { limit } => {
            let mut timers = controller.armed_timers().await?;
            timers.truncate(limit);
            let out = output::render_list(
                global.output,
                &timers,
                |t| TimerRow::new(t, color),
                |t| format!("{} {} {}", t.next_fire.to_rfc3339(), t.edge, t.schedule_id),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

async fn set_enabled(
    controller: &Controller,
    identifier: &str,
    enabled: bool,
    global: &GlobalOpts,
    color: bool,
) -> Result<(), CliError> {
    let schedule = util::resolve_schedule(controller, identifier)?;
    controller.set_schedule_enabled(schedule.id, enabled).await?;
    let verb = if enabled { "Enabled" } else { "Disabled" };
    output::print_status(
        &format!("{verb} schedule '{}'", schedule.name),
        global.quiet,
        color,
    );
    Ok(())
}
