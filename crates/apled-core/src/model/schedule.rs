// ── Schedule domain types ──
//
// A schedule assigns a set of access points (by MAC) to weekly rules. Each
// rule contributes two independent weekly edges: LEDs on at `on_time`,
// LEDs off at `off_time`. Times are seconds since local midnight.

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

use apled_api::AccessPoint;

use super::mac::MacAddress;
use crate::error::CoreError;

/// Seconds in a day; rule times must be strictly below this.
pub const SECONDS_PER_DAY: u32 = 86_400;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DayOfWeek {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl From<DayOfWeek> for Weekday {
    fn from(day: DayOfWeek) -> Self {
        match day {
            DayOfWeek::Sunday => Self::Sun,
            DayOfWeek::Monday => Self::Mon,
            DayOfWeek::Tuesday => Self::Tue,
            DayOfWeek::Wednesday => Self::Wed,
            DayOfWeek::Thursday => Self::Thu,
            DayOfWeek::Friday => Self::Fri,
            DayOfWeek::Saturday => Self::Sat,
        }
    }
}

/// One of the two weekly events a rule produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Edge {
    On,
    Off,
}

impl Edge {
    pub const ALL: [Self; 2] = [Self::On, Self::Off];

    /// LED state this edge applies.
    pub fn led_enabled(self) -> bool {
        matches!(self, Self::On)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRule {
    pub id: Uuid,
    pub day: DayOfWeek,
    /// Seconds since local midnight.
    pub on_time: u32,
    /// Seconds since local midnight. May be earlier than `on_time`.
    pub off_time: u32,
}

impl ScheduleRule {
    /// Build a validated rule with a fresh id.
    pub fn new(day: DayOfWeek, on_time: u32, off_time: u32) -> Result<Self, CoreError> {
        let rule = Self {
            id: Uuid::new_v4(),
            day,
            on_time,
            off_time,
        };
        rule.validate()?;
        Ok(rule)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        for (label, secs) in [("on", self.on_time), ("off", self.off_time)] {
            if secs >= SECONDS_PER_DAY {
                return Err(CoreError::validation(format!(
                    "{label} time {secs}s is outside a day (must be below {SECONDS_PER_DAY})"
                )));
            }
        }
        Ok(())
    }

    /// Time of day for the given edge.
    pub fn time_for(&self, edge: Edge) -> u32 {
        match edge {
            Edge::On => self.on_time,
            Edge::Off => self.off_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub name: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub assignments: Vec<MacAddress>,
    #[serde(default)]
    pub rules: Vec<ScheduleRule>,
}

fn enabled_by_default() -> bool {
    true
}

impl Schedule {
    /// New enabled schedule with no assignments or rules.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            enabled: true,
            assignments: Vec::new(),
            rules: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::validation("schedule name must not be empty"));
        }
        self.rules.iter().try_for_each(ScheduleRule::validate)
    }

    pub fn rule(&self, rule_id: Uuid) -> Option<&ScheduleRule> {
        self.rules.iter().find(|r| r.id == rule_id)
    }

    /// Devices from `devices` whose MAC is assigned to this schedule.
    pub fn assigned_devices<'a>(&self, devices: &'a [AccessPoint]) -> Vec<&'a AccessPoint> {
        devices
            .iter()
            .filter(|ap| self.assignments.iter().any(|m| m.matches(&ap.mac_address)))
            .collect()
    }
}

// ── Time-of-day helpers ──────────────────────────────────────────────

/// Parse `HH:MM` or `HH:MM:SS` into seconds since midnight.
pub fn parse_time_of_day(raw: &str) -> Result<u32, CoreError> {
    let invalid = || CoreError::validation(format!("invalid time of day '{raw}' (expected HH:MM)"));

    let mut parts = raw.trim().split(':');
    let mut field = |max: u32| -> Result<Option<u32>, CoreError> {
        parts
            .next()
            .map(|p| p.parse::<u32>().ok().filter(|v| *v < max).ok_or_else(invalid))
            .transpose()
    };

    let hours = field(24)?.ok_or_else(invalid)?;
    let minutes = field(60)?.ok_or_else(invalid)?;
    let seconds = field(60)?.unwrap_or(0);
    if parts.next().is_some() {
        return Err(invalid());
    }
    Ok(hours * 3600 + minutes * 60 + seconds)
}

/// Render seconds since midnight as `HH:MM` (or `HH:MM:SS` when needed).
pub fn format_time_of_day(secs: u32) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if s == 0 {
        format!("{h:02}:{m:02}")
    } else {
        format!("{h:02}:{m:02}:{s:02}")
    }
}
