// ── Domain model ──

pub mod mac;
pub mod override_state;
pub mod schedule;

pub use apled_api::AccessPoint;
pub use mac::MacAddress;
pub use override_state::OverrideState;
pub use schedule::{
    DayOfWeek, Edge, SECONDS_PER_DAY, Schedule, ScheduleRule, format_time_of_day,
    parse_time_of_day,
};
