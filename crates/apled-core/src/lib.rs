//! State ownership and weekly LED scheduling on top of `apled-api`.
//!
//! - **[`Controller`]**: handle to a single owner task that serializes all
//!   state mutation (config, device snapshot, schedules) through an `mpsc`
//!   command channel and publishes snapshots through `watch` channels.
//! - **[`Scheduler`]**: arms one weekly tokio timer per rule edge and posts
//!   [`FireEvent`]s to the owner; rebuilt wholesale on every schedule
//!   change and on wake.
//! - **Collaborators**: [`Vault`] for passwords and [`Persistence`] for the
//!   config and schedule documents.

pub mod collaborator;
pub mod command;
pub mod controller;
pub mod error;
pub mod model;
pub mod scheduler;

// ── Primary re-exports ──────────────────────────────────────────────
pub use collaborator::{MemoryPersistence, MemoryVault, Persistence, Vault};
pub use command::{Command, CommandResult};
pub use controller::{Controller, ControllerBuilder, LifecycleState, RuntimeSettings};
pub use error::CoreError;
pub use model::{
    AccessPoint, DayOfWeek, Edge, MacAddress, OverrideState, Schedule, ScheduleRule,
    format_time_of_day, parse_time_of_day,
};
pub use scheduler::{
    ArmedTimer, Clock, ClockJumpMonitor, FireEvent, FixedClock, Scheduler, SystemClock, WEEK,
    WakeEvent, WakeNotifier, next_fire, plan_timers,
};

pub use apled_api::{ControllerClient, ControllerConfig};
