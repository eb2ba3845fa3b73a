// ── Command API ──
//
// Every state mutation travels to the owner task as a `Command` and is
// answered through a oneshot channel.

use tokio::sync::oneshot;
use uuid::Uuid;

use apled_api::{AccessPoint, ControllerConfig, SessionKey};

use crate::error::CoreError;
use crate::model::Schedule;
use crate::scheduler::ArmedTimer;

#[derive(Debug)]
pub enum Command {
    /// Replace the controller config. A changed session key drops the old
    /// session.
    SetConfig(ControllerConfig),
    /// Install persisted state wholesale.
    Restore {
        config: ControllerConfig,
        schedules: Vec<Schedule>,
    },
    /// Insert a schedule, or replace the one with the same id.
    UpsertSchedule(Schedule),
    DeleteSchedule(Uuid),
    SetScheduleEnabled { id: Uuid, enabled: bool },
    /// Swap in a freshly fetched device list. Ignored unless `key` still
    /// matches the current config's session key.
    ReplaceDevices {
        key: SessionKey,
        devices: Vec<AccessPoint>,
    },
    /// Install a schedule list read back from persistence, if it differs
    /// from the live one. Nothing is written.
    ReloadSchedules(Vec<Schedule>),
    /// Cancel and re-arm every timer.
    RebuildTimers,
    ListArmedTimers,
}

#[derive(Debug)]
pub enum CommandResult {
    Ok,
    ArmedTimers(Vec<ArmedTimer>),
    /// The command's payload was stale and was dropped.
    Discarded,
    Reloaded { changed: bool },
}

pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: oneshot::Sender<Result<CommandResult, CoreError>>,
}
