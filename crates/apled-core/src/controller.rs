// ── Controller abstraction ──
//
// Single owner of the app state: controller config, device snapshot and
// schedule list. All mutation is serialized through one owner task that
// also owns the `Scheduler`; network work runs in independent tasks and
// posts its results back through the command channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use apled_api::{AccessPoint, ControllerClient, ControllerConfig};

use crate::collaborator::{MemoryPersistence, MemoryVault, Persistence, Vault};
use crate::command::{Command, CommandEnvelope, CommandResult};
use crate::error::CoreError;
use crate::model::{Edge, MacAddress, Schedule};
use crate::scheduler::{
    ArmedTimer, Clock, ClockJumpMonitor, FireEvent, Scheduler, SystemClock, WakeEvent,
    WakeNotifier,
};

const COMMAND_CHANNEL_SIZE: usize = 64;

// ── Settings ─────────────────────────────────────────────────────

/// Timing knobs for the background tasks.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    /// Auto-refresh period. Zero disables auto-refresh entirely.
    pub refresh_interval: Duration,
    /// Delay before the first auto-refresh.
    pub startup_delay: Duration,
    /// Clock-jump sampling period. Zero disables the monitor.
    pub wake_check_interval: Duration,
    /// Wall-clock drift beyond monotonic time that counts as a wake.
    pub clock_jump_threshold: Duration,
    /// Persisted-schedule polling period. Zero disables polling.
    pub schedule_reload_interval: Duration,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(300),
            startup_delay: Duration::from_secs(1),
            wake_check_interval: Duration::from_secs(30),
            clock_jump_threshold: Duration::from_secs(10),
            schedule_reload_interval: Duration::from_secs(5),
        }
    }
}

impl RuntimeSettings {
    /// No background refresh, reload or clock monitoring; for one-shot
    /// CLI runs.
    pub fn oneshot() -> Self {
        Self {
            refresh_interval: Duration::ZERO,
            wake_check_interval: Duration::ZERO,
            schedule_reload_interval: Duration::ZERO,
            ..Self::default()
        }
    }
}

// ── Lifecycle ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Running,
    Stopped,
}

// ── Controller ───────────────────────────────────────────────────

/// Handle to the state owner. Cheaply cloneable via `Arc<ControllerInner>`.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    client: Arc<ControllerClient>,
    settings: RuntimeSettings,
    clock: Arc<dyn Clock>,
    persistence: Arc<dyn Persistence>,
    vault: Arc<dyn Vault>,
    wake: WakeNotifier,
    config: watch::Sender<Arc<ControllerConfig>>,
    devices: watch::Sender<Arc<Vec<AccessPoint>>>,
    schedules: watch::Sender<Arc<Vec<Schedule>>>,
    lifecycle: watch::Sender<LifecycleState>,
    command_tx: mpsc::Sender<CommandEnvelope>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    /// Set while the in-memory schedule list has not reached persistence.
    schedules_unsaved: AtomicBool,
}

/// Assembles a [`Controller`]. Collaborators default to in-memory ones and
/// the system clock.
pub struct ControllerBuilder {
    client: Arc<ControllerClient>,
    settings: RuntimeSettings,
    clock: Arc<dyn Clock>,
    persistence: Arc<dyn Persistence>,
    vault: Arc<dyn Vault>,
    wake: WakeNotifier,
}

impl ControllerBuilder {
    pub fn settings(mut self, settings: RuntimeSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn persistence(mut self, persistence: Arc<dyn Persistence>) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn vault(mut self, vault: Arc<dyn Vault>) -> Self {
        self.vault = vault;
        self
    }

    pub fn wake_notifier(mut self, wake: WakeNotifier) -> Self {
        self.wake = wake;
        self
    }

    pub fn build(self) -> Controller {
        let (config, _) = watch::channel(Arc::new(ControllerConfig::default()));
        let (devices, _) = watch::channel(Arc::new(Vec::new()));
        let (schedules, _) = watch::channel(Arc::new(Vec::new()));
        let (lifecycle, _) = watch::channel(LifecycleState::Idle);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        Controller {
            inner: Arc::new(ControllerInner {
                client: self.client,
                settings: self.settings,
                clock: self.clock,
                persistence: self.persistence,
                vault: self.vault,
                wake: self.wake,
                config,
                devices,
                schedules,
                lifecycle,
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
                schedules_unsaved: AtomicBool::new(false),
            }),
        }
    }
}

impl Controller {
    pub fn builder(client: Arc<ControllerClient>) -> ControllerBuilder {
        ControllerBuilder {
            client,
            settings: RuntimeSettings::default(),
            clock: Arc::new(SystemClock),
            persistence: Arc::new(MemoryPersistence::default()),
            vault: Arc::new(MemoryVault::default()),
            wake: WakeNotifier::new(),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the owner task and, per settings, the auto-refresh task, the
    /// schedule-reload task and the clock-jump monitor. Calling it twice is
    /// a no-op.
    pub async fn start(&self) -> Result<(), CoreError> {
        let Some(rx) = self.inner.command_rx.lock().await.take() else {
            return match *self.inner.lifecycle.borrow() {
                LifecycleState::Running => Ok(()),
                _ => Err(CoreError::ControllerStopped),
            };
        };

        let mut handles = self.inner.task_handles.lock().await;
        let cancel = self.inner.cancel.clone();
        let wake_rx = self.inner.wake.subscribe();

        handles.push(tokio::spawn(owner_task(
            self.clone(),
            rx,
            wake_rx,
            cancel.clone(),
        )));

        let settings = &self.inner.settings;
        if !settings.refresh_interval.is_zero() {
            handles.push(tokio::spawn(refresh_task(
                self.clone(),
                settings.startup_delay,
                settings.refresh_interval,
                cancel.clone(),
            )));
        }
        if !settings.schedule_reload_interval.is_zero() {
            handles.push(tokio::spawn(reload_task(
                self.clone(),
                settings.schedule_reload_interval,
                cancel.clone(),
            )));
        }
        if !settings.wake_check_interval.is_zero() {
            let monitor = ClockJumpMonitor::new(
                Arc::clone(&self.inner.clock),
                self.inner.wake.clone(),
                settings.wake_check_interval,
                settings.clock_jump_threshold,
            );
            handles.push(tokio::spawn(monitor.run(cancel.clone())));
        }

        self.inner.lifecycle.send_replace(LifecycleState::Running);
        info!(tasks = handles.len(), "controller started");
        Ok(())
    }

    /// Cancel every background task, tear down timers, wait for the
    /// tasks, and log out.
    ///
    /// LED toggles a timer already started run to completion first; their
    /// follow-up refresh is skipped.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        // A never-started controller still owns its receiver; drop it so
        // later commands fail fast.
        self.inner.command_rx.lock().await.take();

        let config = self.config();
        if let Err(e) = self.inner.client.logout(&config).await {
            warn!(error = %e, "logout failed (non-fatal)");
        }

        self.inner.lifecycle.send_replace(LifecycleState::Stopped);
        debug!("controller stopped");
    }

    /// One-shot: start without background tasks, run closure, shut down.
    pub async fn oneshot<F, Fut, T>(controller: Controller, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        controller.start().await?;
        let result = f(controller.clone()).await;
        controller.shutdown().await;
        result
    }

    pub fn lifecycle(&self) -> watch::Receiver<LifecycleState> {
        self.inner.lifecycle.subscribe()
    }

    // ── Command execution ────────────────────────────────────────

    /// Send a command to the owner task and await its result.
    pub async fn execute(&self, command: Command) -> Result<CommandResult, CoreError> {
        if *self.inner.lifecycle.borrow() != LifecycleState::Running {
            return Err(CoreError::ControllerStopped);
        }

        let (tx, rx) = oneshot::channel();
        self.inner
            .command_tx
            .send(CommandEnvelope {
                command,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::ControllerStopped)?;

        rx.await.map_err(|_| CoreError::ControllerStopped)?
    }

    async fn execute_ok(&self, command: Command) -> Result<(), CoreError> {
        self.execute(command).await.map(|_| ())
    }

    // ── State observation ────────────────────────────────────────

    pub fn config(&self) -> Arc<ControllerConfig> {
        self.inner.config.borrow().clone()
    }

    pub fn devices_snapshot(&self) -> Arc<Vec<AccessPoint>> {
        self.inner.devices.borrow().clone()
    }

    pub fn schedules_snapshot(&self) -> Arc<Vec<Schedule>> {
        self.inner.schedules.borrow().clone()
    }

    pub fn subscribe_devices(&self) -> watch::Receiver<Arc<Vec<AccessPoint>>> {
        self.inner.devices.subscribe()
    }

    pub fn subscribe_schedules(&self) -> watch::Receiver<Arc<Vec<Schedule>>> {
        self.inner.schedules.subscribe()
    }

    pub fn wake_notifier(&self) -> &WakeNotifier {
        &self.inner.wake
    }

    pub fn schedule(&self, id: Uuid) -> Result<Schedule, CoreError> {
        self.schedules_snapshot()
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(CoreError::ScheduleNotFound { id })
    }

    /// Find a device in the current snapshot by controller id or MAC.
    pub fn find_device(&self, needle: &str) -> Result<AccessPoint, CoreError> {
        let mac = MacAddress::new(needle);
        self.devices_snapshot()
            .iter()
            .find(|ap| ap.device_id == needle || mac.matches(&ap.mac_address))
            .cloned()
            .ok_or_else(|| CoreError::DeviceNotFound {
                identifier: needle.to_owned(),
            })
    }

    pub async fn armed_timers(&self) -> Result<Vec<ArmedTimer>, CoreError> {
        match self.execute(Command::ListArmedTimers).await? {
            CommandResult::ArmedTimers(timers) => Ok(timers),
            _ => Ok(Vec::new()),
        }
    }

    // ── Mutations ────────────────────────────────────────────────

    pub async fn set_config(&self, config: ControllerConfig) -> Result<(), CoreError> {
        self.execute_ok(Command::SetConfig(config)).await
    }

    /// Validate and insert or replace a schedule; timers are rebuilt.
    pub async fn upsert_schedule(&self, schedule: Schedule) -> Result<Schedule, CoreError> {
        let id = schedule.id;
        self.execute_ok(Command::UpsertSchedule(schedule)).await?;
        self.schedule(id)
    }

    pub async fn delete_schedule(&self, id: Uuid) -> Result<(), CoreError> {
        self.execute_ok(Command::DeleteSchedule(id)).await
    }

    pub async fn set_schedule_enabled(&self, id: Uuid, enabled: bool) -> Result<(), CoreError> {
        self.execute_ok(Command::SetScheduleEnabled { id, enabled }).await
    }

    pub async fn rebuild_timers(&self) -> Result<(), CoreError> {
        self.execute_ok(Command::RebuildTimers).await
    }

    // ── Network operations ───────────────────────────────────────

    /// Fetch the device list and install it. On failure the previous list
    /// is kept and the error returned.
    ///
    /// A list fetched for a config that was replaced while the request was
    /// in flight is dropped, and the refresh reports zero devices.
    pub async fn refresh_devices(&self) -> Result<usize, CoreError> {
        let config = self.config();
        match self.inner.client.fetch_devices(&config).await {
            Ok(devices) => {
                let count = devices.len();
                let key = config.session_key();
                match self.execute(Command::ReplaceDevices { key, devices }).await? {
                    CommandResult::Discarded => Ok(0),
                    _ => {
                        debug!(count, "device list refreshed");
                        Ok(count)
                    }
                }
            }
            Err(e) => {
                error!(
                    error = %e,
                    transient = e.is_transient(),
                    "device refresh failed, keeping previous list"
                );
                Err(e.into())
            }
        }
    }

    /// Fleet-wide LED toggle, followed by a refresh.
    pub async fn set_all_leds(&self, enabled: bool) -> Result<(), CoreError> {
        let config = self.config();
        self.inner.client.toggle_led(&config, enabled).await?;
        self.refresh_after_change().await;
        Ok(())
    }

    /// Per-device LED override, followed by a refresh.
    pub async fn set_device_led(&self, device_id: &str, enabled: bool) -> Result<(), CoreError> {
        let config = self.config();
        self.inner
            .client
            .toggle_device_led(&config, device_id, enabled)
            .await?;
        self.refresh_after_change().await;
        Ok(())
    }

    /// Apply one edge of a schedule to its assigned devices now.
    ///
    /// Each matched device is toggled independently; individual failures
    /// are logged and do not stop the rest. Returns how many devices were
    /// toggled successfully.
    pub async fn apply_edge(&self, schedule_id: Uuid, edge: Edge) -> Result<usize, CoreError> {
        let schedule = self.schedule(schedule_id)?;
        let devices = self.devices_snapshot();
        let targets = schedule.assigned_devices(&devices);
        if targets.is_empty() {
            info!(schedule = %schedule.name, %edge, "no assigned access points found, nothing to do");
            return Ok(0);
        }

        let config = self.config();
        let enabled = edge.led_enabled();
        let mut applied = 0;
        for ap in &targets {
            match self
                .inner
                .client
                .toggle_device_led(&config, &ap.device_id, enabled)
                .await
            {
                Ok(()) => applied += 1,
                Err(e) => warn!(
                    schedule = %schedule.name,
                    device = %ap.name,
                    error = %e,
                    "scheduled LED toggle failed"
                ),
            }
        }
        info!(
            schedule = %schedule.name,
            %edge,
            applied,
            targets = targets.len(),
            "schedule edge applied"
        );

        self.refresh_after_change().await;
        Ok(applied)
    }

    async fn refresh_after_change(&self) {
        if let Err(e) = self.refresh_devices().await {
            debug!(error = %e, "post-change refresh failed");
        }
    }

    // ── Persistence & credentials ────────────────────────────────

    /// Load the persisted config and schedules and install them. The
    /// password is filled in from the vault when the config has none; an
    /// unreachable vault only costs the password.
    pub async fn load_persisted_state(&self) -> Result<(), CoreError> {
        let mut config = self.inner.persistence.load_config()?;
        let schedules = self.inner.persistence.load_schedules()?;

        if config.password.expose_secret().is_empty() && config.is_configured() {
            match self.inner.vault.get(&config.account_key()) {
                Ok(Some(secret)) => config.password = secret,
                Ok(None) => {}
                Err(e) => warn!(error = %e, "vault lookup failed, continuing without password"),
            }
        }

        info!(
            configured = config.is_configured(),
            schedules = schedules.len(),
            "persisted state loaded"
        );
        self.execute_ok(Command::Restore { config, schedules }).await
    }

    /// Re-read the persisted schedule list and install it if it differs
    /// from the live one. Returns `true` when the timers were re-armed.
    pub async fn reload_schedules(&self) -> Result<bool, CoreError> {
        let schedules = self.inner.persistence.load_schedules()?;
        match self.execute(Command::ReloadSchedules(schedules)).await? {
            CommandResult::Reloaded { changed } => Ok(changed),
            _ => Ok(false),
        }
    }

    /// Write the current config and schedules through the persistence layer.
    pub fn save_state(&self) -> Result<(), CoreError> {
        self.inner.persistence.save_config(&self.config())?;
        self.inner
            .persistence
            .save_schedules(&self.schedules_snapshot())
    }

    /// Store the password for the current config in the vault and use it.
    pub async fn store_password(&self, password: SecretString) -> Result<(), CoreError> {
        let mut config = (*self.config()).clone();
        self.inner.vault.save(&config.account_key(), &password)?;
        config.password = password;
        self.set_config(config).await
    }

    // ── Owner-side command handling ──────────────────────────────

    fn apply(&self, scheduler: &mut Scheduler, command: Command) -> Result<CommandResult, CoreError> {
        match command {
            Command::SetConfig(config) => {
                self.replace_config(config);
                self.inner.persistence.save_config(&self.config())?;
                Ok(CommandResult::Ok)
            }
            Command::Restore { config, schedules } => {
                self.replace_config(config);
                self.inner.schedules_unsaved.store(false, Ordering::Release);
                self.inner.schedules.send_replace(Arc::new(schedules));
                scheduler.rebuild(&self.schedules_snapshot());
                Ok(CommandResult::Ok)
            }
            Command::UpsertSchedule(schedule) => {
                schedule.validate()?;
                let mut schedules = (*self.schedules_snapshot()).clone();
                match schedules.iter_mut().find(|s| s.id == schedule.id) {
                    Some(existing) => *existing = schedule,
                    None => schedules.push(schedule),
                }
                self.commit_schedules(scheduler, schedules)?;
                Ok(CommandResult::Ok)
            }
            Command::DeleteSchedule(id) => {
                let mut schedules = (*self.schedules_snapshot()).clone();
                let before = schedules.len();
                schedules.retain(|s| s.id != id);
                if schedules.len() == before {
                    return Err(CoreError::ScheduleNotFound { id });
                }
                self.commit_schedules(scheduler, schedules)?;
                Ok(CommandResult::Ok)
            }
            Command::SetScheduleEnabled { id, enabled } => {
                let mut schedules = (*self.schedules_snapshot()).clone();
                let schedule = schedules
                    .iter_mut()
                    .find(|s| s.id == id)
                    .ok_or(CoreError::ScheduleNotFound { id })?;
                schedule.enabled = enabled;
                self.commit_schedules(scheduler, schedules)?;
                Ok(CommandResult::Ok)
            }
            Command::ReplaceDevices { key, devices } => {
                if key != self.config().session_key() {
                    debug!(%key, "dropping device list fetched for a replaced config");
                    return Ok(CommandResult::Discarded);
                }
                self.inner.devices.send_replace(Arc::new(devices));
                Ok(CommandResult::Ok)
            }
            Command::ReloadSchedules(schedules) => Ok(CommandResult::Reloaded {
                changed: self.install_reloaded(scheduler, schedules),
            }),
            Command::RebuildTimers => {
                scheduler.rebuild(&self.schedules_snapshot());
                Ok(CommandResult::Ok)
            }
            Command::ListArmedTimers => Ok(CommandResult::ArmedTimers(
                scheduler.armed_timers().to_vec(),
            )),
        }
    }

    /// Swap the config, dropping the old session when the key changes.
    fn replace_config(&self, config: ControllerConfig) {
        let previous = self.inner.config.send_replace(Arc::new(config));
        if previous.session_key() != self.config().session_key() {
            self.inner.client.invalidate(&previous);
        }
    }

    /// Install a new schedule list, re-arm timers, and persist it. The
    /// in-memory change stands even if persisting fails.
    fn commit_schedules(
        &self,
        scheduler: &mut Scheduler,
        schedules: Vec<Schedule>,
    ) -> Result<(), CoreError> {
        self.inner.schedules.send_replace(Arc::new(schedules));
        let snapshot = self.schedules_snapshot();
        scheduler.rebuild(&snapshot);
        let saved = self.inner.persistence.save_schedules(&snapshot);
        self.inner
            .schedules_unsaved
            .store(saved.is_err(), Ordering::Release);
        saved
    }

    /// Swap in a schedule list read from persistence when it differs from
    /// the live one, re-arming the timers. Skipped while a save is pending.
    fn install_reloaded(&self, scheduler: &mut Scheduler, schedules: Vec<Schedule>) -> bool {
        if self.inner.schedules_unsaved.load(Ordering::Acquire) {
            debug!("schedule changes not yet persisted, skipping reload");
            return false;
        }
        if *self.schedules_snapshot() == schedules {
            return false;
        }
        info!(schedules = schedules.len(), "persisted schedules changed, re-arming timers");
        self.inner.schedules.send_replace(Arc::new(schedules));
        scheduler.rebuild(&self.schedules_snapshot());
        true
    }

    /// Pick up schedule edits made while asleep, then re-arm from the
    /// current clock.
    fn handle_wake(&self, scheduler: &mut Scheduler) {
        let reloaded = match self.inner.persistence.load_schedules() {
            Ok(schedules) => self.install_reloaded(scheduler, schedules),
            Err(e) => {
                warn!(error = %e, "could not re-read schedules on wake");
                false
            }
        };
        if !reloaded {
            scheduler.rebuild(&self.schedules_snapshot());
        }
    }

    /// Start the toggles for a live fire event. The task joins `in_flight`,
    /// which the owner drains before it exits, so `shutdown` waits for it.
    fn handle_fire(
        &self,
        scheduler: &mut Scheduler,
        in_flight: &mut JoinSet<()>,
        event: FireEvent,
    ) {
        if !scheduler.accept(&event) {
            debug!(
                generation = event.generation,
                current = scheduler.generation(),
                "dropping stale fire event"
            );
            return;
        }
        let controller = self.clone();
        in_flight.spawn(async move {
            if let Err(e) = controller.apply_edge(event.schedule_id, event.edge).await {
                warn!(error = %e, "scheduled edge could not be applied");
            }
        });
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Serializes every state mutation and owns the scheduler.
async fn owner_task(
    controller: Controller,
    mut rx: mpsc::Receiver<CommandEnvelope>,
    mut wake_rx: broadcast::Receiver<WakeEvent>,
    cancel: CancellationToken,
) {
    let (fire_tx, mut fire_rx) = mpsc::unbounded_channel();
    let mut scheduler = Scheduler::new(Arc::clone(&controller.inner.clock), fire_tx);
    scheduler.rebuild(&controller.schedules_snapshot());
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = controller.apply(&mut scheduler, envelope.command);
                let _ = envelope.response_tx.send(result);
            }
            Some(event) = fire_rx.recv() => {
                controller.handle_fire(&mut scheduler, &mut in_flight, event);
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    error!(error = %e, "scheduled edge task panicked");
                }
            }
            wake = wake_rx.recv() => match wake {
                Ok(event) => {
                    info!(?event, "wake detected, re-arming timers");
                    controller.handle_wake(&mut scheduler);
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "wake events coalesced");
                    controller.handle_wake(&mut scheduler);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    // Commands sent from here on fail with `ControllerStopped`.
    drop(rx);
    scheduler.teardown();
    if !in_flight.is_empty() {
        debug!(pending = in_flight.len(), "waiting for scheduled LED toggles");
    }
    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "scheduled edge task panicked");
        }
    }
    debug!("owner task stopped");
}

/// Refresh once after `startup_delay`, then every `interval`.
async fn refresh_task(
    controller: Controller,
    startup_delay: Duration,
    interval: Duration,
    cancel: CancellationToken,
) {
    tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        () = tokio::time::sleep(startup_delay) => {}
    }
    let _ = controller.refresh_devices().await;

    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let _ = controller.refresh_devices().await;
            }
        }
    }
}

/// Re-read the persisted schedules every `interval`, so edits made by
/// other processes reach the armed timers.
async fn reload_task(controller: Controller, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = controller.reload_schedules().await {
                    warn!(error = %e, "schedule reload failed");
                }
            }
        }
    }
}
