#![allow(clippy::unwrap_used)]
// Integration tests for the `Controller` state owner, against a wiremock
// controller and in-memory collaborators.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, body_string, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use apled_api::{ControllerClient, ControllerConfig, TransportConfig};
use apled_core::{
    Clock, Controller, CoreError, DayOfWeek, Edge, FixedClock, MacAddress, MemoryPersistence,
    MemoryVault, Persistence, RuntimeSettings, Schedule, ScheduleRule, SystemClock, Vault,
    WakeEvent,
};

// ── Helpers ─────────────────────────────────────────────────────────

struct Harness {
    server: MockServer,
    client: Arc<ControllerClient>,
    controller: Controller,
    persistence: Arc<MemoryPersistence>,
    config: ControllerConfig,
}

async fn harness() -> Harness {
    harness_with_clock(Arc::new(SystemClock)).await
}

async fn harness_with_clock(clock: Arc<dyn Clock>) -> Harness {
    let server = MockServer::start().await;
    let client = Arc::new(ControllerClient::new(&TransportConfig::default()).unwrap());
    let persistence = Arc::new(MemoryPersistence::default());
    let controller = Controller::builder(Arc::clone(&client))
        .settings(RuntimeSettings::oneshot())
        .clock(clock)
        .persistence(persistence.clone())
        .build();
    let config = ControllerConfig::new(Url::parse(&server.uri()).unwrap())
        .with_credentials("admin", SecretString::from("pw".to_string()));

    controller.start().await.unwrap();
    controller.set_config(config.clone()).await.unwrap();

    Harness {
        server,
        client,
        controller,
        persistence,
        config,
    }
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/proxy/network/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "TOKEN=abc; Path=/")
                .insert_header("x-csrf-token", "csrf-1"),
        )
        .mount(server)
        .await;
}

async fn mount_devices(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/proxy/network/api/s/default/stat/device"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "_id": "ap1", "mac": "AA:BB:CC:00:00:01", "type": "uap", "name": "Hall", "state": 1 },
                { "_id": "ap2", "mac": "aa:bb:cc:00:00:02", "type": "uap", "name": "Den", "state": 1 }
            ]
        })))
        .mount(server)
        .await;
}

fn weekday_rule() -> ScheduleRule {
    ScheduleRule::new(DayOfWeek::Monday, 7 * 3600, 22 * 3600).unwrap()
}

fn local(day: u32, hour: u32, min: u32, sec: u32) -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2024, 1, day, hour, min, sec)
        .single()
        .unwrap()
}

/// A controller with no HTTP traffic of its own, sharing `persistence`.
fn offline_controller(
    persistence: Arc<dyn Persistence>,
    settings: RuntimeSettings,
    clock: Arc<dyn Clock>,
) -> Controller {
    let client = Arc::new(ControllerClient::new(&TransportConfig::default()).unwrap());
    Controller::builder(client)
        .settings(settings)
        .clock(clock)
        .persistence(persistence)
        .build()
}

/// Wednesday 2024-01-03 10:00 local.
fn wednesday_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(local(3, 10, 0, 0)))
}

/// Saves fail while `fail_saves` is set; everything else is in memory.
#[derive(Default)]
struct FlakyPersistence {
    inner: MemoryPersistence,
    fail_saves: AtomicBool,
}

impl Persistence for FlakyPersistence {
    fn save_config(&self, config: &ControllerConfig) -> Result<(), CoreError> {
        self.inner.save_config(config)
    }

    fn load_config(&self) -> Result<ControllerConfig, CoreError> {
        self.inner.load_config()
    }

    fn save_schedules(&self, schedules: &[Schedule]) -> Result<(), CoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(CoreError::Persistence {
                message: "disk full".into(),
            });
        }
        self.inner.save_schedules(schedules)
    }

    fn load_schedules(&self) -> Result<Vec<Schedule>, CoreError> {
        self.inner.load_schedules()
    }
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn commands_require_a_running_owner() {
    let client = Arc::new(ControllerClient::new(&TransportConfig::default()).unwrap());
    let controller = Controller::builder(client)
        .settings(RuntimeSettings::oneshot())
        .build();

    let err = controller
        .upsert_schedule(Schedule::new("early"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ControllerStopped));

    controller.start().await.unwrap();
    controller.upsert_schedule(Schedule::new("live")).await.unwrap();
    controller.shutdown().await;

    let err = controller.rebuild_timers().await.unwrap_err();
    assert!(matches!(err, CoreError::ControllerStopped));
    assert!(matches!(
        controller.start().await,
        Err(CoreError::ControllerStopped)
    ));
}

// ── Schedules ───────────────────────────────────────────────────────

#[tokio::test]
async fn schedule_mutations_rearm_and_persist() {
    let h = harness().await;

    let mut schedule = Schedule::new("Evenings");
    schedule.rules.push(weekday_rule());
    let schedule = h.controller.upsert_schedule(schedule).await.unwrap();

    assert_eq!(h.controller.armed_timers().await.unwrap().len(), 2);
    assert_eq!(h.persistence.load_schedules().unwrap(), vec![schedule.clone()]);

    h.controller
        .set_schedule_enabled(schedule.id, false)
        .await
        .unwrap();
    assert!(h.controller.armed_timers().await.unwrap().is_empty());
    assert!(!h.persistence.load_schedules().unwrap()[0].enabled);

    h.controller
        .set_schedule_enabled(schedule.id, true)
        .await
        .unwrap();
    let mut edited = h.controller.schedule(schedule.id).unwrap();
    edited
        .rules
        .push(ScheduleRule::new(DayOfWeek::Saturday, 9 * 3600, 9 * 3600).unwrap());
    h.controller.upsert_schedule(edited).await.unwrap();
    assert_eq!(h.controller.schedules_snapshot().len(), 1);
    assert_eq!(h.controller.armed_timers().await.unwrap().len(), 4);

    h.controller.delete_schedule(schedule.id).await.unwrap();
    assert!(h.controller.schedules_snapshot().is_empty());
    assert!(h.controller.armed_timers().await.unwrap().is_empty());
    assert!(h.persistence.load_schedules().unwrap().is_empty());

    h.controller.shutdown().await;
}

#[tokio::test]
async fn unknown_schedule_is_reported() {
    let h = harness().await;
    let id = uuid::Uuid::new_v4();

    assert!(matches!(
        h.controller.delete_schedule(id).await,
        Err(CoreError::ScheduleNotFound { .. })
    ));
    assert!(matches!(
        h.controller.set_schedule_enabled(id, true).await,
        Err(CoreError::ScheduleNotFound { .. })
    ));
    h.controller.shutdown().await;
}

#[tokio::test]
async fn invalid_rules_are_rejected() {
    let h = harness().await;

    let mut schedule = Schedule::new("Broken");
    schedule.rules.push(ScheduleRule {
        id: uuid::Uuid::new_v4(),
        day: DayOfWeek::Monday,
        on_time: 90_000,
        off_time: 0,
    });
    assert!(matches!(
        h.controller.upsert_schedule(schedule).await,
        Err(CoreError::ValidationFailed { .. })
    ));
    assert!(h.controller.schedules_snapshot().is_empty());
    h.controller.shutdown().await;
}

// ── Devices ─────────────────────────────────────────────────────────

#[tokio::test]
async fn refresh_installs_and_failure_keeps_previous_list() {
    let h = harness().await;
    mount_login(&h.server).await;
    mount_devices(&h.server).await;

    assert_eq!(h.controller.refresh_devices().await.unwrap(), 2);
    assert_eq!(h.controller.devices_snapshot().len(), 2);
    assert_eq!(h.controller.find_device("aa:bb:cc:00:00:01").unwrap().device_id, "ap1");
    assert_eq!(h.controller.find_device("ap2").unwrap().name, "Den");
    assert!(matches!(
        h.controller.find_device("nope"),
        Err(CoreError::DeviceNotFound { .. })
    ));

    h.server.reset().await;
    mount_login(&h.server).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&h.server)
        .await;

    assert!(h.controller.refresh_devices().await.is_err());
    assert_eq!(h.controller.devices_snapshot().len(), 2);
    h.controller.shutdown().await;
}

#[tokio::test]
async fn fleet_toggle_then_refreshes() {
    let h = harness().await;
    mount_login(&h.server).await;
    mount_devices(&h.server).await;
    Mock::given(method("POST"))
        .and(path("/proxy/network/api/s/default/set/setting/mgmt"))
        .and(body_json(json!({ "led_enabled": true })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&h.server)
        .await;

    h.controller.set_all_leds(true).await.unwrap();
    assert_eq!(h.controller.devices_snapshot().len(), 2);
    h.controller.shutdown().await;
}

// ── Schedule edges ──────────────────────────────────────────────────

#[tokio::test]
async fn edge_toggles_matched_devices_and_tolerates_failures() {
    let h = harness().await;
    mount_login(&h.server).await;
    mount_devices(&h.server).await;
    Mock::given(method("PUT"))
        .and(path("/proxy/network/api/s/default/rest/device/ap1"))
        .and(body_json(json!({ "led_override": "off" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex("/rest/device/ap2$"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&h.server)
        .await;

    h.controller.refresh_devices().await.unwrap();

    let mut schedule = Schedule::new("Bedtime");
    schedule.assignments = vec![
        MacAddress::new("aa:bb:cc:00:00:01"),
        MacAddress::new("AA:BB:CC:00:00:02"),
        MacAddress::new("aa:bb:cc:00:00:99"),
    ];
    schedule.rules.push(weekday_rule());
    let schedule = h.controller.upsert_schedule(schedule).await.unwrap();

    let applied = h.controller.apply_edge(schedule.id, Edge::Off).await.unwrap();
    assert_eq!(applied, 1);
    h.controller.shutdown().await;
}

#[tokio::test]
async fn edge_without_matches_is_a_no_op() {
    let h = harness().await;

    let mut schedule = Schedule::new("Nobody");
    schedule.assignments = vec![MacAddress::new("aa:bb:cc:00:00:99")];
    let schedule = h.controller.upsert_schedule(schedule).await.unwrap();

    assert_eq!(h.controller.apply_edge(schedule.id, Edge::On).await.unwrap(), 0);
    assert!(h.server.received_requests().await.unwrap().is_empty());
    h.controller.shutdown().await;
}

// ── Config & credentials ────────────────────────────────────────────

#[tokio::test]
async fn persisted_state_picks_up_the_vault_password() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/proxy/network/api/auth/login"))
        .and(body_string(r#"{"username":"ops","password":"from-vault"}"#))
        .respond_with(ResponseTemplate::new(200).append_header("set-cookie", "TOKEN=v; Path=/"))
        .expect(1)
        .mount(&server)
        .await;
    mount_devices(&server).await;

    let config = ControllerConfig::new(Url::parse(&server.uri()).unwrap())
        .with_credentials("ops", SecretString::from(String::new()));
    let persistence = Arc::new(MemoryPersistence::default());
    persistence.save_config(&config).unwrap();
    let mut schedule = Schedule::new("Saved");
    schedule.rules.push(weekday_rule());
    persistence.save_schedules(&[schedule]).unwrap();

    let vault = Arc::new(MemoryVault::default());
    vault
        .save(&config.account_key(), &SecretString::from("from-vault".to_string()))
        .unwrap();

    let client = Arc::new(ControllerClient::new(&TransportConfig::default()).unwrap());
    let controller = Controller::builder(client)
        .settings(RuntimeSettings::oneshot())
        .persistence(persistence)
        .vault(vault)
        .build();
    controller.start().await.unwrap();
    controller.load_persisted_state().await.unwrap();

    assert_eq!(controller.schedules_snapshot().len(), 1);
    assert_eq!(controller.armed_timers().await.unwrap().len(), 2);
    assert_eq!(controller.refresh_devices().await.unwrap(), 2);
    controller.shutdown().await;
}

#[tokio::test]
async fn changing_the_account_drops_the_old_session() {
    let h = harness().await;
    mount_login(&h.server).await;

    h.client.ensure_authenticated(&h.config).await.unwrap();
    assert!(h.client.has_session(&h.config));

    let other = h
        .config
        .clone()
        .with_credentials("someone-else", SecretString::from("x".to_string()));
    h.controller.set_config(other).await.unwrap();

    assert!(!h.client.has_session(&h.config));
    assert_eq!(h.persistence.load_config().unwrap().username, "someone-else");
    h.controller.shutdown().await;
}

#[tokio::test]
async fn refresh_for_a_replaced_account_is_dropped() {
    let h = harness().await;
    mount_login(&h.server).await;
    Mock::given(method("GET"))
        .and(path("/proxy/network/api/s/default/stat/device"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "data": [{ "_id": "ap1", "mac": "aa:bb:cc:00:00:01", "type": "uap" }]
                }))
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&h.server)
        .await;

    let controller = h.controller.clone();
    let refresh = tokio::spawn(async move { controller.refresh_devices().await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let other = h
        .config
        .clone()
        .with_credentials("someone-else", SecretString::from("x".to_string()));
    h.controller.set_config(other).await.unwrap();

    assert_eq!(refresh.await.unwrap().unwrap(), 0);
    assert!(h.controller.devices_snapshot().is_empty());
    h.controller.shutdown().await;
}

// ── Owner task ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn wake_replans_from_the_current_clock() {
    let clock = wednesday_clock();
    let controller = offline_controller(
        Arc::new(MemoryPersistence::default()),
        RuntimeSettings::oneshot(),
        clock.clone(),
    );
    controller.start().await.unwrap();

    let mut schedule = Schedule::new("Midday");
    schedule
        .rules
        .push(ScheduleRule::new(DayOfWeek::Wednesday, 11 * 3600, 12 * 3600).unwrap());
    controller.upsert_schedule(schedule).await.unwrap();

    let timers = controller.armed_timers().await.unwrap();
    assert_eq!(timers[0].edge, Edge::On);
    assert_eq!(timers[0].next_fire, local(3, 11, 0, 0));

    // Asleep through the on edge.
    clock.set(local(3, 11, 30, 0));
    controller
        .wake_notifier()
        .notify(WakeEvent::ClockJump { drift_secs: 5400 });

    let mut timers = Vec::new();
    for _ in 0..100 {
        timers = controller.armed_timers().await.unwrap();
        if timers[0].edge == Edge::Off {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(timers[0].edge, Edge::Off);
    assert_eq!(timers[0].next_fire, local(3, 12, 0, 0));
    assert_eq!(timers[1].edge, Edge::On);
    assert_eq!(timers[1].next_fire, local(10, 11, 0, 0));

    // The re-armed off edge is half an hour out; once it fires the listing
    // is a full week ahead.
    tokio::time::sleep(Duration::from_secs(2 * 3600)).await;
    let timers = controller.armed_timers().await.unwrap();
    assert_eq!(timers[0].next_fire, local(10, 11, 0, 0));
    assert_eq!(timers[1].next_fire, local(10, 12, 0, 0));
    controller.shutdown().await;
}

#[tokio::test]
async fn armed_timer_toggles_assigned_devices() {
    // One second before the Monday 07:00 on edge.
    let clock = Arc::new(FixedClock::new(local(8, 6, 59, 59)));
    let h = harness_with_clock(clock).await;
    mount_login(&h.server).await;
    mount_devices(&h.server).await;
    Mock::given(method("PUT"))
        .and(path("/proxy/network/api/s/default/rest/device/ap1"))
        .and(body_json(json!({ "led_override": "on" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&h.server)
        .await;

    h.controller.refresh_devices().await.unwrap();
    let mut schedule = Schedule::new("Mornings");
    schedule.assignments = vec![MacAddress::new("aa:bb:cc:00:00:01")];
    schedule.rules.push(weekday_rule());
    h.controller.upsert_schedule(schedule).await.unwrap();

    let mut methods = Vec::new();
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        methods = h
            .server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path().contains("/device"))
            .map(|r| r.method.as_str().to_owned())
            .collect();
        if methods.len() >= 3 {
            break;
        }
    }
    // Initial refresh, the toggle, then the follow-up refresh.
    assert_eq!(methods, vec!["GET", "PUT", "GET"]);

    let timers = h.controller.armed_timers().await.unwrap();
    assert_eq!(timers[0].edge, Edge::Off);
    assert_eq!(timers[1].next_fire, local(15, 7, 0, 0));
    h.controller.shutdown().await;
}

#[tokio::test]
async fn shutdown_waits_for_a_started_toggle() {
    let clock = Arc::new(FixedClock::new(local(8, 6, 59, 59)));
    let h = harness_with_clock(clock).await;
    mount_login(&h.server).await;
    mount_devices(&h.server).await;
    Mock::given(method("PUT"))
        .and(path("/proxy/network/api/s/default/rest/device/ap1"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .expect(1)
        .mount(&h.server)
        .await;

    h.controller.refresh_devices().await.unwrap();
    let mut schedule = Schedule::new("Mornings");
    schedule.assignments = vec![MacAddress::new("aa:bb:cc:00:00:01")];
    schedule.rules.push(weekday_rule());
    h.controller.upsert_schedule(schedule).await.unwrap();

    // The edge fires after one second; stop while its PUT is outstanding.
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let stopping = std::time::Instant::now();
    h.controller.shutdown().await;
    assert!(stopping.elapsed() >= Duration::from_millis(250));
}

// ── Schedule reload ─────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn running_controller_picks_up_edits_from_another_process() {
    let persistence: Arc<dyn Persistence> = Arc::new(MemoryPersistence::default());
    let daemon = offline_controller(
        Arc::clone(&persistence),
        RuntimeSettings {
            schedule_reload_interval: Duration::from_secs(5),
            ..RuntimeSettings::oneshot()
        },
        wednesday_clock(),
    );
    let cli = offline_controller(
        Arc::clone(&persistence),
        RuntimeSettings::oneshot(),
        wednesday_clock(),
    );
    daemon.start().await.unwrap();
    daemon.load_persisted_state().await.unwrap();
    cli.start().await.unwrap();
    cli.load_persisted_state().await.unwrap();

    let mut schedule = Schedule::new("Evenings");
    schedule.rules.push(weekday_rule());
    let schedule = cli.upsert_schedule(schedule).await.unwrap();
    assert!(daemon.armed_timers().await.unwrap().is_empty());

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(daemon.schedules_snapshot().as_slice(), [schedule.clone()]);
    assert_eq!(daemon.armed_timers().await.unwrap().len(), 2);

    cli.set_schedule_enabled(schedule.id, false).await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(!daemon.schedules_snapshot()[0].enabled);
    assert!(daemon.armed_timers().await.unwrap().is_empty());

    cli.shutdown().await;
    daemon.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn wake_rereads_persisted_schedules() {
    let persistence: Arc<dyn Persistence> = Arc::new(MemoryPersistence::default());
    let daemon = offline_controller(
        Arc::clone(&persistence),
        RuntimeSettings::oneshot(),
        wednesday_clock(),
    );
    let cli = offline_controller(
        Arc::clone(&persistence),
        RuntimeSettings::oneshot(),
        wednesday_clock(),
    );
    daemon.start().await.unwrap();
    cli.start().await.unwrap();

    let mut schedule = Schedule::new("Evenings");
    schedule.rules.push(weekday_rule());
    cli.upsert_schedule(schedule).await.unwrap();
    assert_eq!(persistence.load_schedules().unwrap().len(), 1);

    daemon.wake_notifier().notify(WakeEvent::SystemWake);
    for _ in 0..100 {
        if !daemon.schedules_snapshot().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(daemon.schedules_snapshot().len(), 1);
    assert_eq!(daemon.armed_timers().await.unwrap().len(), 2);

    cli.shutdown().await;
    daemon.shutdown().await;
}

#[tokio::test]
async fn reload_keeps_unsaved_changes() {
    let persistence = Arc::new(FlakyPersistence::default());
    let controller = offline_controller(
        persistence.clone(),
        RuntimeSettings::oneshot(),
        wednesday_clock(),
    );
    controller.start().await.unwrap();

    persistence.fail_saves.store(true, Ordering::SeqCst);
    let err = controller
        .upsert_schedule(Schedule::new("Unsaved"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Persistence { .. }));
    assert!(!controller.reload_schedules().await.unwrap());
    assert_eq!(controller.schedules_snapshot().len(), 1);

    persistence.fail_saves.store(false, Ordering::SeqCst);
    controller.upsert_schedule(Schedule::new("Saved")).await.unwrap();
    assert!(!controller.reload_schedules().await.unwrap());
    assert_eq!(controller.schedules_snapshot().len(), 2);
    assert_eq!(persistence.load_schedules().unwrap().len(), 2);
    controller.shutdown().await;
}

#[tokio::test]
async fn reload_reports_whether_anything_changed() {
    let h = harness().await;
    assert!(!h.controller.reload_schedules().await.unwrap());

    let mut schedule = Schedule::new("Written elsewhere");
    schedule.rules.push(weekday_rule());
    h.persistence.save_schedules(&[schedule]).unwrap();

    assert!(h.controller.reload_schedules().await.unwrap());
    assert_eq!(h.controller.armed_timers().await.unwrap().len(), 2);
    assert!(!h.controller.reload_schedules().await.unwrap());
    h.controller.shutdown().await;
}
