// ── Recurring scheduler ──
//
// Every enabled schedule rule arms two weekly timers, one per edge. Timers
// are plain tokio tasks that post `FireEvent`s to the owner; they know
// nothing about devices or the network. A rebuild cancels the whole set
// through one `CancellationToken` and bumps the generation, so an event
// that was already in flight when the rebuild happened can be recognized
// as stale and dropped by the owner.

pub mod clock;
pub mod wake;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::model::{DayOfWeek, Edge, Schedule};

pub use clock::{Clock, FixedClock, SystemClock, next_fire};
pub use wake::{ClockJumpMonitor, WakeEvent, WakeNotifier, detect_clock_jump};

/// Repeat period of every armed timer.
pub const WEEK: Duration = Duration::from_secs(7 * 24 * 3600);

/// Posted by a timer when its edge is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireEvent {
    pub generation: u64,
    pub schedule_id: Uuid,
    pub rule_id: Uuid,
    pub edge: Edge,
}

/// Read-only view of one armed timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArmedTimer {
    pub schedule_id: Uuid,
    pub schedule_name: String,
    pub rule_id: Uuid,
    pub day: DayOfWeek,
    pub edge: Edge,
    pub next_fire: DateTime<Local>,
}

/// Compute the timer set for `schedules` as of `now`, soonest first.
///
/// Disabled schedules and schedules without rules contribute nothing.
pub fn plan_timers(schedules: &[Schedule], now: &DateTime<Local>) -> Vec<ArmedTimer> {
    let mut timers: Vec<ArmedTimer> = schedules
        .iter()
        .filter(|s| s.enabled)
        .flat_map(|schedule| {
            schedule.rules.iter().flat_map(move |rule| {
                Edge::ALL.into_iter().map(move |edge| ArmedTimer {
                    schedule_id: schedule.id,
                    schedule_name: schedule.name.clone(),
                    rule_id: rule.id,
                    day: rule.day,
                    edge,
                    next_fire: next_fire(now, rule.day, rule.time_for(edge)),
                })
            })
        })
        .collect();
    timers.sort_by_key(|t| t.next_fire);
    timers
}

/// Owns the armed timer set. Dropping it cancels every timer.
pub struct Scheduler {
    clock: Arc<dyn Clock>,
    fire_tx: mpsc::UnboundedSender<FireEvent>,
    generation: u64,
    cancel: Option<CancellationToken>,
    timers: Vec<ArmedTimer>,
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock>, fire_tx: mpsc::UnboundedSender<FireEvent>) -> Self {
        Self {
            clock,
            fire_tx,
            generation: 0,
            cancel: None,
            timers: Vec::new(),
        }
    }

    /// Cancel every timer and arm a fresh set for `schedules`.
    ///
    /// Must be called from within a tokio runtime. Returns the new
    /// generation.
    pub fn rebuild(&mut self, schedules: &[Schedule]) -> u64 {
        self.teardown();
        self.generation += 1;

        let now = self.clock.now();
        let cancel = CancellationToken::new();
        let timers = plan_timers(schedules, &now);

        for timer in &timers {
            let delay = (timer.next_fire - now).to_std().unwrap_or_default();
            let event = FireEvent {
                generation: self.generation,
                schedule_id: timer.schedule_id,
                rule_id: timer.rule_id,
                edge: timer.edge,
            };
            tokio::spawn(timer_task(
                Instant::now() + delay,
                event,
                self.fire_tx.clone(),
                cancel.clone(),
            ));
        }

        info!(
            generation = self.generation,
            armed = timers.len(),
            "scheduler timers rebuilt"
        );
        self.cancel = Some(cancel);
        self.timers = timers;
        self.generation
    }

    /// Cancel every timer. Nothing fires afterwards until the next rebuild.
    pub fn teardown(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
            debug!(
                generation = self.generation,
                cancelled = self.timers.len(),
                "scheduler timers cancelled"
            );
        }
        self.timers.clear();
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// `true` if the event belongs to the live timer set.
    ///
    /// On acceptance the matching timer's next fire moves a week out.
    pub fn accept(&mut self, event: &FireEvent) -> bool {
        if self.cancel.is_none() || event.generation != self.generation {
            return false;
        }
        if let Some(timer) = self.timers.iter_mut().find(|t| {
            t.schedule_id == event.schedule_id && t.rule_id == event.rule_id && t.edge == event.edge
        }) {
            if let Ok(week) = chrono::TimeDelta::from_std(WEEK) {
                timer.next_fire += week;
            }
        }
        self.timers.sort_by_key(|t| t.next_fire);
        true
    }

    pub fn armed_timers(&self) -> &[ArmedTimer] {
        &self.timers
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Sleep until `first`, then post `event` every week until cancelled.
async fn timer_task(
    first: Instant,
    event: FireEvent,
    fire_tx: mpsc::UnboundedSender<FireEvent>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(first, WEEK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                debug!(schedule = %event.schedule_id, edge = %event.edge, "timer fired");
                if fire_tx.send(event).is_err() {
                    break;
                }
            }
        }
    }
}
