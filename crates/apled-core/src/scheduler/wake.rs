// Wake sources
//
// Tokio timers sleep on the monotonic clock, which stops while the machine
// is suspended. Anything that can notice a resume (a platform hook, the
// CLI, or the clock-jump monitor below) publishes a `WakeEvent` so the
// owner can rebuild its timers against the wall clock.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::clock::Clock;

const WAKE_CHANNEL_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeEvent {
    /// The system resumed from sleep.
    SystemWake,
    /// The display woke.
    DisplayWake,
    /// Wall-clock time moved by `drift_secs` more than monotonic time did.
    ClockJump { drift_secs: i64 },
}

/// Fan-out point for wake events. Cloning shares the channel.
#[derive(Debug, Clone)]
pub struct WakeNotifier {
    tx: broadcast::Sender<WakeEvent>,
}

impl Default for WakeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl WakeNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(WAKE_CHANNEL_SIZE);
        Self { tx }
    }

    /// Subscribe; dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<WakeEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Returns the number of subscribers reached.
    pub fn notify(&self, event: WakeEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }
}

/// Compare wall and monotonic progress over one sampling period.
///
/// Returns the drift when the wall clock either ran ahead by more than
/// `threshold` or went backwards.
pub fn detect_clock_jump(
    wall_elapsed: TimeDelta,
    mono_elapsed: Duration,
    threshold: Duration,
) -> Option<TimeDelta> {
    let mono = TimeDelta::from_std(mono_elapsed).unwrap_or(TimeDelta::MAX);
    let threshold = TimeDelta::from_std(threshold).unwrap_or(TimeDelta::MAX);
    let drift = wall_elapsed - mono;

    if wall_elapsed < TimeDelta::zero() || drift > threshold {
        Some(drift)
    } else {
        None
    }
}

/// Samples both clocks on a fixed cadence and reports jumps as wake events.
pub struct ClockJumpMonitor {
    clock: Arc<dyn Clock>,
    notifier: WakeNotifier,
    interval: Duration,
    threshold: Duration,
}

impl ClockJumpMonitor {
    pub fn new(
        clock: Arc<dyn Clock>,
        notifier: WakeNotifier,
        interval: Duration,
        threshold: Duration,
    ) -> Self {
        Self {
            clock,
            notifier,
            interval,
            threshold,
        }
    }

    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        let mut last_wall = self.clock.now();
        let mut last_mono = Instant::now();

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let wall = self.clock.now();
                    let mono = Instant::now();
                    if let Some(drift) = detect_clock_jump(
                        wall - last_wall,
                        mono.duration_since(last_mono),
                        self.threshold,
                    ) {
                        info!(drift_secs = drift.num_seconds(), "wall clock jumped, treating as wake");
                        self.notifier.notify(WakeEvent::ClockJump {
                            drift_secs: drift.num_seconds(),
                        });
                    }
                    last_wall = wall;
                    last_mono = mono;
                }
            }
        }
        debug!("clock jump monitor stopped");
    }
}
