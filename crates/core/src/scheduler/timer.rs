//! Scheduler implementation.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{watch, Notify};
use tracing::{debug, error, info};

use crate::config::SchedulerConfig;
use crate::metrics;

use super::types::{remaining_until, SchedulePhase, SchedulerError};

/// Work run when a schedule fires.
pub type FireCallback = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Arms one-shot timers against the wall clock.
#[derive(Debug, Clone)]
pub struct Scheduler {
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.config.tick_interval_ms.max(1))
    }

    /// Arm `callback` to run once at `target`.
    ///
    /// Must be called from within a tokio runtime. A target that is not
    /// strictly in the future is rejected and nothing is armed.
    pub fn arm(
        &self,
        target: DateTime<Utc>,
        callback: FireCallback,
    ) -> Result<ScheduleHandle, SchedulerError> {
        let now = Utc::now();
        if target <= now {
            return Err(SchedulerError::InputInvalid(format!(
                "scheduled instant {} is not in the future",
                target.to_rfc3339()
            )));
        }

        let phase = Arc::new(Mutex::new(SchedulePhase::Armed));
        let wake = Arc::new(Notify::new());
        let (countdown_tx, countdown_rx) = watch::channel(remaining_until(target));

        let handle = ScheduleHandle {
            target,
            phase: Arc::clone(&phase),
            wake: Arc::clone(&wake),
            countdown: countdown_rx,
        };

        let tick = self.tick_interval();
        tokio::spawn(async move {
            loop {
                let left = remaining_until(target);
                let _ = countdown_tx.send(left);
                if left.is_zero() {
                    break;
                }

                tokio::select! {
                    _ = wake.notified() => {}
                    _ = tokio::time::sleep(left.min(tick)) => {}
                }

                if *lock(&phase) != SchedulePhase::Armed {
                    debug!("Schedule for {} stopped before firing", target);
                    return;
                }
            }

            {
                let mut current = lock(&phase);
                if *current != SchedulePhase::Armed {
                    return;
                }
                *current = SchedulePhase::Firing;
            }

            info!("Schedule for {} firing", target);
            metrics::SCHEDULER_EVENTS.with_label_values(&["fired"]).inc();
            // A panicking callback must not leave the schedule stuck in Firing.
            let run = AssertUnwindSafe(async move { callback().await }).catch_unwind();
            if run.await.is_err() {
                error!("Schedule callback for {} panicked", target);
            }
            *lock(&phase) = SchedulePhase::Fired;
        });

        metrics::SCHEDULER_EVENTS.with_label_values(&["armed"]).inc();
        info!(
            "Armed schedule for {} ({} from now)",
            target,
            super::format_countdown(remaining_until(target))
        );

        Ok(handle)
    }
}

fn lock(phase: &Mutex<SchedulePhase>) -> std::sync::MutexGuard<'_, SchedulePhase> {
    phase.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to an armed schedule. Clones share the same schedule.
#[derive(Debug, Clone)]
pub struct ScheduleHandle {
    target: DateTime<Utc>,
    phase: Arc<Mutex<SchedulePhase>>,
    wake: Arc<Notify>,
    countdown: watch::Receiver<Duration>,
}

impl ScheduleHandle {
    pub fn target(&self) -> DateTime<Utc> {
        self.target
    }

    pub fn phase(&self) -> SchedulePhase {
        *lock(&self.phase)
    }

    pub fn is_armed(&self) -> bool {
        self.phase() == SchedulePhase::Armed
    }

    /// Time left before firing; zero unless still armed.
    pub fn remaining(&self) -> Duration {
        if self.is_armed() {
            remaining_until(self.target)
        } else {
            Duration::ZERO
        }
    }

    /// Receiver updated with the remaining time on every tick.
    pub fn countdown(&self) -> watch::Receiver<Duration> {
        self.countdown.clone()
    }

    /// Cancel the schedule.
    ///
    /// Returns true if this call prevented the callback from running, false
    /// if the schedule had already fired, started firing, or been cancelled.
    pub fn cancel(&self) -> bool {
        {
            let mut current = lock(&self.phase);
            if *current != SchedulePhase::Armed {
                return false;
            }
            *current = SchedulePhase::Cancelled;
        }

        self.wake.notify_one();
        metrics::SCHEDULER_EVENTS
            .with_label_values(&["cancelled"])
            .inc();
        info!("Cancelled schedule for {}", self.target);
        true
    }
}
