//! Timer-driven anchoring.
//!
//! The scheduler is a tokio task that calls [`Kernel::trigger_anchor_cycle`]
//! once per interval. Manual triggers go straight to the kernel and share the
//! same exclusivity, so a tick that lands during a manual cycle is a no-op.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::cycle::CycleOutcome;
use crate::kernel::Kernel;

/// Spawns the periodic anchor task.
pub struct AnchorScheduler;

impl AnchorScheduler {
    /// Start ticking at the kernel's configured `anchor_interval`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(kernel: Arc<Kernel>) -> SchedulerHandle {
        let interval = kernel.config().anchor_interval;
        Self::spawn_with_interval(kernel, interval)
    }

    /// Start ticking every `period`. The first tick fires one period from now.
    pub fn spawn_with_interval(kernel: Arc<Kernel>, period: Duration) -> SchedulerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run(kernel, period, stop_rx));
        tracing::info!(interval_ms = period.as_millis() as u64, "anchor scheduler started");
        SchedulerHandle { stop_tx, task }
    }
}

/// Handle to a running scheduler.
///
/// Dropping the handle stops the scheduler after any in-flight cycle.
pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Cancel future ticks. A cycle already running is left to finish.
    pub fn stop(&self) {
        // Err only if the task already exited.
        let _ = self.stop_tx.send(true);
    }

    /// Stop and wait for the task to exit.
    pub async fn shutdown(self) {
        self.stop();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "anchor scheduler task failed");
        }
    }

    /// Whether the scheduler task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

async fn run(kernel: Arc<Kernel>, period: Duration, mut stop_rx: watch::Receiver<bool>) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                tick(&kernel).await;
            }
        }
    }

    tracing::info!("anchor scheduler stopped");
}

/// One scheduled cycle. Never propagates an error or a panic.
async fn tick(kernel: &Arc<Kernel>) {
    let kernel = Arc::clone(kernel);
    let cycle = tokio::spawn(async move { kernel.trigger_anchor_cycle().await });

    match cycle.await {
        Ok(Ok(CycleOutcome::Busy)) => {
            tracing::debug!("scheduled tick skipped; cycle in flight");
        }
        Ok(Ok(CycleOutcome::Ran(report))) => {
            tracing::debug!(
                built = report.built.map(|b| b.sequence),
                anchored = report.anchored.len(),
                failed = report.failed.len(),
                deferred = report.deferred.len(),
                "scheduled anchor cycle finished"
            );
        }
        Ok(Err(e)) if e.is_integrity_violation() => {
            tracing::error!(error = %e, "chain integrity violation during scheduled cycle");
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "scheduled anchor cycle failed");
        }
        Err(e) => {
            tracing::error!(error = %e, "scheduled anchor cycle panicked");
        }
    }
}
