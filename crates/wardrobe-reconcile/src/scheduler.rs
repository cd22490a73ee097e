//! Periodic reconciliation for one signed-in owner

use crate::Reconciler;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use wardrobe_core::Timestamp;

/// Source of the current time in epoch seconds
pub type Clock = Arc<dyn Fn() -> Timestamp + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(|| chrono::Utc::now().timestamp())
}

/// Runs reconciliation passes on a fixed period.
///
/// Passes never overlap: each one is awaited before the next tick is taken.
pub struct Scheduler {
    reconciler: Arc<Reconciler>,
    owner_id: String,
    period: Duration,
    clock: Clock,
}

impl Scheduler {
    pub fn new(reconciler: Arc<Reconciler>, owner_id: impl Into<String>, period: Duration) -> Self {
        Self {
            reconciler,
            owner_id: owner_id.into(),
            period,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Run passes until `cancel` fires; returns the number of completed passes.
    ///
    /// The first pass starts immediately.
    pub async fn run(&self, cancel: CancellationToken) -> u64 {
        info!(
            "Scheduler started for {} (period {:?})",
            self.owner_id, self.period
        );

        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut passes = 0;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let now = (self.clock)();
            let pass = self.reconciler.run_pass(&self.owner_id, now);
            tokio::select! {
                _ = cancel.cancelled() => break,
                result = pass => {
                    passes += 1;
                    if let Err(e) = result {
                        // Continue running despite errors
                        error!(error = %e, "Reconciliation pass failed");
                    }
                }
            }
        }

        info!("Scheduler stopped after {} passes", passes);
        passes
    }

    /// Start a session task tied to `parent`
    pub fn spawn(self, parent: &CancellationToken) -> SessionHandle {
        let cancel = parent.child_token();
        let token = cancel.clone();
        let task = tokio::spawn(async move { self.run(token).await });
        SessionHandle { cancel, task }
    }
}

/// A running scheduler session; stopping it ends the owner's reconciliation
pub struct SessionHandle {
    cancel: CancellationToken,
    task: JoinHandle<u64>,
}

impl SessionHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the session and wait for the in-flight pass to unwind
    pub async fn stop(self) -> u64 {
        self.cancel.cancel();
        match self.task.await {
            Ok(passes) => passes,
            Err(e) => {
                error!(error = %e, "Scheduler task ended abnormally");
                0
            }
        }
    }
}
