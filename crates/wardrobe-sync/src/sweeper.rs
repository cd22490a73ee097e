//! Periodic re-push of records still flagged for sync

use crate::worker::push_record;
use crate::SyncResult;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use wardrobe_core::{OutfitStore, RemoteSync};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub pushed: usize,
    pub failed: usize,
}

/// Push every record of `owner_id` still flagged for sync.
///
/// Individual push failures are counted, not returned.
#[instrument(skip(store, remote))]
pub async fn sweep_unsynced(
    store: &dyn OutfitStore,
    remote: &dyn RemoteSync,
    owner_id: &str,
) -> SyncResult<SweepReport> {
    let pending = store.list_pending_sync(owner_id).await?;
    let mut report = SweepReport::default();

    for record in &pending {
        match push_record(store, remote, record).await {
            Ok(_) => report.pushed += 1,
            Err(e) => {
                warn!(outfit_id = %record.id, error = %e, "Sweep push failed");
                report.failed += 1;
            }
        }
    }

    if !pending.is_empty() {
        info!(
            "Sync sweep for {}: {} pushed, {} failed",
            owner_id, report.pushed, report.failed
        );
    }
    Ok(report)
}

pub struct Sweeper {
    store: Arc<dyn OutfitStore>,
    remote: Arc<dyn RemoteSync>,
    owner_id: String,
    period: Duration,
}

impl Sweeper {
    pub fn new(
        store: Arc<dyn OutfitStore>,
        remote: Arc<dyn RemoteSync>,
        owner_id: impl Into<String>,
        period: Duration,
    ) -> Self {
        Self {
            store,
            remote,
            owner_id: owner_id.into(),
            period,
        }
    }

    /// Sweep immediately, then every `period` until cancelled
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let sweep = sweep_unsynced(self.store.as_ref(), self.remote.as_ref(), &self.owner_id);
            tokio::select! {
                _ = cancel.cancelled() => break,
                result = sweep => {
                    if let Err(e) = result {
                        error!(error = %e, "Sync sweep failed");
                    }
                }
            }
        }

        info!("Sync sweeper stopped");
    }
}
