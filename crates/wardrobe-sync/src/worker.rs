//! Fire-and-forget push of locally updated records

use crate::{SyncError, SyncReceiver, SyncResult};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wardrobe_core::{OutfitStore, OutfitWeatherRecord, RemoteSync};

/// Push one record and clear its sync flag.
///
/// Returns false when the local copy changed during the push and still needs
/// another round.
pub async fn push_record(
    store: &dyn OutfitStore,
    remote: &dyn RemoteSync,
    record: &OutfitWeatherRecord,
) -> SyncResult<bool> {
    remote
        .push(record)
        .await
        .map_err(|e| SyncError::Propagation {
            outfit_id: record.id.clone(),
            message: format!("{:#}", e),
        })?;

    let cleared = store.mark_synced(&record.id, record.updated_at).await?;
    if !cleared {
        debug!("Outfit {} changed during push, leaving flagged", record.id);
    }
    Ok(cleared)
}

/// Drains the sync channel and pushes each record to the remote store
pub struct PushWorker {
    store: Arc<dyn OutfitStore>,
    remote: Arc<dyn RemoteSync>,
}

impl PushWorker {
    pub fn new(store: Arc<dyn OutfitStore>, remote: Arc<dyn RemoteSync>) -> Self {
        Self { store, remote }
    }

    /// Run until the channel closes or `cancel` fires
    pub async fn run(self, mut rx: SyncReceiver, cancel: CancellationToken) {
        info!("Push worker started");

        loop {
            let record = tokio::select! {
                _ = cancel.cancelled() => break,
                received = rx.recv() => match received {
                    Some(record) => record,
                    None => break,
                },
            };

            // failures stay flagged for the unsynced sweep
            if let Err(e) = push_record(self.store.as_ref(), self.remote.as_ref(), &record).await {
                warn!(outfit_id = %record.id, error = %e, "Remote push failed");
            }
        }

        info!("Push worker stopped");
    }
}
