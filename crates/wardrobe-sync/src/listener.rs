//! Remote change listener with last-write-wins merge
//!
//! A poller feeds remote changes into a channel; the listener applies each
//! one against the local store.

use crate::SyncResult;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use wardrobe_core::{OutfitStore, OutfitWeatherRecord, RemoteChangeFeed, Timestamp};

/// Outcome of merging a remote copy into local state
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Write this record locally
    AcceptRemote(OutfitWeatherRecord),
    /// Local copy wins; `reflag` asks for a push so the remote converges
    KeepLocal { reflag: bool },
}

fn same_content(a: &OutfitWeatherRecord, b: &OutfitWeatherRecord) -> bool {
    let mut a = a.clone();
    let mut b = b.clone();
    a.pending_sync = false;
    b.pending_sync = false;
    a == b
}

/// Last-write-wins merge of a remote copy against the local one.
///
/// Ties go to the local copy. Attached weather is never dropped: a newer
/// remote copy without weather inherits the local weather and is pushed back.
pub fn resolve(local: Option<&OutfitWeatherRecord>, remote: OutfitWeatherRecord) -> Resolution {
    let mut remote = remote;
    remote.pending_sync = false;

    let Some(local) = local else {
        return Resolution::AcceptRemote(remote);
    };

    if remote.updated_at > local.updated_at {
        if local.weather_fetched && !remote.weather_fetched {
            remote.copy_weather_from(local);
            remote.pending_sync = true;
        }
        return Resolution::AcceptRemote(remote);
    }

    let reflag = !local.pending_sync && !same_content(local, &remote);
    Resolution::KeepLocal { reflag }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Accepted,
    KeptLocal,
    Reflagged,
    Ignored,
}

pub struct ChangeListener {
    store: Arc<dyn OutfitStore>,
    owner_id: String,
}

impl ChangeListener {
    pub fn new(store: Arc<dyn OutfitStore>, owner_id: impl Into<String>) -> Self {
        Self {
            store,
            owner_id: owner_id.into(),
        }
    }

    /// Merge one remote change into the local store
    #[instrument(skip(self, remote), fields(outfit_id = %remote.id))]
    pub async fn apply(&self, remote: OutfitWeatherRecord) -> SyncResult<ApplyOutcome> {
        if remote.owner_id != self.owner_id {
            warn!(owner_id = %remote.owner_id, "Ignoring change for another owner");
            return Ok(ApplyOutcome::Ignored);
        }

        let id = remote.id.clone();
        let local = self.store.get_outfit(&id).await?;
        let outcome = match resolve(local.as_ref(), remote) {
            Resolution::AcceptRemote(record) => {
                self.store.update_outfit(&record).await?;
                ApplyOutcome::Accepted
            }
            Resolution::KeepLocal { reflag: true } => {
                self.store.mark_pending_sync(&id).await?;
                ApplyOutcome::Reflagged
            }
            Resolution::KeepLocal { reflag: false } => ApplyOutcome::KeptLocal,
        };

        debug!("Applied remote change: {:?}", outcome);
        Ok(outcome)
    }

    /// Apply changes from `rx` until the channel closes or `cancel` fires
    pub async fn run(
        self,
        mut rx: mpsc::Receiver<OutfitWeatherRecord>,
        cancel: CancellationToken,
    ) {
        info!("Change listener started for {}", self.owner_id);

        loop {
            let remote = tokio::select! {
                _ = cancel.cancelled() => break,
                received = rx.recv() => match received {
                    Some(remote) => remote,
                    None => break,
                },
            };

            let id = remote.id.clone();
            if let Err(e) = self.apply(remote).await {
                warn!(outfit_id = %id, error = %e, "Failed to apply remote change");
            }
        }

        info!("Change listener stopped");
    }
}

/// Polls a [`RemoteChangeFeed`] and forwards changes to a listener channel
pub struct ChangePoller {
    feed: Arc<dyn RemoteChangeFeed>,
    owner_id: String,
    period: Duration,
    since: Timestamp,
}

impl ChangePoller {
    pub fn new(
        feed: Arc<dyn RemoteChangeFeed>,
        owner_id: impl Into<String>,
        period: Duration,
    ) -> Self {
        Self {
            feed,
            owner_id: owner_id.into(),
            period,
            since: 0,
        }
    }

    pub fn with_since(mut self, since: Timestamp) -> Self {
        self.since = since;
        self
    }

    /// Fetch one batch and forward it; returns the number forwarded
    pub async fn poll_once(
        &mut self,
        tx: &mpsc::Sender<OutfitWeatherRecord>,
    ) -> SyncResult<usize> {
        let changes = self.feed.changes_since(&self.owner_id, self.since).await?;
        let mut forwarded = 0;

        for change in changes {
            let updated_at = change.updated_at;
            if tx.send(change).await.is_err() {
                break;
            }
            self.since = self.since.max(updated_at);
            forwarded += 1;
        }

        Ok(forwarded)
    }

    pub async fn run(mut self, tx: mpsc::Sender<OutfitWeatherRecord>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if tx.is_closed() {
                break;
            }

            if let Err(e) = self.poll_once(&tx).await {
                warn!(error = %e, "Remote change poll failed");
            }
        }

        info!("Change poller stopped");
    }
}
