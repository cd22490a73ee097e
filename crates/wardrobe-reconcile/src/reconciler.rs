//! Per-pass weather reconciliation over collaborator traits

use crate::{ReconcileError, ReconcileResult};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use wardrobe_core::{
    aggregate, generate_grid, AggregateError, OutfitId, OutfitStore, OutfitWeatherRecord,
    PendingOutfitSource, Timestamp, WeatherSampleSource,
};
use wardrobe_sync::SyncSender;

/// Default bound on a single outfit's sample fetch
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of one outfit's unit of work that is not an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutfitOutcome {
    Attached,
    AlreadyCurrent,
    Quarantined,
}

/// Tally of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub attached: usize,
    pub already_current: usize,
    pub no_samples: usize,
    pub transient_failures: usize,
    pub persistence_failures: usize,
    pub permanent_skips: usize,
}

impl PassReport {
    fn record(&mut self, result: &ReconcileResult<OutfitOutcome>) {
        match result {
            Ok(OutfitOutcome::Attached) => self.attached += 1,
            Ok(OutfitOutcome::AlreadyCurrent) => self.already_current += 1,
            Ok(OutfitOutcome::Quarantined) => self.permanent_skips += 1,
            Err(ReconcileError::NoSamplesAvailable(_)) => self.no_samples += 1,
            Err(ReconcileError::FetchTransient { .. }) => self.transient_failures += 1,
            Err(ReconcileError::Persistence { .. }) => self.persistence_failures += 1,
            Err(_) => self.permanent_skips += 1,
        }
    }

    pub fn examined(&self) -> usize {
        self.attached
            + self.already_current
            + self.no_samples
            + self.transient_failures
            + self.persistence_failures
            + self.permanent_skips
    }
}

// Outfit interval that failed grid generation
type IntervalKey = (OutfitId, Timestamp, Timestamp);

pub struct Reconciler {
    pending: Arc<dyn PendingOutfitSource>,
    weather: Arc<dyn WeatherSampleSource>,
    store: Arc<dyn OutfitStore>,
    sync_tx: Option<SyncSender>,
    fetch_timeout: Duration,
    quarantine: Mutex<HashSet<IntervalKey>>,
}

impl Reconciler {
    pub fn new(
        pending: Arc<dyn PendingOutfitSource>,
        weather: Arc<dyn WeatherSampleSource>,
        store: Arc<dyn OutfitStore>,
    ) -> Self {
        Self {
            pending,
            weather,
            store,
            sync_tx: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            quarantine: Mutex::new(HashSet::new()),
        }
    }

    /// Queue updated records for remote push
    pub fn with_sync(mut self, sync_tx: SyncSender) -> Self {
        self.sync_tx = Some(sync_tx);
        self
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// Reconcile every pending outfit of `owner_id`.
    ///
    /// Only a failure to list pending outfits fails the pass; per-outfit
    /// errors are logged and counted in the report.
    #[instrument(skip(self))]
    pub async fn run_pass(&self, owner_id: &str, now: Timestamp) -> ReconcileResult<PassReport> {
        let pending = self
            .pending
            .list_pending_outfits(owner_id, now)
            .await
            .map_err(|e| ReconcileError::PendingQuery(format!("{:#}", e)))?;

        let mut report = PassReport::default();
        for record in pending {
            if record.owner_id != owner_id {
                warn!(outfit_id = %record.id, "Skipping outfit of another owner");
                continue;
            }

            let outfit_id = record.id.clone();
            let result = self.reconcile_outfit(record, now).await;
            match &result {
                Ok(outcome) => debug!(outfit_id = %outfit_id, ?outcome, "Outfit reconciled"),
                Err(e @ ReconcileError::InvalidInterval { .. }) => {
                    error!(outfit_id = %outfit_id, error = %e, "Outfit skipped until its interval is corrected")
                }
                Err(e) if e.is_retryable() => {
                    warn!(outfit_id = %outfit_id, error = %e, "Outfit left pending for the next pass")
                }
                Err(e) => error!(outfit_id = %outfit_id, error = %e, "Outfit reconciliation failed"),
            }
            report.record(&result);
        }

        if report.examined() > 0 {
            info!(
                "Reconciliation pass for {}: {} attached, {} without samples, {} fetch failures, {} persistence failures, {} skipped",
                owner_id,
                report.attached,
                report.no_samples,
                report.transient_failures,
                report.persistence_failures,
                report.permanent_skips
            );
        }
        Ok(report)
    }

    /// Fetch, aggregate, and attach weather for one outfit.
    ///
    /// Nothing is written unless a full aggregate is available.
    #[instrument(skip(self, record), fields(outfit_id = %record.id))]
    pub async fn reconcile_outfit(
        &self,
        record: OutfitWeatherRecord,
        now: Timestamp,
    ) -> ReconcileResult<OutfitOutcome> {
        if !record.is_pending(now) {
            return Ok(OutfitOutcome::AlreadyCurrent);
        }

        let key: IntervalKey = (
            record.id.clone(),
            record.worn_start_time,
            record.worn_end_time,
        );
        if self.quarantine.lock().await.contains(&key) {
            return Ok(OutfitOutcome::Quarantined);
        }

        let grid = match generate_grid(record.worn_start_time, record.worn_end_time) {
            Ok(grid) => grid,
            Err(source) => {
                self.quarantine.lock().await.insert(key);
                return Err(ReconcileError::InvalidInterval {
                    outfit_id: record.id,
                    source,
                });
            }
        };

        let fetch = self.weather.fetch_samples(record.location, &grid);
        let mut samples = match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Ok(Ok(samples)) => samples,
            Ok(Err(e)) => {
                return Err(ReconcileError::FetchTransient {
                    outfit_id: record.id,
                    message: format!("{:#}", e),
                })
            }
            Err(_) => {
                return Err(ReconcileError::FetchTransient {
                    outfit_id: record.id,
                    message: format!(
                        "{} did not respond within {:?}",
                        self.weather.name(),
                        self.fetch_timeout
                    ),
                })
            }
        };

        let returned = samples.len();
        samples.retain(|s| s.timestamp >= grid.start() && s.timestamp <= grid.end());
        if samples.len() < returned {
            debug!(
                outfit_id = %record.id,
                "Dropped {} samples outside the worn interval",
                returned - samples.len()
            );
        }

        if samples.is_empty() {
            return Err(ReconcileError::NoSamplesAvailable(record.id));
        }
        if samples.len() < grid.len() {
            debug!(
                outfit_id = %record.id,
                "Partial coverage: {} of {} hourly samples",
                samples.len(),
                grid.len()
            );
        }

        let weather = aggregate(&samples).map_err(|e| match e {
            AggregateError::EmptyInput => ReconcileError::EmptyInput(record.id.clone()),
            source => ReconcileError::Aggregation {
                outfit_id: record.id.clone(),
                source,
            },
        })?;

        let read_at = record.updated_at;
        let mut updated = record;
        if updated.attach_weather(&weather, now).is_err() {
            return Ok(OutfitOutcome::AlreadyCurrent);
        }

        let saved = self
            .store
            .save_weather(&updated, read_at)
            .await
            .map_err(|e| ReconcileError::Persistence {
                outfit_id: updated.id.clone(),
                message: format!("{:#}", e),
            })?;
        if !saved {
            // changed by another writer since listing; the next pass sees
            // the fresh copy if it still needs weather
            debug!(outfit_id = %updated.id, "Outfit changed during reconciliation, discarding aggregate");
            return Ok(OutfitOutcome::AlreadyCurrent);
        }

        info!(
            outfit_id = %updated.id,
            "Attached weather from {} samples: {:.1}°C, {}",
            weather.sample_count(),
            weather.temperature_avg(),
            weather.most_common_description()
        );

        self.enqueue_sync(updated);
        Ok(OutfitOutcome::Attached)
    }

    fn enqueue_sync(&self, record: OutfitWeatherRecord) {
        let Some(tx) = &self.sync_tx else {
            return;
        };

        match tx.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) => {
                warn!(outfit_id = %record.id, "Sync queue full, leaving outfit for the sweep")
            }
            Err(TrySendError::Closed(record)) => {
                debug!(outfit_id = %record.id, "Sync queue closed, leaving outfit for the sweep")
            }
        }
    }
}
