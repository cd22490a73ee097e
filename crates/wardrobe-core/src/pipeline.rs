use anyhow::Result;

use crate::{GeoPoint, HourlyGrid, OutfitWeatherRecord, Timestamp, WeatherSample};

/// Lists outfits whose worn interval ended without weather attached
#[async_trait::async_trait]
pub trait PendingOutfitSource: Send + Sync {
    async fn list_pending_outfits(
        &self,
        owner_id: &str,
        now: Timestamp,
    ) -> Result<Vec<OutfitWeatherRecord>>;
}

/// Provides weather samples for a location over an hourly grid
///
/// May return fewer samples than grid points.
#[async_trait::async_trait]
pub trait WeatherSampleSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_samples(
        &self,
        location: GeoPoint,
        grid: &HourlyGrid,
    ) -> Result<Vec<WeatherSample>>;
}

#[async_trait::async_trait]
pub trait OutfitStore: Send + Sync {
    async fn get_outfit(&self, id: &str) -> Result<Option<OutfitWeatherRecord>>;

    /// Persist the full record in one write
    async fn update_outfit(&self, record: &OutfitWeatherRecord) -> Result<()>;

    /// Persist attached weather in one write, only if the stored record is
    /// still unfetched and unmodified since `expected_updated_at`.
    ///
    /// Returns false when the record changed in the meantime.
    async fn save_weather(
        &self,
        record: &OutfitWeatherRecord,
        expected_updated_at: Timestamp,
    ) -> Result<bool>;

    async fn mark_pending_sync(&self, id: &str) -> Result<()>;

    async fn list_pending_sync(&self, owner_id: &str) -> Result<Vec<OutfitWeatherRecord>>;

    /// Clear the sync flag unless the record changed after `updated_at`
    async fn mark_synced(&self, id: &str, updated_at: Timestamp) -> Result<bool>;
}

/// Remote document store push
#[async_trait::async_trait]
pub trait RemoteSync: Send + Sync {
    async fn push(&self, record: &OutfitWeatherRecord) -> Result<()>;
}

/// Remote change notifications, polled by owner
#[async_trait::async_trait]
pub trait RemoteChangeFeed: Send + Sync {
    async fn changes_since(
        &self,
        owner_id: &str,
        since: Timestamp,
    ) -> Result<Vec<OutfitWeatherRecord>>;
}
