//! Collaborator trait implementations backed by [`DbClient`]

use anyhow::Result;
use wardrobe_core::{OutfitStore, OutfitWeatherRecord, PendingOutfitSource, Timestamp};

use crate::DbClient;

#[async_trait::async_trait]
impl PendingOutfitSource for DbClient {
    async fn list_pending_outfits(
        &self,
        owner_id: &str,
        now: Timestamp,
    ) -> Result<Vec<OutfitWeatherRecord>> {
        Ok(DbClient::list_pending_outfits(self, owner_id, now).await?)
    }
}

#[async_trait::async_trait]
impl OutfitStore for DbClient {
    async fn get_outfit(&self, id: &str) -> Result<Option<OutfitWeatherRecord>> {
        Ok(DbClient::get_outfit(self, id).await?)
    }

    async fn update_outfit(&self, record: &OutfitWeatherRecord) -> Result<()> {
        Ok(DbClient::update_outfit(self, record).await?)
    }

    async fn save_weather(
        &self,
        record: &OutfitWeatherRecord,
        expected_updated_at: Timestamp,
    ) -> Result<bool> {
        Ok(DbClient::save_weather(self, record, expected_updated_at).await?)
    }

    async fn mark_pending_sync(&self, id: &str) -> Result<()> {
        Ok(DbClient::mark_pending_sync(self, id).await?)
    }

    async fn list_pending_sync(&self, owner_id: &str) -> Result<Vec<OutfitWeatherRecord>> {
        Ok(DbClient::list_pending_sync(self, owner_id).await?)
    }

    async fn mark_synced(&self, id: &str, updated_at: Timestamp) -> Result<bool> {
        Ok(DbClient::mark_synced(self, id, updated_at).await?)
    }
}
