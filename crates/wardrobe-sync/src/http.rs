//! JSON-over-HTTP remote document store
//!
//! Documents live at `{base}/owners/{owner}/outfits/{id}`.

use crate::{SyncError, SyncResult};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;
use wardrobe_core::{OutfitWeatherRecord, RemoteChangeFeed, RemoteSync, Timestamp};

pub struct HttpDocumentStore {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpDocumentStore {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> SyncResult<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(SyncError::InvalidBaseUrl(base_url.to_string()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    fn collection_url(&self, owner_id: &str) -> SyncResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["owners", owner_id, "outfits"]);
        Ok(url)
    }

    fn document_url(&self, owner_id: &str, outfit_id: &str) -> SyncResult<Url> {
        let mut url = self.collection_url(owner_id)?;
        url.path_segments_mut()
            .map_err(|_| SyncError::InvalidBaseUrl(self.base_url.to_string()))?
            .push(outfit_id);
        Ok(url)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn check(resp: reqwest::Response) -> SyncResult<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Err(SyncError::Status { status, body })
    }

    /// Write one document, replacing the remote copy
    #[instrument(skip(self, record), fields(outfit_id = %record.id))]
    pub async fn put_outfit(&self, record: &OutfitWeatherRecord) -> SyncResult<()> {
        let url = self.document_url(&record.owner_id, &record.id)?;
        let resp = self
            .authorize(self.client.put(url))
            .json(record)
            .send()
            .await?;
        Self::check(resp).await?;

        debug!("Pushed outfit {} (updated_at={})", record.id, record.updated_at);
        Ok(())
    }

    /// Documents of `owner_id` modified after `since`
    #[instrument(skip(self))]
    pub async fn list_changes(
        &self,
        owner_id: &str,
        since: Timestamp,
    ) -> SyncResult<Vec<OutfitWeatherRecord>> {
        let mut url = self.collection_url(owner_id)?;
        url.query_pairs_mut()
            .append_pair("updatedSince", &since.to_string());

        let resp = self.authorize(self.client.get(url)).send().await?;
        let records: Vec<OutfitWeatherRecord> = Self::check(resp).await?.json().await?;

        debug!("Fetched {} remote changes since {}", records.len(), since);
        Ok(records)
    }
}

#[async_trait::async_trait]
impl RemoteSync for HttpDocumentStore {
    async fn push(&self, record: &OutfitWeatherRecord) -> anyhow::Result<()> {
        Ok(self.put_outfit(record).await?)
    }
}

#[async_trait::async_trait]
impl RemoteChangeFeed for HttpDocumentStore {
    async fn changes_since(
        &self,
        owner_id: &str,
        since: Timestamp,
    ) -> anyhow::Result<Vec<OutfitWeatherRecord>> {
        Ok(self.list_changes(owner_id, since).await?)
    }
}
