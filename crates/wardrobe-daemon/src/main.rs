//! Wardrobe daemon - weather reconciliation for a signed-in owner
//!
//! This binary coordinates:
//! - Periodic reconciliation of finished outfits against a weather provider
//! - Fire-and-forget push of updated outfits to the remote document store
//! - Last-write-wins merge of remote changes into the local store

mod services;

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use wardrobe_config::AppConfig;
use wardrobe_db::DbClient;
use wardrobe_reconcile::{Reconciler, Scheduler};

#[tokio::main]
async fn main() -> Result<()> {
    wardrobe_obs::init("wardrobed");

    info!("Starting wardrobe daemon");

    let config = AppConfig::load().context("Failed to load configuration")?;
    let owner_id = config.owner_id()?.to_string();
    info!("Loaded configuration for owner {}", owner_id);

    let db = DbClient::new(&config.database_url())
        .await
        .context("Failed to open database")?;
    db.init_schema().await.context("Failed to create schema")?;
    db.ping().await.context("Database ping failed")?;
    let db = Arc::new(db);
    info!("Database ready");

    let weather = services::weather_source(&config)?;
    let shutdown = CancellationToken::new();

    let sync = services::start_sync(&config, db.clone(), &owner_id, &shutdown).await?;

    let mut reconciler = Reconciler::new(db.clone(), weather, db.clone())
        .with_fetch_timeout(config.fetch_timeout());
    if let Some(sync) = &sync {
        reconciler = reconciler.with_sync(sync.sender.clone());
    }

    let session = Scheduler::new(Arc::new(reconciler), &owner_id, config.reconcile_period())
        .spawn(&shutdown);

    info!("Daemon running - press Ctrl+C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    shutdown.cancel();
    let passes = session.stop().await;
    if let Some(sync) = sync {
        sync.join().await;
    }

    info!("Wardrobe daemon stopped after {} passes", passes);
    Ok(())
}
