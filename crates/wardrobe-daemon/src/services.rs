//! Construction of the daemon's collaborators from configuration

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;
use wardrobe_config::{AppConfig, WeatherProvider};
use wardrobe_core::WeatherSampleSource;
use wardrobe_db::DbClient;
use wardrobe_sync::{
    create_sync_channel, ChangeListener, ChangePoller, HttpDocumentStore, PushWorker, SyncSender,
    Sweeper,
};
use wardrobe_weather::{OpenWeatherSource, SimulatedWeatherSource, DEFAULT_BASE_URL};

/// Select the weather provider named in the configuration
pub fn weather_source(config: &AppConfig) -> Result<Arc<dyn WeatherSampleSource>> {
    let source: Arc<dyn WeatherSampleSource> = match config.weather_provider() {
        WeatherProvider::OpenWeather => {
            let api_key = config.weather_api_key()?;
            let base_url = config.weather_base_url().unwrap_or(DEFAULT_BASE_URL);
            // leave headroom under the reconciler's fetch timeout
            let grid_budget = config.fetch_timeout().mul_f64(0.8);
            Arc::new(
                OpenWeatherSource::new(base_url, api_key, config.fetch_timeout())
                    .context("Failed to create OpenWeather client")?
                    .with_grid_budget(grid_budget),
            )
        }
        WeatherProvider::Simulator => Arc::new(SimulatedWeatherSource::new()),
    };

    info!("Weather provider: {}", source.name());
    Ok(source)
}

/// Background sync tasks and the sender the reconciler pushes into
pub struct SyncTasks {
    pub sender: SyncSender,
    tasks: Vec<JoinHandle<()>>,
}

impl SyncTasks {
    pub async fn join(self) {
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

/// Start push, sweep and change-polling tasks when a remote store is configured
pub async fn start_sync(
    config: &AppConfig,
    db: Arc<DbClient>,
    owner_id: &str,
    cancel: &CancellationToken,
) -> Result<Option<SyncTasks>> {
    let Some(base_url) = config.sync_base_url() else {
        info!("No sync base URL configured, remote sync disabled");
        return Ok(None);
    };

    let remote = Arc::new(
        HttpDocumentStore::new(base_url, config.sync_token(), config.fetch_timeout())
            .context("Failed to create remote document store client")?,
    );

    // resume polling from the newest local write
    let since = db
        .latest_update(owner_id)
        .await
        .context("Failed to read latest local update")?
        .unwrap_or(0);

    let (sender, rx) = create_sync_channel(config.queue_capacity());
    let (change_tx, change_rx) = mpsc::channel(config.queue_capacity());

    let worker = PushWorker::new(db.clone(), remote.clone());
    let sweeper = Sweeper::new(db.clone(), remote.clone(), owner_id, config.sweep_period());
    let poller =
        ChangePoller::new(remote, owner_id, config.poll_period()).with_since(since);
    let listener = ChangeListener::new(db, owner_id);

    let tasks = vec![
        tokio::spawn(worker.run(rx, cancel.clone())),
        tokio::spawn(sweeper.run(cancel.clone())),
        tokio::spawn(poller.run(change_tx, cancel.clone())),
        tokio::spawn(listener.run(change_rx, cancel.clone())),
    ];

    info!("Remote sync enabled: {}", base_url);
    Ok(Some(SyncTasks { sender, tasks }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(toml_src: &str) -> AppConfig {
        toml::from_str(toml_src).unwrap()
    }

    #[test]
    fn test_default_provider_is_simulator() {
        let source = weather_source(&AppConfig::default()).unwrap();
        assert_eq!(source.name(), "simulator");
    }

    #[test]
    fn test_openweather_requires_key() {
        let cfg = config("[weather]\nprovider = \"openweather\"");
        assert!(weather_source(&cfg).is_err());

        let cfg = config("[weather]\nprovider = \"openweather\"\napi_key = \"k\"");
        assert_eq!(weather_source(&cfg).unwrap().name(), "openweather");
    }

    #[tokio::test]
    async fn test_sync_disabled_without_url() {
        let db = Arc::new(DbClient::in_memory().await.unwrap());
        let cancel = CancellationToken::new();

        let tasks = start_sync(&AppConfig::default(), db, "alice", &cancel)
            .await
            .unwrap();
        assert!(tasks.is_none());
    }

    #[tokio::test]
    async fn test_sync_tasks_stop_on_cancel() {
        let db = Arc::new(DbClient::in_memory().await.unwrap());
        let cancel = CancellationToken::new();
        let cfg = config("[sync]\nbase_url = \"http://127.0.0.1:9/\"\npoll_period_secs = 3600\nsweep_period_secs = 3600");

        let tasks = start_sync(&cfg, db, "alice", &cancel)
            .await
            .unwrap()
            .unwrap();
        cancel.cancel();
        tasks.join().await;
    }
}
