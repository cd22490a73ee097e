use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_ENV: &str = "WARDROBE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "wardrobe.toml";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://wardrobe.db";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionConfig {
    pub owner_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeatherProvider {
    OpenWeather,
    #[default]
    Simulator,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WeatherConfig {
    pub provider: Option<WeatherProvider>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub fetch_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReconcileConfig {
    pub period_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SyncConfig {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub sweep_period_secs: Option<u64>,
    pub poll_period_secs: Option<u64>,
    pub queue_capacity: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub session: Option<SessionConfig>,
    pub database: Option<DatabaseConfig>,
    pub weather: Option<WeatherConfig>,
    pub reconcile: Option<ReconcileConfig>,
    pub sync: Option<SyncConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
    #[error("Invalid setting {0}: must be greater than zero")]
    NonPositive(&'static str),
}

impl AppConfig {
    /// Load configuration from WARDROBE_CONFIG path (TOML) if present, then
    /// apply environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut cfg = Self::load_from(&path)?;
        cfg.apply_env(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject durations and capacities that cannot drive a timer or channel
    pub fn validate(&self) -> Result<(), ConfigError> {
        let weather = self.weather.as_ref();
        let reconcile = self.reconcile.as_ref();
        let sync = self.sync.as_ref();

        let checks = [
            (
                "weather.fetch_timeout_secs",
                weather.and_then(|w| w.fetch_timeout_secs),
            ),
            ("reconcile.period_secs", reconcile.and_then(|r| r.period_secs)),
            ("sync.sweep_period_secs", sync.and_then(|s| s.sweep_period_secs)),
            ("sync.poll_period_secs", sync.and_then(|s| s.poll_period_secs)),
            (
                "sync.queue_capacity",
                sync.and_then(|s| s.queue_capacity).map(|c| c as u64),
            ),
        ];
        for (name, value) in checks {
            if value == Some(0) {
                return Err(ConfigError::NonPositive(name));
            }
        }
        Ok(())
    }

    /// Read a TOML file; a missing file yields defaults
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(AppConfig::default());
        }
        let s = fs::read_to_string(path)?;
        Ok(toml::from_str::<AppConfig>(&s)?)
    }

    /// Override settings from environment-style lookups
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(owner_id) = lookup("WARDROBE_OWNER_ID") {
            self.session.get_or_insert_with(Default::default).owner_id = Some(owner_id);
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.get_or_insert_with(Default::default).url = Some(url);
        }
        if let Some(api_key) = lookup("OPENWEATHER_API_KEY") {
            self.weather.get_or_insert_with(Default::default).api_key = Some(api_key);
        }
        if let Some(base_url) = lookup("WARDROBE_SYNC_URL") {
            self.sync.get_or_insert_with(Default::default).base_url = Some(base_url);
        }
        if let Some(token) = lookup("WARDROBE_SYNC_TOKEN") {
            self.sync.get_or_insert_with(Default::default).token = Some(token);
        }
    }

    /// Signed-in owner; reconciliation has nothing to do without one
    pub fn owner_id(&self) -> Result<&str, ConfigError> {
        self.session
            .as_ref()
            .and_then(|s| s.owner_id.as_deref())
            .ok_or(ConfigError::Missing("session.owner_id"))
    }

    pub fn database_url(&self) -> String {
        self.database
            .as_ref()
            .and_then(|d| d.url.clone())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
    }

    pub fn weather_provider(&self) -> WeatherProvider {
        self.weather
            .as_ref()
            .and_then(|w| w.provider)
            .unwrap_or_default()
    }

    /// OpenWeather API key (required for the openweather provider)
    pub fn weather_api_key(&self) -> Result<&str, ConfigError> {
        self.weather
            .as_ref()
            .and_then(|w| w.api_key.as_deref())
            .ok_or(ConfigError::Missing("weather.api_key"))
    }

    pub fn weather_base_url(&self) -> Option<&str> {
        self.weather.as_ref().and_then(|w| w.base_url.as_deref())
    }

    pub fn fetch_timeout(&self) -> Duration {
        let secs = self
            .weather
            .as_ref()
            .and_then(|w| w.fetch_timeout_secs)
            .unwrap_or(10);
        Duration::from_secs(secs)
    }

    pub fn reconcile_period(&self) -> Duration {
        let secs = self
            .reconcile
            .as_ref()
            .and_then(|r| r.period_secs)
            .unwrap_or(60);
        Duration::from_secs(secs)
    }

    /// Remote store base URL; sync is disabled when unset
    pub fn sync_base_url(&self) -> Option<&str> {
        self.sync.as_ref().and_then(|s| s.base_url.as_deref())
    }

    pub fn sync_token(&self) -> Option<String> {
        self.sync.as_ref().and_then(|s| s.token.clone())
    }

    pub fn sweep_period(&self) -> Duration {
        let secs = self
            .sync
            .as_ref()
            .and_then(|s| s.sweep_period_secs)
            .unwrap_or(300);
        Duration::from_secs(secs)
    }

    pub fn poll_period(&self) -> Duration {
        let secs = self
            .sync
            .as_ref()
            .and_then(|s| s.poll_period_secs)
            .unwrap_or(60);
        Duration::from_secs(secs)
    }

    pub fn queue_capacity(&self) -> usize {
        self.sync
            .as_ref()
            .and_then(|s| s.queue_capacity)
            .unwrap_or(64)
            .max(1)
    }
}
