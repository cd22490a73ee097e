//! Weather sample sources
//!
//! Implementations of [`wardrobe_core::WeatherSampleSource`]: an HTTP client
//! for OpenWeather historical data and a deterministic simulator for local
//! runs and tests.

pub mod openweather;
pub mod simulator;

pub use openweather::*;
pub use simulator::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Provider rejected credentials")]
    Unauthorized,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

pub type WeatherResult<T> = Result<T, WeatherError>;

/// Sort by timestamp and drop duplicate instants, keeping the first
pub(crate) fn normalize_series(
    mut samples: Vec<wardrobe_core::WeatherSample>,
) -> Vec<wardrobe_core::WeatherSample> {
    samples.sort_by_key(|s| s.timestamp);
    samples.dedup_by_key(|s| s.timestamp);
    samples
}
