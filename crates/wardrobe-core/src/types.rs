//! Core data types for weather samples and outfit records

use crate::units::PrecipitationUnit;
use serde::{Deserialize, Serialize};

/// Timestamp type (Unix epoch seconds)
pub type Timestamp = i64;

/// Outfit record identifier
pub type OutfitId = String;

/// Owning user identifier
pub type OwnerId = String;

/// Geographic location an outfit was worn at
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One weather observation at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSample {
    /// Unix timestamp of observation
    pub timestamp: Timestamp,

    /// Degrees Celsius
    pub temperature: f64,

    pub description: String,

    pub icon: String,

    /// Meters per second
    pub wind_speed: f64,

    pub precipitation: f64,

    pub precipitation_unit: PrecipitationUnit,
}

/// Summary of one or more weather samples
///
/// Only produced by [`crate::aggregate`]; there is no empty aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedWeather {
    pub(crate) temperature_avg: f64,
    pub(crate) temperature_min: f64,
    pub(crate) temperature_max: f64,
    pub(crate) wind_speed_avg: f64,
    pub(crate) precipitation_avg: f64,
    pub(crate) precipitation_unit: PrecipitationUnit,
    pub(crate) most_common_description: String,
    pub(crate) most_common_icon: String,
    pub(crate) sample_count: usize,
}

impl AggregatedWeather {
    pub fn temperature_avg(&self) -> f64 {
        self.temperature_avg
    }

    pub fn temperature_min(&self) -> f64 {
        self.temperature_min
    }

    pub fn temperature_max(&self) -> f64 {
        self.temperature_max
    }

    pub fn wind_speed_avg(&self) -> f64 {
        self.wind_speed_avg
    }

    pub fn precipitation_avg(&self) -> f64 {
        self.precipitation_avg
    }

    pub fn precipitation_unit(&self) -> PrecipitationUnit {
        self.precipitation_unit
    }

    pub fn most_common_description(&self) -> &str {
        &self.most_common_description
    }

    pub fn most_common_icon(&self) -> &str {
        &self.most_common_icon
    }

    /// Number of samples reduced into this aggregate
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }
}

/// Outfit record error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("Weather already attached to outfit {0}")]
    AlreadyFetched(OutfitId),
}

/// The weather-bearing subset of an outfit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutfitWeatherRecord {
    pub id: OutfitId,

    pub owner_id: OwnerId,

    pub location: GeoPoint,

    pub worn_start_time: Timestamp,

    pub worn_end_time: Timestamp,

    /// Set once, when an aggregate is attached
    pub weather_fetched: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_avg: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_max: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precipitation: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precipitation_unit: Option<PrecipitationUnit>,

    /// Local changes not yet pushed to the remote store
    #[serde(default, skip_serializing)]
    pub pending_sync: bool,

    /// Last modification time, used for last-write-wins
    pub updated_at: Timestamp,
}

impl OutfitWeatherRecord {
    /// Create a record with no weather attached
    pub fn new(
        id: impl Into<OutfitId>,
        owner_id: impl Into<OwnerId>,
        location: GeoPoint,
        worn_start_time: Timestamp,
        worn_end_time: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            location,
            worn_start_time,
            worn_end_time,
            weather_fetched: false,
            temperature_avg: None,
            temperature_min: None,
            temperature_max: None,
            description: None,
            icon_code: None,
            wind_speed: None,
            precipitation: None,
            precipitation_unit: None,
            pending_sync: false,
            updated_at,
        }
    }

    /// Worn interval has ended and no weather is attached yet
    pub fn is_pending(&self, now: Timestamp) -> bool {
        !self.weather_fetched && self.worn_end_time <= now
    }

    /// Copy every aggregate field onto the record and flag it for sync.
    pub fn attach_weather(
        &mut self,
        weather: &AggregatedWeather,
        now: Timestamp,
    ) -> Result<(), RecordError> {
        if self.weather_fetched {
            return Err(RecordError::AlreadyFetched(self.id.clone()));
        }

        self.temperature_avg = Some(weather.temperature_avg);
        self.temperature_min = Some(weather.temperature_min);
        self.temperature_max = Some(weather.temperature_max);
        self.description = Some(weather.most_common_description.clone());
        self.icon_code = Some(weather.most_common_icon.clone());
        self.wind_speed = Some(weather.wind_speed_avg);
        self.precipitation = Some(weather.precipitation_avg);
        self.precipitation_unit = Some(weather.precipitation_unit);
        self.weather_fetched = true;
        self.pending_sync = true;
        self.updated_at = now;
        Ok(())
    }

    /// Copy weather fields from another record of the same outfit.
    pub fn copy_weather_from(&mut self, other: &OutfitWeatherRecord) {
        self.weather_fetched = other.weather_fetched;
        self.temperature_avg = other.temperature_avg;
        self.temperature_min = other.temperature_min;
        self.temperature_max = other.temperature_max;
        self.description = other.description.clone();
        self.icon_code = other.icon_code.clone();
        self.wind_speed = other.wind_speed;
        self.precipitation = other.precipitation;
        self.precipitation_unit = other.precipitation_unit;
    }
}
