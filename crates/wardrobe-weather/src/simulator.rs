//! Simulated weather source for local runs and testing

use crate::normalize_series;
use wardrobe_core::{
    GeoPoint, HourlyGrid, PrecipitationUnit, Timestamp, WeatherSample, WeatherSampleSource,
};

const CONDITIONS: [(&str, &str, f64); 5] = [
    ("clear sky", "01d", 0.0),
    ("few clouds", "02d", 0.0),
    ("scattered clouds", "03d", 0.0),
    ("broken clouds", "04d", 0.0),
    ("light rain", "10d", 0.6),
];

/// Simulator source that generates deterministic synthetic samples
#[derive(Debug, Clone)]
pub struct SimulatedWeatherSource {
    base_temp: f64,
    history_start: Option<Timestamp>,
}

impl SimulatedWeatherSource {
    pub fn new() -> Self {
        Self {
            base_temp: 15.0, // 15°C base temperature
            history_start: None,
        }
    }

    /// Drop points before `start`, like a provider with a limited history
    pub fn with_history_start(mut self, start: Timestamp) -> Self {
        self.history_start = Some(start);
        self
    }

    fn generate_sample(&self, location: GeoPoint, timestamp: Timestamp) -> WeatherSample {
        let hour_of_day = timestamp.rem_euclid(86_400) / 3600;
        // warmest mid-afternoon, coolest before dawn
        let diurnal = ((hour_of_day as f64 - 9.0) / 24.0 * std::f64::consts::TAU).sin() * 5.0;
        let latitude_offset = -(location.latitude.abs() / 10.0);

        let slot = (timestamp.div_euclid(3 * 3600) + location.longitude.round() as i64)
            .rem_euclid(CONDITIONS.len() as i64) as usize;
        let (description, icon, precipitation) = CONDITIONS[slot];

        WeatherSample {
            timestamp,
            temperature: self.base_temp + diurnal + latitude_offset,
            description: description.to_string(),
            icon: icon.to_string(),
            wind_speed: 2.0 + (timestamp.rem_euclid(7 * 3600) / 3600) as f64 * 0.5,
            precipitation,
            precipitation_unit: PrecipitationUnit::Millimeters,
        }
    }
}

impl Default for SimulatedWeatherSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl WeatherSampleSource for SimulatedWeatherSource {
    fn name(&self) -> &str {
        "simulator"
    }

    async fn fetch_samples(
        &self,
        location: GeoPoint,
        grid: &HourlyGrid,
    ) -> anyhow::Result<Vec<WeatherSample>> {
        let samples = grid
            .iter()
            .filter(|t| self.history_start.map_or(true, |start| *t >= start))
            .map(|t| self.generate_sample(location, t))
            .collect();

        Ok(normalize_series(samples))
    }
}
