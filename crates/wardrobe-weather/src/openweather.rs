//! OpenWeather One Call "timemachine" client: one request per grid point

use crate::{normalize_series, WeatherError, WeatherResult};
use futures::stream::{self, StreamExt};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};
use url::Url;
use wardrobe_core::{
    GeoPoint, HourlyGrid, PrecipitationUnit, Timestamp, WeatherSample, WeatherSampleSource,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// Time allowed for a whole grid before returning what has arrived
pub const DEFAULT_GRID_BUDGET: Duration = Duration::from_secs(8);

/// Point requests in flight at once
pub const MAX_CONCURRENT_POINTS: usize = 4;

#[derive(Debug, Deserialize)]
struct TimeMachineResponse {
    #[serde(default)]
    data: Vec<TimeMachinePoint>,
}

#[derive(Debug, Deserialize)]
struct TimeMachinePoint {
    dt: i64,
    temp: f64,
    #[serde(default)]
    wind_speed: f64,
    #[serde(default)]
    weather: Vec<Condition>,
    rain: Option<HourlyAmount>,
    snow: Option<HourlyAmount>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct HourlyAmount {
    #[serde(rename = "1h", default)]
    one_hour: f64,
}

impl TimeMachinePoint {
    fn into_sample(self) -> Option<WeatherSample> {
        let condition = self.weather.into_iter().next()?;
        let precipitation = self.rain.map_or(0.0, |r| r.one_hour)
            + self.snow.map_or(0.0, |s| s.one_hour);

        Some(WeatherSample {
            timestamp: self.dt,
            temperature: self.temp,
            description: condition.description,
            icon: condition.icon,
            wind_speed: self.wind_speed.max(0.0),
            precipitation: precipitation.max(0.0),
            precipitation_unit: PrecipitationUnit::Millimeters,
        })
    }
}

/// Historical hourly weather from OpenWeather
#[derive(Debug, Clone)]
pub struct OpenWeatherSource {
    client: Client,
    endpoint: Url,
    api_key: String,
    grid_budget: Duration,
}

impl OpenWeatherSource {
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout: Duration) -> WeatherResult<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(WeatherError::ConfigError("missing OpenWeather API key".into()));
        }

        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join("data/3.0/onecall/timemachine")?;

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            grid_budget: DEFAULT_GRID_BUDGET,
        })
    }

    /// Bound on a whole grid fetch; keep it below any caller timeout so
    /// partial coverage is returned instead of discarded
    pub fn with_grid_budget(mut self, grid_budget: Duration) -> Self {
        self.grid_budget = grid_budget;
        self
    }

    fn point_url(&self, location: GeoPoint, dt: Timestamp) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("lat", &location.latitude.to_string())
            .append_pair("lon", &location.longitude.to_string())
            .append_pair("dt", &dt.to_string())
            .append_pair("units", "metric")
            .append_pair("appid", &self.api_key);
        url
    }

    /// Fetch one hourly point.
    ///
    /// `Ok(None)` means the provider has no data for that instant.
    #[instrument(skip(self))]
    pub async fn fetch_point(
        &self,
        location: GeoPoint,
        dt: Timestamp,
    ) -> WeatherResult<Option<WeatherSample>> {
        let resp = self.client.get(self.point_url(location, dt)).send().await?;
        let status = resp.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(WeatherError::Unauthorized);
        }
        if status.is_client_error() {
            // out of the provider's history window
            debug!("No data for dt={} ({})", dt, status);
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(WeatherError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TimeMachineResponse = resp
            .json()
            .await
            .map_err(|e| WeatherError::InvalidResponse(e.to_string()))?;

        let sample = parsed
            .data
            .into_iter()
            .next()
            .and_then(TimeMachinePoint::into_sample);
        if sample.is_none() {
            warn!("Response for dt={} carried no usable conditions", dt);
        }
        Ok(sample)
    }

    /// Fetch every grid point, a few at a time.
    ///
    /// Points still outstanding when the grid budget runs out are dropped and
    /// the samples collected so far are returned.
    pub async fn fetch_grid(
        &self,
        location: GeoPoint,
        grid: &HourlyGrid,
    ) -> WeatherResult<Vec<WeatherSample>> {
        let deadline = Instant::now() + self.grid_budget;
        let mut points = stream::iter(grid.iter())
            .map(|dt| self.fetch_point(location, dt))
            .buffered(MAX_CONCURRENT_POINTS);

        let mut samples = Vec::with_capacity(grid.len());
        loop {
            match tokio::time::timeout_at(deadline, points.next()).await {
                Ok(Some(point)) => samples.extend(point?),
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        "Grid budget of {:?} exhausted, keeping {} of {} points",
                        self.grid_budget,
                        samples.len(),
                        grid.len()
                    );
                    break;
                }
            }
        }

        debug!(
            "Fetched {} of {} hourly samples",
            samples.len(),
            grid.len()
        );
        Ok(normalize_series(samples))
    }
}

#[async_trait::async_trait]
impl WeatherSampleSource for OpenWeatherSource {
    fn name(&self) -> &str {
        "openweather"
    }

    async fn fetch_samples(
        &self,
        location: GeoPoint,
        grid: &HourlyGrid,
    ) -> anyhow::Result<Vec<WeatherSample>> {
        Ok(self.fetch_grid(location, grid).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wardrobe_core::generate_grid;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const START: Timestamp = 1_700_000_000;

    fn point_body(dt: Timestamp, temp: f64, description: &str, icon: &str) -> serde_json::Value {
        json!({
            "lat": 52.37,
            "lon": 4.89,
            "timezone": "Europe/Amsterdam",
            "data": [{
                "dt": dt,
                "temp": temp,
                "wind_speed": 4.1,
                "weather": [{ "id": 800, "main": "Clear", "description": description, "icon": icon }]
            }]
        })
    }

    fn source(server: &MockServer) -> OpenWeatherSource {
        OpenWeatherSource::new(&server.uri(), "test-key", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_grid_all_points() {
        let server = MockServer::start().await;
        for (i, temp) in [10.0, 12.0, 11.0].into_iter().enumerate() {
            let dt = START + i as i64 * 3600;
            Mock::given(method("GET"))
                .and(path("/data/3.0/onecall/timemachine"))
                .and(query_param("dt", dt.to_string()))
                .and(query_param("appid", "test-key"))
                .and(query_param("units", "metric"))
                .respond_with(ResponseTemplate::new(200).set_body_json(point_body(
                    dt,
                    temp,
                    "clear sky",
                    "01d",
                )))
                .mount(&server)
                .await;
        }

        let grid = generate_grid(START, START + 9000).unwrap();
        let samples = source(&server)
            .fetch_samples(GeoPoint::new(52.37, 4.89), &grid)
            .await
            .unwrap();

        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].timestamp, START);
        assert_eq!(samples[1].temperature, 12.0);
        assert_eq!(samples[2].description, "clear sky");
        assert!(samples
            .iter()
            .all(|s| s.precipitation_unit == PrecipitationUnit::Millimeters));
    }

    #[tokio::test]
    async fn test_rain_amount_mapped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/3.0/onecall/timemachine"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{
                    "dt": START,
                    "temp": 7.5,
                    "wind_speed": 6.0,
                    "weather": [{ "description": "moderate rain", "icon": "10n" }],
                    "rain": { "1h": 1.8 }
                }]
            })))
            .mount(&server)
            .await;

        let sample = source(&server)
            .fetch_point(GeoPoint::new(0.0, 0.0), START)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sample.precipitation, 1.8);
        assert_eq!(sample.icon, "10n");
    }

    #[tokio::test]
    async fn test_history_gap_is_partial_coverage() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("dt", START.to_string()))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "cod": 400,
                "message": "requested time is out of allowed range"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("dt", (START + 3600).to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(point_body(
                START + 3600,
                9.0,
                "mist",
                "50d",
            )))
            .mount(&server)
            .await;

        let grid = generate_grid(START, START + 7200).unwrap();
        let samples = source(&server)
            .fetch_grid(GeoPoint::new(0.0, 0.0), &grid)
            .await
            .unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].timestamp, START + 3600);
    }

    #[tokio::test]
    async fn test_slow_point_keeps_collected_samples() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("dt", (START + 3600).to_string()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(point_body(START + 3600, 8.0, "fog", "50n"))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(point_body(
                START,
                6.0,
                "mist",
                "50n",
            )))
            .mount(&server)
            .await;

        let grid = generate_grid(START, START + 7200).unwrap();
        let samples = source(&server)
            .with_grid_budget(Duration::from_millis(500))
            .fetch_grid(GeoPoint::new(0.0, 0.0), &grid)
            .await
            .unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].timestamp, START);
        assert_eq!(samples[0].description, "mist");
    }

    #[tokio::test]
    async fn test_points_fetched_concurrently() {
        let server = MockServer::start().await;
        for i in 0..4 {
            let dt = START + i * 3600;
            Mock::given(method("GET"))
                .and(query_param("dt", dt.to_string()))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(point_body(dt, 5.0, "clear sky", "01n"))
                        .set_delay(Duration::from_millis(400)),
                )
                .mount(&server)
                .await;
        }

        // four points at 400ms each only fit the budget when overlapped
        let grid = generate_grid(START, START + 4 * 3600).unwrap();
        let samples = source(&server)
            .with_grid_budget(Duration::from_millis(1200))
            .fetch_grid(GeoPoint::new(0.0, 0.0), &grid)
            .await
            .unwrap();

        assert_eq!(samples.len(), 4);
        assert_eq!(samples[3].timestamp, START + 3 * 3600);
    }

    #[tokio::test]
    async fn test_server_error_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let grid = generate_grid(START, START).unwrap();
        let err = source(&server)
            .fetch_grid(GeoPoint::new(0.0, 0.0), &grid)
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = source(&server)
            .fetch_point(GeoPoint::new(0.0, 0.0), START)
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::Unauthorized));
    }

    #[test]
    fn test_requires_api_key() {
        assert!(matches!(
            OpenWeatherSource::new(DEFAULT_BASE_URL, "", Duration::from_secs(1)),
            Err(WeatherError::ConfigError(_))
        ));
    }

    #[test]
    fn test_endpoint_under_base_path() {
        let src = OpenWeatherSource::new("http://localhost:9000/proxy", "k", Duration::from_secs(1))
            .unwrap();
        let url = src.point_url(GeoPoint::new(1.5, -2.25), 42);
        assert_eq!(url.path(), "/proxy/data/3.0/onecall/timemachine");
        assert!(url.query().unwrap().contains("lat=1.5&lon=-2.25&dt=42"));
    }
}
