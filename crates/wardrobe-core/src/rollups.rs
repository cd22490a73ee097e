//! Reduction of weather samples into an outfit-level summary

use crate::types::{AggregatedWeather, WeatherSample};
use crate::units::{common_precipitation_unit, UnitError};

/// Aggregation error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregateError {
    #[error("No samples to aggregate")]
    EmptyInput,

    #[error(transparent)]
    MixedPrecipitationUnits(#[from] UnitError),
}

/// Running mean/min/max over numeric observations
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.sum += value;
        self.count += 1;
    }

    /// Mean, clamped so rounding never leaves it outside `[min, max]`
    pub fn avg(&self) -> Option<f64> {
        (self.count > 0).then(|| (self.sum / self.count as f64).max(self.min).min(self.max))
    }

    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

/// Occurrence counter for categorical values.
///
/// Ties resolve to the value seen first.
#[derive(Debug, Clone, Default)]
pub struct ModeCounter {
    // (value, count) in first-seen order
    counts: Vec<(String, usize)>,
}

impl ModeCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: &str) {
        match self.counts.iter_mut().find(|(v, _)| v == value) {
            Some((_, count)) => *count += 1,
            None => self.counts.push((value.to_string(), 1)),
        }
    }

    pub fn mode(&self) -> Option<&str> {
        let mut best: Option<&(String, usize)> = None;
        for entry in &self.counts {
            // strict comparison keeps the earliest value on ties
            if best.map_or(true, |b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        best.map(|(value, _)| value.as_str())
    }
}

/// Reduce samples into a single [`AggregatedWeather`].
///
/// Numeric fields use mean/min/max, categorical fields use the stable mode.
/// All samples must share one precipitation unit.
pub fn aggregate(samples: &[WeatherSample]) -> Result<AggregatedWeather, AggregateError> {
    let precipitation_unit =
        common_precipitation_unit(samples.iter().map(|s| s.precipitation_unit))?
            .ok_or(AggregateError::EmptyInput)?;

    let mut temperature = Accumulator::new();
    let mut wind = Accumulator::new();
    let mut precip = Accumulator::new();
    let mut descriptions = ModeCounter::new();
    let mut icons = ModeCounter::new();

    for sample in samples {
        temperature.add(sample.temperature);
        wind.add(sample.wind_speed);
        precip.add(sample.precipitation);
        descriptions.add(&sample.description);
        icons.add(&sample.icon);
    }

    let numeric = |value: Option<f64>| value.ok_or(AggregateError::EmptyInput);
    let categorical = |counter: &ModeCounter| {
        counter
            .mode()
            .map(str::to_string)
            .ok_or(AggregateError::EmptyInput)
    };

    Ok(AggregatedWeather {
        temperature_avg: numeric(temperature.avg())?,
        temperature_min: numeric(temperature.min())?,
        temperature_max: numeric(temperature.max())?,
        wind_speed_avg: numeric(wind.avg())?,
        precipitation_avg: numeric(precip.avg())?,
        precipitation_unit,
        most_common_description: categorical(&descriptions)?,
        most_common_icon: categorical(&icons)?,
        sample_count: temperature.count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::PrecipitationUnit;

    fn sample(temp: f64, wind: f64, precip: f64, desc: &str, icon: &str) -> WeatherSample {
        WeatherSample {
            timestamp: 1_700_000_000,
            temperature: temp,
            description: desc.to_string(),
            icon: icon.to_string(),
            wind_speed: wind,
            precipitation: precip,
            precipitation_unit: PrecipitationUnit::Millimeters,
        }
    }

    #[test]
    fn test_accumulator() {
        let mut acc = Accumulator::new();
        for value in [10.0, 5.0, 15.0, 30.0] {
            acc.add(value);
        }
        assert_eq!(acc.min(), Some(5.0));
        assert_eq!(acc.max(), Some(30.0));
        assert_eq!(acc.avg(), Some(15.0));
        assert_eq!(acc.count(), 4);
    }

    #[test]
    fn test_accumulator_negative_only() {
        let mut acc = Accumulator::new();
        acc.add(-4.0);
        acc.add(-2.0);
        assert_eq!(acc.max(), Some(-2.0));
        assert_eq!(acc.min(), Some(-4.0));
    }

    #[test]
    fn test_accumulator_avg_within_bounds_for_inexact_values() {
        for value in [0.1, 0.7, 1.1, -0.3] {
            let mut acc = Accumulator::new();
            for _ in 0..3 {
                acc.add(value);
            }
            let avg = acc.avg().unwrap();
            assert!(acc.min().unwrap() <= avg, "{} below min", avg);
            assert!(avg <= acc.max().unwrap(), "{} above max", avg);
            assert_eq!(avg, value);
        }
    }

    #[test]
    fn test_accumulator_empty() {
        let acc = Accumulator::new();
        assert_eq!(acc.avg(), None);
        assert_eq!(acc.min(), None);
        assert_eq!(acc.max(), None);
    }

    #[test]
    fn test_mode_tie_prefers_first_seen() {
        let mut counter = ModeCounter::new();
        for value in ["rain", "clear", "rain", "clear"] {
            counter.add(value);
        }
        assert_eq!(counter.mode(), Some("rain"));

        let mut counter = ModeCounter::new();
        for value in ["clear", "rain", "rain", "clear"] {
            counter.add(value);
        }
        assert_eq!(counter.mode(), Some("clear"));
    }

    #[test]
    fn test_mode_majority() {
        let mut counter = ModeCounter::new();
        for value in ["snow", "rain", "rain"] {
            counter.add(value);
        }
        assert_eq!(counter.mode(), Some("rain"));
        assert_eq!(ModeCounter::new().mode(), None);
    }

    #[test]
    fn test_aggregate_scenario() {
        let samples = vec![
            sample(10.0, 2.0, 0.0, "clear", "01d"),
            sample(14.0, 4.0, 0.0, "clear", "01d"),
            sample(8.0, 3.0, 1.0, "rain", "10d"),
        ];

        let agg = aggregate(&samples).unwrap();
        assert!((agg.temperature_avg() - 10.667).abs() < 0.001);
        assert_eq!(agg.temperature_min(), 8.0);
        assert_eq!(agg.temperature_max(), 14.0);
        assert_eq!(agg.wind_speed_avg(), 3.0);
        assert!((agg.precipitation_avg() - 0.333).abs() < 0.001);
        assert_eq!(agg.precipitation_unit(), PrecipitationUnit::Millimeters);
        assert_eq!(agg.most_common_description(), "clear");
        assert_eq!(agg.most_common_icon(), "01d");
        assert_eq!(agg.sample_count(), 3);
    }

    #[test]
    fn test_aggregate_description_tie() {
        let samples = vec![
            sample(1.0, 0.0, 0.0, "rain", "10d"),
            sample(2.0, 0.0, 0.0, "clear", "01d"),
            sample(3.0, 0.0, 0.0, "rain", "10d"),
            sample(4.0, 0.0, 0.0, "clear", "01d"),
        ];
        let agg = aggregate(&samples).unwrap();
        assert_eq!(agg.most_common_description(), "rain");
        assert_eq!(agg.most_common_icon(), "10d");
    }

    #[test]
    fn test_aggregate_deterministic_and_bounded() {
        let samples: Vec<_> = (0..24)
            .map(|h| {
                let temp = -3.5 + (h as f64 * 1.37) % 11.0;
                sample(temp, h as f64 * 0.1, 0.0, "few clouds", "02n")
            })
            .collect();

        let first = aggregate(&samples).unwrap();
        let second = aggregate(&samples).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first.temperature_avg().to_bits(),
            second.temperature_avg().to_bits()
        );
        assert!(first.temperature_min() <= first.temperature_avg());
        assert!(first.temperature_avg() <= first.temperature_max());
    }

    #[test]
    fn test_aggregate_constant_inexact_temperature() {
        let samples = vec![
            sample(0.1, 0.7, 0.1, "drizzle", "09d"),
            sample(0.1, 0.7, 0.1, "drizzle", "09d"),
            sample(0.1, 0.7, 0.1, "drizzle", "09d"),
        ];
        let agg = aggregate(&samples).unwrap();
        assert_eq!(agg.temperature_min(), 0.1);
        assert_eq!(agg.temperature_avg(), 0.1);
        assert_eq!(agg.temperature_max(), 0.1);
        assert_eq!(agg.wind_speed_avg(), 0.7);
    }

    #[test]
    fn test_aggregate_empty() {
        assert_eq!(aggregate(&[]), Err(AggregateError::EmptyInput));
    }

    #[test]
    fn test_aggregate_rejects_mixed_units() {
        let mut forecast = sample(10.0, 1.0, 0.4, "light rain", "10d");
        forecast.precipitation_unit = PrecipitationUnit::Probability;
        let observed = sample(11.0, 1.0, 2.5, "light rain", "10d");

        assert!(matches!(
            aggregate(&[forecast, observed]),
            Err(AggregateError::MixedPrecipitationUnits(_))
        ));
    }
}
