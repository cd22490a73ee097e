//! Database schema for the local outfit table
//!
//! Only the columns the weather pipeline reads or writes live here. Clothing
//! items and outfit metadata belong to other tables.

use crate::{DbError, DbResult};
use sqlx::FromRow;
use wardrobe_core::{GeoPoint, OutfitWeatherRecord, PrecipitationUnit};

/// Outfit table record
#[derive(Debug, Clone, FromRow)]
pub struct OutfitRow {
    pub id: String,
    pub owner_id: String,

    pub latitude: f64,
    pub longitude: f64,

    pub worn_start_time: i64,
    pub worn_end_time: i64,

    pub weather_fetched: bool,

    // Weather fields, NULL until fetched
    pub temperature_avg: Option<f64>,
    pub temperature_min: Option<f64>,
    pub temperature_max: Option<f64>,
    pub description: Option<String>,
    pub icon_code: Option<String>,
    pub wind_speed: Option<f64>,
    pub precipitation: Option<f64>,
    pub precipitation_unit: Option<String>,

    // Sync bookkeeping
    pub pending_sync: bool,
    pub updated_at: i64,
}

impl TryFrom<OutfitRow> for OutfitWeatherRecord {
    type Error = DbError;

    fn try_from(row: OutfitRow) -> DbResult<Self> {
        let precipitation_unit = row
            .precipitation_unit
            .as_deref()
            .map(PrecipitationUnit::parse)
            .transpose()
            .map_err(|e| DbError::InvalidData(format!("outfit {}: {}", row.id, e)))?;

        Ok(OutfitWeatherRecord {
            id: row.id,
            owner_id: row.owner_id,
            location: GeoPoint::new(row.latitude, row.longitude),
            worn_start_time: row.worn_start_time,
            worn_end_time: row.worn_end_time,
            weather_fetched: row.weather_fetched,
            temperature_avg: row.temperature_avg,
            temperature_min: row.temperature_min,
            temperature_max: row.temperature_max,
            description: row.description,
            icon_code: row.icon_code,
            wind_speed: row.wind_speed,
            precipitation: row.precipitation,
            precipitation_unit,
            pending_sync: row.pending_sync,
            updated_at: row.updated_at,
        })
    }
}

impl From<&OutfitWeatherRecord> for OutfitRow {
    fn from(record: &OutfitWeatherRecord) -> Self {
        Self {
            id: record.id.clone(),
            owner_id: record.owner_id.clone(),
            latitude: record.location.latitude,
            longitude: record.location.longitude,
            worn_start_time: record.worn_start_time,
            worn_end_time: record.worn_end_time,
            weather_fetched: record.weather_fetched,
            temperature_avg: record.temperature_avg,
            temperature_min: record.temperature_min,
            temperature_max: record.temperature_max,
            description: record.description.clone(),
            icon_code: record.icon_code.clone(),
            wind_speed: record.wind_speed,
            precipitation: record.precipitation,
            precipitation_unit: record.precipitation_unit.map(|u| u.as_str().to_string()),
            pending_sync: record.pending_sync,
            updated_at: record.updated_at,
        }
    }
}

pub(crate) const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS outfits (
        id TEXT PRIMARY KEY NOT NULL,
        owner_id TEXT NOT NULL,
        latitude REAL NOT NULL,
        longitude REAL NOT NULL,
        worn_start_time INTEGER NOT NULL,
        worn_end_time INTEGER NOT NULL,
        weather_fetched INTEGER NOT NULL DEFAULT 0,
        temperature_avg REAL,
        temperature_min REAL,
        temperature_max REAL,
        description TEXT,
        icon_code TEXT,
        wind_speed REAL,
        precipitation REAL,
        precipitation_unit TEXT,
        pending_sync INTEGER NOT NULL DEFAULT 0,
        updated_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_outfits_weather_pending
        ON outfits (owner_id, weather_fetched, worn_end_time)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_outfits_sync_pending
        ON outfits (owner_id, pending_sync)
    "#,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_conversion() {
        let mut record = OutfitWeatherRecord::new(
            "outfit-1",
            "user-1",
            GeoPoint::new(40.0, -74.0),
            100,
            200,
            100,
        );
        record.precipitation_unit = Some(PrecipitationUnit::Probability);

        let row = OutfitRow::from(&record);
        assert_eq!(row.precipitation_unit.as_deref(), Some("probability"));

        let back = OutfitWeatherRecord::try_from(row).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_row_rejects_unknown_unit() {
        let record =
            OutfitWeatherRecord::new("outfit-1", "user-1", GeoPoint::new(0.0, 0.0), 0, 1, 0);
        let mut row = OutfitRow::from(&record);
        row.precipitation_unit = Some("furlongs".to_string());

        assert!(matches!(
            OutfitWeatherRecord::try_from(row),
            Err(DbError::InvalidData(_))
        ));
    }
}
