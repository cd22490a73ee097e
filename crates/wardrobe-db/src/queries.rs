//! Query operations for the outfits table

use crate::schema::OutfitRow;
use crate::{DbClient, DbError, DbResult};
use tracing::{debug, instrument};
use wardrobe_core::{OutfitWeatherRecord, Timestamp};

const OUTFIT_COLUMNS: &str = r#"
    id, owner_id, latitude, longitude,
    worn_start_time, worn_end_time, weather_fetched,
    temperature_avg, temperature_min, temperature_max,
    description, icon_code, wind_speed,
    precipitation, precipitation_unit,
    pending_sync, updated_at
"#;

fn into_records(rows: Vec<OutfitRow>) -> DbResult<Vec<OutfitWeatherRecord>> {
    rows.into_iter().map(OutfitWeatherRecord::try_from).collect()
}

impl DbClient {
    /// Insert a new outfit record; fails if the id exists
    #[instrument(skip(self, record), fields(outfit_id = %record.id))]
    pub async fn insert_outfit(&self, record: &OutfitWeatherRecord) -> DbResult<()> {
        let sql = format!(
            "INSERT INTO outfits ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            OUTFIT_COLUMNS
        );
        bind_row(sqlx::query(&sql), &OutfitRow::from(record))
            .execute(self.pool())
            .await?;

        debug!("Inserted outfit {}", record.id);
        Ok(())
    }

    /// Insert or replace every column of an outfit record in one statement
    #[instrument(skip(self, record), fields(outfit_id = %record.id))]
    pub async fn update_outfit(&self, record: &OutfitWeatherRecord) -> DbResult<()> {
        let sql = format!(
            r#"
            INSERT INTO outfits ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                owner_id = excluded.owner_id,
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                worn_start_time = excluded.worn_start_time,
                worn_end_time = excluded.worn_end_time,
                weather_fetched = excluded.weather_fetched,
                temperature_avg = excluded.temperature_avg,
                temperature_min = excluded.temperature_min,
                temperature_max = excluded.temperature_max,
                description = excluded.description,
                icon_code = excluded.icon_code,
                wind_speed = excluded.wind_speed,
                precipitation = excluded.precipitation,
                precipitation_unit = excluded.precipitation_unit,
                pending_sync = excluded.pending_sync,
                updated_at = excluded.updated_at
            "#,
            OUTFIT_COLUMNS
        );
        bind_row(sqlx::query(&sql), &OutfitRow::from(record))
            .execute(self.pool())
            .await?;

        debug!(
            "Updated outfit {} (weather_fetched={}, pending_sync={})",
            record.id, record.weather_fetched, record.pending_sync
        );
        Ok(())
    }

    /// Write attached weather only if the stored row is still the unfetched
    /// version last modified at `expected_updated_at`.
    ///
    /// Returns false when another writer got there first; nothing is changed.
    #[instrument(skip(self, record), fields(outfit_id = %record.id))]
    pub async fn save_weather(
        &self,
        record: &OutfitWeatherRecord,
        expected_updated_at: Timestamp,
    ) -> DbResult<bool> {
        let row = OutfitRow::from(record);
        let result = sqlx::query(
            r#"
            UPDATE outfits SET
                weather_fetched = 1,
                temperature_avg = ?,
                temperature_min = ?,
                temperature_max = ?,
                description = ?,
                icon_code = ?,
                wind_speed = ?,
                precipitation = ?,
                precipitation_unit = ?,
                pending_sync = ?,
                updated_at = ?
            WHERE id = ? AND weather_fetched = 0 AND updated_at = ?
            "#,
        )
        .bind(row.temperature_avg)
        .bind(row.temperature_min)
        .bind(row.temperature_max)
        .bind(row.description)
        .bind(row.icon_code)
        .bind(row.wind_speed)
        .bind(row.precipitation)
        .bind(row.precipitation_unit)
        .bind(row.pending_sync)
        .bind(row.updated_at)
        .bind(row.id)
        .bind(expected_updated_at)
        .execute(self.pool())
        .await?;

        let saved = result.rows_affected() > 0;
        if !saved {
            debug!("Outfit {} changed since it was read, weather not saved", record.id);
        }
        Ok(saved)
    }

    /// Get a single outfit by id
    #[instrument(skip(self))]
    pub async fn get_outfit(&self, id: &str) -> DbResult<Option<OutfitWeatherRecord>> {
        let sql = format!("SELECT {} FROM outfits WHERE id = ?", OUTFIT_COLUMNS);
        let row = sqlx::query_as::<_, OutfitRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        row.map(OutfitWeatherRecord::try_from).transpose()
    }

    /// Outfits for `owner_id` whose worn interval ended by `now` without weather
    #[instrument(skip(self))]
    pub async fn list_pending_outfits(
        &self,
        owner_id: &str,
        now: Timestamp,
    ) -> DbResult<Vec<OutfitWeatherRecord>> {
        let sql = format!(
            r#"
            SELECT {} FROM outfits
            WHERE owner_id = ? AND weather_fetched = 0 AND worn_end_time <= ?
            ORDER BY worn_end_time ASC, id ASC
            "#,
            OUTFIT_COLUMNS
        );
        let rows = sqlx::query_as::<_, OutfitRow>(&sql)
            .bind(owner_id)
            .bind(now)
            .fetch_all(self.pool())
            .await?;

        debug!("Found {} outfits pending weather", rows.len());
        into_records(rows)
    }

    /// Flag an outfit for the next remote push
    #[instrument(skip(self))]
    pub async fn mark_pending_sync(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE outfits SET pending_sync = 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Outfits for `owner_id` with local changes not yet pushed
    #[instrument(skip(self))]
    pub async fn list_pending_sync(&self, owner_id: &str) -> DbResult<Vec<OutfitWeatherRecord>> {
        let sql = format!(
            r#"
            SELECT {} FROM outfits
            WHERE owner_id = ? AND pending_sync = 1
            ORDER BY updated_at ASC, id ASC
            "#,
            OUTFIT_COLUMNS
        );
        let rows = sqlx::query_as::<_, OutfitRow>(&sql)
            .bind(owner_id)
            .fetch_all(self.pool())
            .await?;

        into_records(rows)
    }

    /// Clear the sync flag if the record was not modified after `updated_at`.
    ///
    /// Returns false when a newer local write is still waiting to be pushed.
    #[instrument(skip(self))]
    pub async fn mark_synced(&self, id: &str, updated_at: Timestamp) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE outfits SET pending_sync = 0 WHERE id = ? AND updated_at <= ?",
        )
        .bind(id)
        .bind(updated_at)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Latest `updated_at` among an owner's outfits, if any
    #[instrument(skip(self))]
    pub async fn latest_update(&self, owner_id: &str) -> DbResult<Option<Timestamp>> {
        let latest: Option<i64> =
            sqlx::query_scalar("SELECT MAX(updated_at) FROM outfits WHERE owner_id = ?")
                .bind(owner_id)
                .fetch_one(self.pool())
                .await?;

        Ok(latest)
    }
}

fn bind_row<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    row: &OutfitRow,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    query
        .bind(row.id.clone())
        .bind(row.owner_id.clone())
        .bind(row.latitude)
        .bind(row.longitude)
        .bind(row.worn_start_time)
        .bind(row.worn_end_time)
        .bind(row.weather_fetched)
        .bind(row.temperature_avg)
        .bind(row.temperature_min)
        .bind(row.temperature_max)
        .bind(row.description.clone())
        .bind(row.icon_code.clone())
        .bind(row.wind_speed)
        .bind(row.precipitation)
        .bind(row.precipitation_unit.clone())
        .bind(row.pending_sync)
        .bind(row.updated_at)
}
