//! Prediction persistence over a single-connection SQLite pool.
//!
//! Every method here is async and is meant to run on the bridge runtime, not
//! on a request thread. The pool is capped at one connection: it is the one
//! logical storage connection of the whole process, shared read-only after
//! `connect` and released only by `close`.

mod stats;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::{PredictionRecord, RequestInfo, Result, ServiceError, StatsSnapshot};

const CREATE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS predictions (
    id           TEXT PRIMARY KEY,
    text         TEXT NOT NULL,
    emotions     TEXT NOT NULL,
    timestamp    TEXT NOT NULL,
    request_info TEXT
)
"#;

const CREATE_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS idx_predictions_timestamp ON predictions (timestamp)";

#[derive(Clone, Debug)]
pub struct PredictionStore {
    pool: SqlitePool,
}

impl PredictionStore {
    /// Opens the store: single connection attempt, liveness ping, idempotent
    /// schema/index creation. No retry loop; a failure here is surfaced to
    /// the caller as-is.
    pub async fn connect(database_url: &str) -> Result<Self> {
        if database_url.trim().is_empty() {
            return Err(ServiceError::configuration(
                "database URL must not be empty",
            ));
        }

        info!("connecting to prediction database");
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .map_err(|err| ServiceError::connection(err.to_string()))?;

        // Round-trip health check before the store is handed out.
        sqlx::query("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|err| ServiceError::connection(err.to_string()))?;

        sqlx::query(CREATE_TABLE_SQL)
            .execute(&pool)
            .await
            .map_err(|err| ServiceError::connection(err.to_string()))?;
        sqlx::query(CREATE_INDEX_SQL)
            .execute(&pool)
            .await
            .map_err(|err| ServiceError::connection(err.to_string()))?;

        info!("prediction database connected");
        Ok(Self { pool })
    }

    /// Releases the connection. Idempotent.
    pub async fn close(&self) {
        if !self.pool.is_closed() {
            info!("closing prediction database connection");
            self.pool.close().await;
        }
    }

    /// Writes a new record with store-assigned id and timestamp and returns
    /// the id.
    pub async fn insert(
        &self,
        text: &str,
        emotions: &BTreeMap<String, f64>,
        request_info: Option<&RequestInfo>,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let timestamp = Utc::now();
        let emotions_json = serde_json::to_string(emotions)?;
        let request_info_json = request_info.map(serde_json::to_string).transpose()?;

        sqlx::query(
            r#"
            INSERT INTO predictions (id, text, emotions, timestamp, request_info)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&id)
        .bind(text)
        .bind(emotions_json)
        .bind(timestamp)
        .bind(request_info_json)
        .execute(&self.pool)
        .await?;

        info!(prediction_id = %id, "saved prediction");
        Ok(id)
    }

    /// Records in `timestamp`-descending order with skip/limit pagination.
    ///
    /// `limit` is deliberately not clamped here; the HTTP layer enforces the
    /// page-size ceiling.
    pub async fn list(&self, limit: i64, skip: i64) -> Result<Vec<PredictionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, text, emotions, timestamp, request_info
            FROM predictions
            ORDER BY timestamp DESC, rowid DESC
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }

    /// `Ok(None)` when nothing matches; an error only for I/O failure or a
    /// malformed identifier.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<PredictionRecord>> {
        parse_id(id)?;

        let maybe_row = sqlx::query(
            r#"
            SELECT id, text, emotions, timestamp, request_info
            FROM predictions
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        maybe_row.as_ref().map(row_to_record).transpose()
    }

    /// Whether a record was actually removed. Not-found is `Ok(false)`,
    /// never an error.
    pub async fn delete_by_id(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM predictions WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            info!(prediction_id = %id, "deleted prediction");
        } else {
            warn!(prediction_id = %id, "no prediction found to delete");
        }
        Ok(removed)
    }

    /// Full-scan aggregate view; see [`stats`] for the passes.
    pub async fn stats(&self) -> Result<StatsSnapshot> {
        stats::collect(&self.pool).await
    }
}

fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id)
        .map_err(|_| ServiceError::storage(format!("malformed prediction id: {id}")))
}

fn row_to_record(row: &SqliteRow) -> Result<PredictionRecord> {
    let emotions_json: String = row.try_get("emotions")?;
    let emotions: BTreeMap<String, f64> = serde_json::from_str(&emotions_json)?;

    let request_info_json: Option<String> = row.try_get("request_info")?;
    let request_info: Option<RequestInfo> = request_info_json
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?;

    Ok(PredictionRecord {
        id: row.try_get("id")?,
        text: row.try_get("text")?,
        emotions,
        timestamp: row.try_get::<DateTime<Utc>, _>("timestamp")?,
        request_info,
    })
}
