//! Statistics aggregation over the prediction collection.
//!
//! Two independent passes plus a total count, each a full scan. No caching
//! and no incremental rollups: at the expected scale (tens of thousands of
//! rows) recomputing on every request is the simpler contract.

use sqlx::Row;
use sqlx::sqlite::SqlitePool;

use crate::core::{DailyCount, EmotionStat, Result, StatsSnapshot};

/// How many top emotions the snapshot keeps.
const TOP_EMOTIONS_LIMIT: i64 = 5;

/// How many recent day-buckets the time series keeps.
const DAY_BUCKETS_LIMIT: i64 = 30;

pub(super) async fn collect(pool: &SqlitePool) -> Result<StatsSnapshot> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM predictions")
        .fetch_one(pool)
        .await?;

    Ok(StatsSnapshot {
        total_predictions: total.max(0) as u64,
        top_emotions: top_emotions(pool).await?,
        predictions_by_day: predictions_by_day(pool).await?,
    })
}

/// Pass 1: explode each record's `{label: score}` object into pairs, group
/// by label, keep the 5 most frequent with their mean score.
async fn top_emotions(pool: &SqlitePool) -> Result<Vec<EmotionStat>> {
    let rows = sqlx::query(
        r#"
        SELECT je.key AS emotion,
               AVG(je.value) AS average_score,
               COUNT(*) AS occurrences
        FROM predictions AS p, json_each(p.emotions) AS je
        GROUP BY je.key
        ORDER BY occurrences DESC, emotion ASC
        LIMIT ?1
        "#,
    )
    .bind(TOP_EMOTIONS_LIMIT)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(EmotionStat {
                emotion: row.try_get("emotion")?,
                average_score: row.try_get("average_score")?,
                count: row.try_get::<i64, _>("occurrences")?.max(0) as u64,
            })
        })
        .collect()
}

/// Pass 2: bucket records by UTC calendar day, most recent 30 buckets,
/// returned ascending. Days without records never appear.
async fn predictions_by_day(pool: &SqlitePool) -> Result<Vec<DailyCount>> {
    let rows = sqlx::query(
        r#"
        SELECT day, occurrences FROM (
            SELECT date(timestamp) AS day, COUNT(*) AS occurrences
            FROM predictions
            GROUP BY day
            ORDER BY day DESC
            LIMIT ?1
        )
        ORDER BY day ASC
        "#,
    )
    .bind(DAY_BUCKETS_LIMIT)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(DailyCount {
                date: row.try_get("day")?,
                count: row.try_get::<i64, _>("occurrences")?.max(0) as u64,
            })
        })
        .collect()
}
