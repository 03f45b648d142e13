use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single persisted prediction.
///
/// Records are insert-once and delete-only: there is no in-place update path.
/// `id` and `timestamp` are assigned by the storage layer at write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: String,
    pub text: String,
    /// Emotion label -> score in [0.0, 1.0]. Callers store the top-K labels
    /// (K = 5) out of the model's full vocabulary.
    pub emotions: BTreeMap<String, f64>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_info: Option<RequestInfo>,
}

/// Unvalidated caller metadata attached to a prediction at insert time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
}

/// Point-in-time aggregate over the whole prediction collection.
///
/// Derived data only: recomputed on every request, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_predictions: u64,
    /// Top 5 emotions by occurrence count, descending.
    pub top_emotions: Vec<EmotionStat>,
    /// Per-day record counts for the most recent 30 day-buckets, ascending
    /// by date. Days without records are omitted, not zero-filled.
    pub predictions_by_day: Vec<DailyCount>,
}

impl StatsSnapshot {
    pub fn empty() -> Self {
        Self {
            total_predictions: 0,
            top_emotions: Vec::new(),
            predictions_by_day: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionStat {
    pub emotion: String,
    pub average_score: f64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    /// UTC calendar day formatted as `YYYY-MM-DD`.
    pub date: String,
    pub count: u64,
}
