use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::spawn_blocking;

use crate::core::{PredictionRecord, RequestInfo};
use crate::facade::PredictionService;
use crate::web::{ApiResult, AppState, WebError};

/// Input cap enforced at the HTTP boundary, not by the persistence layer.
const MAX_TEXT_LEN: usize = 512;

const MAX_PAGE_SIZE: u32 = 100;
const DEFAULT_PAGE_SIZE: u32 = 10;

const MODEL_PROBE_TEXT: &str = "Test message";

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub emotions: BTreeMap<String, f64>,
}

pub async fn predict(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<PredictRequest>,
) -> ApiResult<Json<PredictResponse>> {
    let Some(text) = request.text else {
        return Err(WebError::bad_request(
            "Please provide 'text' field in JSON body",
        ));
    };
    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(WebError::bad_request("Input text cannot be empty"));
    }
    if text.chars().count() > MAX_TEXT_LEN {
        return Err(WebError::bad_request(
            "Input text too long. Max 512 characters allowed",
        ));
    }

    let request_info = request_info_from_headers(&headers);
    let emotions = run_blocking(&state, move |service| {
        service.predict_and_save(&text, Some(request_info))
    })
    .await?;

    Ok(Json(PredictResponse { emotions }))
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Serialize)]
pub struct PredictionView {
    pub id: String,
    pub text: String,
    pub emotions: BTreeMap<String, f64>,
    pub timestamp: DateTime<Utc>,
}

impl From<PredictionRecord> for PredictionView {
    fn from(record: PredictionRecord) -> Self {
        Self {
            id: record.id,
            text: record.text,
            emotions: record.emotions,
            timestamp: record.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListPredictionsResponse {
    pub predictions: Vec<PredictionView>,
    /// Returned count plus skip, not a true collection count. Clients
    /// depend on this exact value.
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

pub async fn list_predictions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ListPredictionsResponse>> {
    let limit = query.limit.clamp(1, MAX_PAGE_SIZE);
    let page = query.page.max(1);
    let skip = i64::from(page - 1) * i64::from(limit);

    let records = run_blocking(&state, move |service| {
        service.list_predictions(i64::from(limit), skip)
    })
    .await?;

    let predictions: Vec<PredictionView> = records.into_iter().map(Into::into).collect();
    let total = predictions.len() as u64 + skip as u64;

    Ok(Json(ListPredictionsResponse {
        predictions,
        total,
        page,
        limit,
    }))
}

pub async fn get_prediction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PredictionRecord>> {
    let lookup_id = id.clone();
    let record = run_blocking(&state, move |service| service.get_prediction(&lookup_id)).await?;

    match record {
        Some(record) => Ok(Json(record)),
        None => Err(WebError::not_found(format!(
            "Prediction with ID {id} not found"
        ))),
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
}

pub async fn delete_prediction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let delete_id = id.clone();
    let removed = run_blocking(&state, move |service| {
        service.delete_prediction(&delete_id)
    })
    .await?;

    if !removed {
        return Err(WebError::not_found(format!(
            "Prediction with ID {id} not found"
        )));
    }

    Ok(Json(DeleteResponse {
        message: format!("Prediction {id} deleted successfully"),
    }))
}

pub async fn stats(
    State(state): State<AppState>,
) -> ApiResult<Json<crate::core::StatsSnapshot>> {
    let snapshot = run_blocking(&state, |service| service.stats()).await?;
    Ok(Json(snapshot))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_status: &'static str,
    pub database: &'static str,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let health = state.service.health();
    Json(HealthResponse {
        status: "healthy",
        model_status: if health.model_loaded {
            "loaded"
        } else {
            "not_loaded"
        },
        database: if health.database_connected {
            "connected"
        } else {
            "disconnected"
        },
    })
}

#[derive(Debug, Serialize)]
pub struct ModelTestResponse {
    pub status: &'static str,
    pub results: BTreeMap<String, f64>,
}

pub async fn model_test(State(state): State<AppState>) -> ApiResult<Json<ModelTestResponse>> {
    let service = state.service.clone();
    let results = spawn_blocking(move || service.predict(MODEL_PROBE_TEXT))
        .await
        .map_err(|err| WebError::unavailable(format!("Model test failed: {err}")))?
        .map_err(|err| WebError::unavailable(format!("Model test failed: {err}")))?;

    Ok(Json(ModelTestResponse {
        status: "model working",
        results,
    }))
}

/// Runs a blocking facade call off the async worker threads.
async fn run_blocking<T, F>(state: &AppState, call: F) -> Result<T, WebError>
where
    F: FnOnce(&PredictionService) -> crate::core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let service = state.service.clone();
    spawn_blocking(move || call(&service))
        .await
        .map_err(|err| WebError::internal(format!("request task failed: {err}")))?
        .map_err(WebError::from)
}

fn request_info_from_headers(headers: &HeaderMap) -> RequestInfo {
    RequestInfo {
        ip_address: header_string(headers, "x-forwarded-for")
            .map(|raw| raw.split(',').next().unwrap_or(&raw).trim().to_string()),
        user_agent: header_string(headers, "user-agent"),
        referer: header_string(headers, "referer"),
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
