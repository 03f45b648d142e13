//! HTTP surface: axum router, shared state and error mapping.
//!
//! Handlers call the blocking facade through `spawn_blocking`; nothing in
//! this module touches the database directly. Error payloads are always
//! `{"error": message}` with an appropriate status, never a stack trace.

pub mod handlers;

use std::sync::Arc;

use axum::Json;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::core::ServiceError;
use crate::facade::PredictionService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
}

impl AppState {
    pub fn new(service: Arc<PredictionService>) -> Self {
        Self { service }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/predict", axum::routing::post(handlers::predict))
        .route("/api/predictions", get(handlers::list_predictions))
        .route(
            "/api/predictions/{id}",
            get(handlers::get_prediction).delete(handlers::delete_prediction),
        )
        .route("/api/stats", get(handlers::stats))
        .route("/api/model-test", get(handlers::model_test))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS]),
        )
        .with_state(state)
}

pub type ApiResult<T> = Result<T, WebError>;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug)]
pub struct WebError {
    status: StatusCode,
    message: String,
}

impl WebError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<ServiceError> for WebError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Connection(_) => Self::unavailable("Database not connected"),
            ServiceError::SchedulerUnavailable => Self::unavailable(err.to_string()),
            ServiceError::OperationTimeout(_) => Self::internal("Database operation timed out"),
            ServiceError::Storage(message) => Self::internal(format!("Database error: {message}")),
            ServiceError::Upstream(message) => Self::internal(format!("Prediction error: {message}")),
            ServiceError::Configuration(message) => Self::internal(message),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, message = %self.message, "request failed");
        }
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
