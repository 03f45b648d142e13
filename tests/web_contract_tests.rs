use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use emotion_analyzer::{
    AppConfig, AppState, EmotionModel, LexiconModel, PredictionService, build_router,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

fn app_with_database(database_url: &str) -> Router {
    let config = AppConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        database_url: database_url.to_string(),
        op_timeout: Duration::from_secs(5),
    };
    let model: Arc<dyn EmotionModel> = Arc::new(LexiconModel);
    let service = PredictionService::start(&config, model).expect("service should start");
    build_router(AppState::new(Arc::new(service)))
}

fn app() -> Router {
    app_with_database("sqlite::memory:")
}

async fn request_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("request should complete");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body should be JSON")
    };
    (status, body)
}

fn predict_request(text: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "text": text }).to_string()))
        .expect("valid predict request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("valid GET request")
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .expect("valid DELETE request")
}

#[tokio::test]
async fn predict_returns_top_emotions_and_persists() {
    let app = app();

    let (status, body) = request_json(app.clone(), predict_request("I am thrilled today!")).await;
    assert_eq!(status, StatusCode::OK);

    let emotions = body
        .get("emotions")
        .and_then(Value::as_object)
        .expect("response must contain emotions object");
    assert!(!emotions.is_empty());
    assert!(emotions.len() <= 5);
    for score in emotions.values() {
        let score = score.as_f64().expect("score must be a number");
        assert!((0.0..=1.0).contains(&score));
    }

    let (status, body) = request_json(app, get("/api/predictions")).await;
    assert_eq!(status, StatusCode::OK);
    let predictions = body
        .get("predictions")
        .and_then(Value::as_array)
        .expect("predictions array");
    assert_eq!(predictions.len(), 1);
    assert_eq!(
        predictions[0].get("text").and_then(Value::as_str),
        Some("I am thrilled today!")
    );
    assert!(predictions[0].get("timestamp").and_then(Value::as_str).is_some());
    assert_eq!(body.get("total").and_then(Value::as_u64), Some(1));
    assert_eq!(body.get("page").and_then(Value::as_u64), Some(1));
    assert_eq!(body.get("limit").and_then(Value::as_u64), Some(10));
}

#[tokio::test]
async fn predict_validates_input() {
    let app = app();

    let (status, body) = request_json(
        app.clone(),
        Request::builder()
            .method("POST")
            .uri("/predict")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "message": "no text field" }).to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body.get("error").and_then(Value::as_str),
        Some("Please provide 'text' field in JSON body")
    );

    let (status, body) = request_json(app.clone(), predict_request("   ")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body.get("error").and_then(Value::as_str),
        Some("Input text cannot be empty")
    );

    let (status, body) = request_json(app, predict_request(&"a".repeat(600))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body.get("error")
            .and_then(Value::as_str)
            .unwrap()
            .contains("too long")
    );
}

#[tokio::test]
async fn list_clamps_limit_and_reports_paging() {
    let app = app();

    let (status, body) = request_json(app, get("/api/predictions?page=0&limit=500")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.get("limit").and_then(Value::as_u64), Some(100));
    assert_eq!(body.get("page").and_then(Value::as_u64), Some(1));
    assert_eq!(body.get("total").and_then(Value::as_u64), Some(0));
}

#[tokio::test]
async fn get_and_delete_round_trip_with_not_found_paths() {
    let app = app();
    let missing = Uuid::new_v4();

    let (status, body) = request_json(app.clone(), get(&format!("/api/predictions/{missing}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.get("error").and_then(Value::as_str).unwrap().contains("not found"));

    let (status, _) = request_json(app.clone(), delete(&format!("/api/predictions/{missing}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = request_json(app.clone(), predict_request("so happy and grateful")).await;
    assert_eq!(status, StatusCode::OK);

    let (_, listed) = request_json(app.clone(), get("/api/predictions")).await;
    let id = listed["predictions"][0]["id"]
        .as_str()
        .expect("listed prediction must carry an id")
        .to_string();

    let (status, fetched) = request_json(app.clone(), get(&format!("/api/predictions/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        fetched.get("text").and_then(Value::as_str),
        Some("so happy and grateful")
    );

    let (status, deleted) = request_json(app.clone(), delete(&format!("/api/predictions/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        deleted
            .get("message")
            .and_then(Value::as_str)
            .unwrap()
            .contains("deleted successfully")
    );

    let (status, _) = request_json(app, get(&format!("/api/predictions/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_id_surfaces_as_storage_failure() {
    let app = app();
    let (status, body) = request_json(app, get("/api/predictions/not-a-uuid")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        body.get("error")
            .and_then(Value::as_str)
            .unwrap()
            .contains("malformed prediction id")
    );
}

#[tokio::test]
async fn stats_reflect_inserted_predictions() {
    let app = app();

    let (status, body) = request_json(app.clone(), get("/api/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.get("total_predictions").and_then(Value::as_u64), Some(0));
    assert_eq!(body["top_emotions"], json!([]));
    assert_eq!(body["predictions_by_day"], json!([]));

    let (status, _) = request_json(app.clone(), predict_request("what a wonderful day")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = request_json(app.clone(), predict_request("this is so sad")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request_json(app, get("/api/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.get("total_predictions").and_then(Value::as_u64), Some(2));

    let top = body["top_emotions"].as_array().unwrap();
    assert!(!top.is_empty() && top.len() <= 5);
    for stat in top {
        let average = stat["average_score"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&average));
        assert!(stat["count"].as_u64().unwrap() <= 2);
    }

    let by_day = body["predictions_by_day"].as_array().unwrap();
    assert_eq!(by_day.len(), 1);
    assert_eq!(by_day[0]["count"].as_u64(), Some(2));
}

#[tokio::test]
async fn health_and_model_test_report_service_state() {
    let app = app();

    let (status, body) = request_json(app.clone(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.get("status").and_then(Value::as_str), Some("healthy"));
    assert_eq!(body.get("model_status").and_then(Value::as_str), Some("loaded"));
    assert_eq!(body.get("database").and_then(Value::as_str), Some("connected"));

    let (status, body) = request_json(app, get("/api/model-test")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.get("status").and_then(Value::as_str), Some("model working"));
    assert!(body.get("results").and_then(Value::as_object).is_some());
}

#[tokio::test]
async fn degraded_database_yields_503_for_reads() {
    let app = app_with_database("sqlite:///nonexistent-emotion-analyzer-dir/predictions.db");

    let (status, body) = request_json(app.clone(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body.get("database").and_then(Value::as_str),
        Some("disconnected")
    );

    let (status, body) = request_json(app.clone(), get("/api/predictions")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body.get("error").and_then(Value::as_str),
        Some("Database not connected")
    );

    let (status, _) = request_json(app.clone(), get("/api/stats")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    // Inference still answers while the store is down.
    let (status, body) = request_json(app, predict_request("prediction without persistence")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("emotions").and_then(Value::as_object).is_some());
}
