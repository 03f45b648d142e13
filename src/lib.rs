// ============================================================================
// Emotion Analyzer Library
// ============================================================================

pub mod bridge;
pub mod config;
pub mod core;
pub mod facade;
pub mod model;
pub mod storage;
pub mod web;

// Re-export main types for convenience
pub use bridge::{AsyncBridge, DEFAULT_OP_TIMEOUT};
pub use config::AppConfig;
pub use self::core::{
    DailyCount, EmotionStat, PredictionRecord, RequestInfo, Result, ServiceError, StatsSnapshot,
};
pub use facade::{HealthStatus, PredictionService};
pub use model::{EMOTION_LABELS, EmotionModel, LexiconModel, TOP_K, top_emotions};
pub use storage::PredictionStore;
pub use web::{AppState, build_router};
