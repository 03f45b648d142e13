pub mod error;
pub mod types;

pub use error::{Result, ServiceError};
pub use types::{DailyCount, EmotionStat, PredictionRecord, RequestInfo, StatsSnapshot};
