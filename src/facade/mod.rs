//! Blocking-but-bounded prediction service composing model, bridge and store.
//!
//! This is the one object the HTTP layer talks to. It is explicitly
//! constructed and dependency-injected (no module-level globals), with
//! `start`/`stop` lifecycle: `start` builds the bridge and connects the
//! store, `stop` drains and releases both.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::bridge::AsyncBridge;
use crate::config::AppConfig;
use crate::core::{PredictionRecord, RequestInfo, Result, ServiceError, StatsSnapshot};
use crate::model::{EmotionModel, TOP_K, top_emotions};
use crate::storage::PredictionStore;

/// Liveness/readiness summary for the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub model_loaded: bool,
    pub database_connected: bool,
}

pub struct PredictionService {
    bridge: AsyncBridge,
    /// `None` when the database was unreachable at startup: the service then
    /// runs degraded, serving inference without persistence.
    store: Option<PredictionStore>,
    model: Arc<dyn EmotionModel>,
}

impl std::fmt::Debug for PredictionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionService").finish_non_exhaustive()
    }
}

impl PredictionService {
    /// Starts the background scheduler and connects the store through it.
    ///
    /// A missing database URL is fatal. An unreachable database is not: the
    /// failure is logged and the service starts without persistence, so
    /// inference keeps working while read/delete/stats endpoints report the
    /// store as unavailable.
    pub fn start(config: &AppConfig, model: Arc<dyn EmotionModel>) -> Result<Self> {
        if config.database_url.trim().is_empty() {
            return Err(ServiceError::configuration(
                "EMO_DATABASE_URL must be set",
            ));
        }

        let bridge = AsyncBridge::start(config.op_timeout)?;

        let database_url = config.database_url.clone();
        let store =
            match bridge.run_sync(async move { PredictionStore::connect(&database_url).await }) {
                Ok(store) => Some(store),
                Err(err) => {
                    error!(error = %err, "database connection failed, serving without persistence");
                    None
                }
            };

        info!(
            database_connected = store.is_some(),
            "prediction service started"
        );
        Ok(Self {
            bridge,
            store,
            model,
        })
    }

    /// Runs inference and persists the top-5 result.
    ///
    /// Persistence failure is deliberately non-fatal here: if inference
    /// succeeded the emotions are returned even when the write was lost.
    /// This is the single place where that rule lives.
    pub fn predict_and_save(
        &self,
        text: &str,
        request_info: Option<RequestInfo>,
    ) -> Result<BTreeMap<String, f64>> {
        let scores = self.predict(text)?;
        let top = top_emotions(&scores, TOP_K);

        if let Some(store) = &self.store {
            let store = store.clone();
            let text = text.to_string();
            let emotions = top.clone();
            let persisted = self.bridge.run_sync(async move {
                store.insert(&text, &emotions, request_info.as_ref()).await
            });
            if let Err(err) = persisted {
                warn!(error = %err, "failed to persist prediction, returning inference result anyway");
            }
        }

        Ok(top)
    }

    /// Inference only, no persistence. Full-vocabulary scores.
    pub fn predict(&self, text: &str) -> Result<BTreeMap<String, f64>> {
        self.model
            .predict(text)
            .map_err(|err| match err {
                upstream @ ServiceError::Upstream(_) => upstream,
                other => ServiceError::upstream(other.to_string()),
            })
    }

    pub fn list_predictions(&self, limit: i64, skip: i64) -> Result<Vec<PredictionRecord>> {
        let store = self.store()?.clone();
        self.bridge
            .run_sync(async move { store.list(limit, skip).await })
    }

    pub fn get_prediction(&self, id: &str) -> Result<Option<PredictionRecord>> {
        let store = self.store()?.clone();
        let id = id.to_string();
        self.bridge
            .run_sync(async move { store.get_by_id(&id).await })
    }

    pub fn delete_prediction(&self, id: &str) -> Result<bool> {
        let store = self.store()?.clone();
        let id = id.to_string();
        self.bridge
            .run_sync(async move { store.delete_by_id(&id).await })
    }

    pub fn stats(&self) -> Result<StatsSnapshot> {
        let store = self.store()?.clone();
        self.bridge.run_sync(async move { store.stats().await })
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            model_loaded: self.model.is_loaded(),
            database_connected: self.store.is_some(),
        }
    }

    /// Closes the store and stops the scheduler. Idempotent via the bridge.
    pub fn stop(&self) {
        if let Some(store) = &self.store {
            let store = store.clone();
            let closed = self.bridge.run_sync(async move {
                store.close().await;
                Ok(())
            });
            if let Err(err) = closed {
                warn!(error = %err, "failed to close store cleanly");
            }
        }
        self.bridge.stop();
    }

    fn store(&self) -> Result<&PredictionStore> {
        self.store
            .as_ref()
            .ok_or_else(|| ServiceError::connection("database not connected"))
    }
}
