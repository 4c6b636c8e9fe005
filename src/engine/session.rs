use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, OnceCell, RwLock};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::requester::{ForecastOutcome, ForecastRequester};
use super::window::WindowPolicy;
use crate::error::{ForecastError, Result};
use crate::model::{ForecastModel, ModelSource};
use crate::types::{Horizon, HorizonLimits};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    ModelLoading,
    ModelReady,
    ModelLoadFailed,
    Forecasting,
    ForecastDisplayed,
    ForecastFailed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Idle => write!(f, "Idle"),
            SessionStatus::ModelLoading => write!(f, "Loading model"),
            SessionStatus::ModelReady => write!(f, "Model ready"),
            SessionStatus::ModelLoadFailed => write!(f, "Model load failed"),
            SessionStatus::Forecasting => write!(f, "Forecasting"),
            SessionStatus::ForecastDisplayed => write!(f, "Forecast displayed"),
            SessionStatus::ForecastFailed => write!(f, "Forecast failed"),
        }
    }
}

/// Lifecycle of the cached model
#[derive(Debug, Clone, PartialEq)]
pub enum ModelState {
    Unloaded,
    Loaded(Arc<ForecastModel>),
    Failed(String),
}

/// One completed forecast request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRun {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub horizon: Horizon,
    pub window_policy: WindowPolicy,
}

#[derive(Debug, Clone)]
pub struct LatestForecast {
    pub run: ForecastRun,
    pub outcome: Arc<ForecastOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub model_source: String,
    pub model_name: Option<String>,
    pub model_error: Option<String>,
    pub last_run: Option<ForecastRun>,
    pub last_error: Option<String>,
    pub forecasts_count: u64,
    pub started_at: DateTime<Utc>,
}

/// Dashboard session: loads the model at most once, then serves forecasts
pub struct ForecastSession {
    source: Arc<dyn ModelSource>,
    model: OnceCell<ModelState>,
    limits: HorizonLimits,
    policy: WindowPolicy,
    status: RwLock<SessionStatus>,
    latest: RwLock<Option<LatestForecast>>,
    last_error: RwLock<Option<String>>,
    forecasts_count: AtomicU64,
    started_at: DateTime<Utc>,
    status_tx: broadcast::Sender<SessionStatus>,
}

impl ForecastSession {
    pub fn new(source: Arc<dyn ModelSource>, limits: HorizonLimits, policy: WindowPolicy) -> Self {
        let (status_tx, _) = broadcast::channel(32);
        Self {
            source,
            model: OnceCell::new(),
            limits,
            policy,
            status: RwLock::new(SessionStatus::Idle),
            latest: RwLock::new(None),
            last_error: RwLock::new(None),
            forecasts_count: AtomicU64::new(0),
            started_at: Utc::now(),
            status_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    pub async fn status(&self) -> SessionStatus {
        *self.status.read().await
    }

    async fn set_status(&self, status: SessionStatus) {
        *self.status.write().await = status;
        let _ = self.status_tx.send(status);
    }

    pub fn model_state(&self) -> ModelState {
        self.model.get().cloned().unwrap_or(ModelState::Unloaded)
    }

    /// Load the model on first use. Concurrent callers wait on the same load;
    /// a failed load is cached and every later call is refused.
    pub async fn ensure_model(&self) -> Result<Arc<ForecastModel>> {
        let state = self
            .model
            .get_or_init(|| async {
                self.set_status(SessionStatus::ModelLoading).await;
                info!("Loading model from {}", self.source.describe());

                let source = Arc::clone(&self.source);
                let loaded = tokio::task::spawn_blocking(move || source.load())
                    .await
                    .map_err(|e| ForecastError::ModelUnavailable(format!("model loader task failed: {}", e)))
                    .and_then(|r| r);

                match loaded {
                    Ok(model) => {
                        self.set_status(SessionStatus::ModelReady).await;
                        ModelState::Loaded(Arc::new(model))
                    }
                    Err(e) => {
                        error!("Model load failed: {}", e);
                        self.set_status(SessionStatus::ModelLoadFailed).await;
                        ModelState::Failed(e.to_string())
                    }
                }
            })
            .await;

        match state {
            ModelState::Loaded(model) => Ok(Arc::clone(model)),
            ModelState::Failed(msg) => Err(ForecastError::ModelUnavailable(msg.clone())),
            ModelState::Unloaded => Err(ForecastError::ModelUnavailable("model not loaded".to_string())),
        }
    }

    #[cfg(test)]
    pub async fn forecast(&self, horizon: Horizon) -> Result<LatestForecast> {
        self.forecast_from(|_| Ok(horizon)).await
    }

    /// Run one forecast, building the horizon against the session limits once
    /// the model is ready. Any failure, a rejected horizon included, keeps the
    /// previously displayed forecast.
    pub async fn forecast_from<F>(&self, build: F) -> Result<LatestForecast>
    where
        F: FnOnce(&HorizonLimits) -> Result<Horizon>,
    {
        let model = self.ensure_model().await?;

        self.set_status(SessionStatus::Forecasting).await;
        let requester = ForecastRequester::new(model.as_ref(), self.limits, self.policy);

        let result = build(&self.limits).and_then(|horizon| {
            requester.request(&horizon).map(|outcome| (horizon, outcome))
        });

        match result {
            Ok((horizon, outcome)) => {
                let latest = LatestForecast {
                    run: ForecastRun {
                        id: Uuid::new_v4(),
                        created_at: Utc::now(),
                        horizon,
                        window_policy: self.policy,
                    },
                    outcome: Arc::new(outcome),
                };
                *self.latest.write().await = Some(latest.clone());
                *self.last_error.write().await = None;
                self.forecasts_count.fetch_add(1, Ordering::Relaxed);
                self.set_status(SessionStatus::ForecastDisplayed).await;

                info!("Forecast {} ready: {}", latest.run.id, latest.outcome.window.title());
                Ok(latest)
            }
            Err(e) => {
                warn!("Forecast request failed: {}", e);
                *self.last_error.write().await = Some(e.to_string());
                self.set_status(SessionStatus::ForecastFailed).await;
                Err(e)
            }
        }
    }

    pub async fn latest(&self) -> Option<LatestForecast> {
        self.latest.read().await.clone()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let (model_name, model_error) = match self.model_state() {
            ModelState::Loaded(model) => (Some(model.name().to_string()), None),
            ModelState::Failed(msg) => (None, Some(msg)),
            ModelState::Unloaded => (None, None),
        };

        SessionSnapshot {
            status: self.status().await,
            model_source: self.source.describe(),
            model_name,
            model_error,
            last_run: self.latest.read().await.as_ref().map(|l| l.run.clone()),
            last_error: self.last_error.read().await.clone(),
            forecasts_count: self.forecasts_count.load(Ordering::Relaxed),
            started_at: self.started_at,
        }
    }
}
