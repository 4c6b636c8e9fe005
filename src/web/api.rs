use axum::{
    extract::{
        rejection::JsonRejection,
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, warn};

use super::AppState;
use crate::engine::{SessionSnapshot, SessionStatus};
use crate::error::ForecastError;
use crate::presenter::{forecast_table, window_to_csv, EXPORT_FILE_NAME, EXPORT_MIME};
use crate::types::{Frequency, Horizon};

const SVG_MIME: &str = "image/svg+xml";

/// Forecast errors mapped onto HTTP status codes
pub struct ApiError(ForecastError);

impl From<ForecastError> for ApiError {
    fn from(err: ForecastError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ForecastError::InvalidHorizon(_) => StatusCode::BAD_REQUEST,
            ForecastError::Load { .. } | ForecastError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ForecastError::Prediction(_) | ForecastError::Render(_) | ForecastError::Export(_) => {
                error!("Request failed: {}", self.0);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

fn no_forecast() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": "no forecast has been generated yet"})),
    )
        .into_response()
}

/// Body of `POST /api/forecast`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ForecastRequest {
    Periods {
        periods: i64,
        #[serde(default)]
        frequency: Option<Frequency>,
    },
    Range {
        start: NaiveDate,
        end: NaiveDate,
    },
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.session.snapshot().await)
}

pub async fn get_model(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let model = state.session.ensure_model().await?;
    Ok(Json(model.summary()))
}

pub async fn get_history(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let model = state.session.ensure_model().await?;
    Ok(Json(json!({
        "title": "Historical Sales Data",
        "rows": model.history(),
    })))
}

pub async fn get_history_chart(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let model = state.session.ensure_model().await?;
    let svg = state.renderer_for(&model).history_svg(model.history())?;
    Ok(([(header::CONTENT_TYPE, SVG_MIME)], svg))
}

pub async fn post_forecast(
    State(state): State<AppState>,
    body: Result<Json<ForecastRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!("Rejected forecast body: {}", rejection.body_text());
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": format!("invalid request body: {}", rejection.body_text())})),
            )
                .into_response();
        }
    };

    let default_frequency = state.config.forecast.default_frequency;
    let result = state
        .session
        .forecast_from(|limits| match request {
            ForecastRequest::Periods { periods, frequency } => {
                Horizon::from_count(periods, frequency.unwrap_or(default_frequency), limits)
            }
            ForecastRequest::Range { start, end } => Horizon::from_range(start, end, limits),
        })
        .await;

    match result {
        Ok(latest) => {
            let window = &latest.outcome.window;
            let message = if window.is_empty() {
                "Forecast generated, but no forecast dates fall in the requested window."
            } else {
                "Forecast generated successfully!"
            };
            (
                StatusCode::OK,
                Json(json!({
                    "status": "ok",
                    "message": message,
                    "run": latest.run,
                    "title": window.title(),
                    "rows": window.rows(),
                    "table": forecast_table(window),
                })),
            )
                .into_response()
        }
        Err(e) => ApiError(e).into_response(),
    }
}

pub async fn get_latest_forecast(State(state): State<AppState>) -> Response {
    match state.session.latest().await {
        Some(latest) => Json(json!({
            "run": latest.run,
            "title": latest.outcome.window.title(),
            "rows": latest.outcome.window.rows(),
        }))
        .into_response(),
        None => no_forecast(),
    }
}

pub async fn get_latest_chart(State(state): State<AppState>) -> Response {
    let Some(latest) = state.session.latest().await else {
        return no_forecast();
    };
    if latest.outcome.window.is_empty() {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "forecast window has no rows to chart"})),
        )
            .into_response();
    }
    let rendered = match state.session.ensure_model().await {
        Ok(model) => state.renderer_for(&model).forecast_svg(&latest.outcome.window),
        Err(e) => Err(e),
    };
    match rendered {
        Ok(svg) => ([(header::CONTENT_TYPE, SVG_MIME)], svg).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

pub async fn get_latest_csv(State(state): State<AppState>) -> Response {
    let Some(latest) = state.session.latest().await else {
        return no_forecast();
    };
    match window_to_csv(&latest.outcome.window) {
        Ok(csv) => (
            [
                (header::CONTENT_TYPE, EXPORT_MIME.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
                ),
            ],
            csv,
        )
            .into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

/// Payload pushed to websocket clients on every session status change
fn status_event(status: SessionStatus, snapshot: &SessionSnapshot) -> serde_json::Value {
    json!({
        "type": "status",
        "status": status,
        "label": status.to_string(),
        "snapshot": snapshot,
    })
}

pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_websocket(socket, state))
}

async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.session.subscribe();

    let initial = json!({
        "type": "initial",
        "snapshot": state.session.snapshot().await,
    });
    if sender.send(Message::Text(initial.to_string())).await.is_err() {
        return;
    }

    let session = state.session.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(status) => {
                    let event = status_event(status, &session.snapshot().await);
                    if sender.send(Message::Text(event.to_string())).await.is_err() {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Websocket client lagged, skipped {} status updates", skipped);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    loop {
        tokio::select! {
            _ = &mut send_task => break,
            msg = receiver.next() => match msg {
                Some(Ok(Message::Close(_))) | None => {
                    info!("Websocket client disconnected");
                    break;
                }
                Some(Err(e)) => {
                    warn!("Websocket error: {}", e);
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }

    send_task.abort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_status_event_carries_snapshot() {
        let snapshot = SessionSnapshot {
            status: SessionStatus::ForecastFailed,
            model_source: "models/sales.json".to_string(),
            model_name: Some("sales".to_string()),
            model_error: None,
            last_run: None,
            last_error: Some("invalid forecast horizon".to_string()),
            forecasts_count: 2,
            started_at: Utc::now(),
        };

        let event = status_event(SessionStatus::ForecastFailed, &snapshot);
        assert_eq!(event["type"], "status");
        assert_eq!(event["status"], "forecast_failed");
        assert_eq!(event["label"], "Forecast failed");
        assert_eq!(event["snapshot"]["forecasts_count"], 2);
        assert_eq!(event["snapshot"]["last_error"], "invalid forecast horizon");
    }
}
