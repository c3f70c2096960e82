// HTTP request handlers
use crate::application::detail_service::DetailSeries;
use crate::application::runtime::Command;
use crate::domain::display::{DisplayMode, DisplayRange, ModeError, ModeRequest};
use crate::domain::energy::DetailKind;
use crate::presentation::app_state::AppState;
use crate::presentation::chart_view::{ChartSnapshot, ChartUpdate};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use chrono::NaiveDate;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, oneshot, watch};

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

/// Body of `POST /mode`.
#[derive(Debug, Deserialize)]
pub struct ModeBody {
    pub mode: DisplayMode,
    /// Required for `day`.
    pub date: Option<NaiveDate>,
    /// Epoch milliseconds, required for `range`.
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl ModeBody {
    pub fn into_request(self) -> Result<ModeRequest, String> {
        match self.mode {
            DisplayMode::Realtime => Ok(ModeRequest::Realtime),
            DisplayMode::Today => Ok(ModeRequest::Today),
            DisplayMode::Day => self
                .date
                .map(ModeRequest::Day)
                .ok_or_else(|| "day mode needs a date".to_string()),
            DisplayMode::Range => match (self.from, self.to) {
                (Some(from_ms), Some(to_ms)) => Ok(ModeRequest::Range { from_ms, to_ms }),
                _ => Err("range mode needs from and to".to_string()),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DetailQuery {
    pub from: i64,
    pub to: i64,
    pub kind: DetailKind,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Current chart contents
pub async fn get_chart(State(state): State<Arc<AppState>>) -> Json<ChartSnapshot> {
    Json(state.chart.snapshot())
}

/// Live chart updates as server-sent events
pub async fn stream_chart(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = chart_events(state.chart.subscribe(), state.shutdown.clone());
    Sse::new(events).keep_alive(KeepAlive::default())
}

/// Encoded chart updates until the update channel closes or shutdown begins.
fn chart_events(
    mut updates: broadcast::Receiver<ChartUpdate>,
    mut shutdown: watch::Receiver<bool>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        loop {
            let received = tokio::select! {
                _ = shutdown.wait_for(|stopping| *stopping) => break,
                received = updates.recv() => received,
            };

            match received {
                Ok(update) => match Event::default().json_data(&update) {
                    Ok(event) => yield Ok::<Event, Infallible>(event),
                    Err(e) => tracing::warn!("Failed to encode chart update: {}", e),
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Chart stream subscriber lagged by {} updates", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}

/// Switch display mode
pub async fn select_mode(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ModeBody>,
) -> Result<Json<ChartSnapshot>, ApiError> {
    let request = body
        .into_request()
        .map_err(|message| api_error(StatusCode::BAD_REQUEST, message))?;

    let (reply, response) = oneshot::channel();
    state
        .commands
        .send(Command::Select { request, reply })
        .await
        .map_err(|_| {
            api_error(StatusCode::SERVICE_UNAVAILABLE, "dashboard engine is not running")
        })?;

    match response.await {
        Ok(Ok(())) => Ok(Json(state.chart.snapshot())),
        Ok(Err(e @ ModeError::RealtimeEnforced)) => {
            Err(api_error(StatusCode::CONFLICT, e.to_string()))
        }
        Ok(Err(e @ ModeError::InvalidRange { .. })) => {
            Err(api_error(StatusCode::BAD_REQUEST, e.to_string()))
        }
        Err(_) => Err(api_error(StatusCode::SERVICE_UNAVAILABLE, "dashboard engine stopped")),
    }
}

/// Re-read pricing settings from the backend
pub async fn reload_settings(State(state): State<Arc<AppState>>) -> StatusCode {
    match state.commands.send(Command::ReloadSettings).await {
        Ok(()) => StatusCode::ACCEPTED,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Hour or day drill-down
pub async fn get_detail(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DetailQuery>,
) -> Result<Json<DetailSeries>, ApiError> {
    let range = DisplayRange::new(query.from, query.to)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    state
        .details
        .detail(range, query.kind)
        .await
        .map(Json)
        .map_err(|e| api_error(StatusCode::BAD_GATEWAY, format!("{e:#}")))
}
