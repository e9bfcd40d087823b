use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header::CONTENT_TYPE},
    response::IntoResponse,
    routing::{get, post},
};
use std::sync::Arc;

use crate::aggregation::DashboardSummary;
use crate::events::EventRecord;
use crate::server::dashboard::RefreshOutcome;
use crate::web::{AppState, error::AppError};

const DEFAULT_IMAGE_TYPE: &str = "application/octet-stream";

pub fn dashboard_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/summary", get(get_summary))
        .route("/events", get(get_events))
        .route("/refresh", post(refresh_events))
        .route("/snapshot", get(get_snapshot))
        .route("/snapshot/refresh", post(refresh_snapshot))
}

async fn get_summary(State(app_state): State<Arc<AppState>>) -> Json<DashboardSummary> {
    Json(app_state.dashboard.summary().await)
}

async fn get_events(State(app_state): State<Arc<AppState>>) -> Json<Vec<EventRecord>> {
    let events = app_state.dashboard.events().await;
    Json(events.as_ref().clone())
}

async fn refresh_events(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<RefreshOutcome>, AppError> {
    let outcome = app_state.dashboard.refresh_events().await?;
    Ok(Json(outcome))
}

async fn get_snapshot(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = app_state
        .dashboard
        .latest_snapshot()
        .await
        .ok_or_else(|| AppError::NotFound("No snapshot fetched yet".to_string()))?;

    let content_type = snapshot
        .image
        .content_type
        .clone()
        .unwrap_or_else(|| DEFAULT_IMAGE_TYPE.to_string());
    Ok(([(CONTENT_TYPE, content_type)], snapshot.image.bytes.clone()))
}

async fn refresh_snapshot(
    State(app_state): State<Arc<AppState>>,
) -> Result<StatusCode, AppError> {
    app_state.dashboard.refresh_snapshot().await?;
    Ok(StatusCode::NO_CONTENT)
}
