//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use tracing::{error, info, warn};

use super::responses::{
    ApiResponse, CalendarQuery, ClearResponse, ErrorResponse, HealthResponse, HeatmapQuery,
    StartTimerRequest, StatusResponse, TimerResponse,
};
use crate::{
    dashboard::{self, CalendarWeek, HeatmapDay, MonthlySummary, WeeklySummary},
    error::LogError,
    state::{AppState, EntryFields, LogEntry},
    timer::TaskId,
};

const DEFAULT_HEATMAP_DAYS: u32 = 365;
const MAX_HEATMAP_DAYS: u32 = 366;

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(e: LogError) -> ApiError {
    let status = match &e {
        LogError::NotFound(_) => StatusCode::NOT_FOUND,
        LogError::Invalid(_) => StatusCode::BAD_REQUEST,
        LogError::Store(_) => {
            error!("Task log storage failure: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ErrorResponse::new(e.to_string())))
}

/// Handle GET /timer - Return the timer snapshot and its progress
pub async fn timer_handler(State(state): State<Arc<AppState>>) -> Json<TimerResponse> {
    Json(state.timer.snapshot().into())
}

/// Handle POST /timer/start - Lock a logged task and start its countdown
pub async fn timer_start_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartTimerRequest>,
) -> Result<(StatusCode, Json<ApiResponse>), ApiError> {
    let started = state
        .start_task(&request.task_id, request.duration_seconds)
        .map_err(error_response)?;
    let snapshot = state.timer.snapshot();

    if started {
        info!("Timer start endpoint called - task {} locked", request.task_id);
        Ok((
            StatusCode::OK,
            Json(ApiResponse::started(
                format!("Timer started for task {}", request.task_id),
                snapshot,
            )),
        ))
    } else {
        let holder = snapshot
            .active_task_id
            .as_ref()
            .map_or_else(|| "another task".to_string(), |id| format!("task {}", id));
        warn!("Timer start for {} rejected, {} is locked", request.task_id, holder);
        Ok((
            StatusCode::CONFLICT,
            Json(ApiResponse::locked(format!("Timer is locked by {}", holder), snapshot)),
        ))
    }
}

/// Handle POST /timer/stop - Abort the locked task
pub async fn timer_stop_handler(State(state): State<Arc<AppState>>) -> Json<ApiResponse> {
    let active = state.timer.active_task_id();
    if state.timer.stop_timer() {
        let id = active.map_or_else(String::new, |id| id.to_string());
        info!("Timer stop endpoint called - task {} aborted", id);
        Json(ApiResponse::stopped(
            format!("Timer stopped for task {}", id),
            state.timer.snapshot(),
        ))
    } else {
        Json(ApiResponse::idle(
            "Timer was already idle".to_string(),
            state.timer.snapshot(),
        ))
    }
}

/// Handle GET /logs - List logged tasks
pub async fn list_logs_handler(State(state): State<Arc<AppState>>) -> Json<Vec<LogEntry>> {
    Json(state.logs.list())
}

/// Handle POST /logs - Log a new task
pub async fn add_log_handler(
    State(state): State<Arc<AppState>>,
    Json(fields): Json<EntryFields>,
) -> Result<(StatusCode, Json<LogEntry>), ApiError> {
    let entry = state.add_entry(fields).map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Handle PUT /logs/:id - Edit a logged task
pub async fn update_log_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(fields): Json<EntryFields>,
) -> Result<Json<LogEntry>, ApiError> {
    state
        .logs
        .update(&TaskId::new(id), fields)
        .map(Json)
        .map_err(error_response)
}

/// Handle DELETE /logs/:id - Delete a logged task
pub async fn delete_log_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<LogEntry>, ApiError> {
    state
        .delete_entry(&TaskId::new(id))
        .map(Json)
        .map_err(error_response)
}

/// Handle DELETE /logs - Clear the whole log
pub async fn clear_logs_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ClearResponse>, ApiError> {
    let removed = state.clear_entries().map_err(error_response)?;
    Ok(Json(ClearResponse { removed }))
}

/// Handle GET /dashboard/week - Summary of the current week
pub async fn week_handler(State(state): State<Arc<AppState>>) -> Json<WeeklySummary> {
    let today = state.clock.now().date_naive();
    Json(dashboard::weekly_summary(&state.logs.list(), today))
}

/// Handle GET /dashboard/month - Summary of the current month
pub async fn month_handler(State(state): State<Arc<AppState>>) -> Json<MonthlySummary> {
    let today = state.clock.now().date_naive();
    Json(dashboard::monthly_summary(&state.logs.list(), today))
}

/// Handle GET /dashboard/heatmap - Daily activity ending today
pub async fn heatmap_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HeatmapQuery>,
) -> Result<Json<Vec<HeatmapDay>>, ApiError> {
    let days = query.days.unwrap_or(DEFAULT_HEATMAP_DAYS);
    if days == 0 || days > MAX_HEATMAP_DAYS {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(format!(
                "days must be between 1 and {}",
                MAX_HEATMAP_DAYS
            ))),
        ));
    }
    let today = state.clock.now().date_naive();
    Ok(Json(dashboard::heatmap(&state.logs.list(), today, days)))
}

/// Handle GET /calendar/week - Scheduled tasks of one Monday-to-Sunday week
pub async fn calendar_week_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<CalendarWeek>, ApiError> {
    let day = query
        .start
        .unwrap_or_else(|| state.clock.now().date_naive());
    dashboard::calendar_week(&state.logs.list(), day)
        .map(Json)
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(format!("week of {} is out of range", day))),
            )
        })
}

/// Handle GET /status - Return current timer and log status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let (pending_tasks, completed_tasks) = state.logs.counts();
    Json(StatusResponse {
        timer: state.timer.snapshot(),
        pending_tasks,
        completed_tasks,
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
    })
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
