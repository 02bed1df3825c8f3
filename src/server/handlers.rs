use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::cache::CacheStats;
use crate::error::ResolveError;
use crate::jurisdiction::Level;
use crate::orchestrator::{AggregateResult, ResolveFlags};
use crate::preload::QueueStats;
use crate::scheduler::SchedulerStatus;

use super::state::AppState;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

pub(super) struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    ApiError(status, msg.into())
}

impl From<ResolveError> for ApiError {
    fn from(e: ResolveError) -> Self {
        api_error(StatusCode::BAD_REQUEST, e.to_string())
    }
}

// ─── GET /api/representatives ────────────────────────────────────

#[derive(Deserialize)]
pub struct RepresentativesQuery {
    pub zip: Option<String>,
    #[serde(default)]
    pub committees: bool,
    #[serde(default)]
    pub refresh: bool,
}

pub async fn representatives(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RepresentativesQuery>,
) -> Result<Json<AggregateResult>, ApiError> {
    let start = Instant::now();

    let zip = params.zip.as_deref().unwrap_or("").trim();
    if zip.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Missing 'zip' parameter"));
    }

    let flags = ResolveFlags {
        include_committees: params.committees,
        force_refresh: params.refresh,
    };
    let result = state.orchestrator.resolve_representation(zip, flags).await?;

    info!(
        zip,
        records = result.total_records(),
        degraded = result.degraded,
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "GET /api/representatives"
    );
    Ok(Json(result))
}

// ─── POST /api/cache/events/{event} ──────────────────────────────

pub async fn invalidate(State(state): State<Arc<AppState>>, Path(event): Path<String>) -> Response {
    match state.orchestrator.invalidate(&event) {
        Ok(report) => Json(report).into_response(),
        Err(e) => api_error(StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}

// ─── POST /api/refresh/{level} ───────────────────────────────────

#[derive(Serialize)]
struct RefreshQueued {
    level: Level,
    queued: bool,
}

pub async fn refresh(State(state): State<Arc<AppState>>, Path(level): Path<String>) -> Result<Response, ApiError> {
    let level: Level = level
        .parse()
        .map_err(|e: String| api_error(StatusCode::BAD_REQUEST, e))?;

    match &state.scheduler {
        Some(scheduler) => {
            let queued = scheduler.trigger_emergency(level);
            let status = if queued {
                StatusCode::ACCEPTED
            } else {
                StatusCode::SERVICE_UNAVAILABLE
            };
            Ok((status, Json(RefreshQueued { level, queued })).into_response())
        }
        None => {
            let report = state.orchestrator.refresh(level).await;
            Ok(Json(report).into_response())
        }
    }
}

// ─── GET /api/health ─────────────────────────────────────────────

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    cache: CacheStats,
    preload: QueueStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    scheduler: Option<SchedulerStatus>,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<impl Serialize> {
    Json(HealthResponse {
        status: "ok",
        cache: state.orchestrator.cache_stats(),
        preload: state.orchestrator.preload_stats(),
        scheduler: state.scheduler.as_ref().map(|s| s.status()),
    })
}
