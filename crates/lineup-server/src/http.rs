use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDateTime;
use lineup_core::{
    scoring_csv, ContentCatalog, ContentItem, DomainError, Generator, JobKind, Profile,
    ProgrammingRequest,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::{runner, AppState};

/// Create the HTTP router with all REST endpoints
pub fn create_http_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        // Profile management
        .route("/profiles", get(list_profiles))
        .route("/profiles/:profile_id", post(upsert_profile))
        // Content catalog (demo/in-memory)
        .route("/content", post(insert_content))
        // Programming runs
        .route("/programming/run", post(run_programming))
        // Playlist scoring
        .route("/scoring/run", post(run_scoring))
        // Jobs
        .route("/jobs", get(list_jobs))
        .route("/jobs/:job_id", get(get_job))
        .route("/jobs/:job_id/cancel", post(cancel_job))
        .route("/jobs/clear", post(clear_jobs))
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

// ============================================================================
// PROFILES
// ============================================================================

async fn list_profiles(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let profiles = state.profiles.read().await;
    let summaries: Vec<_> = profiles
        .iter()
        .map(|(id, profile)| {
            json!({
                "id": id,
                "name": profile.name,
                "time_blocks": profile.time_blocks.len(),
            })
        })
        .collect();
    Json(summaries)
}

async fn upsert_profile(
    State(state): State<Arc<AppState>>,
    Path(profile_id): Path<String>,
    Json(mut profile): Json<Profile>,
) -> Result<impl IntoResponse, AppError> {
    profile.id = profile_id.clone();
    state.profiles.write().await.insert(profile_id.clone(), profile);
    Ok(Json(json!({ "id": profile_id })))
}

// ============================================================================
// CONTENT
// ============================================================================

async fn insert_content(
    State(state): State<Arc<AppState>>,
    Json(items): Json<Vec<ContentItem>>,
) -> impl IntoResponse {
    let count = items.len();
    state.catalog.insert_all(items).await;
    Json(json!({ "inserted": count }))
}

// ============================================================================
// PROGRAMMING
// ============================================================================

async fn run_programming(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProgrammingRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate().map_err(AppError::from)?;

    let profile = state
        .profiles
        .read()
        .await
        .get(&request.profile_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Profile not found: {}", request.profile_id)))?;

    let pool = state
        .catalog
        .fetch_pool(&profile.libraries)
        .await
        .map_err(AppError::Internal)?;
    if pool.is_empty() {
        return Err(AppError::BadRequest("content pool is empty".to_string()));
    }

    let job_id = state
        .coordinator
        .create_job(
            JobKind::Programming,
            &format!("Programming run for channel {}", request.channel_id),
            Some(request.channel_id.clone()),
            Some(request.profile_id.clone()),
            Some(request.iterations),
        )
        .await;

    runner::spawn_programming_job(Arc::clone(&state), job_id.clone(), request, profile, pool)
        .await;

    Ok(Json(json!({ "job_id": job_id })))
}

// ============================================================================
// SCORING
// ============================================================================

#[derive(Debug, Deserialize)]
struct ScoringRunRequest {
    profile_id: String,
    items: Vec<ScoringRunItem>,
}

#[derive(Debug, Deserialize)]
struct ScoringRunItem {
    #[serde(flatten)]
    item: ContentItem,
    start_time: NaiveDateTime,
}

#[derive(Debug, Deserialize)]
struct ScoringRunQuery {
    #[serde(default)]
    format: Option<String>,
}

async fn run_scoring(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScoringRunQuery>,
    Json(request): Json<ScoringRunRequest>,
) -> Result<Response, AppError> {
    let profile = state
        .profiles
        .read()
        .await
        .get(&request.profile_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Profile not found: {}", request.profile_id)))?;

    let items: Vec<(ContentItem, NaiveDateTime)> = request
        .items
        .into_iter()
        .map(|entry| (entry.item, entry.start_time))
        .collect();

    let scored = tokio::task::spawn_blocking(move || {
        Generator::new().score_playlist(&items, &profile)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("scoring task panicked: {e}")))?;

    if query.format.as_deref() == Some("csv") {
        let csv = scoring_csv(&scored.programs);
        return Ok((
            [
                (header::CONTENT_TYPE, "text/csv"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"scoring.csv\"",
                ),
            ],
            csv,
        )
            .into_response());
    }

    Ok(Json(json!({
        "programs": scored.programs,
        "total_score": scored.total_score,
        "average_score": scored.average_score,
    }))
    .into_response())
}

// ============================================================================
// JOBS
// ============================================================================

#[derive(Debug, Deserialize)]
struct ListJobsQuery {
    #[serde(default)]
    limit: Option<usize>,
}

async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListJobsQuery>,
) -> impl IntoResponse {
    let jobs = state
        .coordinator
        .recent_jobs(query.limit.unwrap_or(20))
        .await;
    Json(jobs)
}

async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let job = state
        .coordinator
        .get_job(&job_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Job not found: {job_id}")))?;
    Ok(Json(job))
}

async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    let cancelled = state.coordinator.cancel_job(&job_id).await;
    if cancelled {
        if let Some(token) = state.cancel_token_for(&job_id).await {
            token.cancel();
        }
    }
    Json(json!({ "cancelled": cancelled }))
}

async fn clear_jobs(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let removed = state.coordinator.clear_terminal().await;
    Json(json!({ "removed": removed }))
}

// ============================================================================
// ERRORS
// ============================================================================

/// HTTP error mapping: config problems are the caller's fault, dependency
/// and internal errors are ours.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Config(msg) | DomainError::Data(msg) => AppError::BadRequest(msg),
            DomainError::Dependency(msg) => {
                AppError::Internal(anyhow::anyhow!("dependency unavailable: {msg}"))
            }
            DomainError::Internal(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(err) => {
                tracing::error!("internal error: {err:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
