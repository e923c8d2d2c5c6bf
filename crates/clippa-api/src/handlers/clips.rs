//! Clip job handlers.

use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use clippa_models::{ClipRequest, JobStatus, JobStatusView};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Lifetime of signed download URLs.
pub const SIGNED_URL_TTL: Duration = Duration::from_secs(60);

const DEFAULT_DOWNLOAD_FILENAME: &str = "clip.mp4";

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateClipResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct DownloadUrlQuery {
    pub filename: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DownloadUrlResponse {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Submit a clip job. Processing continues after the response.
pub async fn create_clip(
    State(state): State<AppState>,
    Json(request): Json<ClipRequest>,
) -> ApiResult<(StatusCode, Json<CreateClipResponse>)> {
    let job_id = state.orchestrator.submit(request).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(CreateClipResponse {
            id: job_id.to_string(),
        }),
    ))
}

pub async fn get_clip(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobStatusView>> {
    let job = state
        .jobs
        .get_job(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;
    Ok(Json(job.view()))
}

/// Short-lived download URL for a finished clip.
pub async fn get_clip_url(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DownloadUrlQuery>,
) -> ApiResult<Json<DownloadUrlResponse>> {
    let job = state
        .jobs
        .get_job(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    let storage_path = match (job.status, job.storage_path) {
        (JobStatus::Ready, Some(path)) => path,
        _ => return Err(ApiError::conflict("Job not ready")),
    };

    let filename = query
        .filename
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DOWNLOAD_FILENAME.to_string());

    let url = state
        .blobs
        .signed_url(&storage_path, &filename, SIGNED_URL_TTL)
        .await?;
    Ok(Json(DownloadUrlResponse { url }))
}

/// Delete a job record and, best-effort, its stored clip.
pub async fn cleanup_clip(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse>> {
    if let Some(path) = state.jobs.get_job(&id).await?.and_then(|job| job.storage_path) {
        if let Err(e) = state.blobs.delete(&path).await {
            warn!(job_id = %id, key = %path, error = %e, "Failed to delete stored clip");
        }
    }
    state.jobs.delete_job(&id).await?;
    info!(job_id = %id, "Job cleaned up");
    Ok(Json(SuccessResponse { success: true }))
}
