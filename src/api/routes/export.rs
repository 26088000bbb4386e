use std::path::PathBuf;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::api::errors::ApiResult;
use crate::api::AppState;
use crate::errors::BreachwatchError;
use crate::reporting::export::write_export;
use crate::reporting::{ExportFormat, ExportJob, ExportJobStatus, ExportRequest};

fn job_not_found(job_id: &str) -> BreachwatchError {
    BreachwatchError::NotFound(format!("Export job {} not found", job_id))
}

/// Queues an export and renders it in the background.
pub async fn create_export(
    State(state): State<AppState>,
    Json(req): Json<ExportRequest>,
) -> ApiResult<(StatusCode, Json<ExportJob>)> {
    let job = ExportJob::pending(req.format);
    let job_id = job.job_id.clone();
    state.export_jobs.insert(job_id.clone(), job.clone());

    let task_state = state.clone();
    tokio::spawn(async move {
        run_export(task_state, job_id, req).await;
    });

    Ok((StatusCode::ACCEPTED, Json(job)))
}

async fn run_export(state: AppState, job_id: String, req: ExportRequest) {
    let file_name = match state.export_jobs.get_mut(&job_id) {
        Some(mut job) => {
            job.status = ExportJobStatus::Processing;
            job.file_name()
        }
        None => return,
    };

    let dir = PathBuf::from(&state.config.export.directory);
    let result = write_export(&state.db, &req, &dir, &file_name).await;

    if let Some(mut job) = state.export_jobs.get_mut(&job_id) {
        job.completed_at = Some(Utc::now());
        match result {
            Ok((_, records)) => {
                job.status = ExportJobStatus::Completed;
                job.total_records = records;
                job.download_url = Some(format!("/api/export/download/{}", job_id));
                info!(job_id = %job_id, records, "Export job completed");
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Export job failed");
                job.status = ExportJobStatus::Failed;
                job.error_message = Some(e.to_string());
            }
        }
    }
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<ExportJob>> {
    state.export_jobs
        .get(&job_id)
        .map(|job| Json(job.clone()))
        .ok_or_else(|| job_not_found(&job_id))
}

pub async fn download(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let job = state.export_jobs
        .get(&job_id)
        .map(|job| job.clone())
        .ok_or_else(|| job_not_found(&job_id))?;

    if job.status != ExportJobStatus::Completed {
        return Err(BreachwatchError::Conflict(format!(
            "Export job {} is not ready (status: {:?})",
            job_id, job.status
        )));
    }

    let file_name = job.file_name();
    let path = PathBuf::from(&state.config.export.directory).join(&file_name);
    let body = tokio::fs::read(&path).await?;

    Ok((
        [
            (header::CONTENT_TYPE, job.format.media_type().to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file_name)),
        ],
        body,
    ))
}

pub async fn formats() -> Json<Value> {
    let formats: Vec<Value> = ExportFormat::ALL
        .iter()
        .map(|f| json!({
            "format": f,
            "media_type": f.media_type(),
            "description": f.describe(),
        }))
        .collect();
    Json(json!({ "formats": formats }))
}
