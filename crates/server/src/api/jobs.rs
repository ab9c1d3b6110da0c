//! Job and file API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use filesmith_core::{
    CreateJobRequest, FileId, FileState, Job, JobFile, JobId, JobState, JobWithFiles, Notifier,
    StoreError,
};

use crate::metrics::{JOBS_CREATED_TOTAL, JOBS_DELETED_TOTAL};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a job
#[derive(Debug, Deserialize)]
pub struct CreateJobBody {
    /// Owning user (defaults to "anonymous")
    pub user: Option<String>,
    /// Directory the input files are read from
    pub folder_in: String,
    /// Directory processing artifacts are written to
    pub folder_out: String,
}

/// Request body for manually transitioning a file
#[derive(Debug, Deserialize)]
pub struct UpdateFileStateBody {
    pub state: FileState,
}

/// A file in API responses
#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub id: FileId,
    pub job_id: JobId,
    pub filename: String,
    pub filepath: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_out: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub state: FileState,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<String>,
}

impl From<JobFile> for FileResponse {
    fn from(file: JobFile) -> Self {
        Self {
            id: file.id,
            job_id: file.job_id,
            filename: file.filename,
            filepath: file.filepath,
            content: file.content,
            content_out: file.content_out,
            error: file.error,
            state: file.state,
            created_at: file.created_at.to_rfc3339(),
            processed_at: file.processed_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// A job with its files and derived state
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: JobId,
    pub created_at: String,
    pub user: String,
    pub folder_in: String,
    pub folder_out: String,
    pub state: JobState,
    pub files: Vec<FileResponse>,
}

impl From<JobWithFiles> for JobResponse {
    fn from(with_files: JobWithFiles) -> Self {
        let state = with_files.state();
        Self {
            id: with_files.job.id,
            created_at: with_files.job.created_at.to_rfc3339(),
            user: with_files.job.user,
            folder_in: with_files.job.folder_in,
            folder_out: with_files.job.folder_out,
            state,
            files: with_files.files.into_iter().map(FileResponse::from).collect(),
        }
    }
}

/// Response for listing jobs
#[derive(Debug, Serialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<JobResponse>,
    pub total: usize,
}

/// A deleted job (files are gone with it)
#[derive(Debug, Serialize)]
pub struct DeletedJobResponse {
    pub id: JobId,
    pub created_at: String,
    pub user: String,
    pub folder_in: String,
    pub folder_out: String,
}

impl From<Job> for DeletedJobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            created_at: job.created_at.to_rfc3339(),
            user: job.user,
            folder_in: job.folder_in,
            folder_out: job.folder_out,
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct JobErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<JobErrorResponse>);

fn not_found(what: &str, id: i64) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(JobErrorResponse {
            error: format!("{} not found: {}", what, id),
        }),
    )
}

fn internal_error(e: impl std::fmt::Display) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(JobErrorResponse {
            error: e.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a new job, ingest every regular file in `folder_in` and launch
/// background processing.
pub async fn create_job(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateJobBody>,
) -> Result<(StatusCode, Json<JobResponse>), ApiError> {
    let folder_in = std::path::PathBuf::from(&body.folder_in);
    if !folder_in.is_dir() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(JobErrorResponse {
                error: format!("folder_in is not a directory: {}", body.folder_in),
            }),
        ));
    }

    let request = CreateJobRequest {
        user: body.user.unwrap_or_else(|| "anonymous".to_string()),
        folder_in: body.folder_in.clone(),
        folder_out: body.folder_out.clone(),
    };

    let job = state.job_store().create(request).map_err(internal_error)?;

    // Ingest input files in name order so file ids are deterministic
    let mut entries: Vec<std::path::PathBuf> = match std::fs::read_dir(&folder_in) {
        Ok(dir) => dir
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect(),
        Err(e) => {
            warn!("Failed to read folder_in {:?}: {}", folder_in, e);
            Vec::new()
        }
    };
    entries.sort();

    for path in entries {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        // Unreadable or non-UTF-8 files are ingested with empty content
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read {:?}: {}", path, e);
                String::new()
            }
        };
        state
            .job_store()
            .add_file(job.id, &filename, &path.to_string_lossy(), &content)
            .map_err(internal_error)?;
    }

    let with_files = state
        .job_store()
        .get_with_files(job.id)
        .map_err(internal_error)?
        .ok_or_else(|| not_found("Job", job.id))?;

    info!(
        "Created job {} with {} files from {}",
        job.id,
        with_files.files.len(),
        with_files.job.folder_in
    );
    JOBS_CREATED_TOTAL.inc();
    state.ws_broadcaster().job_updated(job.id);

    state.launcher().launch(job.id);

    Ok((StatusCode::CREATED, Json(JobResponse::from(with_files))))
}

/// List all jobs, newest first
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListJobsResponse>, ApiError> {
    let jobs = state.job_store().list().map_err(internal_error)?;

    let mut responses = Vec::with_capacity(jobs.len());
    for job in jobs {
        let files = state
            .job_store()
            .files_for_job(job.id)
            .map_err(internal_error)?;
        responses.push(JobResponse::from(JobWithFiles { job, files }));
    }

    let total = responses.len();
    Ok(Json(ListJobsResponse {
        jobs: responses,
        total,
    }))
}

/// Get a job by id, with its files
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<JobId>,
) -> Result<Json<JobResponse>, ApiError> {
    match state.job_store().get_with_files(id) {
        Ok(Some(with_files)) => Ok(Json(JobResponse::from(with_files))),
        Ok(None) => Err(not_found("Job", id)),
        Err(e) => Err(internal_error(e)),
    }
}

/// List a job's files
pub async fn get_job_files(
    State(state): State<Arc<AppState>>,
    Path(id): Path<JobId>,
) -> Result<Json<Vec<FileResponse>>, ApiError> {
    match state.job_store().get(id) {
        Ok(Some(_)) => {}
        Ok(None) => return Err(not_found("Job", id)),
        Err(e) => return Err(internal_error(e)),
    }

    let files = state.job_store().files_for_job(id).map_err(internal_error)?;
    Ok(Json(files.into_iter().map(FileResponse::from).collect()))
}

/// Delete a job and all its files
///
/// A batch already running for this job is not cancelled; its remaining
/// saves hit deleted rows and drain as no-ops.
pub async fn delete_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<JobId>,
) -> Result<Json<DeletedJobResponse>, ApiError> {
    match state.job_store().delete(id) {
        Ok(job) => {
            info!("Deleted job {}", id);
            JOBS_DELETED_TOTAL.inc();
            state.ws_broadcaster().job_deleted(id);
            Ok(Json(DeletedJobResponse::from(job)))
        }
        Err(StoreError::JobNotFound(_)) => Err(not_found("Job", id)),
        Err(e) => Err(internal_error(e)),
    }
}

/// Get a file's raw input content as plain text
pub async fn get_file_content(
    State(state): State<Arc<AppState>>,
    Path(id): Path<FileId>,
) -> Result<String, ApiError> {
    match state.job_store().get_file(id) {
        Ok(Some(file)) => Ok(file.content),
        Ok(None) => Err(not_found("File", id)),
        Err(e) => Err(internal_error(e)),
    }
}

/// Manually transition a file to a new state
pub async fn update_file_state(
    State(state): State<Arc<AppState>>,
    Path(id): Path<FileId>,
    Json(body): Json<UpdateFileStateBody>,
) -> Result<Json<FileResponse>, ApiError> {
    match state.job_store().update_file_state(id, body.state) {
        Ok(file) => {
            state.ws_broadcaster().job_updated(file.job_id);
            Ok(Json(FileResponse::from(file)))
        }
        Err(StoreError::FileNotFound(_)) => Err(not_found("File", id)),
        Err(StoreError::IllegalTransition(e)) => Err((
            StatusCode::CONFLICT,
            Json(JobErrorResponse {
                error: e.to_string(),
            }),
        )),
        Err(e) => Err(internal_error(e)),
    }
}
