//! Job storage trait and types.

use thiserror::Error;

use crate::job::{FileId, FileState, IllegalTransition, Job, JobFile, JobId, JobWithFiles};

/// Error type for job store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Job not found.
    #[error("job not found: {0}")]
    JobNotFound(JobId),

    /// File not found.
    #[error("file not found: {0}")]
    FileNotFound(FileId),

    /// Attempted file state change violates the state machine.
    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

/// Request to create a new job.
#[derive(Debug, Clone)]
pub struct CreateJobRequest {
    /// Owning user.
    pub user: String,
    /// Input location.
    pub folder_in: String,
    /// Output location.
    pub folder_out: String,
}

/// Trait for job storage backends.
///
/// The single mutation point for job and file records. Implementations must
/// make each call atomic with respect to concurrent readers: a reader never
/// observes a file mid-transition with inconsistent fields.
pub trait JobStore: Send + Sync {
    /// Create a new job with no files.
    fn create(&self, request: CreateJobRequest) -> Result<Job, StoreError>;

    /// Add a file to a job, in `Init` state with empty output and error.
    fn add_file(
        &self,
        job_id: JobId,
        filename: &str,
        filepath: &str,
        content: &str,
    ) -> Result<JobFile, StoreError>;

    /// Get a job by id.
    fn get(&self, id: JobId) -> Result<Option<Job>, StoreError>;

    /// Get a job together with its files, in creation order.
    fn get_with_files(&self, id: JobId) -> Result<Option<JobWithFiles>, StoreError>;

    /// List all jobs, newest first.
    fn list(&self) -> Result<Vec<Job>, StoreError>;

    /// List a job's files in creation order.
    fn files_for_job(&self, job_id: JobId) -> Result<Vec<JobFile>, StoreError>;

    /// Get a single file by id.
    fn get_file(&self, id: FileId) -> Result<Option<JobFile>, StoreError>;

    /// Persist the full mutable state of a file.
    ///
    /// Saving a file whose row no longer exists is a silent no-op: a batch
    /// whose job was deleted mid-run drains without errors.
    fn save_file(&self, file: &JobFile) -> Result<(), StoreError>;

    /// Transition a file to a new state, enforcing transition legality.
    ///
    /// A transition into a terminal state also stamps `processed_at` and the
    /// companion fields (`content_out` on success, `error` on failure), so a
    /// terminal file always carries them regardless of who transitioned it.
    fn update_file_state(&self, id: FileId, state: FileState) -> Result<JobFile, StoreError>;

    /// Permanently delete a job and all its files.
    /// Returns the deleted job if found.
    fn delete(&self, id: JobId) -> Result<Job, StoreError>;
}
