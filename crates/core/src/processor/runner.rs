//! Job processor implementation.
//!
//! Drives one job's files from `Init` to a terminal state, one at a time,
//! persisting every transition and notifying subscribers after each one.
//! A single file's failure is recorded and never aborts the batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, warn};

use crate::job::{wrap_output, FileState, JobFile, JobId, JobStore, StoreError};
use crate::notify::Notifier;

use super::config::ProcessorConfig;
use super::outcome::{Outcome, OutcomeDecider, RandomDecider};

/// The job processor.
///
/// Holds no per-job state; `run` can be called for any number of jobs
/// concurrently. Within one run, files are processed strictly sequentially.
pub struct JobProcessor {
    config: ProcessorConfig,
    store: Arc<dyn JobStore>,
    notifier: Arc<dyn Notifier>,
    decider: Arc<dyn OutcomeDecider>,
}

impl JobProcessor {
    /// Creates a new processor with the default (random) outcome decider.
    pub fn new(
        config: ProcessorConfig,
        store: Arc<dyn JobStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            store,
            notifier,
            decider: Arc::new(RandomDecider),
        }
    }

    /// Replaces the outcome decider (deterministic outcomes in tests).
    pub fn with_decider(mut self, decider: Arc<dyn OutcomeDecider>) -> Self {
        self.decider = decider;
        self
    }

    /// Processes every file of `job_id` to a terminal state.
    ///
    /// An unknown job id is a no-op: the background runner may race a delete
    /// and that is not an error condition. Nothing this method encounters
    /// propagates to the caller.
    pub async fn run(&self, job_id: JobId) {
        let loaded = match self.store.get_with_files(job_id) {
            Ok(Some(loaded)) => loaded,
            Ok(None) => {
                debug!("Job {} not found, nothing to process", job_id);
                return;
            }
            Err(e) => {
                error!("Failed to load job {}: {}", job_id, e);
                return;
            }
        };

        let folder_out = PathBuf::from(&loaded.job.folder_out);
        if let Err(e) = tokio::fs::create_dir_all(&folder_out).await {
            warn!(
                "Failed to create output folder {:?} for job {}: {}",
                folder_out, job_id, e
            );
        }

        debug!("Processing {} files for job {}", loaded.files.len(), job_id);

        for mut file in loaded.files {
            if let Err(e) = self.process_file(&mut file, &folder_out).await {
                // Store or state-machine anomaly on this file; the rest of
                // the batch still gets its chance.
                warn!(
                    "Skipping file {} ({}) of job {}: {}",
                    file.id, file.filename, job_id, e
                );
            }
        }
    }

    /// Drives a single file through `Active` to `Success` or `Error`.
    async fn process_file(
        &self,
        file: &mut JobFile,
        folder_out: &Path,
    ) -> Result<(), StoreError> {
        file.state = file.state.transition(FileState::Active)?;
        self.store.save_file(file)?;
        self.notifier.job_updated(file.job_id);

        // The induced delay stands in for real work. It holds no locks, so
        // other jobs' runs are unaffected.
        tokio::time::sleep(self.config.work_delay()).await;

        match self.decider.decide(file) {
            Outcome::Success => {
                self.copy_to_output(file, folder_out).await;
                file.content_out = Some(wrap_output(&file.content));
                file.error = None;
                file.state = file.state.transition(FileState::Success)?;
            }
            Outcome::Failure(message) => {
                self.write_error_artifact(file, folder_out, &message).await;
                file.content_out = None;
                file.error = Some(message);
                file.state = file.state.transition(FileState::Error)?;
            }
        }
        file.processed_at = Some(Utc::now());

        self.store.save_file(file)?;
        self.notifier.job_updated(file.job_id);

        Ok(())
    }

    /// Best-effort copy of the original source to the output location.
    /// A copy failure never changes the file's outcome.
    async fn copy_to_output(&self, file: &JobFile, folder_out: &Path) {
        let dest = folder_out.join(&file.filename);
        if let Err(e) = tokio::fs::copy(&file.filepath, &dest).await {
            warn!(
                "Failed to copy {} to {:?} for job {}: {}",
                file.filepath, dest, file.job_id, e
            );
        }
    }

    /// Best-effort write of a human-readable error artifact next to the
    /// would-be output.
    async fn write_error_artifact(&self, file: &JobFile, folder_out: &Path, message: &str) {
        let stem = Path::new(&file.filename)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| file.filename.clone());
        let error_path = folder_out.join(format!("{}_error.txt", stem));
        if let Err(e) = tokio::fs::write(&error_path, message).await {
            warn!(
                "Failed to write error artifact {:?} for job {}: {}",
                error_path, file.job_id, e
            );
        }
    }
}
