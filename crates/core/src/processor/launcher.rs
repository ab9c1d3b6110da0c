//! Fire-and-forget launching of job runs.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::job::JobId;

use super::runner::JobProcessor;

/// Schedules processor runs without blocking the caller.
///
/// `launch` returns immediately; the run executes on the runtime and is
/// fully isolated from the launching context (`JobProcessor::run` handles
/// and logs everything itself). Completion is observable only through the
/// store and the notifier.
#[derive(Clone)]
pub struct JobLauncher {
    processor: Arc<JobProcessor>,
}

impl JobLauncher {
    /// Creates a launcher around a processor.
    pub fn new(processor: Arc<JobProcessor>) -> Self {
        Self { processor }
    }

    /// Starts a background run for `job_id`.
    ///
    /// The returned handle may be dropped; it exists so callers that care
    /// (tests, shutdown paths) can await the run.
    pub fn launch(&self, job_id: JobId) -> JoinHandle<()> {
        debug!("Launching background run for job {}", job_id);
        let processor = Arc::clone(&self.processor);
        tokio::spawn(async move {
            processor.run(job_id).await;
        })
    }
}
