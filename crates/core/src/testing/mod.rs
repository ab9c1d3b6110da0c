//! Testing utilities and mock implementations.
//!
//! Mocks for the processor's two collaborator seams (notification and
//! outcome decision), plus fixtures for building jobs on disk and in the
//! store without boilerplate.

mod mock_notifier;
mod scripted_decider;

pub use mock_notifier::MockNotifier;
pub use scripted_decider::{Forced, ScriptedDecider};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;

    use crate::job::{CreateJobRequest, Job, JobFile, JobStore};

    /// Create a request with input/output folders under `root`.
    pub fn job_request(root: &Path) -> CreateJobRequest {
        CreateJobRequest {
            user: "user@example.com".to_string(),
            folder_in: root.join("in").display().to_string(),
            folder_out: root.join("out").display().to_string(),
        }
    }

    /// Create a job plus one file record per `(filename, content)` pair,
    /// writing each source file to the job's input folder on disk.
    pub fn job_with_files(
        store: &dyn JobStore,
        root: &Path,
        files: &[(&str, &str)],
    ) -> (Job, Vec<JobFile>) {
        let request = job_request(root);
        let folder_in = Path::new(&request.folder_in).to_path_buf();
        std::fs::create_dir_all(&folder_in).expect("failed to create input folder");

        let job = store.create(request).expect("failed to create job");

        let mut records = Vec::new();
        for (filename, content) in files {
            let filepath = folder_in.join(filename);
            std::fs::write(&filepath, content).expect("failed to write source file");
            let record = store
                .add_file(job.id, filename, &filepath.display().to_string(), content)
                .expect("failed to add file");
            records.push(record);
        }

        (job, records)
    }
}
