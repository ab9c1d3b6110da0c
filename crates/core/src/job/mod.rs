//! Job and file records, state machine, and storage.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteJobStore;
pub use store::{CreateJobRequest, JobStore, StoreError};
pub use types::{
    wrap_output, FileId, FileState, IllegalTransition, Job, JobFile, JobId, JobState, JobWithFiles,
};
