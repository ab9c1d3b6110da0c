//! Core job and file data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Job identifier (SQLite rowid).
pub type JobId = i64;

/// File identifier (SQLite rowid).
pub type FileId = i64;

/// Wraps input content in the stand-in output envelope that marks a
/// successful transformation.
pub fn wrap_output(input: &str) -> String {
    format!("<result>{}</result>", input)
}

/// Error for illegal file state transitions.
///
/// A programmer error in normal operation: the processor only ever drives
/// files along the legal path, so seeing this means something mutated a file
/// outside the state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal file state transition: {from:?} -> {to:?}")]
pub struct IllegalTransition {
    pub from: FileState,
    pub to: FileState,
}

/// State of a single file within a job.
///
/// State machine flow:
/// ```text
/// Init -> Active -> Success
///            |
///            v
///          Error
/// ```
///
/// `Success` and `Error` are terminal; no transition leaves them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    /// Queued, untouched by the processor.
    Init,
    /// Processing in progress.
    Active,
    /// Processed successfully, output content produced (terminal).
    Success,
    /// Processing failed, error message recorded (terminal).
    Error,
}

impl FileState {
    /// Returns true if no further transition is possible from this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FileState::Success | FileState::Error)
    }

    /// Returns true if `self -> to` is a legal transition.
    ///
    /// The only legal transitions are `Init -> Active`, `Active -> Success`
    /// and `Active -> Error`.
    pub fn can_transition(&self, to: FileState) -> bool {
        matches!(
            (self, to),
            (FileState::Init, FileState::Active)
                | (FileState::Active, FileState::Success)
                | (FileState::Active, FileState::Error)
        )
    }

    /// Checks transition legality, returning the target state on success.
    pub fn transition(&self, to: FileState) -> Result<FileState, IllegalTransition> {
        if self.can_transition(to) {
            Ok(to)
        } else {
            Err(IllegalTransition { from: *self, to })
        }
    }

    /// Returns the state as a string (for filtering and metrics labels).
    pub fn as_str(&self) -> &'static str {
        match self {
            FileState::Init => "init",
            FileState::Active => "active",
            FileState::Success => "success",
            FileState::Error => "error",
        }
    }
}

/// Aggregate state of a job, derived from its file states.
///
/// Never stored: recomputed from the current file rows on every read so the
/// aggregate can never drift from the files it summarizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// No files yet.
    Pending,
    /// At least one file is still in `Init` or `Active`.
    Processing,
    /// Every file has reached a terminal state.
    Completed,
}

impl JobState {
    /// Derive the job state from a slice of file states.
    ///
    /// Total and side-effect free: empty input yields `Pending`.
    pub fn derive(files: &[FileState]) -> JobState {
        if files.is_empty() {
            JobState::Pending
        } else if files.iter().all(FileState::is_terminal) {
            JobState::Completed
        } else {
            JobState::Processing
        }
    }

    /// Returns the state as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
        }
    }
}

/// A job: a batch of files submitted and processed together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    /// Unique identifier, assigned at creation.
    pub id: JobId,

    /// When the job was created.
    pub created_at: DateTime<Utc>,

    /// Owning user.
    pub user: String,

    /// Input location the files were read from.
    pub folder_in: String,

    /// Output location processing artifacts are written to.
    pub folder_out: String,
}

/// One unit of work within a job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobFile {
    /// Unique identifier.
    pub id: FileId,

    /// Owning job (immutable association).
    pub job_id: JobId,

    /// Original file name.
    pub filename: String,

    /// Full source path the content was read from.
    pub filepath: String,

    /// Input content.
    pub content: String,

    /// Output content, present only after a successful run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_out: Option<String>,

    /// Error message, present only after a failed run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Current state.
    pub state: FileState,

    /// When the file record was created.
    pub created_at: DateTime<Utc>,

    /// When the file reached a terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
}

/// A job together with its files, in creation order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobWithFiles {
    #[serde(flatten)]
    pub job: Job,
    pub files: Vec<JobFile>,
}

impl JobWithFiles {
    /// The derived aggregate state of this job.
    pub fn state(&self) -> JobState {
        JobState::derive(&self.file_states())
    }

    fn file_states(&self) -> Vec<FileState> {
        self.files.iter().map(|f| f.state).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_output() {
        assert_eq!(wrap_output("hello"), "<result>hello</result>");
        assert_eq!(wrap_output(""), "<result></result>");
    }

    #[test]
    fn test_init_and_active_are_not_terminal() {
        assert!(!FileState::Init.is_terminal());
        assert!(!FileState::Active.is_terminal());
    }

    #[test]
    fn test_success_and_error_are_terminal() {
        assert!(FileState::Success.is_terminal());
        assert!(FileState::Error.is_terminal());
    }

    #[test]
    fn test_legal_transitions() {
        assert!(FileState::Init.can_transition(FileState::Active));
        assert!(FileState::Active.can_transition(FileState::Success));
        assert!(FileState::Active.can_transition(FileState::Error));
    }

    #[test]
    fn test_illegal_transitions() {
        // Skipping Active
        assert!(!FileState::Init.can_transition(FileState::Success));
        assert!(!FileState::Init.can_transition(FileState::Error));
        // Leaving a terminal state
        assert!(!FileState::Success.can_transition(FileState::Active));
        assert!(!FileState::Success.can_transition(FileState::Error));
        assert!(!FileState::Error.can_transition(FileState::Active));
        assert!(!FileState::Error.can_transition(FileState::Success));
        // Going backwards
        assert!(!FileState::Active.can_transition(FileState::Init));
        // Self transitions
        assert!(!FileState::Init.can_transition(FileState::Init));
        assert!(!FileState::Active.can_transition(FileState::Active));
    }

    #[test]
    fn test_transition_returns_target_state() {
        let next = FileState::Init.transition(FileState::Active).unwrap();
        assert_eq!(next, FileState::Active);
    }

    #[test]
    fn test_transition_error_carries_both_states() {
        let err = FileState::Success
            .transition(FileState::Active)
            .unwrap_err();
        assert_eq!(err.from, FileState::Success);
        assert_eq!(err.to, FileState::Active);
    }

    #[test]
    fn test_derive_empty_is_pending() {
        assert_eq!(JobState::derive(&[]), JobState::Pending);
    }

    #[test]
    fn test_derive_all_terminal_is_completed() {
        assert_eq!(
            JobState::derive(&[FileState::Success, FileState::Error, FileState::Success]),
            JobState::Completed
        );
        assert_eq!(JobState::derive(&[FileState::Error]), JobState::Completed);
    }

    #[test]
    fn test_derive_any_non_terminal_is_processing() {
        assert_eq!(
            JobState::derive(&[FileState::Success, FileState::Init]),
            JobState::Processing
        );
        assert_eq!(
            JobState::derive(&[FileState::Active]),
            JobState::Processing
        );
        assert_eq!(
            JobState::derive(&[FileState::Error, FileState::Active, FileState::Success]),
            JobState::Processing
        );
    }

    #[test]
    fn test_file_state_serialization() {
        let json = serde_json::to_string(&FileState::Init).unwrap();
        assert_eq!(json, r#""init""#);

        let deserialized: FileState = serde_json::from_str(r#""success""#).unwrap();
        assert_eq!(deserialized, FileState::Success);
    }

    #[test]
    fn test_job_state_serialization() {
        let json = serde_json::to_string(&JobState::Processing).unwrap();
        assert_eq!(json, r#""processing""#);
    }

    #[test]
    fn test_as_str() {
        assert_eq!(FileState::Init.as_str(), "init");
        assert_eq!(FileState::Active.as_str(), "active");
        assert_eq!(FileState::Success.as_str(), "success");
        assert_eq!(FileState::Error.as_str(), "error");
        assert_eq!(JobState::Pending.as_str(), "pending");
        assert_eq!(JobState::Completed.as_str(), "completed");
    }

    #[test]
    fn test_job_with_files_derived_state() {
        let now = Utc::now();
        let job = Job {
            id: 1,
            created_at: now,
            user: "user@example.com".to_string(),
            folder_in: "/in".to_string(),
            folder_out: "/out".to_string(),
        };

        let mut with_files = JobWithFiles {
            job,
            files: vec![],
        };
        assert_eq!(with_files.state(), JobState::Pending);

        with_files.files.push(JobFile {
            id: 1,
            job_id: 1,
            filename: "a.txt".to_string(),
            filepath: "/in/a.txt".to_string(),
            content: "hello".to_string(),
            content_out: None,
            error: None,
            state: FileState::Init,
            created_at: now,
            processed_at: None,
        });
        assert_eq!(with_files.state(), JobState::Processing);

        with_files.files[0].state = FileState::Success;
        assert_eq!(with_files.state(), JobState::Completed);
    }

    #[test]
    fn test_job_file_skips_empty_optionals() {
        let file = JobFile {
            id: 1,
            job_id: 1,
            filename: "a.txt".to_string(),
            filepath: "/in/a.txt".to_string(),
            content: "hello".to_string(),
            content_out: None,
            error: None,
            state: FileState::Init,
            created_at: Utc::now(),
            processed_at: None,
        };
        let json = serde_json::to_string(&file).unwrap();
        assert!(!json.contains("content_out"));
        assert!(!json.contains("error"));
        assert!(!json.contains("processed_at"));
    }
}
