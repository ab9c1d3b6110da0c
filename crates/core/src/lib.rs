pub mod config;
pub mod job;
pub mod notify;
pub mod processor;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DatabaseConfig,
    SanitizedConfig, ServerConfig,
};
pub use job::{
    wrap_output, CreateJobRequest, FileId, FileState, IllegalTransition, Job, JobFile, JobId,
    JobState, JobStore, JobWithFiles, SqliteJobStore, StoreError,
};
pub use notify::{Notifier, NullNotifier};
pub use processor::{
    JobLauncher, JobProcessor, Outcome, OutcomeDecider, ProcessorConfig, RandomDecider,
};
