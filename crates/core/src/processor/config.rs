//! Configuration for the processor module.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the job processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Induced per-file delay in milliseconds, standing in for real work.
    #[serde(default = "default_work_delay_ms")]
    pub work_delay_ms: u64,
}

fn default_work_delay_ms() -> u64 {
    5000
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            work_delay_ms: default_work_delay_ms(),
        }
    }
}

impl ProcessorConfig {
    /// Sets the per-file work delay in milliseconds.
    pub fn with_work_delay_ms(mut self, ms: u64) -> Self {
        self.work_delay_ms = ms;
        self
    }

    /// The per-file work delay as a `Duration`.
    pub fn work_delay(&self) -> Duration {
        Duration::from_millis(self.work_delay_ms)
    }
}
