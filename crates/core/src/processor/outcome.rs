//! Outcome decision seam for simulated per-file work.
//!
//! The success/failure choice is deliberately kept out of the state machine
//! and behind a trait, so tests can force deterministic outcomes per file.

use rand::Rng;

use crate::job::JobFile;

/// Result of the simulated processing step for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The file processed successfully.
    Success,
    /// The file failed, with a descriptive message.
    Failure(String),
}

impl Outcome {
    /// A failure outcome with the standard message for `filename`.
    pub fn failure_for(filename: &str) -> Outcome {
        Outcome::Failure(format!(
            "Error processing file: {}\nSimulated processing failure.",
            filename
        ))
    }
}

/// Decides the outcome of the simulated work for one file.
pub trait OutcomeDecider: Send + Sync {
    fn decide(&self, file: &JobFile) -> Outcome;
}

/// The default decider: a uniform coin flip per file.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomDecider;

impl OutcomeDecider for RandomDecider {
    fn decide(&self, file: &JobFile) -> Outcome {
        if rand::thread_rng().gen_bool(0.5) {
            Outcome::Success
        } else {
            Outcome::failure_for(&file.filename)
        }
    }
}
