//! Deterministic outcome decider for testing.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::job::JobFile;
use crate::processor::{Outcome, OutcomeDecider};

/// Forced outcome for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forced {
    Success,
    Failure,
}

/// Decider that replays a fixed sequence of outcomes, one per file.
///
/// Once the script is exhausted, every remaining file succeeds. Failure
/// messages use the same shape as the default random decider.
#[derive(Debug)]
pub struct ScriptedDecider {
    script: Mutex<VecDeque<Forced>>,
}

impl ScriptedDecider {
    /// Create a decider that plays `script` in order.
    pub fn new(script: impl IntoIterator<Item = Forced>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
        }
    }

    /// A decider that always succeeds.
    pub fn always_success() -> Self {
        Self::new([])
    }

    /// A decider that fails every file.
    pub fn always_failure(len: usize) -> Self {
        Self::new(std::iter::repeat(Forced::Failure).take(len))
    }
}

impl OutcomeDecider for ScriptedDecider {
    fn decide(&self, file: &JobFile) -> Outcome {
        match self.script.lock().unwrap().pop_front() {
            Some(Forced::Failure) => Outcome::failure_for(&file.filename),
            Some(Forced::Success) | None => Outcome::Success,
        }
    }
}
