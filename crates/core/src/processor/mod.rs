//! Background processing of jobs.
//!
//! The processor loads a job, drives each of its files through the state
//! machine with an induced delay standing in for real work, and notifies
//! subscribers after every persisted transition. The launcher schedules runs
//! fire-and-forget so request handlers never block on processing.

mod config;
mod launcher;
mod outcome;
mod runner;

pub use config::ProcessorConfig;
pub use launcher::JobLauncher;
pub use outcome::{Outcome, OutcomeDecider, RandomDecider};
pub use runner::JobProcessor;
