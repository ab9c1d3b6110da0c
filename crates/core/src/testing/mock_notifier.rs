//! Mock notifier for testing.

use std::sync::Mutex;

use crate::job::JobId;
use crate::notify::Notifier;

/// Mock implementation of the `Notifier` trait.
///
/// Records every broadcast so tests can assert on call counts and ordering.
///
/// # Example
///
/// ```rust,ignore
/// let notifier = Arc::new(MockNotifier::new());
/// processor_with(notifier.clone()).run(job_id).await;
/// assert_eq!(notifier.count_for(job_id), 2 * file_count);
/// ```
#[derive(Debug, Default)]
pub struct MockNotifier {
    calls: Mutex<Vec<JobId>>,
}

impl MockNotifier {
    /// Create a new mock notifier with no recorded calls.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded broadcasts, in call order.
    pub fn calls(&self) -> Vec<JobId> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of broadcasts recorded for a specific job.
    pub fn count_for(&self, job_id: JobId) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|id| **id == job_id)
            .count()
    }

    /// Clear recorded calls.
    pub fn reset(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl Notifier for MockNotifier {
    fn job_updated(&self, job_id: JobId) {
        self.calls.lock().unwrap().push(job_id);
    }
}
