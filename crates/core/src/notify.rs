//! Notification contract for job progress updates.

use crate::job::JobId;

/// Best-effort push channel informing listeners that a job changed.
///
/// Carries only the job id; listeners re-fetch current state themselves.
/// Implementations must not block the caller and must tolerate having zero
/// listeners. Delivery is at-most-once per call, with no queuing or replay.
pub trait Notifier: Send + Sync {
    /// Broadcast that something about `job_id` changed.
    fn job_updated(&self, job_id: JobId);
}

/// Notifier that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn job_updated(&self, _job_id: JobId) {}
}
