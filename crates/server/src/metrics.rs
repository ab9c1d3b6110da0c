//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the Filesmith server:
//! - HTTP request metrics (latency, counts, in-flight)
//! - WebSocket connection metrics
//! - Job and file counts by state (collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry, TextEncoder,
};

use filesmith_core::{FileState, JobState};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "filesmith_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("filesmith_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "filesmith_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// WebSocket Metrics
// =============================================================================

/// Active WebSocket connections.
pub static WS_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "filesmith_ws_connections_active",
        "Number of active WebSocket connections",
    )
    .unwrap()
});

/// Total WebSocket connections (cumulative).
pub static WS_CONNECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "filesmith_ws_connections_total",
        "Total WebSocket connections since startup",
    )
    .unwrap()
});

/// WebSocket messages sent by type.
pub static WS_MESSAGES_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("filesmith_ws_messages_sent_total", "WebSocket messages sent"),
        &["type"],
    )
    .unwrap()
});

/// WebSocket lag events (when client falls behind).
pub static WS_LAG_EVENTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "filesmith_ws_lag_events_total",
        "WebSocket lag events (client fell behind)",
    )
    .unwrap()
});

// =============================================================================
// Job Metrics
// =============================================================================

/// Jobs created total.
pub static JOBS_CREATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "filesmith_jobs_created_total",
        "Total jobs created since startup",
    )
    .unwrap()
});

/// Jobs deleted total.
pub static JOBS_DELETED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "filesmith_jobs_deleted_total",
        "Total jobs deleted since startup",
    )
    .unwrap()
});

/// Jobs by current derived state (collected dynamically).
pub static JOBS_BY_STATE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("filesmith_jobs_by_state", "Current job count by state"),
        &["state"],
    )
    .unwrap()
});

/// Files by current state (collected dynamically).
pub static FILES_BY_STATE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("filesmith_files_by_state", "Current file count by state"),
        &["state"],
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // WebSocket
    registry
        .register(Box::new(WS_CONNECTIONS_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_CONNECTIONS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_MESSAGES_SENT.clone()))
        .unwrap();
    registry.register(Box::new(WS_LAG_EVENTS.clone())).unwrap();

    // Jobs
    registry
        .register(Box::new(JOBS_CREATED_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(JOBS_DELETED_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(JOBS_BY_STATE.clone()))
        .unwrap();
    registry
        .register(Box::new(FILES_BY_STATE.clone()))
        .unwrap();
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the job and file gauges reflect the store at
/// scrape time rather than whenever a handler last touched them.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let store = state.job_store();

    let jobs = match store.list() {
        Ok(jobs) => jobs,
        Err(_) => return,
    };

    let mut job_counts = [0i64; 3];
    let mut file_counts = [0i64; 4];

    for job in &jobs {
        let Ok(files) = store.files_for_job(job.id) else {
            continue;
        };
        let states: Vec<FileState> = files.iter().map(|f| f.state).collect();
        let job_state = JobState::derive(&states);
        match job_state {
            JobState::Pending => job_counts[0] += 1,
            JobState::Processing => job_counts[1] += 1,
            JobState::Completed => job_counts[2] += 1,
        }
        for s in states {
            match s {
                FileState::Init => file_counts[0] += 1,
                FileState::Active => file_counts[1] += 1,
                FileState::Success => file_counts[2] += 1,
                FileState::Error => file_counts[3] += 1,
            }
        }
    }

    for (state, count) in [
        (JobState::Pending, job_counts[0]),
        (JobState::Processing, job_counts[1]),
        (JobState::Completed, job_counts[2]),
    ] {
        JOBS_BY_STATE.with_label_values(&[state.as_str()]).set(count);
    }

    for (state, count) in [
        (FileState::Init, file_counts[0]),
        (FileState::Active, file_counts[1]),
        (FileState::Success, file_counts[2]),
        (FileState::Error, file_counts[3]),
    ] {
        FILES_BY_STATE.with_label_values(&[state.as_str()]).set(count);
    }
}

/// Normalize a path for metric labels (replace numeric IDs with a placeholder).
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_numeric() {
        assert_eq!(normalize_path("/api/v1/jobs/42"), "/api/v1/jobs/{id}");
        assert_eq!(
            normalize_path("/api/v1/jobs/42/files"),
            "/api/v1/jobs/{id}/files"
        );
        assert_eq!(
            normalize_path("/api/v1/files/7/content"),
            "/api/v1/files/{id}/content"
        );
    }

    #[test]
    fn test_normalize_path_passthrough() {
        assert_eq!(normalize_path("/api/v1/jobs"), "/api/v1/jobs");
        assert_eq!(normalize_path("/health"), "/health");
        assert_eq!(normalize_path("/"), "/");
    }
}
