//! Common test utilities for in-process API testing.
//!
//! Provides a test fixture that builds the full router around a temporary
//! SQLite database, so API tests run without binding a socket.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use filesmith_core::{
    testing::ScriptedDecider, Config, CreateJobRequest, DatabaseConfig, JobFile, JobLauncher,
    JobProcessor, JobStore, Notifier, OutcomeDecider, ProcessorConfig, SqliteJobStore,
};
use filesmith_server::api::{create_router, WsBroadcaster};
use filesmith_server::state::AppState;

/// Delay long enough that files stay non-terminal for the whole test.
const STALLED_DELAY_MS: u64 = 60_000;

/// Test fixture wrapping an in-process server.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Direct store access for assertions
    pub store: Arc<SqliteJobStore>,
    /// Broadcaster the server pushes events through
    pub broadcaster: WsBroadcaster,
    /// Temporary directory for the database and job folders
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Fixture whose processor stalls on every file, so jobs created during
    /// a test never leave the processing state.
    pub fn stalled() -> Self {
        Self::with_processor(STALLED_DELAY_MS, Arc::new(ScriptedDecider::always_success()))
    }

    /// Fixture whose processor finishes instantly and always succeeds.
    pub fn completing() -> Self {
        Self::with_processor(0, Arc::new(ScriptedDecider::always_success()))
    }

    fn with_processor(work_delay_ms: u64, decider: Arc<dyn OutcomeDecider>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let store =
            Arc::new(SqliteJobStore::new(&db_path).expect("Failed to create job store"));

        let config = Config {
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            processor: ProcessorConfig::default().with_work_delay_ms(work_delay_ms),
            ..Default::default()
        };

        let broadcaster = WsBroadcaster::default();

        let processor = JobProcessor::new(
            config.processor.clone(),
            Arc::clone(&store) as Arc<dyn JobStore>,
            Arc::new(broadcaster.clone()) as Arc<dyn Notifier>,
        )
        .with_decider(decider);
        let launcher = JobLauncher::new(Arc::new(processor));

        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&store) as Arc<dyn JobStore>,
            launcher,
            broadcaster.clone(),
        ));

        let router = create_router(state);

        Self {
            router,
            store,
            broadcaster,
            temp_dir,
        }
    }

    /// Write input files under a fresh folder pair and return (folder_in,
    /// folder_out) paths.
    pub fn seed_folders(&self, name: &str, files: &[(&str, &str)]) -> (PathBuf, PathBuf) {
        let folder_in = self.temp_dir.path().join(name).join("in");
        let folder_out = self.temp_dir.path().join(name).join("out");
        std::fs::create_dir_all(&folder_in).expect("Failed to create folder_in");

        for (filename, content) in files {
            std::fs::write(folder_in.join(filename), content).expect("Failed to write input");
        }

        (folder_in, folder_out)
    }

    /// Insert a job with a single file directly through the store, without
    /// launching the processor.
    pub fn seed_file(&self, name: &str) -> JobFile {
        let root = self.temp_dir.path().join(name);
        let job = self
            .store
            .create(CreateJobRequest {
                user: "tester@example.com".to_string(),
                folder_in: root.join("in").to_string_lossy().into_owned(),
                folder_out: root.join("out").to_string_lossy().into_owned(),
            })
            .expect("Failed to create job");

        self.store
            .add_file(job.id, "seeded.txt", "/tmp/seeded.txt", "seeded")
            .expect("Failed to add file")
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a GET request and return the raw body as text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        (status, String::from_utf8_lossy(&body_bytes).into_owned())
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a PATCH request with JSON body.
    pub async fn patch(&self, path: &str, body: Value) -> TestResponse {
        self.request("PATCH", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}
