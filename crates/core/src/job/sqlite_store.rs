//! SQLite-backed job store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{
    wrap_output, CreateJobRequest, FileId, FileState, Job, JobFile, JobId, JobStore, JobWithFiles,
    StoreError,
};

/// SQLite-backed job store.
pub struct SqliteJobStore {
    conn: Mutex<Connection>,
}

impl SqliteJobStore {
    /// Create a new SQLite job store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite job store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at TEXT NOT NULL,
                user TEXT NOT NULL,
                folder_in TEXT NOT NULL,
                folder_out TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS job_files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id INTEGER NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
                filename TEXT NOT NULL,
                filepath TEXT NOT NULL,
                content TEXT NOT NULL,
                content_out TEXT,
                error TEXT,
                state TEXT NOT NULL,
                created_at TEXT NOT NULL,
                processed_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_created_at ON jobs(created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_job_files_job_id ON job_files(job_id);
            "#,
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<Job> {
        let id: JobId = row.get(0)?;
        let created_at_str: String = row.get(1)?;
        let user: String = row.get(2)?;
        let folder_in: String = row.get(3)?;
        let folder_out: String = row.get(4)?;

        Ok(Job {
            id,
            created_at: parse_timestamp(&created_at_str),
            user,
            folder_in,
            folder_out,
        })
    }

    fn row_to_file(row: &rusqlite::Row) -> rusqlite::Result<JobFile> {
        let id: FileId = row.get(0)?;
        let job_id: JobId = row.get(1)?;
        let filename: String = row.get(2)?;
        let filepath: String = row.get(3)?;
        let content: String = row.get(4)?;
        let content_out: Option<String> = row.get(5)?;
        let error: Option<String> = row.get(6)?;
        let state_str: String = row.get(7)?;
        let created_at_str: String = row.get(8)?;
        let processed_at_str: Option<String> = row.get(9)?;

        // The state column only ever holds values written from FileState;
        // fall back to Init if the row was tampered with.
        let state: FileState =
            serde_json::from_str(&format!("\"{}\"", state_str)).unwrap_or(FileState::Init);

        Ok(JobFile {
            id,
            job_id,
            filename,
            filepath,
            content,
            content_out,
            error,
            state,
            created_at: parse_timestamp(&created_at_str),
            processed_at: processed_at_str.as_deref().map(parse_timestamp),
        })
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

const FILE_COLUMNS: &str =
    "id, job_id, filename, filepath, content, content_out, error, state, created_at, processed_at";

impl JobStore for SqliteJobStore {
    fn create(&self, request: CreateJobRequest) -> Result<Job, StoreError> {
        let conn = self.conn.lock().unwrap();

        let now = Utc::now();
        conn.execute(
            "INSERT INTO jobs (created_at, user, folder_in, folder_out) VALUES (?, ?, ?, ?)",
            params![
                now.to_rfc3339(),
                request.user,
                request.folder_in,
                request.folder_out,
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Job {
            id: conn.last_insert_rowid(),
            created_at: now,
            user: request.user,
            folder_in: request.folder_in,
            folder_out: request.folder_out,
        })
    }

    fn add_file(
        &self,
        job_id: JobId,
        filename: &str,
        filepath: &str,
        content: &str,
    ) -> Result<JobFile, StoreError> {
        let conn = self.conn.lock().unwrap();

        let job_exists: bool = conn
            .query_row("SELECT 1 FROM jobs WHERE id = ?", params![job_id], |_| {
                Ok(true)
            })
            .optional()
            .map_err(|e| StoreError::Database(e.to_string()))?
            .unwrap_or(false);

        if !job_exists {
            return Err(StoreError::JobNotFound(job_id));
        }

        let now = Utc::now();
        let state = FileState::Init;
        conn.execute(
            "INSERT INTO job_files (job_id, filename, filepath, content, content_out, error, state, created_at, processed_at) \
             VALUES (?, ?, ?, ?, NULL, NULL, ?, ?, NULL)",
            params![job_id, filename, filepath, content, state.as_str(), now.to_rfc3339()],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(JobFile {
            id: conn.last_insert_rowid(),
            job_id,
            filename: filename.to_string(),
            filepath: filepath.to_string(),
            content: content.to_string(),
            content_out: None,
            error: None,
            state,
            created_at: now,
            processed_at: None,
        })
    }

    fn get(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, created_at, user, folder_in, folder_out FROM jobs WHERE id = ?",
            params![id],
            Self::row_to_job,
        )
        .optional()
        .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_with_files(&self, id: JobId) -> Result<Option<JobWithFiles>, StoreError> {
        let Some(job) = self.get(id)? else {
            return Ok(None);
        };
        let files = self.files_for_job(id)?;
        Ok(Some(JobWithFiles { job, files }))
    }

    fn list(&self) -> Result<Vec<Job>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT id, created_at, user, folder_in, folder_out FROM jobs \
                 ORDER BY created_at DESC, id DESC",
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], Self::row_to_job)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut jobs = Vec::new();
        for row_result in rows {
            jobs.push(row_result.map_err(|e| StoreError::Database(e.to_string()))?);
        }

        Ok(jobs)
    }

    fn files_for_job(&self, job_id: JobId) -> Result<Vec<JobFile>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let sql = format!(
            "SELECT {} FROM job_files WHERE job_id = ? ORDER BY created_at ASC, id ASC",
            FILE_COLUMNS
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![job_id], Self::row_to_file)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut files = Vec::new();
        for row_result in rows {
            files.push(row_result.map_err(|e| StoreError::Database(e.to_string()))?);
        }

        Ok(files)
    }

    fn get_file(&self, id: FileId) -> Result<Option<JobFile>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let sql = format!("SELECT {} FROM job_files WHERE id = ?", FILE_COLUMNS);
        conn.query_row(&sql, params![id], Self::row_to_file)
            .optional()
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn save_file(&self, file: &JobFile) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        // Zero rows affected means the job was deleted mid-run; per the
        // cancellation contract this is not an error.
        conn.execute(
            "UPDATE job_files SET content_out = ?, error = ?, state = ?, processed_at = ? \
             WHERE id = ?",
            params![
                file.content_out,
                file.error,
                file.state.as_str(),
                file.processed_at.map(|dt| dt.to_rfc3339()),
                file.id,
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn update_file_state(&self, id: FileId, state: FileState) -> Result<JobFile, StoreError> {
        let current = self
            .get_file(id)?
            .ok_or(StoreError::FileNotFound(id))?;

        let next = current.state.transition(state)?;

        // A terminal state always carries its companion fields, whether the
        // processor or a manual transition put it there.
        let mut updated = JobFile {
            state: next,
            ..current
        };
        if next.is_terminal() {
            updated.processed_at = Some(Utc::now());
            match next {
                FileState::Success => {
                    updated.content_out = Some(wrap_output(&updated.content));
                    updated.error = None;
                }
                _ => {
                    updated.error = Some(format!("Error processing file: {}", updated.filename));
                    updated.content_out = None;
                }
            }
        }

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE job_files SET content_out = ?, error = ?, state = ?, processed_at = ? \
             WHERE id = ?",
            params![
                updated.content_out,
                updated.error,
                updated.state.as_str(),
                updated.processed_at.map(|dt| dt.to_rfc3339()),
                id,
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(updated)
    }

    fn delete(&self, id: JobId) -> Result<Job, StoreError> {
        let job = self.get(id)?.ok_or(StoreError::JobNotFound(id))?;

        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM jobs WHERE id = ?", params![id])
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobState;

    fn create_test_store() -> SqliteJobStore {
        SqliteJobStore::in_memory().unwrap()
    }

    fn create_test_request() -> CreateJobRequest {
        CreateJobRequest {
            user: "user@example.com".to_string(),
            folder_in: "/data/in".to_string(),
            folder_out: "/data/out".to_string(),
        }
    }

    #[test]
    fn test_create_job() {
        let store = create_test_store();
        let job = store.create(create_test_request()).unwrap();

        assert!(job.id > 0);
        assert_eq!(job.user, "user@example.com");
        assert_eq!(job.folder_in, "/data/in");
        assert_eq!(job.folder_out, "/data/out");
    }

    #[test]
    fn test_get_job() {
        let store = create_test_store();
        let created = store.create(create_test_request()).unwrap();

        let fetched = store.get(created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[test]
    fn test_get_nonexistent_job() {
        let store = create_test_store();
        assert!(store.get(999).unwrap().is_none());
    }

    #[test]
    fn test_add_file_starts_in_init() {
        let store = create_test_store();
        let job = store.create(create_test_request()).unwrap();

        let file = store
            .add_file(job.id, "a.txt", "/data/in/a.txt", "hello")
            .unwrap();

        assert!(file.id > 0);
        assert_eq!(file.job_id, job.id);
        assert_eq!(file.state, FileState::Init);
        assert!(file.content_out.is_none());
        assert!(file.error.is_none());
        assert!(file.processed_at.is_none());
    }

    #[test]
    fn test_add_file_to_nonexistent_job() {
        let store = create_test_store();
        let result = store.add_file(999, "a.txt", "/in/a.txt", "hello");
        assert!(matches!(result, Err(StoreError::JobNotFound(999))));
    }

    #[test]
    fn test_files_for_job_in_creation_order() {
        let store = create_test_store();
        let job = store.create(create_test_request()).unwrap();

        for name in ["a.txt", "b.txt", "c.txt"] {
            store
                .add_file(job.id, name, &format!("/in/{}", name), "x")
                .unwrap();
        }

        let files = store.files_for_job(job.id).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn test_get_with_files_and_derived_state() {
        let store = create_test_store();
        let job = store.create(create_test_request()).unwrap();

        let with_files = store.get_with_files(job.id).unwrap().unwrap();
        assert!(with_files.files.is_empty());
        assert_eq!(with_files.state(), JobState::Pending);

        store.add_file(job.id, "a.txt", "/in/a.txt", "x").unwrap();
        let with_files = store.get_with_files(job.id).unwrap().unwrap();
        assert_eq!(with_files.files.len(), 1);
        assert_eq!(with_files.state(), JobState::Processing);
    }

    #[test]
    fn test_list_newest_first() {
        let store = create_test_store();
        let first = store.create(create_test_request()).unwrap();
        let second = store.create(create_test_request()).unwrap();

        let jobs = store.list().unwrap();
        assert_eq!(jobs.len(), 2);
        // Same created_at second is possible, the id tiebreaker keeps newest first
        assert_eq!(jobs[0].id, second.id);
        assert_eq!(jobs[1].id, first.id);
    }

    #[test]
    fn test_save_file_round_trip() {
        let store = create_test_store();
        let job = store.create(create_test_request()).unwrap();
        let mut file = store.add_file(job.id, "a.txt", "/in/a.txt", "hello").unwrap();

        file.state = FileState::Active;
        store.save_file(&file).unwrap();

        file.state = FileState::Success;
        file.content_out = Some("<result>hello</result>".to_string());
        file.processed_at = Some(Utc::now());
        store.save_file(&file).unwrap();

        let fetched = store.get_file(file.id).unwrap().unwrap();
        assert_eq!(fetched.state, FileState::Success);
        assert_eq!(
            fetched.content_out.as_deref(),
            Some("<result>hello</result>")
        );
        assert!(fetched.error.is_none());
        assert!(fetched.processed_at.is_some());
    }

    #[test]
    fn test_save_file_missing_row_is_noop() {
        let store = create_test_store();
        let job = store.create(create_test_request()).unwrap();
        let mut file = store.add_file(job.id, "a.txt", "/in/a.txt", "hello").unwrap();

        store.delete(job.id).unwrap();

        file.state = FileState::Active;
        // Job (and file) are gone; the save must not error.
        store.save_file(&file).unwrap();
        assert!(store.get_file(file.id).unwrap().is_none());
    }

    #[test]
    fn test_update_file_state_legal() {
        let store = create_test_store();
        let job = store.create(create_test_request()).unwrap();
        let file = store.add_file(job.id, "a.txt", "/in/a.txt", "x").unwrap();

        let updated = store.update_file_state(file.id, FileState::Active).unwrap();
        assert_eq!(updated.state, FileState::Active);

        let fetched = store.get_file(file.id).unwrap().unwrap();
        assert_eq!(fetched.state, FileState::Active);
    }

    #[test]
    fn test_update_file_state_to_success_stamps_terminal_fields() {
        let store = create_test_store();
        let job = store.create(create_test_request()).unwrap();
        let file = store.add_file(job.id, "a.txt", "/in/a.txt", "hello").unwrap();

        store.update_file_state(file.id, FileState::Active).unwrap();
        let updated = store.update_file_state(file.id, FileState::Success).unwrap();

        assert_eq!(updated.state, FileState::Success);
        assert_eq!(updated.content_out.as_deref(), Some("<result>hello</result>"));
        assert!(updated.error.is_none());
        assert!(updated.processed_at.is_some());

        let fetched = store.get_file(file.id).unwrap().unwrap();
        assert_eq!(fetched.content_out.as_deref(), Some("<result>hello</result>"));
        assert!(fetched.processed_at.is_some());
    }

    #[test]
    fn test_update_file_state_to_error_stamps_terminal_fields() {
        let store = create_test_store();
        let job = store.create(create_test_request()).unwrap();
        let file = store.add_file(job.id, "a.txt", "/in/a.txt", "hello").unwrap();

        store.update_file_state(file.id, FileState::Active).unwrap();
        let updated = store.update_file_state(file.id, FileState::Error).unwrap();

        assert_eq!(updated.state, FileState::Error);
        assert!(updated.content_out.is_none());
        assert!(updated.error.as_deref().unwrap().contains("a.txt"));
        assert!(updated.processed_at.is_some());
    }

    #[test]
    fn test_update_file_state_illegal() {
        let store = create_test_store();
        let job = store.create(create_test_request()).unwrap();
        let file = store.add_file(job.id, "a.txt", "/in/a.txt", "x").unwrap();

        let result = store.update_file_state(file.id, FileState::Success);
        assert!(matches!(result, Err(StoreError::IllegalTransition(_))));

        // Unchanged on failure
        let fetched = store.get_file(file.id).unwrap().unwrap();
        assert_eq!(fetched.state, FileState::Init);
    }

    #[test]
    fn test_update_file_state_nonexistent() {
        let store = create_test_store();
        let result = store.update_file_state(999, FileState::Active);
        assert!(matches!(result, Err(StoreError::FileNotFound(999))));
    }

    #[test]
    fn test_delete_cascades_to_files() {
        let store = create_test_store();
        let job = store.create(create_test_request()).unwrap();
        let file = store.add_file(job.id, "a.txt", "/in/a.txt", "x").unwrap();

        let deleted = store.delete(job.id).unwrap();
        assert_eq!(deleted.id, job.id);

        assert!(store.get(job.id).unwrap().is_none());
        assert!(store.get_file(file.id).unwrap().is_none());
        assert!(store.files_for_job(job.id).unwrap().is_empty());
    }

    #[test]
    fn test_delete_nonexistent_job() {
        let store = create_test_store();
        let result = store.delete(999);
        assert!(matches!(result, Err(StoreError::JobNotFound(999))));
    }

    #[test]
    fn test_file_based_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("jobs.db");

        let store = SqliteJobStore::new(&db_path).unwrap();
        let job = store.create(create_test_request()).unwrap();

        assert!(db_path.exists());
        assert!(store.get(job.id).unwrap().is_some());
    }
}
