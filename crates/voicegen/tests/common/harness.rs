#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use axum::Router;
use tempfile::TempDir;

use voicegen::{build_router, AppState, AudioStorage, Config, Database, Synthesizer, Worker};

/// Isolated environment: one SQLite file and one public directory.
///
/// Every call to [`TestHarness::database`] opens a fresh handle on the same
/// file, the way the server and worker processes each hold their own.
pub struct TestHarness {
    temp_dir: TempDir,
    pub db_path: PathBuf,
    pub public_dir: PathBuf,
    pub config: Config,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("data").join("voicegen.db");
        let public_dir = temp_dir.path().join("public");
        std::fs::create_dir_all(&public_dir).expect("Failed to create public dir");

        let mut config = Config::default();
        config.database_path = db_path.clone();
        config.public_dir = public_dir.clone();
        config.worker.poll_interval_ms = 10;

        Self {
            temp_dir,
            db_path,
            public_dir,
            config,
        }
    }

    /// Harness whose store handles give up on a locked database quickly.
    pub fn with_busy_timeout(busy_timeout_ms: u64) -> Self {
        let mut harness = Self::new();
        harness.config.store.busy_timeout_ms = busy_timeout_ms;
        // Create the file and schema before anyone takes the lock.
        drop(harness.database());
        harness
    }

    /// Opens a new store handle on the shared database file.
    pub fn database(&self) -> Database {
        Database::open(&self.db_path, self.config.store.busy_timeout())
            .expect("Failed to open database")
    }

    /// Router backed by its own store handle.
    pub fn router(&self) -> Router {
        build_router(AppState::new(self.database(), self.config.clone()))
    }

    /// Worker backed by its own store handle.
    pub fn worker(&self, synthesizer: Box<dyn Synthesizer>) -> Worker {
        Worker::new(
            self.database(),
            AudioStorage::new(&self.public_dir),
            synthesizer,
            Duration::from_millis(self.config.worker.poll_interval_ms),
        )
    }

    pub fn write_public_file(&self, relative: &str, content: &[u8]) {
        let path = self.public_dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        std::fs::write(path, content).expect("Failed to write public file");
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
