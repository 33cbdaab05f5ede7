pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod storage;
pub mod synthesis;
pub mod telemetry;
pub mod worker;

pub use api::{build_router, AppState};
pub use config::{load_config, load_default_config, Config};
pub use db::{Database, DatabaseError, Job, JobStatus};
pub use error::{ConfigError, Result, StorageError, VoicegenError, WorkerError};
pub use storage::AudioStorage;
pub use synthesis::{CommandSynthesizer, Synthesis, SynthesisError, Synthesizer};
pub use worker::{WorkOutcome, Worker, WorkerHandle};
