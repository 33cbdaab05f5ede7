use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::db::{job_repo, Database, DatabaseError, Job};
use crate::error::WorkerError;
use crate::storage::AudioStorage;
use crate::synthesis::Synthesizer;
use crate::worker::handle::WorkerHandle;
use crate::worker::job::{duration_ms, text_preview, WorkOutcome};

/// Message recorded on jobs found in `processing` when a worker starts.
pub const ORPHANED_JOB_MESSAGE: &str = "worker restarted before job completed";

/// Longest uninterrupted sleep while idle, so shutdown is noticed quickly.
const SHUTDOWN_CHECK: Duration = Duration::from_millis(100);

/// Result of a claimed job that still has to be written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Completion {
    Success {
        job_id: i64,
        audio_path: String,
        duration_ms: i64,
    },
    Error {
        job_id: i64,
        message: String,
        duration_ms: i64,
    },
}

impl Completion {
    fn job_id(&self) -> i64 {
        match self {
            Completion::Success { job_id, .. } | Completion::Error { job_id, .. } => *job_id,
        }
    }

    fn into_outcome(self) -> WorkOutcome {
        match self {
            Completion::Success {
                job_id, audio_path, ..
            } => WorkOutcome::Succeeded { job_id, audio_path },
            Completion::Error {
                job_id, message, ..
            } => WorkOutcome::Failed {
                job_id,
                error: message,
            },
        }
    }
}

/// Drains the job queue one job at a time.
///
/// The worker owns its synthesizer; nothing else in the process calls it.
/// A job's result that could not be written (e.g. store busy) is kept and
/// retried before anything new is claimed, so every claimed job ends in
/// `success` or `error`.
pub struct Worker {
    db: Database,
    storage: AudioStorage,
    synthesizer: Box<dyn Synthesizer>,
    poll_interval: Duration,
    shutdown: Arc<AtomicBool>,
    pending: Option<Completion>,
}

impl Worker {
    pub fn new(
        db: Database,
        storage: AudioStorage,
        synthesizer: Box<dyn Synthesizer>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            db,
            storage,
            synthesizer,
            poll_interval,
            shutdown: Arc::new(AtomicBool::new(false)),
            pending: None,
        }
    }

    /// Flag that stops [`Worker::run`] once set.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// True while a finished job's result is waiting to be recorded.
    pub fn has_pending_completion(&self) -> bool {
        self.pending.is_some()
    }

    /// Fails jobs left in `processing` by a previous worker that died mid-job.
    pub fn fail_orphaned(&self) -> Result<usize, WorkerError> {
        let count = job_repo::fail_orphaned(&self.db, ORPHANED_JOB_MESSAGE)?;
        if count > 0 {
            warn!("Marked {} orphaned job(s) as failed", count);
        }
        Ok(count)
    }

    /// Polls and processes jobs until the shutdown flag is set.
    pub fn run(&mut self) {
        info!(
            "Worker ready (backend: {}, poll interval: {}ms)",
            self.synthesizer.name(),
            self.poll_interval.as_millis()
        );

        while !self.shutdown.load(Ordering::Relaxed) {
            match self.run_once() {
                Ok(WorkOutcome::Idle) => self.idle(),
                Ok(_) => {}
                Err(e) => {
                    if matches!(&e, WorkerError::Database(db) if db.is_busy()) {
                        warn!("Store busy, retrying: {}", e);
                    } else {
                        error!("Worker error: {}", e);
                    }
                    self.idle();
                }
            }
        }

        if let Some(completion) = self.pending.take() {
            let job_id = completion.job_id();
            if let Err(e) = self.commit(completion) {
                error!("Result for job {} not recorded before shutdown: {}", job_id, e);
            }
        }

        info!("Worker stopped");
    }

    /// Records a held-back result, or claims and processes at most one job.
    ///
    /// Synthesis and storage failures are recorded on the job and reported as
    /// [`WorkOutcome::Failed`]; only store failures are returned as errors.
    /// After a store failure the job's result is kept and the next call
    /// retries it instead of claiming.
    pub fn run_once(&mut self) -> Result<WorkOutcome, WorkerError> {
        if let Some(completion) = self.pending.take() {
            info!("Retrying result for job {}", completion.job_id());
            return self.commit(completion);
        }

        let Some(job) = job_repo::claim_next(&self.db)? else {
            return Ok(WorkOutcome::Idle);
        };

        let span = tracing::info_span!("job", id = job.id);
        let _enter = span.enter();

        info!("Processing entry {}: {}", job.id, text_preview(&job.text));

        let started = Instant::now();
        let result = self.synthesize_and_store(&job);
        let elapsed_ms = duration_ms(started.elapsed());

        let completion = match result {
            Ok(audio_path) => {
                info!("Generated {} ({}ms)", audio_path, elapsed_ms);
                Completion::Success {
                    job_id: job.id,
                    audio_path,
                    duration_ms: elapsed_ms,
                }
            }
            Err(e) => {
                let message = e.to_string();
                error!("Entry {} failed: {}", job.id, message);
                Completion::Error {
                    job_id: job.id,
                    message,
                    duration_ms: elapsed_ms,
                }
            }
        };

        self.commit(completion)
    }

    /// Moves the worker onto its own thread.
    pub fn spawn(mut self) -> Result<WorkerHandle, WorkerError> {
        let shutdown = self.shutdown_flag();
        let handle = thread::Builder::new()
            .name("voicegen-worker".into())
            .spawn(move || self.run())
            .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;
        Ok(WorkerHandle::new(shutdown, handle))
    }

    fn synthesize_and_store(&mut self, job: &Job) -> Result<String, WorkerError> {
        let synthesis = self.synthesizer.synthesize(&job.text)?;
        debug!(
            "Backend produced {} bytes in {}ms",
            synthesis.audio.len(),
            synthesis.elapsed.as_millis()
        );
        Ok(self.storage.store(job.id, &synthesis.audio)?)
    }

    /// Writes a job's result. On failure the result (or a replacement) is
    /// held in `pending` for the next iteration.
    fn commit(&mut self, completion: Completion) -> Result<WorkOutcome, WorkerError> {
        let result = match &completion {
            Completion::Success {
                job_id,
                audio_path,
                duration_ms,
            } => job_repo::complete_success(&self.db, *job_id, audio_path, *duration_ms),
            Completion::Error {
                job_id,
                message,
                duration_ms,
            } => job_repo::complete_error(&self.db, *job_id, message, *duration_ms),
        };

        match result {
            Ok(()) => Ok(completion.into_outcome()),
            Err(e) if e.is_busy() => {
                warn!(
                    "Store busy while recording job {}, will retry",
                    completion.job_id()
                );
                self.pending = Some(completion);
                Err(e.into())
            }
            Err(e) => {
                self.pending = self.retry_after_failure(completion, &e);
                Err(e.into())
            }
        }
    }

    /// Picks what to retry after a non-transient store failure: nothing if
    /// the job is already finished, an error result in place of a success
    /// that could not be recorded, otherwise the same result.
    fn retry_after_failure(
        &self,
        completion: Completion,
        failure: &DatabaseError,
    ) -> Option<Completion> {
        let job_id = completion.job_id();
        match job_repo::get(&self.db, job_id) {
            Ok(Some(job)) if !job.status.is_terminal() => match completion {
                Completion::Success { duration_ms, .. } => Some(Completion::Error {
                    job_id,
                    message: format!("Failed to record result: {}", failure),
                    duration_ms,
                }),
                error => Some(error),
            },
            Ok(_) => {
                warn!("Job {} is no longer in progress, dropping its result", job_id);
                None
            }
            Err(e) => {
                warn!("Could not re-read job {}: {}", job_id, e);
                Some(completion)
            }
        }
    }

    fn idle(&self) {
        let deadline = Instant::now() + self.poll_interval;
        while !self.shutdown.load(Ordering::Relaxed) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).min(SHUTDOWN_CHECK));
        }
    }
}
