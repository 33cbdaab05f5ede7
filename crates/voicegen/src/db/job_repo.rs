//! Queue operations on the `audio_entries` table.
//!
//! Every call round-trips to SQLite; there is no cache, so the server and
//! the worker always observe each other's committed state. Timestamps are
//! produced by SQLite so both processes share a single clock source.

use rusqlite::{params, OptionalExtension, TransactionBehavior};

use super::{Database, DatabaseError, Job, JobStatus};

/// Upper bound on stored failure descriptions, in characters.
pub const MAX_ERROR_MESSAGE_CHARS: usize = 500;

const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

/// Inserts a new `pending` job and returns the stored record.
///
/// The text is stored as given; length and emptiness checks belong to the caller.
pub fn create(db: &Database, text: &str) -> Result<Job, DatabaseError> {
    db.with_conn(|conn| {
        let job = conn.query_row(
            "INSERT INTO audio_entries (text) VALUES (?1) RETURNING *",
            params![text],
            Job::from_row,
        )?;
        log::debug!("Created job {}", job.id);
        Ok(job)
    })
}

/// Returns all jobs, newest first.
pub fn list(db: &Database) -> Result<Vec<Job>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM audio_entries ORDER BY id DESC")?;
        let rows = stmt
            .query_map([], Job::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Finds a job by its ID.
pub fn get(db: &Database, id: i64) -> Result<Option<Job>, DatabaseError> {
    db.with_conn(|conn| {
        let job = conn
            .query_row(
                "SELECT * FROM audio_entries WHERE id = ?1",
                params![id],
                Job::from_row,
            )
            .optional()?;
        Ok(job)
    })
}

/// Atomically claims the oldest pending job.
///
/// The select and the status change are a single statement executed under
/// an IMMEDIATE transaction, so two claimers (in any process) can never
/// receive the same job.
pub fn claim_next(db: &Database) -> Result<Option<Job>, DatabaseError> {
    db.with_conn_mut(|conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let job = tx
            .query_row(
                &format!(
                    "UPDATE audio_entries
                     SET status = 'processing', started_at = {NOW}
                     WHERE id = (
                         SELECT id FROM audio_entries
                         WHERE status = 'pending'
                         ORDER BY id ASC
                         LIMIT 1
                     ) AND status = 'pending'
                     RETURNING *"
                ),
                [],
                Job::from_row,
            )
            .optional()?;
        tx.commit()?;
        Ok(job)
    })
}

/// Marks a processing job as successful.
pub fn complete_success(
    db: &Database,
    id: i64,
    audio_path: &str,
    duration_ms: i64,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            &format!(
                "UPDATE audio_entries
                 SET status = 'success', audio_path = ?2, error_message = NULL,
                     duration_ms = ?3, completed_at = MAX({NOW}, started_at)
                 WHERE id = ?1 AND {guard}",
                guard = transition_guard(JobStatus::Success)
            ),
            params![id, audio_path, duration_ms],
        )?;
        ensure_transitioned(id, changed)
    })
}

/// Marks a processing job as failed. The message is truncated to
/// [`MAX_ERROR_MESSAGE_CHARS`].
pub fn complete_error(
    db: &Database,
    id: i64,
    error_message: &str,
    duration_ms: i64,
) -> Result<(), DatabaseError> {
    let message = truncate_chars(error_message, MAX_ERROR_MESSAGE_CHARS);
    db.with_conn(|conn| {
        let changed = conn.execute(
            &format!(
                "UPDATE audio_entries
                 SET status = 'error', error_message = ?2, audio_path = NULL,
                     duration_ms = ?3, completed_at = MAX({NOW}, started_at)
                 WHERE id = ?1 AND {guard}",
                guard = transition_guard(JobStatus::Error)
            ),
            params![id, message, duration_ms],
        )?;
        ensure_transitioned(id, changed)
    })
}

/// Moves every `processing` job to `error`. Returns how many were changed.
///
/// Only safe to call when no worker is running, e.g. at worker startup.
pub fn fail_orphaned(db: &Database, error_message: &str) -> Result<usize, DatabaseError> {
    let message = truncate_chars(error_message, MAX_ERROR_MESSAGE_CHARS);
    db.with_conn(|conn| {
        let changed = conn.execute(
            &format!(
                "UPDATE audio_entries
                 SET status = 'error', error_message = ?1, audio_path = NULL,
                     duration_ms = CAST((julianday({NOW}) - julianday(started_at)) * 86400000 AS INTEGER),
                     completed_at = MAX({NOW}, started_at)
                 WHERE status = 'processing'"
            ),
            params![message],
        )?;
        Ok(changed)
    })
}

/// Counts jobs with the given status.
pub fn count_by_status(db: &Database, status: JobStatus) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM audio_entries WHERE status = ?1",
            params![status.as_str()],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

/// SQL condition matching rows whose status may move to `next`.
fn transition_guard(next: JobStatus) -> String {
    let sources: Vec<String> = JobStatus::ALL
        .iter()
        .filter(|s| s.can_transition_to(next))
        .map(|s| format!("'{}'", s.as_str()))
        .collect();
    format!("status IN ({})", sources.join(", "))
}

fn ensure_transitioned(id: i64, changed: usize) -> Result<(), DatabaseError> {
    if changed == 0 {
        return Err(DatabaseError::InvalidTransition { id });
    }
    Ok(())
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
