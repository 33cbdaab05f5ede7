//! Job entity: one text submission tracked through synthesis.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::db::DatabaseError;

/// Lifecycle of a job.
///
/// `Pending -> Processing -> Success | Error`. There is no way back to
/// `Pending` and no cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Success,
    Error,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Pending,
        JobStatus::Processing,
        JobStatus::Success,
        JobStatus::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Success => "success",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Error)
    }

    /// Returns true if `next` is a legal edge out of `self`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Success)
                | (JobStatus::Processing, JobStatus::Error)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "success" => Ok(JobStatus::Success),
            "error" => Ok(JobStatus::Error),
            other => Err(DatabaseError::InvalidColumn {
                column: "status",
                value: other.to_string(),
            }),
        }
    }
}

/// A synthesis job as stored in `audio_entries`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub text: String,
    pub status: JobStatus,
    /// Set only when `status` is `error`.
    pub error_message: Option<String>,
    /// Path relative to the public directory, set only when `status` is `success`.
    pub audio_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Wall-clock processing time in milliseconds.
    pub duration_ms: Option<i64>,
}

impl Job {
    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let status: String = row.get("status")?;
        Ok(Self {
            id: row.get("id")?,
            text: row.get("text")?,
            status: status.parse().map_err(|e| conversion_error(row, "status", e))?,
            error_message: row.get("error_message")?,
            audio_path: row.get("audio_path")?,
            created_at: parse_timestamp(row, "created_at")?,
            started_at: parse_optional_timestamp(row, "started_at")?,
            completed_at: parse_optional_timestamp(row, "completed_at")?,
            duration_ms: row.get("duration_ms")?,
        })
    }
}

fn parse_timestamp(row: &Row<'_>, column: &'static str) -> Result<DateTime<Utc>, rusqlite::Error> {
    let raw: String = row.get(column)?;
    decode_timestamp(column, &raw).map_err(|e| conversion_error(row, column, e))
}

fn parse_optional_timestamp(
    row: &Row<'_>,
    column: &'static str,
) -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
    let raw: Option<String> = row.get(column)?;
    raw.map(|raw| decode_timestamp(column, &raw))
        .transpose()
        .map_err(|e| conversion_error(row, column, e))
}

fn decode_timestamp(column: &'static str, raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DatabaseError::InvalidColumn {
            column,
            value: raw.to_string(),
        })
}

fn conversion_error(row: &Row<'_>, column: &str, err: DatabaseError) -> rusqlite::Error {
    let index = row.as_ref().column_index(column).unwrap_or(0);
    rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(err))
}
