use std::time::Duration;

/// Characters of job text shown in log lines.
const PREVIEW_CHARS: usize = 50;

/// What a single worker iteration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkOutcome {
    /// No pending job was available.
    Idle,
    Succeeded { job_id: i64, audio_path: String },
    Failed { job_id: i64, error: String },
}

impl WorkOutcome {
    pub fn job_id(&self) -> Option<i64> {
        match self {
            WorkOutcome::Idle => None,
            WorkOutcome::Succeeded { job_id, .. } | WorkOutcome::Failed { job_id, .. } => {
                Some(*job_id)
            }
        }
    }
}

/// First few characters of `text`, with `...` appended when cut.
pub fn text_preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Elapsed time in whole milliseconds, rounded up and never below 1.
pub fn duration_ms(elapsed: Duration) -> i64 {
    let millis = elapsed.as_micros().div_ceil(1000);
    i64::try_from(millis).unwrap_or(i64::MAX).max(1)
}
