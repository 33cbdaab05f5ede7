//! Text-to-speech backends.
//!
//! The worker owns exactly one [`Synthesizer`] and calls it for one job at a
//! time; implementations may hold heavyweight, non-reentrant state.

pub mod command;

use std::time::Duration;

use thiserror::Error;

pub use command::CommandSynthesizer;

/// Audio produced for one job.
#[derive(Debug, Clone)]
pub struct Synthesis {
    /// WAV-encoded audio.
    pub audio: Vec<u8>,
    /// Time the backend spent producing it.
    pub elapsed: Duration,
}

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error during synthesis: {0}")]
    Io(#[from] std::io::Error),

    #[error("Synthesis timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Synthesizer exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },

    #[error("Synthesizer produced no audio")]
    EmptyOutput,

    #[error("{0}")]
    Backend(String),
}

pub trait Synthesizer: Send {
    /// Converts `text` into WAV audio.
    fn synthesize(&mut self, text: &str) -> Result<Synthesis, SynthesisError>;

    /// Short name used in log lines.
    fn name(&self) -> &str;
}
