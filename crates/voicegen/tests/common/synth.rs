#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use voicegen::{Synthesis, SynthesisError, Synthesizer};

/// A short silent mono clip.
pub fn wav_bytes() -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 22050,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
        for _ in 0..256 {
            writer.write_sample(0i16).expect("wav sample");
        }
        writer.finalize().expect("wav finalize");
    }
    cursor.into_inner()
}

/// Speaks anything except texts containing `fail_on`, and records every
/// text it was asked to speak.
pub struct ScriptedSynthesizer {
    fail_on: Option<String>,
    pub spoken: Arc<Mutex<Vec<String>>>,
}

impl ScriptedSynthesizer {
    pub fn new() -> Self {
        Self {
            fail_on: None,
            spoken: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_on: Some(marker.to_string()),
            ..Self::new()
        }
    }
}

impl Synthesizer for ScriptedSynthesizer {
    fn synthesize(&mut self, text: &str) -> Result<Synthesis, SynthesisError> {
        self.spoken.lock().unwrap().push(text.to_string());
        if let Some(marker) = &self.fail_on {
            if text.contains(marker.as_str()) {
                return Err(SynthesisError::Backend("voice model crashed".to_string()));
            }
        }
        Ok(Synthesis {
            audio: wav_bytes(),
            elapsed: Duration::from_millis(2),
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Holds the store's write lock from a second connection, starting while
/// the first job is being synthesized, until [`StoreLock::release`].
pub struct StoreLock {
    conn: Arc<Mutex<rusqlite::Connection>>,
    held: Arc<AtomicBool>,
}

impl StoreLock {
    pub fn new(db_path: &Path) -> Self {
        Self {
            conn: Arc::new(Mutex::new(
                rusqlite::Connection::open(db_path).expect("open blocker connection"),
            )),
            held: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }

    pub fn release(&self) {
        self.conn
            .lock()
            .unwrap()
            .execute_batch("COMMIT")
            .expect("release store lock");
    }

    /// Synthesizer that takes the lock on its first call.
    pub fn synthesizer(&self) -> LockingSynthesizer {
        LockingSynthesizer {
            conn: Arc::clone(&self.conn),
            held: Arc::clone(&self.held),
        }
    }
}

pub struct LockingSynthesizer {
    conn: Arc<Mutex<rusqlite::Connection>>,
    held: Arc<AtomicBool>,
}

impl Synthesizer for LockingSynthesizer {
    fn synthesize(&mut self, _text: &str) -> Result<Synthesis, SynthesisError> {
        if !self.held.load(Ordering::SeqCst) {
            self.conn
                .lock()
                .unwrap()
                .execute_batch("BEGIN IMMEDIATE")
                .map_err(|e| SynthesisError::Backend(e.to_string()))?;
            self.held.store(true, Ordering::SeqCst);
        }
        Ok(Synthesis {
            audio: wav_bytes(),
            elapsed: Duration::from_millis(2),
        })
    }

    fn name(&self) -> &str {
        "locking"
    }
}
