//! Synthesizer that shells out to an external TTS program such as `piper`.
//!
//! The text is written to the program's stdin and the program is expected to
//! write a WAV file to the path substituted for `{output}` in its arguments.

use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::schema::{SynthesisConfig, OUTPUT_PLACEHOLDER};

use super::{Synthesis, SynthesisError, Synthesizer};

const WAIT_POLL: Duration = Duration::from_millis(20);
const MAX_STDERR_CHARS: usize = 400;

pub struct CommandSynthesizer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSynthesizer {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &SynthesisConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone(), config.timeout())
    }

    fn run(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
        let output_path = tempfile::Builder::new()
            .prefix("voicegen-")
            .suffix(".wav")
            .tempfile()?
            .into_temp_path();
        let output = output_path.to_string_lossy().into_owned();

        let args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace(OUTPUT_PLACEHOLDER, &output))
            .collect();

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SynthesisError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;

        // Drain stderr on its own thread so a chatty backend cannot fill the pipe.
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf);
                buf
            })
        });

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(text.as_bytes()) {
                // The program may exit without reading; its status says why.
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(SynthesisError::Io(e));
                }
            }
        }

        // On timeout the stderr reader is left detached; a grandchild may still hold the pipe.
        let Some(status) = wait_with_timeout(&mut child, self.timeout)? else {
            return Err(SynthesisError::Timeout {
                secs: self.timeout.as_secs(),
            });
        };
        let stderr = stderr_reader
            .and_then(|h| h.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(SynthesisError::CommandFailed {
                status: status.to_string(),
                stderr: stderr.trim().chars().take(MAX_STDERR_CHARS).collect(),
            });
        }

        let audio = std::fs::read(&output_path)?;
        if audio.is_empty() {
            return Err(SynthesisError::EmptyOutput);
        }
        Ok(audio)
    }
}

impl Synthesizer for CommandSynthesizer {
    fn synthesize(&mut self, text: &str) -> Result<Synthesis, SynthesisError> {
        let started = Instant::now();
        let audio = self.run(text)?;
        Ok(Synthesis {
            audio,
            elapsed: started.elapsed(),
        })
    }

    fn name(&self) -> &str {
        &self.program
    }
}

/// Waits for the child to exit. Returns `None` (after killing it) on timeout.
fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
) -> Result<Option<ExitStatus>, SynthesisError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            log::warn!("Synthesizer exceeded {}s, killing it", timeout.as_secs());
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(WAIT_POLL);
    }
}
