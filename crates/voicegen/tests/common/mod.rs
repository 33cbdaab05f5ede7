//! Shared test utilities for voicegen integration tests.
//!
//! - `TestHarness` owns a temp directory holding a file-backed store and a
//!   public directory, and builds routers and workers on top of them
//! - `synth` has in-process synthesizers that produce real WAV bytes

pub mod harness;
pub mod synth;

pub use harness::TestHarness;
pub use synth::{ScriptedSynthesizer, StoreLock};
