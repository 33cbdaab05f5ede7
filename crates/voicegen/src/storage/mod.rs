pub mod filesystem;

pub use filesystem::AudioStorage;

/// Subdirectory of the public directory holding generated audio.
pub const AUDIO_SUBDIR: &str = "audio";
