use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use crate::error::StorageError;

use super::AUDIO_SUBDIR;

/// Write-once storage for generated audio under the public directory.
///
/// Files are named after the job id, so each job owns exactly one path and
/// no two jobs can collide.
pub struct AudioStorage {
    public_directory: PathBuf,
}

impl AudioStorage {
    pub fn new<P: AsRef<Path>>(public_directory: P) -> Self {
        Self {
            public_directory: public_directory.as_ref().to_path_buf(),
        }
    }

    pub fn audio_directory(&self) -> PathBuf {
        self.public_directory.join(AUDIO_SUBDIR)
    }

    /// Path (relative to the public directory) used for a job's audio.
    pub fn relative_path(job_id: i64) -> String {
        format!("{}/{}.wav", AUDIO_SUBDIR, job_id)
    }

    /// Validates `content` as WAV and writes it for `job_id`.
    ///
    /// Returns the path relative to the public directory, e.g. `audio/7.wav`.
    pub fn store(&self, job_id: i64, content: &[u8]) -> Result<String, StorageError> {
        let spec = hound::WavReader::new(Cursor::new(content))?.spec();
        log::debug!(
            "Job {} audio: {} channel(s) at {} Hz",
            job_id,
            spec.channels,
            spec.sample_rate
        );

        let dir = self.audio_directory();
        self.ensure_directory(&dir)?;

        let relative = Self::relative_path(job_id);
        let path = self.public_directory.join(&relative);
        write_new(&path, content)?;

        Ok(relative)
    }

    fn ensure_directory(&self, path: &Path) -> Result<(), StorageError> {
        if !path.exists() {
            std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        Ok(())
    }
}

/// Creates `path` exclusively (O_CREAT | O_EXCL) and writes `content`.
/// A partially written file is removed.
fn write_new(path: &Path, content: &[u8]) -> Result<(), StorageError> {
    let mut file = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(StorageError::FileExists(path.to_path_buf()));
        }
        Err(e) => {
            return Err(StorageError::WriteFile {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    if let Err(e) = file.write_all(content).and_then(|_| file.sync_all()) {
        drop(file);
        let _ = std::fs::remove_file(path);
        return Err(StorageError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        });
    }
    Ok(())
}
