//! Atomic script output
//!
//! Scripts are written to a temporary file in the output directory and
//! renamed to `<block_id>__<session_id>-<tag>.js`. Readers never see a
//! partially written script.
//!
//! Both ids are reduced to file-name-safe characters, so distinct ids can
//! read the same. The tag is a Blake3 digest of the unreduced ids and keeps
//! their paths apart.

use crate::error::WriteError;
use macrogen_synth::SynthesizedScript;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::info;

/// Writes synthesized scripts into one directory
#[derive(Debug, Clone)]
pub struct ScriptWriter {
    dir: PathBuf,
    timeout: Duration,
}

impl ScriptWriter {
    /// Create writer for `dir`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            dir: dir.into(),
            timeout,
        }
    }

    /// Output directory
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Destination path of a script
    ///
    /// The same block and session always map to the same path.
    #[must_use]
    pub fn path_for(&self, script: &SynthesizedScript) -> PathBuf {
        let block = script.block_id().as_str();
        let session = script.session_id();
        self.dir.join(format!(
            "{}__{}-{}.js",
            sanitize(block),
            sanitize(session),
            path_tag(block, session)
        ))
    }

    /// Write a script atomically
    ///
    /// # Errors
    /// - `WriteError::Io` if the directory or file cannot be written
    /// - `WriteError::Timeout` if the write takes longer than the timeout
    pub async fn write(&self, script: &SynthesizedScript) -> Result<PathBuf, WriteError> {
        let dir = self.dir.clone();
        let path = self.path_for(script);
        let text = script.text().to_string();

        let task = tokio::task::spawn_blocking(move || write_atomic(&dir, path, &text));
        let path = match tokio::time::timeout(self.timeout, task).await {
            Err(_) => return Err(WriteError::Timeout(self.timeout)),
            Ok(Err(join)) => return Err(WriteError::Join(join.to_string())),
            Ok(Ok(result)) => result?,
        };
        info!(path = %path.display(), block = %script.block_id(), "script written");
        Ok(path)
    }
}

fn write_atomic(dir: &Path, path: PathBuf, text: &str) -> Result<PathBuf, WriteError> {
    std::fs::create_dir_all(dir).map_err(|e| WriteError::io_error(dir, e))?;
    let mut file = NamedTempFile::new_in(dir).map_err(|e| WriteError::io_error(dir, e))?;
    file.write_all(text.as_bytes())
        .and_then(|()| file.as_file().sync_all())
        .map_err(|e| WriteError::io_error(file.path(), e))?;
    file.persist(&path)
        .map_err(|e| WriteError::io_error(&path, e.error))?;
    Ok(path)
}

/// First 8 bytes of the digest of both ids, as hex
fn path_tag(block: &str, session: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(block.len() as u64).to_le_bytes());
    hasher.update(block.as_bytes());
    hasher.update(session.as_bytes());
    hex::encode(&hasher.finalize().as_bytes()[..TAG_BYTES])
}

const TAG_BYTES: usize = 8;

/// Keep file-name-safe characters, replace the rest with `_`
fn sanitize(part: &str) -> String {
    let cleaned: String = part
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}
