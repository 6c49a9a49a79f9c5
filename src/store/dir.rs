//! Directory-backed result store.
//!
//! One WAV file per result, named `chunk_<index>_novocals.wav`. Writes go
//! through a `.part` temp file followed by a rename, so a concurrent
//! listing from the playback process never observes a half-written result.

use crate::audio::wav;
use crate::error::{NovoxError, Result};
use crate::pipeline::types::SeparatedResult;
use crate::store::ResultStore;
use std::fs;
use std::path::{Path, PathBuf};

const FILE_PREFIX: &str = "chunk_";
const FILE_SUFFIX: &str = "_novocals.wav";

/// Durable result store: the boundary between the separation process and
/// the playback process.
#[derive(Debug, Clone)]
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| NovoxError::Relay {
            message: format!("Failed to create store dir {}: {}", dir.display(), e),
        })?;
        Ok(Self { dir })
    }

    /// Deterministic, integer-sortable key for a chunk index.
    fn path_for(&self, index: u64) -> PathBuf {
        self.dir.join(format!("{FILE_PREFIX}{index}{FILE_SUFFIX}"))
    }

    /// Parse a store filename back into its chunk index.
    fn parse_index(name: &str) -> Option<u64> {
        name.strip_prefix(FILE_PREFIX)?
            .strip_suffix(FILE_SUFFIX)?
            .parse()
            .ok()
    }
}

impl ResultStore for DirStore {
    fn put(&self, result: &SeparatedResult) -> Result<()> {
        let path = self.path_for(result.index);
        if path.exists() {
            return Err(NovoxError::Relay {
                message: format!("Result for chunk {} already stored", result.index),
            });
        }

        // Write to a temp name first; the rename is what publishes the result.
        let part = path.with_extension("wav.part");
        wav::write_wav(&part, &result.samples, result.sample_rate, result.channels)?;
        fs::rename(&part, &path).map_err(|e| NovoxError::Relay {
            message: format!("Failed to publish result for chunk {}: {}", result.index, e),
        })?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<u64>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| NovoxError::Relay {
            message: format!("Failed to list store dir {}: {}", self.dir.display(), e),
        })?;

        let mut indices: Vec<u64> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| Self::parse_index(&entry.file_name().to_string_lossy()))
            .collect();
        indices.sort_unstable();
        Ok(indices)
    }

    fn take(&self, index: u64) -> Result<SeparatedResult> {
        let path = self.path_for(index);
        if !path.exists() {
            return Err(NovoxError::ResultNotFound { index });
        }

        let (samples, sample_rate, channels) = wav::read_wav(&path)?;

        // Removal failure leaves residue on disk but the result is still
        // good; the in-process queued set prevents a replay either way.
        if let Err(e) = fs::remove_file(&path) {
            eprintln!(
                "novox: failed to remove consumed result {}: {}",
                path.display(),
                e
            );
        }

        Ok(SeparatedResult::new(index, samples, sample_rate, channels))
    }
}

/// Remove leftover `.part` files from an interrupted separation process.
///
/// Safe to call on startup of the producing side; consumed results and
/// fully published files are untouched.
pub fn sweep_partial_writes(dir: &Path) -> Result<usize> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => {
            return Err(NovoxError::Relay {
                message: format!("Failed to sweep store dir {}: {}", dir.display(), e),
            });
        }
    };

    let mut removed = 0;
    for entry in entries.filter_map(|entry| entry.ok()) {
        let name = entry.file_name();
        if name.to_string_lossy().ends_with(".part") && fs::remove_file(entry.path()).is_ok() {
            removed += 1;
        }
    }
    Ok(removed)
}
