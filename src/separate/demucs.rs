//! Separation backend that shells out to the Demucs CLI.
//!
//! Per chunk: write the audio to a scratch WAV, run
//! `demucs --two-stems=vocals`, read back the `no_vocals.wav` stem, and
//! clean up the scratch files. Demucs draws its own chunk boundaries when
//! given `--overlap`, so it is pinned to 0 — boundary context is already
//! handled by our windowing.

use crate::audio::wav;
use crate::config::SeparationConfig;
use crate::error::{NovoxError, Result};
use crate::pipeline::types::AudioChunk;
use crate::separate::separator::Separator;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

/// Stem filename Demucs writes for the instrumental track.
const INSTRUMENTAL_STEM: &str = "no_vocals.wav";

/// Vocal separator backed by the `demucs` command-line tool.
pub struct DemucsSeparator {
    binary: String,
    model: String,
    device: String,
    work_dir: PathBuf,
    quiet: bool,
}

impl DemucsSeparator {
    /// Create a separator from configuration, creating the scratch dir.
    pub fn new(config: &SeparationConfig) -> Result<Self> {
        fs::create_dir_all(&config.work_dir).map_err(|e| NovoxError::Relay {
            message: format!(
                "Failed to create work dir {}: {}",
                config.work_dir.display(),
                e
            ),
        })?;

        Ok(Self {
            binary: "demucs".to_string(),
            model: config.model.clone(),
            device: config.device.clone(),
            work_dir: config.work_dir.clone(),
            quiet: false,
        })
    }

    /// Suppress per-chunk timing output.
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Override the demucs executable (for tests and custom installs).
    pub fn with_binary(mut self, binary: &str) -> Self {
        self.binary = binary.to_string();
        self
    }

    /// Locate the instrumental stem under a finished demucs output dir.
    ///
    /// Demucs writes `<out>/<model>/<track-name>/no_vocals.wav`; the track
    /// name is derived from the input filename, so we take the first (only)
    /// subdirectory rather than reconstructing it.
    fn locate_instrumental(&self, out_dir: &Path) -> Result<PathBuf> {
        let model_dir = out_dir.join(&self.model);
        let entries = fs::read_dir(&model_dir).map_err(|e| NovoxError::Separation {
            message: format!("demucs output dir {} missing: {}", model_dir.display(), e),
        })?;

        let track_dir = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .find(|path| path.is_dir())
            .ok_or_else(|| NovoxError::Separation {
                message: format!("no track folder under {}", model_dir.display()),
            })?;

        let stem = track_dir.join(INSTRUMENTAL_STEM);
        if stem.exists() {
            Ok(stem)
        } else {
            Err(NovoxError::Separation {
                message: format!("no instrumental stem at {}", stem.display()),
            })
        }
    }

    /// Remove a scratch path, downgrading failures to a logged relay warning.
    fn cleanup(path: &Path, is_dir: bool) {
        let outcome = if is_dir {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        if let Err(e) = outcome {
            eprintln!(
                "novox: failed to clean up scratch path {}: {}",
                path.display(),
                e
            );
        }
    }

    fn run(&self, chunk: &AudioChunk) -> Result<Vec<f32>> {
        let chunk_path = self.work_dir.join(format!("chunk_{}.wav", chunk.index));
        let out_dir = self.work_dir.join(format!("separated_{}", chunk.index));

        wav::write_wav(&chunk_path, &chunk.samples, chunk.sample_rate, chunk.channels)?;

        let status = Command::new(&self.binary)
            .arg("-n")
            .arg(&self.model)
            .arg("--two-stems=vocals")
            .arg("-d")
            .arg(&self.device)
            .arg("--overlap")
            .arg("0")
            .arg("--out")
            .arg(&out_dir)
            .arg(&chunk_path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| NovoxError::Separation {
                message: format!("failed to run {}: {}", self.binary, e),
            })?;

        if !status.success() {
            return Err(NovoxError::Separation {
                message: format!("{} exited with {}", self.binary, status),
            });
        }

        let stem = self.locate_instrumental(&out_dir)?;
        let (samples, _, _) = wav::read_wav(&stem)?;

        // Success: the whole per-chunk output tree is scratch now
        Self::cleanup(&out_dir, true);
        Ok(samples)
    }
}

impl Separator for DemucsSeparator {
    fn separate(&self, chunk: &AudioChunk) -> Result<Vec<f32>> {
        let started = Instant::now();
        let outcome = self.run(chunk);

        // The source chunk WAV is consumed either way. On failure the
        // demucs output dir (if any) stays behind for diagnosis.
        Self::cleanup(&self.work_dir.join(format!("chunk_{}.wav", chunk.index)), false);

        if !self.quiet && outcome.is_ok() {
            eprintln!(
                "novox: chunk {} separated in {:.2}s",
                chunk.index,
                started.elapsed().as_secs_f64()
            );
        }
        outcome
    }
}
