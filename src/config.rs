use crate::defaults;
use crate::error::{NovoxError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub window: WindowConfig,
    pub separation: SeparationConfig,
    pub store: StoreConfig,
}

/// Audio device and format configuration.
///
/// Every stage assumes this exact format; no resampling or reconciliation
/// happens between stages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub input_device: Option<String>,
    pub output_device: Option<String>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Chunk windowing and playback trim configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Total chunk duration in seconds, overlap included.
    pub window_secs: f64,
    /// Seconds of the previous chunk replayed at the head of the next one.
    pub overlap_secs: f64,
    /// Seconds removed from both ends of a separated chunk before playback.
    pub trim_secs: f64,
}

/// Separation backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SeparationConfig {
    /// Demucs model name.
    pub model: String,
    /// Demucs compute device ("cuda" or "cpu").
    pub device: String,
    /// Scratch directory for chunk WAVs and raw separator output.
    pub work_dir: PathBuf,
}

/// Result store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory where completed instrumental results land.
    pub dir: PathBuf,
    /// How often the playback side re-scans the store.
    pub poll_interval_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_device: None,
            output_device: None,
            sample_rate: defaults::SAMPLE_RATE,
            channels: defaults::CHANNELS,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_secs: defaults::WINDOW_SECS,
            overlap_secs: defaults::OVERLAP_SECS,
            trim_secs: defaults::TRIM_SECS,
        }
    }
}

impl Default for SeparationConfig {
    fn default() -> Self {
        Self {
            model: defaults::DEMUCS_MODEL.to_string(),
            device: defaults::DEMUCS_DEVICE.to_string(),
            work_dir: PathBuf::from(defaults::WORK_DIR),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(defaults::STORE_DIR),
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
        }
    }
}

impl WindowConfig {
    /// Frames in a full window at the given sample rate.
    pub fn window_frames(&self, sample_rate: u32) -> usize {
        (self.window_secs * sample_rate as f64) as usize
    }

    /// Frames of overlap carried between consecutive chunks.
    pub fn overlap_frames(&self, sample_rate: u32) -> usize {
        (self.overlap_secs * sample_rate as f64) as usize
    }

    /// Frames of fresh capture per chunk after the first one.
    pub fn fresh_frames(&self, sample_rate: u32) -> usize {
        self.window_frames(sample_rate) - self.overlap_frames(sample_rate)
    }

    /// Frames trimmed from each end of a separated chunk.
    pub fn trim_frames(&self, sample_rate: u32) -> usize {
        (self.trim_secs * sample_rate as f64) as usize
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                NovoxError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                NovoxError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file, or return defaults if the file does
    /// not exist. Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(NovoxError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - NOVOX_INPUT_DEVICE → audio.input_device
    /// - NOVOX_OUTPUT_DEVICE → audio.output_device
    /// - NOVOX_STORE_DIR → store.dir
    /// - NOVOX_WORK_DIR → separation.work_dir
    /// - NOVOX_DEMUCS_MODEL → separation.model
    /// - NOVOX_DEMUCS_DEVICE → separation.device
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(device) = std::env::var("NOVOX_INPUT_DEVICE")
            && !device.is_empty()
        {
            self.audio.input_device = Some(device);
        }
        if let Ok(device) = std::env::var("NOVOX_OUTPUT_DEVICE")
            && !device.is_empty()
        {
            self.audio.output_device = Some(device);
        }
        if let Ok(dir) = std::env::var("NOVOX_STORE_DIR")
            && !dir.is_empty()
        {
            self.store.dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("NOVOX_WORK_DIR")
            && !dir.is_empty()
        {
            self.separation.work_dir = PathBuf::from(dir);
        }
        if let Ok(model) = std::env::var("NOVOX_DEMUCS_MODEL")
            && !model.is_empty()
        {
            self.separation.model = model;
        }
        if let Ok(device) = std::env::var("NOVOX_DEMUCS_DEVICE")
            && !device.is_empty()
        {
            self.separation.device = device;
        }
        self
    }

    /// Validate value ranges and cross-field constraints.
    ///
    /// The windowing math assumes `overlap < window`; everything else is a
    /// plain range check.
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(NovoxError::ConfigInvalidValue {
                key: "audio.sample_rate".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.audio.channels == 0 {
            return Err(NovoxError::ConfigInvalidValue {
                key: "audio.channels".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.window.window_secs <= 0.0 {
            return Err(NovoxError::ConfigInvalidValue {
                key: "window.window_secs".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.window.overlap_secs < 0.0 || self.window.overlap_secs >= self.window.window_secs {
            return Err(NovoxError::ConfigInvalidValue {
                key: "window.overlap_secs".to_string(),
                message: "must be non-negative and smaller than window_secs".to_string(),
            });
        }
        if self.window.trim_secs < 0.0 || self.window.trim_secs * 2.0 > self.window.window_secs {
            return Err(NovoxError::ConfigInvalidValue {
                key: "window.trim_secs".to_string(),
                message: "must be non-negative and at most half of window_secs".to_string(),
            });
        }
        if self.store.poll_interval_ms == 0 {
            return Err(NovoxError::ConfigInvalidValue {
                key: "store.poll_interval_ms".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Default config file location: `$XDG_CONFIG_HOME/novox/novox.toml`,
/// falling back to the current directory when no config dir exists.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("novox").join("novox.toml"))
        .unwrap_or_else(|| PathBuf::from("novox.toml"))
}
