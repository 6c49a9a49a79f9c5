//! Error types for novox.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NovoxError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Capture errors — fatal to the producing side
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio capture failed: {message}")]
    Capture { message: String },

    // Playback errors
    #[error("Audio playback failed: {message}")]
    Playback { message: String },

    // Separation errors — absorbed per chunk, the index becomes a gap
    #[error("Separation produced no result: {message}")]
    Separation { message: String },

    // Result store / scratch-dir I/O — logged, non-fatal
    #[error("Result relay failed: {message}")]
    Relay { message: String },

    #[error("No stored result for chunk {index}")]
    ResultNotFound { index: u64 },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, NovoxError>;
