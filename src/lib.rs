//! novox - Live karaoke vocal removal
//!
//! Captures the microphone, separates vocals from instrumentals with Demucs
//! in overlapping chunks, and plays the instrumental back as one continuous
//! stream.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod app;
pub mod audio;
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod pipeline;
pub mod separate;
pub mod store;

// Core traits (capture → separate → store → play)
pub use audio::playback::{CollectorSink, OutputSink};
pub use audio::source::CaptureSource;
pub use separate::separator::Separator;
pub use store::ResultStore;

// Pipeline
pub use app::PipelineHandle;
pub use pipeline::{AudioChunk, SeparatedResult};

// Error handling
pub use error::{NovoxError, Result};

// Config
pub use config::Config;
