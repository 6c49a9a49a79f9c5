//! Default configuration constants for novox.
//!
//! Shared across the config types and the CLI so the two surfaces can never
//! drift apart.

/// Default audio sample rate in Hz.
///
/// 44.1kHz is the standard rate for music; Demucs models are trained on it.
pub const SAMPLE_RATE: u32 = 44100;

/// Default channel count (stereo).
pub const CHANNELS: u16 = 2;

/// Default window duration in seconds.
///
/// Total length of each chunk handed to the separator, including the
/// overlap carried from the previous chunk.
pub const WINDOW_SECS: f64 = 10.0;

/// Default overlap duration in seconds.
///
/// The trailing seconds of each chunk are replayed at the head of the next
/// one, giving the separator boundary context on both sides of every seam.
pub const OVERLAP_SECS: f64 = 1.0;

/// Default trim duration in seconds.
///
/// Removed from both ends of every separated chunk before playback so that
/// separation-boundary artifacts fall inside the discarded regions.
pub const TRIM_SECS: f64 = 0.5;

/// Default result store poll interval in milliseconds.
///
/// Upper bound on how long a freshly stored result waits before the
/// playback side discovers it.
pub const POLL_INTERVAL_MS: u64 = 1000;

/// Default directory for completed instrumental results.
pub const STORE_DIR: &str = "novox_output";

/// Default scratch directory for chunk WAVs and separator output.
pub const WORK_DIR: &str = "novox_work";

/// Default Demucs model name.
pub const DEMUCS_MODEL: &str = "htdemucs";

/// Default Demucs compute device. Use "cuda" when a GPU is available;
/// CPU separation is typically slower than real time.
pub const DEMUCS_DEVICE: &str = "cpu";

/// Output buffer low-water mark in seconds.
///
/// `CpalOutputSink::write` returns once the buffered backlog drops below
/// this, which is what paces the playback loop at real-time speed.
pub const OUTPUT_LOW_WATER_SECS: f64 = 0.5;
