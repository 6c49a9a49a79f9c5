//! Command-line interface for novox
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Live karaoke: vocal removal for the microphone feed
#[derive(Parser, Debug)]
#[command(
    name = "novox",
    version,
    about = "Live karaoke: vocal removal for the microphone feed"
)]
pub struct Cli {
    /// Subcommand to execute (default: run capture and playback together)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress status output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Audio input device name (substring match)
    #[arg(long, value_name = "DEVICE")]
    pub input_device: Option<String>,

    /// Audio output device name (substring match)
    #[arg(long, value_name = "DEVICE")]
    pub output_device: Option<String>,

    /// Chunk window duration. Examples: 10s, 6s, 1m
    #[arg(long, short = 'w', value_name = "DURATION", value_parser = parse_secs)]
    pub window: Option<f64>,

    /// Overlap carried between consecutive chunks. Examples: 1s, 500ms
    #[arg(long, value_name = "DURATION", value_parser = parse_secs)]
    pub overlap: Option<f64>,

    /// Duration trimmed from each end of a chunk at playback. Examples: 500ms
    #[arg(long, value_name = "DURATION", value_parser = parse_secs)]
    pub trim: Option<f64>,

    /// Demucs model name (default: htdemucs)
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Demucs compute device (cuda or cpu)
    #[arg(long, value_name = "DEVICE")]
    pub compute: Option<String>,

    /// Directory where separated results are stored
    #[arg(long, value_name = "PATH")]
    pub store_dir: Option<PathBuf>,

    /// How often the playback side re-scans the store. Examples: 1s, 250ms
    #[arg(long, global = true, value_name = "DURATION", value_parser = parse_millis)]
    pub poll_interval: Option<u64>,
}

/// Parse a duration string into fractional seconds.
///
/// Supports any format accepted by `humantime`: bare numbers (seconds),
/// single-unit (`10s`, `500ms`), and compound (`1m30s`).
fn parse_secs(s: &str) -> Result<f64, String> {
    let s = s.trim();
    // Bare number → seconds
    if let Ok(secs) = s.parse::<f64>() {
        if secs.is_finite() && secs >= 0.0 {
            return Ok(secs);
        }
        return Err(format!("invalid duration: {s}"));
    }
    humantime::parse_duration(s)
        .map(|d| d.as_secs_f64())
        .map_err(|e| e.to_string())
}

/// Parse a duration string into whole milliseconds.
fn parse_millis(s: &str) -> Result<u64, String> {
    parse_secs(s).map(|secs| (secs * 1000.0) as u64)
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record the microphone and separate chunks into the store (producer only)
    Capture,

    /// Watch the store and play separated chunks (consumer only)
    Play,

    /// List available audio input and output devices
    Devices,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_command() {
        let cli = Cli::try_parse_from(["novox"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
        assert!(!cli.quiet);
        assert!(cli.input_device.is_none());
        assert!(cli.output_device.is_none());
        assert!(cli.window.is_none());
        assert!(cli.overlap.is_none());
        assert!(cli.trim.is_none());
        assert!(cli.model.is_none());
        assert!(cli.store_dir.is_none());
        assert!(cli.poll_interval.is_none());
    }

    #[test]
    fn test_parse_capture() {
        let cli = Cli::try_parse_from(["novox", "capture"]).unwrap();
        match cli.command {
            Some(Commands::Capture) => {}
            _ => panic!("Expected Capture command"),
        }
    }

    #[test]
    fn test_parse_play() {
        let cli = Cli::try_parse_from(["novox", "play"]).unwrap();
        match cli.command {
            Some(Commands::Play) => {}
            _ => panic!("Expected Play command"),
        }
    }

    #[test]
    fn test_parse_devices() {
        let cli = Cli::try_parse_from(["novox", "devices"]).unwrap();
        match cli.command {
            Some(Commands::Devices) => {}
            _ => panic!("Expected Devices command"),
        }
    }

    #[test]
    fn test_parse_global_config() {
        let cli = Cli::try_parse_from(["novox", "--config", "/path/to/novox.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/novox.toml")));
    }

    #[test]
    fn test_parse_global_quiet_after_command() {
        let cli = Cli::try_parse_from(["novox", "play", "-q"]).unwrap();
        assert!(cli.quiet);
        match cli.command {
            Some(Commands::Play) => {}
            _ => panic!("Expected Play command"),
        }
    }

    #[test]
    fn test_parse_devices_overrides() {
        let cli = Cli::try_parse_from([
            "novox",
            "--input-device",
            "USB Microphone",
            "--output-device",
            "Speakers",
        ])
        .unwrap();
        assert_eq!(cli.input_device.as_deref(), Some("USB Microphone"));
        assert_eq!(cli.output_device.as_deref(), Some("Speakers"));
    }

    #[test]
    fn test_parse_window_with_unit() {
        let cli = Cli::try_parse_from(["novox", "--window", "6s"]).unwrap();
        assert_eq!(cli.window, Some(6.0));
    }

    #[test]
    fn test_parse_window_bare_number() {
        let cli = Cli::try_parse_from(["novox", "-w", "12"]).unwrap();
        assert_eq!(cli.window, Some(12.0));
    }

    #[test]
    fn test_parse_trim_millis() {
        let cli = Cli::try_parse_from(["novox", "--trim", "500ms"]).unwrap();
        assert_eq!(cli.trim, Some(0.5));
    }

    #[test]
    fn test_parse_poll_interval() {
        let cli = Cli::try_parse_from(["novox", "play", "--poll-interval", "250ms"]).unwrap();
        assert_eq!(cli.poll_interval, Some(250));
        let cli = Cli::try_parse_from(["novox", "play", "--poll-interval", "2s"]).unwrap();
        assert_eq!(cli.poll_interval, Some(2000));
    }

    #[test]
    fn test_parse_invalid_duration_is_an_error() {
        assert!(Cli::try_parse_from(["novox", "--window", "abc"]).is_err());
        assert!(Cli::try_parse_from(["novox", "--window", "-5"]).is_err());
    }

    #[test]
    fn test_parse_secs_formats() {
        assert_eq!(parse_secs("10").unwrap(), 10.0);
        assert_eq!(parse_secs("10s").unwrap(), 10.0);
        assert_eq!(parse_secs("500ms").unwrap(), 0.5);
        assert_eq!(parse_secs("1m30s").unwrap(), 90.0);
        assert!(parse_secs("nonsense").is_err());
    }

    #[test]
    fn test_invalid_command_returns_error() {
        let result = Cli::try_parse_from(["novox", "record"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn test_version_flag() {
        let result = Cli::try_parse_from(["novox", "--version"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
