use anyhow::Result;
use clap::Parser;
use novox::app::{run_capture_command, run_command, run_play_command};
use novox::audio::capture::{list_input_devices, list_output_devices};
use novox::cli::{Cli, Commands};
use novox::config::{Config, default_config_path};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            let config = load_config(&cli)?;
            run_command(config, cli.quiet).await?;
        }
        Some(Commands::Capture) => {
            let config = load_config(&cli)?;
            run_capture_command(config, cli.quiet).await?;
        }
        Some(Commands::Play) => {
            let config = load_config(&cli)?;
            run_play_command(config, cli.quiet).await?;
        }
        Some(Commands::Devices) => {
            list_audio_devices()?;
        }
    }

    Ok(())
}

/// Load configuration and apply overrides.
///
/// Priority order, lowest to highest:
/// 1. Built-in defaults
/// 2. Config file (--config path, or ~/.config/novox/novox.toml)
/// 3. Environment variables (NOVOX_*)
/// 4. Command-line flags
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(path) = cli.config.as_deref() {
        Config::load(path)?
    } else {
        Config::load_or_default(&default_config_path())?
    }
    .with_env_overrides();

    if let Some(device) = &cli.input_device {
        config.audio.input_device = Some(device.clone());
    }
    if let Some(device) = &cli.output_device {
        config.audio.output_device = Some(device.clone());
    }
    if let Some(secs) = cli.window {
        config.window.window_secs = secs;
    }
    if let Some(secs) = cli.overlap {
        config.window.overlap_secs = secs;
    }
    if let Some(secs) = cli.trim {
        config.window.trim_secs = secs;
    }
    if let Some(model) = &cli.model {
        config.separation.model = model.clone();
    }
    if let Some(compute) = &cli.compute {
        config.separation.device = compute.clone();
    }
    if let Some(dir) = &cli.store_dir {
        config.store.dir = dir.clone();
    }
    if let Some(ms) = cli.poll_interval {
        config.store.poll_interval_ms = ms;
    }

    config.validate()?;
    Ok(config)
}

/// List available audio input and output devices.
fn list_audio_devices() -> Result<()> {
    let inputs = list_input_devices()?;
    let outputs = list_output_devices()?;

    if inputs.is_empty() && outputs.is_empty() {
        eprintln!("No audio devices found");
        std::process::exit(1);
    }

    println!("Input devices:");
    for (idx, device) in inputs.iter().enumerate() {
        println!("  [{}] {}", idx, device);
    }
    println!("Output devices:");
    for (idx, device) in outputs.iter().enumerate() {
        println!("  [{}] {}", idx, device);
    }

    Ok(())
}
