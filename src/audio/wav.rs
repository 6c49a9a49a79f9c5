//! WAV encode/decode for the result store and separator handoff.
//!
//! Chunks travel to the separator as 32-bit float WAV; results coming back
//! may be float or integer PCM depending on the separation backend, so the
//! reader normalizes everything to interleaved f32.

use crate::error::{NovoxError, Result};
use std::path::Path;

/// Write interleaved f32 samples as a 32-bit float WAV file.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) -> Result<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::create(path, spec).map_err(|e| NovoxError::Relay {
        message: format!("Failed to create WAV file {}: {}", path.display(), e),
    })?;
    for &sample in samples {
        writer.write_sample(sample).map_err(|e| NovoxError::Relay {
            message: format!("Failed to write WAV samples to {}: {}", path.display(), e),
        })?;
    }
    writer.finalize().map_err(|e| NovoxError::Relay {
        message: format!("Failed to finalize WAV file {}: {}", path.display(), e),
    })?;
    Ok(())
}

/// Read a WAV file into interleaved f32 samples.
///
/// Returns `(samples, sample_rate, channels)`. Integer PCM input is scaled
/// into the [-1, 1] float range.
pub fn read_wav(path: &Path) -> Result<(Vec<f32>, u32, u16)> {
    let mut reader = hound::WavReader::open(path).map_err(|e| NovoxError::Relay {
        message: format!("Failed to open WAV file {}: {}", path.display(), e),
    })?;

    let spec = reader.spec();
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| NovoxError::Relay {
                message: format!("Failed to read WAV samples from {}: {}", path.display(), e),
            })?,
        hound::SampleFormat::Int => {
            let scale = match spec.bits_per_sample {
                16 => i16::MAX as f32,
                24 => ((1i32 << 23) - 1) as f32,
                32 => i32::MAX as f32,
                bits => {
                    return Err(NovoxError::Relay {
                        message: format!(
                            "Unsupported WAV bit depth {} in {}",
                            bits,
                            path.display()
                        ),
                    });
                }
            };
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| NovoxError::Relay {
                    message: format!("Failed to read WAV samples from {}: {}", path.display(), e),
                })?
        }
    };

    Ok((samples, spec.sample_rate, spec.channels))
}
