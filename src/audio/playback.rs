//! Continuous audio output using CPAL.
//!
//! The playback engine keeps a single output stream alive for the whole
//! session — tearing the stream down between chunks causes audible clicks.

use crate::audio::capture::{SendableStream, with_suppressed_stderr};
use crate::defaults;
use crate::error::{NovoxError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

/// Trait for continuous audio output sinks.
///
/// `write` blocks until the sink has room again, pacing the caller at the
/// sink's real-time consumption rate. This is the playback loop's only
/// suspension point besides its queue pop.
pub trait OutputSink: Send {
    /// Open the output stream. Called once, before the first write.
    fn start(&mut self) -> Result<()>;

    /// Queue interleaved f32 samples for playback, blocking while the
    /// sink's backlog is above its low-water mark.
    fn write(&mut self, samples: &[f32]) -> Result<()>;
}

/// Test sink that records every written segment.
///
/// Clones share one backing store, so a test can hand a clone to the
/// playback engine (which consumes its sink) and inspect the writes
/// through the clone it kept.
#[derive(Debug, Clone, Default)]
pub struct CollectorSink {
    segments: Arc<Mutex<Vec<Vec<f32>>>>,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Segments written so far, in write order.
    pub fn segments(&self) -> Vec<Vec<f32>> {
        self.segments
            .lock()
            .map(|segments| segments.clone())
            .unwrap_or_default()
    }
}

impl OutputSink for CollectorSink {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn write(&mut self, samples: &[f32]) -> Result<()> {
        self.segments
            .lock()
            .map_err(|e| NovoxError::Playback {
                message: format!("Collector lock poisoned: {}", e),
            })?
            .push(samples.to_vec());
        Ok(())
    }
}

/// Find an output device by exact name, or the default output device.
fn find_output_device(device_name: Option<&str>) -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();

        if let Some(name) = device_name {
            let devices = host.output_devices().map_err(|e| NovoxError::Playback {
                message: format!("Failed to enumerate output devices: {}", e),
            })?;

            for dev in devices {
                if let Ok(dev_name) = dev.name()
                    && dev_name == name
                {
                    return Ok(dev);
                }
            }

            Err(NovoxError::AudioDeviceNotFound {
                device: name.to_string(),
            })
        } else {
            host.default_output_device()
                .ok_or_else(|| NovoxError::AudioDeviceNotFound {
                    device: "default".to_string(),
                })
        }
    })
}

/// Shared playback buffer: `write` appends, the stream callback drains.
type SharedBuffer = Arc<(Mutex<VecDeque<f32>>, Condvar)>;

/// Real output sink backed by one long-lived cpal stream.
///
/// The stream callback pulls from a shared ring of queued samples, emitting
/// silence on underrun. `write` appends and then blocks until the backlog
/// drops below the low-water mark, so the playback loop runs at real time.
pub struct CpalOutputSink {
    device: cpal::Device,
    stream: Arc<Mutex<Option<SendableStream>>>,
    shared: SharedBuffer,
    sample_rate: u32,
    channels: u16,
    /// Backlog size (in samples) below which `write` unblocks.
    low_water: usize,
}

impl CpalOutputSink {
    /// Create a new CPAL output sink.
    pub fn new(device_name: Option<&str>, sample_rate: u32, channels: u16) -> Result<Self> {
        let device = find_output_device(device_name)?;
        let low_water =
            (defaults::OUTPUT_LOW_WATER_SECS * sample_rate as f64) as usize * channels as usize;

        Ok(Self {
            device,
            stream: Arc::new(Mutex::new(None)),
            shared: Arc::new((Mutex::new(VecDeque::new()), Condvar::new())),
            sample_rate,
            channels,
            low_water,
        })
    }

    fn build_stream(&self) -> Result<cpal::Stream> {
        let config = cpal::StreamConfig {
            channels: self.channels,
            sample_rate: self.sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        let err_callback = |err| {
            eprintln!("novox: audio output stream error: {}", err);
        };

        let shared = Arc::clone(&self.shared);
        self.device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let (buffer, drained) = &*shared;
                    if let Ok(mut buf) = buffer.lock() {
                        for slot in data.iter_mut() {
                            // Underrun plays silence rather than stalling the device
                            *slot = buf.pop_front().unwrap_or(0.0);
                        }
                        drained.notify_one();
                    } else {
                        data.fill(0.0);
                    }
                },
                err_callback,
                None,
            )
            .map_err(|e| NovoxError::Playback {
                message: format!(
                    "Failed to open output stream ({}ch/{}Hz): {}",
                    self.channels, self.sample_rate, e
                ),
            })
    }
}

impl OutputSink for CpalOutputSink {
    fn start(&mut self) -> Result<()> {
        {
            let stream_guard = self.stream.lock().map_err(|e| NovoxError::Playback {
                message: format!("Failed to lock stream: {}", e),
            })?;
            if stream_guard.is_some() {
                return Ok(()); // Already started
            }
        }

        let stream = self.build_stream()?;
        stream.play().map_err(|e| NovoxError::Playback {
            message: format!("Failed to start output stream: {}", e),
        })?;

        let mut stream_guard = self.stream.lock().map_err(|e| NovoxError::Playback {
            message: format!("Failed to lock stream: {}", e),
        })?;
        *stream_guard = Some(SendableStream(stream));
        Ok(())
    }

    fn write(&mut self, samples: &[f32]) -> Result<()> {
        let (buffer, drained) = &*self.shared;

        let mut buf = buffer.lock().map_err(|e| NovoxError::Playback {
            message: format!("Failed to lock playback buffer: {}", e),
        })?;
        buf.extend(samples.iter().copied());

        // Block until the device has consumed down to the low-water mark;
        // this is what paces the playback loop at real-time speed.
        while buf.len() > self.low_water {
            buf = drained.wait(buf).map_err(|e| NovoxError::Playback {
                message: format!("Playback buffer wait failed: {}", e),
            })?;
        }
        Ok(())
    }
}
