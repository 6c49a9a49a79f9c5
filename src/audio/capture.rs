//! Real audio capture using CPAL (Cross-Platform Audio Library).

use crate::audio::source::CaptureSource;
use crate::error::{NovoxError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Condvar, Mutex};

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// This suppresses noisy ALSA/JACK/PipeWire messages that CPAL triggers
/// when probing audio backends. The messages are harmless but confusing to users.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2 (stderr).
/// Safe as long as no other thread is concurrently manipulating fd 2.
pub(crate) fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// Suppress noisy JACK/ALSA error messages that occur during audio backend probing.
///
/// # Safety
/// This modifies environment variables which is safe when called before spawning threads.
pub fn suppress_audio_warnings() {
    // SAFETY: Called at startup before any threads are spawned
    unsafe {
        std::env::set_var("JACK_NO_START_SERVER", "1");
        std::env::set_var("JACK_NO_AUDIO_RESERVATION", "1");
        std::env::set_var("PIPEWIRE_DEBUG", "0");
        std::env::set_var("ALSA_DEBUG", "0");
        std::env::set_var("PW_LOG", "0");
    }
}

/// Preferred device names for GNOME/PipeWire environments.
const PREFERRED_DEVICES: &[&str] = &["pipewire", "pulse", "PulseAudio"];

/// Input device name patterns to filter out (not useful for live capture).
const FILTERED_PATTERNS: &[&str] = &[
    "surround",
    "front:",
    "rear:",
    "center:",
    "side:",
    "Digital Output",
    "HDMI",
    "S/PDIF",
];

/// Check if an input device name should be filtered out.
fn should_filter_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    FILTERED_PATTERNS
        .iter()
        .any(|pattern| lower.contains(&pattern.to_lowercase()))
}

/// Check if a device is a preferred device.
fn is_preferred_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    PREFERRED_DEVICES
        .iter()
        .any(|pref| lower.contains(&pref.to_lowercase()))
}

/// List all available audio input devices with filtering and recommendations.
///
/// Preferred devices are marked with "\[recommended\]"; obviously unusable
/// devices (surround channels, HDMI, etc.) are filtered out.
///
/// # Errors
/// Returns `NovoxError::Capture` if device enumeration fails.
pub fn list_input_devices() -> Result<Vec<String>> {
    let (host, devices) = with_suppressed_stderr(|| {
        let host = cpal::default_host();
        let devices = host.input_devices();
        (host, devices)
    });
    let _ = host; // keep host alive while iterating devices
    let devices = devices.map_err(|e| NovoxError::Capture {
        message: format!("Failed to enumerate input devices: {}", e),
    })?;

    let mut device_names = Vec::new();
    for device in devices {
        if let Ok(name) = device.name() {
            if should_filter_device(&name) {
                continue;
            }
            if is_preferred_device(&name) {
                device_names.push(format!("{} [recommended]", name));
            } else {
                device_names.push(name);
            }
        }
    }

    Ok(device_names)
}

/// List all available audio output devices.
///
/// Outputs are not filtered: HDMI or S/PDIF sinks are perfectly valid
/// playback targets for instrumental audio.
pub fn list_output_devices() -> Result<Vec<String>> {
    let (host, devices) = with_suppressed_stderr(|| {
        let host = cpal::default_host();
        let devices = host.output_devices();
        (host, devices)
    });
    let _ = host;
    let devices = devices.map_err(|e| NovoxError::Capture {
        message: format!("Failed to enumerate output devices: {}", e),
    })?;

    let mut device_names = Vec::new();
    for device in devices {
        if let Ok(name) = device.name() {
            if is_preferred_device(&name) {
                device_names.push(format!("{} [recommended]", name));
            } else {
                device_names.push(name);
            }
        }
    }

    Ok(device_names)
}

/// Get the best default input device, preferring PipeWire/PulseAudio.
///
/// This ensures we respect the desktop's audio device selection.
fn get_best_default_device() -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();

        if let Ok(devices) = host.input_devices() {
            for device in devices {
                if let Ok(name) = device.name()
                    && is_preferred_device(&name)
                {
                    return Ok(device);
                }
            }
        }

        host.default_input_device()
            .ok_or_else(|| NovoxError::AudioDeviceNotFound {
                device: "default".to_string(),
            })
    })
}

/// Find an input device by exact name.
pub(crate) fn find_input_device(device_name: Option<&str>) -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();

        if let Some(name) = device_name {
            let devices = host.input_devices().map_err(|e| NovoxError::Capture {
                message: format!("Failed to enumerate devices: {}", e),
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
            get_best_default_device()
        }
    })
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: We ensure that the stream is only accessed from a single thread at a time
/// through the Mutex wrapper in CpalCaptureSource. The stream methods are called
/// synchronously and don't cross thread boundaries unsafely.
pub(crate) struct SendableStream(pub(crate) cpal::Stream);

unsafe impl Send for SendableStream {}

/// Shared capture buffer: the stream callback appends, `record` drains.
type SharedBuffer = Arc<(Mutex<Vec<f32>>, Condvar)>;

/// First fatal error reported by the stream's error callback.
type FaultSlot = Arc<Mutex<Option<String>>>;

/// Block until `wanted` samples are buffered, or fail if the stream has
/// reported a fault. The fault check runs on every wakeup, so a device
/// dying mid-session unblocks a waiting `record` instead of hanging it.
fn drain_captured(shared: &SharedBuffer, fault: &FaultSlot, wanted: usize) -> Result<Vec<f32>> {
    let (buffer, available) = &**shared;

    let mut buf = buffer.lock().map_err(|e| NovoxError::Capture {
        message: format!("Failed to lock capture buffer: {}", e),
    })?;
    loop {
        if let Ok(slot) = fault.lock()
            && let Some(message) = slot.clone()
        {
            return Err(NovoxError::Capture { message });
        }
        if buf.len() >= wanted {
            break;
        }
        buf = available.wait(buf).map_err(|e| NovoxError::Capture {
            message: format!("Capture buffer wait failed: {}", e),
        })?;
    }

    Ok(buf.drain(..wanted).collect())
}

/// Real blocking capture implementation using CPAL.
///
/// Captures interleaved f32 audio at the configured sample rate and channel
/// count. The cpal callback appends into a shared buffer; `record` blocks on
/// a condvar until enough frames have arrived, which is what paces the
/// window builder at the hardware's real-time rate. A stream error after
/// start is latched and surfaces from the current or next `record` call.
pub struct CpalCaptureSource {
    device: cpal::Device,
    stream: Arc<Mutex<Option<SendableStream>>>,
    shared: SharedBuffer,
    fault: FaultSlot,
    sample_rate: u32,
    channels: u16,
}

impl CpalCaptureSource {
    /// Create a new CPAL capture source.
    ///
    /// # Arguments
    /// * `device_name` - Optional device name. If None, uses the best default input device.
    /// * `sample_rate` - Capture sample rate in Hz.
    /// * `channels` - Interleaved channel count.
    pub fn new(device_name: Option<&str>, sample_rate: u32, channels: u16) -> Result<Self> {
        let device = find_input_device(device_name)?;

        Ok(Self {
            device,
            stream: Arc::new(Mutex::new(None)),
            shared: Arc::new((Mutex::new(Vec::new()), Condvar::new())),
            fault: Arc::new(Mutex::new(None)),
            sample_rate,
            channels,
        })
    }

    /// Error callback for the input stream: records the first fault and
    /// wakes any `record` call blocked on the capture buffer.
    fn error_callback(&self) -> impl FnMut(cpal::StreamError) + Send + 'static {
        let fault = Arc::clone(&self.fault);
        let shared = Arc::clone(&self.shared);
        move |err| {
            eprintln!("novox: audio input stream error: {}", err);
            if let Ok(mut slot) = fault.lock() {
                slot.get_or_insert(err.to_string());
            }
            shared.1.notify_one();
        }
    }

    /// Build the input stream in the configured format.
    ///
    /// Tries f32 first (the native cpal sample type on PipeWire/PulseAudio),
    /// then i16 with conversion for devices that only expose integer formats.
    fn build_stream(&self) -> Result<cpal::Stream> {
        let config = cpal::StreamConfig {
            channels: self.channels,
            sample_rate: self.sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        let shared = Arc::clone(&self.shared);
        if let Ok(stream) = self.device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let (buffer, available) = &*shared;
                if let Ok(mut buf) = buffer.lock() {
                    buf.extend_from_slice(data);
                    available.notify_one();
                }
            },
            self.error_callback(),
            None,
        ) {
            return Ok(stream);
        }

        let shared = Arc::clone(&self.shared);
        self.device
            .build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let (buffer, available) = &*shared;
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend(data.iter().map(|&s| s as f32 / i16::MAX as f32));
                        available.notify_one();
                    }
                },
                self.error_callback(),
                None,
            )
            .map_err(|e| NovoxError::Capture {
                message: format!(
                    "Failed to open input stream ({}ch/{}Hz): {}",
                    self.channels, self.sample_rate, e
                ),
            })
    }
}

impl CaptureSource for CpalCaptureSource {
    fn start(&mut self) -> Result<()> {
        {
            let stream_guard = self.stream.lock().map_err(|e| NovoxError::Capture {
                message: format!("Failed to lock stream: {}", e),
            })?;
            if stream_guard.is_some() {
                return Ok(()); // Already started
            }
        }

        let stream = self.build_stream()?;
        stream.play().map_err(|e| NovoxError::Capture {
            message: format!("Failed to start audio stream: {}", e),
        })?;

        let mut stream_guard = self.stream.lock().map_err(|e| NovoxError::Capture {
            message: format!("Failed to lock stream: {}", e),
        })?;
        *stream_guard = Some(SendableStream(stream));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let mut stream_guard = self.stream.lock().map_err(|e| NovoxError::Capture {
            message: format!("Failed to lock stream: {}", e),
        })?;

        if let Some(sendable_stream) = stream_guard.take() {
            sendable_stream
                .0
                .pause()
                .map_err(|e| NovoxError::Capture {
                    message: format!("Failed to stop audio stream: {}", e),
                })?;
        }
        Ok(())
    }

    fn record(&mut self, frames: usize) -> Result<Vec<f32>> {
        {
            let stream_guard = self.stream.lock().map_err(|e| NovoxError::Capture {
                message: format!("Failed to lock stream: {}", e),
            })?;
            if stream_guard.is_none() {
                return Err(NovoxError::Capture {
                    message: "record called before start".to_string(),
                });
            }
        }

        drain_captured(&self.shared, &self.fault, frames * self.channels as usize)
    }
}
