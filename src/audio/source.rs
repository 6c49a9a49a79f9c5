use crate::error::{NovoxError, Result};

/// Trait for blocking audio capture devices.
///
/// This trait allows swapping implementations (real audio device vs mock).
/// `record` blocks until exactly the requested number of frames has been
/// captured at the hardware's real-time rate — the window builder leans on
/// this to pace chunk production.
pub trait CaptureSource: Send {
    /// Start capturing audio from the source.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing audio from the source.
    fn stop(&mut self) -> Result<()>;

    /// Block until `frames` frames are available and return them as
    /// interleaved f32 samples (`frames × channels` values).
    fn record(&mut self, frames: usize) -> Result<Vec<f32>>;
}

/// Mock capture source for testing.
///
/// Emits a deterministic ramp — each successive sample across the whole
/// session increases by one step — so tests can check overlap equality and
/// window boundaries sample for sample.
#[derive(Debug, Clone)]
pub struct MockCaptureSource {
    channels: u16,
    next_value: u64,
    step: f32,
    is_started: bool,
    should_fail_start: bool,
    /// Fail the nth record call (1-based), simulating a device dying mid-session.
    fail_on_call: Option<u32>,
    calls: u32,
    error_message: String,
}

impl MockCaptureSource {
    /// Create a new mock capture source with the given channel count.
    pub fn new(channels: u16) -> Self {
        Self {
            channels,
            next_value: 0,
            step: 1e-6,
            is_started: false,
            should_fail_start: false,
            fail_on_call: None,
            calls: 0,
            error_message: "mock capture error".to_string(),
        }
    }

    /// Configure the mock to fail on start
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Configure the mock to fail on the nth record call (1-based)
    pub fn with_failure_on_call(mut self, call: u32) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    /// Configure the error message for failures
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// Check if the source is started
    pub fn is_started(&self) -> bool {
        self.is_started
    }
}

impl CaptureSource for MockCaptureSource {
    fn start(&mut self) -> Result<()> {
        if self.should_fail_start {
            Err(NovoxError::Capture {
                message: self.error_message.clone(),
            })
        } else {
            self.is_started = true;
            Ok(())
        }
    }

    fn stop(&mut self) -> Result<()> {
        self.is_started = false;
        Ok(())
    }

    fn record(&mut self, frames: usize) -> Result<Vec<f32>> {
        self.calls += 1;
        if self.fail_on_call == Some(self.calls) {
            return Err(NovoxError::Capture {
                message: self.error_message.clone(),
            });
        }

        let count = frames * self.channels as usize;
        let samples = (0..count)
            .map(|i| (self.next_value + i as u64) as f32 * self.step)
            .collect();
        self.next_value += count as u64;
        Ok(samples)
    }
}
