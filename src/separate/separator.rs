use crate::error::{NovoxError, Result};
use crate::pipeline::types::AudioChunk;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Trait for the opaque vocal-separation capability.
///
/// The contract is deliberately binary: instrumental samples come back, or
/// the call fails. Capability-level faults (process spawn errors, missing
/// output, timeouts) surface as the same `Separation` error as a clean
/// "no result" — downstream the chunk's index becomes a gap either way.
///
/// Calls may take arbitrarily long; the separation stage invokes them
/// strictly one at a time.
pub trait Separator: Send + Sync {
    /// Separate one chunk, returning interleaved instrumental samples in
    /// the chunk's own sample rate and channel count.
    fn separate(&self, chunk: &AudioChunk) -> Result<Vec<f32>>;
}

/// Implement Separator for Arc<T> to allow sharing across threads.
impl<T: Separator> Separator for Arc<T> {
    fn separate(&self, chunk: &AudioChunk) -> Result<Vec<f32>> {
        (**self).separate(chunk)
    }
}

/// Mock separator for testing.
///
/// Echoes the chunk's samples back unchanged, optionally failing for
/// configured indices or stalling to simulate a slow backend.
#[derive(Debug, Clone, Default)]
pub struct MockSeparator {
    fail_indices: HashSet<u64>,
    delay: Option<Duration>,
}

impl MockSeparator {
    /// Create a passthrough mock separator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the mock to fail for the given chunk indices.
    pub fn with_failures(mut self, indices: &[u64]) -> Self {
        self.fail_indices = indices.iter().copied().collect();
        self
    }

    /// Configure a fixed per-call delay, simulating separation latency.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl Separator for MockSeparator {
    fn separate(&self, chunk: &AudioChunk) -> Result<Vec<f32>> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.fail_indices.contains(&chunk.index) {
            return Err(NovoxError::Separation {
                message: format!("mock failure for chunk {}", chunk.index),
            });
        }
        Ok(chunk.samples.clone())
    }
}
