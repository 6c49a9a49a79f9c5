//! Data types flowing through the separation pipeline.

/// A fixed-duration window of captured audio, overlap included.
///
/// Produced only by the `WindowBuilder`; owned by whichever stage currently
/// holds it and dropped by the separation stage once the separator call
/// resolves, success or not.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    /// Monotonically increasing index, starting at 1.
    pub index: u64,
    /// Interleaved f32 samples (frames × channels).
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioChunk {
    pub fn new(index: u64, samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            index,
            samples,
            sample_rate,
            channels,
        }
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }
}

/// Instrumental audio produced by the separator for one chunk.
///
/// Immutable once written to the result store.
#[derive(Debug, Clone, PartialEq)]
pub struct SeparatedResult {
    /// Index of the source chunk.
    pub index: u64,
    /// Interleaved f32 samples (frames × channels).
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl SeparatedResult {
    pub fn new(index: u64, samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            index,
            samples,
            sample_rate,
            channels,
        }
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_chunk_frames_and_duration() {
        // 2 seconds of stereo at 4 Hz = 16 samples
        let chunk = AudioChunk::new(1, vec![0.0; 16], 4, 2);
        assert_eq!(chunk.frames(), 8);
        assert!((chunk.duration_secs() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_audio_chunk_mono_frames() {
        let chunk = AudioChunk::new(3, vec![0.5; 10], 10, 1);
        assert_eq!(chunk.frames(), 10);
        assert!((chunk.duration_secs() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_separated_result_frames() {
        let result = SeparatedResult::new(2, vec![0.0; 12], 6, 2);
        assert_eq!(result.index, 2);
        assert_eq!(result.frames(), 6);
    }
}
