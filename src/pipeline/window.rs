//! Window builder: turns a continuous capture stream into fixed-duration,
//! overlapping chunks.
//!
//! Chunk 1 is a full window of fresh audio. Every later chunk starts with
//! the previous chunk's trailing overlap and captures only the remainder
//! fresh, so consecutive chunks share `overlap_secs` of identical samples
//! across their seam — the context the separator needs at each boundary.

use crate::audio::source::CaptureSource;
use crate::config::WindowConfig;
use crate::error::Result;
use crate::pipeline::types::AudioChunk;
use crossbeam_channel::Sender;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct WindowBuilder {
    window_frames: usize,
    overlap_frames: usize,
    sample_rate: u32,
    channels: u16,
    /// Index of the next chunk to emit; chunk indices start at 1.
    next_index: u64,
    /// Trailing `overlap` seconds of the previously emitted chunk,
    /// interleaved. Empty until the first chunk is out.
    overlap_tail: Vec<f32>,
}

impl WindowBuilder {
    pub fn new(window: &WindowConfig, sample_rate: u32, channels: u16) -> Self {
        Self {
            window_frames: window.window_frames(sample_rate),
            overlap_frames: window.overlap_frames(sample_rate),
            sample_rate,
            channels,
            next_index: 1,
            overlap_tail: Vec::new(),
        }
    }

    /// Index the next emitted chunk will carry.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Capture and assemble the next chunk, blocking at the capture
    /// source's real-time rate.
    pub fn next_chunk(&mut self, source: &mut dyn CaptureSource) -> Result<AudioChunk> {
        let fresh_frames = if self.next_index == 1 {
            self.window_frames
        } else {
            self.window_frames - self.overlap_frames
        };

        let fresh = source.record(fresh_frames)?;

        let mut samples = std::mem::take(&mut self.overlap_tail);
        samples.extend_from_slice(&fresh);

        // Tail for the next chunk comes from the chunk as emitted, so the
        // overlap region is byte-identical on both sides of the seam.
        let tail_len = self.overlap_frames * self.channels as usize;
        if tail_len > 0 && samples.len() >= tail_len {
            self.overlap_tail = samples[samples.len() - tail_len..].to_vec();
        }

        let chunk = AudioChunk::new(self.next_index, samples, self.sample_rate, self.channels);
        self.next_index += 1;
        Ok(chunk)
    }

    /// Run the capture loop until the stop flag clears.
    ///
    /// Each chunk is pushed to the unbounded chunk channel immediately;
    /// capture never blocks on downstream congestion. A capture-device
    /// error is fatal and aborts the loop.
    pub fn run(
        mut self,
        mut source: Box<dyn CaptureSource>,
        chunk_tx: Sender<AudioChunk>,
        running: Arc<AtomicBool>,
    ) -> Result<()> {
        source.start()?;

        while running.load(Ordering::SeqCst) {
            let chunk = match self.next_chunk(source.as_mut()) {
                Ok(chunk) => chunk,
                Err(e) => {
                    let _ = source.stop();
                    return Err(e);
                }
            };

            if chunk_tx.send(chunk).is_err() {
                // Separation stage is gone; nothing left to capture for
                break;
            }
        }

        source.stop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::source::MockCaptureSource;
    use crate::error::NovoxError;
    use crossbeam_channel::unbounded;

    fn config(window_secs: f64, overlap_secs: f64) -> WindowConfig {
        WindowConfig {
            window_secs,
            overlap_secs,
            trim_secs: 0.5,
        }
    }

    #[test]
    fn test_every_chunk_has_exact_window_duration() {
        let mut builder = WindowBuilder::new(&config(10.0, 1.0), 100, 2);
        let mut source = MockCaptureSource::new(2);

        for expected_index in 1..=4 {
            let chunk = builder.next_chunk(&mut source).unwrap();
            assert_eq!(chunk.index, expected_index);
            assert_eq!(chunk.frames(), 1000);
            assert!((chunk.duration_secs() - 10.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_overlap_region_is_identical_across_seams() {
        let mut builder = WindowBuilder::new(&config(10.0, 1.0), 100, 2);
        let mut source = MockCaptureSource::new(2);

        let first = builder.next_chunk(&mut source).unwrap();
        let second = builder.next_chunk(&mut source).unwrap();
        let third = builder.next_chunk(&mut source).unwrap();

        let overlap_samples = 100 * 2; // 1s at 100Hz stereo
        assert_eq!(
            first.samples[first.samples.len() - overlap_samples..],
            second.samples[..overlap_samples]
        );
        assert_eq!(
            second.samples[second.samples.len() - overlap_samples..],
            third.samples[..overlap_samples]
        );
    }

    #[test]
    fn test_later_chunks_capture_only_fresh_remainder() {
        let mut builder = WindowBuilder::new(&config(10.0, 1.0), 100, 1);
        let mut source = MockCaptureSource::new(1);

        let first = builder.next_chunk(&mut source).unwrap();
        let second = builder.next_chunk(&mut source).unwrap();

        // Chunk 2 = 1s carried tail + 9s fresh; the fresh part continues
        // the source's ramp exactly where chunk 1 ended.
        let last_of_first = first.samples[first.samples.len() - 1];
        let first_fresh_of_second = second.samples[100];
        assert!((first_fresh_of_second - last_of_first - 1e-6).abs() < 1e-9);
    }

    #[test]
    fn test_indices_are_contiguous_from_one() {
        let mut builder = WindowBuilder::new(&config(2.0, 0.5), 10, 1);
        let mut source = MockCaptureSource::new(1);

        assert_eq!(builder.next_index(), 1);
        for expected in 1..=5 {
            assert_eq!(builder.next_chunk(&mut source).unwrap().index, expected);
        }
    }

    #[test]
    fn test_zero_overlap_means_all_fresh() {
        let mut builder = WindowBuilder::new(&config(1.0, 0.0), 10, 1);
        let mut source = MockCaptureSource::new(1);

        let first = builder.next_chunk(&mut source).unwrap();
        let second = builder.next_chunk(&mut source).unwrap();
        assert_eq!(first.frames(), 10);
        assert_eq!(second.frames(), 10);
        // No shared samples
        assert!(second.samples[0] > first.samples[9]);
    }

    #[test]
    fn test_run_pushes_chunks_until_stopped() {
        let builder = WindowBuilder::new(&config(1.0, 0.2), 10, 2);
        let source = Box::new(MockCaptureSource::new(2));
        let (tx, rx) = unbounded();
        let running = Arc::new(AtomicBool::new(true));

        let thread_running = running.clone();
        let handle = std::thread::spawn(move || builder.run(source, tx, thread_running));

        let first = rx.recv_timeout(std::time::Duration::from_secs(1)).unwrap();
        assert_eq!(first.index, 1);
        let second = rx.recv_timeout(std::time::Duration::from_secs(1)).unwrap();
        assert_eq!(second.index, 2);

        running.store(false, Ordering::SeqCst);
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn test_capture_error_aborts_the_loop() {
        let builder = WindowBuilder::new(&config(1.0, 0.2), 10, 1);
        let source = Box::new(
            MockCaptureSource::new(1)
                .with_failure_on_call(2)
                .with_error_message("device gone"),
        );
        let (tx, rx) = unbounded();
        let running = Arc::new(AtomicBool::new(true));

        let result = builder.run(source, tx, running);
        match result {
            Err(NovoxError::Capture { message }) => assert_eq!(message, "device gone"),
            other => panic!("Expected Capture error, got {:?}", other.err()),
        }

        // Exactly one chunk made it out before the failure
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn test_run_stops_when_consumer_hangs_up() {
        let builder = WindowBuilder::new(&config(1.0, 0.2), 10, 1);
        let source = Box::new(MockCaptureSource::new(1));
        let (tx, rx) = unbounded();
        drop(rx);

        let running = Arc::new(AtomicBool::new(true));
        assert!(builder.run(source, tx, running).is_ok());
    }
}
