//! Playback engine: dequeues separated results in order, trims the
//! artifact-prone edges, and streams the middle to one long-lived sink.
//!
//! No crossfading happens here; continuity relies on the overlap and trim
//! durations being sized so separation-boundary artifacts fall entirely
//! inside the trimmed regions.

use crate::audio::playback::OutputSink;
use crate::error::{NovoxError, Result};
use crate::store::ResultStore;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How long a blocking pop waits before re-checking the stop flag.
const POLL_STOP_INTERVAL: Duration = Duration::from_millis(100);

/// Cut `trim_frames` frames from both ends of an interleaved buffer.
///
/// Buffers of `2 × trim_frames` frames or fewer are returned unchanged —
/// the short-chunk fallback, e.g. for a final partial chunk.
pub fn trim_edges(samples: &[f32], trim_frames: usize, channels: u16) -> &[f32] {
    let stride = channels as usize;
    let frames = samples.len() / stride;
    if frames > 2 * trim_frames {
        &samples[trim_frames * stride..samples.len() - trim_frames * stride]
    } else {
        samples
    }
}

pub struct PlaybackEngine {
    store: Arc<dyn ResultStore>,
    trim_frames: usize,
}

impl PlaybackEngine {
    pub fn new(store: Arc<dyn ResultStore>, trim_frames: usize) -> Self {
        Self { store, trim_frames }
    }

    /// Play queued results until the stop flag clears or the watcher hangs
    /// up with nothing left queued.
    ///
    /// The sink's blocking write is the loop's pacing: each chunk takes its
    /// real-time duration to drain. A missing index is logged and skipped —
    /// downstream of a separation failure that is the expected shape of
    /// the world, not corruption.
    pub fn run(
        self,
        playback_rx: Receiver<u64>,
        mut sink: Box<dyn OutputSink>,
        running: Arc<AtomicBool>,
    ) -> Result<()> {
        sink.start()?;

        while running.load(Ordering::SeqCst) {
            let index = match playback_rx.recv_timeout(POLL_STOP_INTERVAL) {
                Ok(index) => index,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };

            let result = match self.store.take(index) {
                Ok(result) => result,
                Err(NovoxError::ResultNotFound { index }) => {
                    eprintln!("novox: chunk {} vanished from the store, skipping", index);
                    continue;
                }
                Err(e) => {
                    eprintln!("novox: failed to load chunk {}: {}", index, e);
                    continue;
                }
            };

            let playable = trim_edges(&result.samples, self.trim_frames, result.channels);
            sink.write(playable)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::playback::CollectorSink;
    use crate::pipeline::types::SeparatedResult;
    use crate::store::MemStore;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_trim_law_long_buffer() {
        // 10 frames stereo, trim 2 frames per side
        let samples: Vec<f32> = (0..20).map(|i| i as f32).collect();
        let trimmed = trim_edges(&samples, 2, 2);

        assert_eq!(trimmed.len(), 12); // (10 - 2*2) frames * 2 channels
        assert_eq!(trimmed[0], 4.0); // first sample after 2 frames
        assert_eq!(trimmed[11], 15.0); // last sample before the tail trim
    }

    #[test]
    fn test_trim_law_short_buffer_unchanged() {
        let samples: Vec<f32> = (0..8).map(|i| i as f32).collect(); // 4 frames stereo
        let trimmed = trim_edges(&samples, 2, 2);
        assert_eq!(trimmed, &samples[..]);
    }

    #[test]
    fn test_trim_law_exact_double_trim_unchanged() {
        // frames == 2*trim is the boundary: play unmodified
        let samples: Vec<f32> = (0..8).map(|i| i as f32).collect(); // 8 frames mono
        let trimmed = trim_edges(&samples, 4, 1);
        assert_eq!(trimmed, &samples[..]);
    }

    #[test]
    fn test_trim_zero_is_identity() {
        let samples = vec![1.0f32; 6];
        assert_eq!(trim_edges(&samples, 0, 2), &samples[..]);
    }

    fn stored_result(store: &MemStore, index: u64, frames: usize) {
        let samples: Vec<f32> = (0..frames * 2).map(|i| index as f32 + i as f32).collect();
        store
            .put(&SeparatedResult::new(index, samples, 44100, 2))
            .unwrap();
    }

    fn run_engine(store: Arc<MemStore>, indices: &[u64], trim_frames: usize) -> Vec<Vec<f32>> {
        let (tx, rx) = unbounded();
        for &index in indices {
            tx.send(index).unwrap();
        }
        drop(tx);

        // The engine consumes its sink; the kept clone shares its storage.
        let sink = CollectorSink::new();
        let engine = PlaybackEngine::new(store, trim_frames);
        let running = Arc::new(AtomicBool::new(true));
        engine.run(rx, Box::new(sink.clone()), running).unwrap();

        sink.segments()
    }

    #[test]
    fn test_playback_trims_and_preserves_order() {
        let store = Arc::new(MemStore::new());
        stored_result(&store, 1, 10);
        stored_result(&store, 2, 10);

        let segments = run_engine(store, &[1, 2], 2);
        assert_eq!(segments.len(), 2);
        // 10 frames - 2*2 trim = 6 frames stereo
        assert_eq!(segments[0].len(), 12);
        assert_eq!(segments[1].len(), 12);
        // Order is the queue order: chunk 1's samples first
        assert_eq!(segments[0][0], 1.0 + 4.0);
        assert_eq!(segments[1][0], 2.0 + 4.0);
    }

    #[test]
    fn test_gap_in_indices_does_not_stall() {
        let store = Arc::new(MemStore::new());
        stored_result(&store, 2, 10);
        stored_result(&store, 4, 10);

        // Index 3 never separated; the watcher never queues it, playback
        // moves straight from 2 to 4.
        let segments = run_engine(store, &[2, 4], 0);
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn test_vanished_index_is_skipped() {
        let store = Arc::new(MemStore::new());
        stored_result(&store, 1, 10);
        stored_result(&store, 3, 10);

        // Index 2 was queued but is gone from the store by playback time
        let segments = run_engine(store, &[1, 2, 3], 0);
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn test_each_result_is_played_at_most_once() {
        let store = Arc::new(MemStore::new());
        stored_result(&store, 1, 10);

        let segments = run_engine(store.clone(), &[1], 0);
        assert_eq!(segments.len(), 1);
        // The store no longer holds the result
        assert!(matches!(
            store.take(1),
            Err(NovoxError::ResultNotFound { index: 1 })
        ));
    }

    #[test]
    fn test_short_final_chunk_plays_in_full() {
        let store = Arc::new(MemStore::new());
        stored_result(&store, 1, 3); // 3 frames, trim of 2 would eat it

        let segments = run_engine(store, &[1], 2);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].len(), 6); // untouched
    }
}
