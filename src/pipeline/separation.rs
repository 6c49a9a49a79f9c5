//! Separation stage: the single worker between capture and the result store.
//!
//! Strictly sequential by construction — one thread, FIFO channel, one
//! separator call in flight — which is what preserves chunk ordering
//! through a backend of unbounded, variable latency. Throughput is bounded
//! by the separator, not the capture rate; when separation runs slower
//! than real time the chunk channel backlog grows without bound.

use crate::pipeline::types::{AudioChunk, SeparatedResult};
use crate::separate::separator::Separator;
use crate::store::ResultStore;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How long a blocking pop waits before re-checking the stop flag.
const POLL_STOP_INTERVAL: Duration = Duration::from_millis(100);

pub struct SeparationStage {
    separator: Arc<dyn Separator>,
    store: Arc<dyn ResultStore>,
}

impl SeparationStage {
    pub fn new(separator: Arc<dyn Separator>, store: Arc<dyn ResultStore>) -> Self {
        Self { separator, store }
    }

    /// Process one chunk to completion, consuming it.
    ///
    /// A separation failure of any kind is absorbed here: the index becomes
    /// a permanent gap in the store, never a retry. A store write failure
    /// is logged and likewise absorbed.
    pub fn process(&self, chunk: AudioChunk) {
        let index = chunk.index;
        match self.separator.separate(&chunk) {
            Ok(samples) => {
                let result =
                    SeparatedResult::new(index, samples, chunk.sample_rate, chunk.channels);
                if let Err(e) = self.store.put(&result) {
                    eprintln!("novox: failed to store result for chunk {}: {}", index, e);
                }
            }
            Err(e) => {
                eprintln!("novox: skipping chunk {}: {}", index, e);
            }
        }
        // chunk (and its capture buffer) dropped here, success or not
    }

    /// Consume the chunk channel in FIFO order until the stop flag clears
    /// or the producer hangs up.
    pub fn run(self, chunk_rx: Receiver<AudioChunk>, running: Arc<AtomicBool>) {
        while running.load(Ordering::SeqCst) {
            match chunk_rx.recv_timeout(POLL_STOP_INTERVAL) {
                Ok(chunk) => self.process(chunk),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{NovoxError, Result};
    use crate::separate::separator::MockSeparator;
    use crate::store::MemStore;
    use crossbeam_channel::unbounded;

    fn chunk(index: u64) -> AudioChunk {
        AudioChunk::new(index, vec![index as f32; 8], 44100, 2)
    }

    #[test]
    fn test_successful_chunk_lands_in_store() {
        let store = Arc::new(MemStore::new());
        let stage = SeparationStage::new(Arc::new(MockSeparator::new()), store.clone());

        stage.process(chunk(1));

        let result = store.take(1).unwrap();
        assert_eq!(result.samples, vec![1.0; 8]);
        assert_eq!(result.sample_rate, 44100);
        assert_eq!(result.channels, 2);
    }

    #[test]
    fn test_failed_chunk_becomes_a_gap() {
        let store = Arc::new(MemStore::new());
        let separator = MockSeparator::new().with_failures(&[2]);
        let stage = SeparationStage::new(Arc::new(separator), store.clone());

        stage.process(chunk(1));
        stage.process(chunk(2));
        stage.process(chunk(3));

        // Index 2 is permanently absent; neighbors unaffected
        assert_eq!(store.list().unwrap(), vec![1, 3]);
    }

    #[test]
    fn test_store_failure_is_absorbed() {
        struct RejectingStore;
        impl ResultStore for RejectingStore {
            fn put(&self, _result: &SeparatedResult) -> Result<()> {
                Err(NovoxError::Relay {
                    message: "disk full".to_string(),
                })
            }
            fn list(&self) -> Result<Vec<u64>> {
                Ok(Vec::new())
            }
            fn take(&self, index: u64) -> Result<SeparatedResult> {
                Err(NovoxError::ResultNotFound { index })
            }
        }

        let stage = SeparationStage::new(Arc::new(MockSeparator::new()), Arc::new(RejectingStore));
        // Must not panic or abort; the error is logged and absorbed
        stage.process(chunk(1));
    }

    #[test]
    fn test_run_preserves_fifo_order() {
        let store = Arc::new(MemStore::new());
        let stage = SeparationStage::new(Arc::new(MockSeparator::new()), store.clone());

        let (tx, rx) = unbounded();
        for index in 1..=5 {
            tx.send(chunk(index)).unwrap();
        }
        drop(tx);

        let running = Arc::new(AtomicBool::new(true));
        stage.run(rx, running);

        assert_eq!(store.list().unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_run_stops_on_flag() {
        let store = Arc::new(MemStore::new());
        let stage = SeparationStage::new(Arc::new(MockSeparator::new()), store);

        let (tx, rx) = unbounded::<AudioChunk>();
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = running.clone();

        let handle = std::thread::spawn(move || stage.run(rx, thread_running));
        running.store(false, Ordering::SeqCst);
        handle.join().unwrap();
        drop(tx);
    }
}
