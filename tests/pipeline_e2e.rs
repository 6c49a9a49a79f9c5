//! End-to-end pipeline tests: capture windows through separation, the
//! store, the watcher, and playback trimming, all on in-memory fakes.

use novox::audio::playback::CollectorSink;
use novox::audio::source::MockCaptureSource;
use novox::config::WindowConfig;
use novox::pipeline::{PlaybackEngine, ResultWatcher, SeparationStage, WindowBuilder};
use novox::separate::separator::MockSeparator;
use novox::store::{MemStore, ResultStore};
use crossbeam_channel::unbounded;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// 10s windows with 1s overlap and 0.5s playback trim, scaled down to a
/// 100 Hz sample rate so a chunk is 1000 frames.
const SAMPLE_RATE: u32 = 100;

fn window_config() -> WindowConfig {
    WindowConfig {
        window_secs: 10.0,
        overlap_secs: 1.0,
        trim_secs: 0.5,
    }
}

/// Capture `chunks` windows from a mock mic, separate them with the given
/// separator, then watch the store and play everything queued. Returns the
/// segments the sink received.
fn run_pipeline(chunks: u64, separator: MockSeparator) -> Vec<Vec<f32>> {
    let window = window_config();
    let mut builder = WindowBuilder::new(&window, SAMPLE_RATE, 1);
    let mut source = MockCaptureSource::new(1);

    let store = Arc::new(MemStore::new());
    let stage = SeparationStage::new(Arc::new(separator), store.clone());
    for _ in 0..chunks {
        stage.process(builder.next_chunk(&mut source).unwrap());
    }

    let mut watcher = ResultWatcher::new(store.clone());
    let queued = watcher.poll_once().unwrap();

    let (tx, rx) = unbounded();
    for index in queued {
        tx.send(index).unwrap();
    }
    drop(tx);

    let sink = CollectorSink::new();
    let engine = PlaybackEngine::new(store, window.trim_frames(SAMPLE_RATE));
    let running = Arc::new(AtomicBool::new(true));
    engine.run(rx, Box::new(sink.clone()), running).unwrap();

    sink.segments()
}

#[test]
fn test_three_chunks_play_as_one_continuous_stream() {
    let segments = run_pipeline(3, MockSeparator::new());

    // Each played segment is the window minus 0.5s from both ends
    assert_eq!(segments.len(), 3);
    for segment in &segments {
        assert_eq!(segment.len(), 900);
    }

    // The mock mic emits a ramp with a fixed step. With a 1s overlap and a
    // 0.5s trim on each side, the trimmed segments tile the ramp exactly:
    // concatenated playback must step uniformly with no repeat and no jump
    // at chunk boundaries.
    let output: Vec<f32> = segments.into_iter().flatten().collect();
    let step = output[1] - output[0];
    assert!(step > 0.0);
    for pair in output.windows(2) {
        let delta = pair[1] - pair[0];
        assert!(
            (delta - step).abs() < step * 0.01,
            "discontinuity: {} then {}",
            pair[0],
            pair[1]
        );
    }
}

#[test]
fn test_failed_chunk_leaves_a_gap_but_playback_continues() {
    let segments = run_pipeline(3, MockSeparator::new().with_failures(&[2]));

    // Chunk 2 never reached the store; chunks 1 and 3 still play, trimmed
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].len(), 900);
    assert_eq!(segments[1].len(), 900);

    // The jump across the missing chunk spans its un-overlapped span
    let last_of_first = segments[0][899];
    let first_of_second = segments[1][0];
    assert!(first_of_second > last_of_first);
}

#[test]
fn test_results_arriving_out_of_order_play_in_index_order() {
    let window = window_config();
    let mut builder = WindowBuilder::new(&window, SAMPLE_RATE, 1);
    let mut source = MockCaptureSource::new(1);

    let chunk1 = builder.next_chunk(&mut source).unwrap();
    let chunk2 = builder.next_chunk(&mut source).unwrap();

    // Separation finishes out of order; the store sees 2 before 1
    let store = Arc::new(MemStore::new());
    let stage = SeparationStage::new(Arc::new(MockSeparator::new()), store.clone());
    stage.process(chunk2);
    stage.process(chunk1);

    let mut watcher = ResultWatcher::new(store.clone());
    assert_eq!(watcher.poll_once().unwrap(), vec![1, 2]);
}

#[test]
fn test_taken_results_never_replay_on_rescan() {
    let window = window_config();
    let mut builder = WindowBuilder::new(&window, SAMPLE_RATE, 1);
    let mut source = MockCaptureSource::new(1);

    let store = Arc::new(MemStore::new());
    let stage = SeparationStage::new(Arc::new(MockSeparator::new()), store.clone());
    stage.process(builder.next_chunk(&mut source).unwrap());

    let mut watcher = ResultWatcher::new(store.clone());
    assert_eq!(watcher.poll_once().unwrap(), vec![1]);

    // Playback takes the result out of the store
    store.take(1).unwrap();

    // A later chunk arrives; rescans see only it
    stage.process(builder.next_chunk(&mut source).unwrap());
    assert_eq!(watcher.poll_once().unwrap(), vec![2]);
    assert!(watcher.poll_once().unwrap().is_empty());
}
