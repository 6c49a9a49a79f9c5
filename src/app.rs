//! Composition root: wires devices, separator, store, and pipeline threads.
//!
//! The capture+separation context and the playback context are wired
//! separately and may run in one process (`run`) or two (`capture` and
//! `play`), talking only through the directory store.

use crate::audio::capture::{CpalCaptureSource, suppress_audio_warnings};
use crate::audio::playback::{CpalOutputSink, OutputSink};
use crate::audio::source::CaptureSource;
use crate::config::Config;
use crate::error::{NovoxError, Result};
use crate::pipeline::player::PlaybackEngine;
use crate::pipeline::separation::SeparationStage;
use crate::pipeline::watcher::ResultWatcher;
use crate::pipeline::window::WindowBuilder;
use crate::separate::demucs::DemucsSeparator;
use crate::separate::separator::Separator;
use crate::store::dir::sweep_partial_writes;
use crate::store::{DirStore, ResultStore};
use crossbeam_channel::unbounded;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Handle to a running pipeline context.
pub struct PipelineHandle {
    /// Flag to signal shutdown
    running: Arc<AtomicBool>,
    /// Join handles for spawned threads
    threads: Vec<JoinHandle<()>>,
    /// First fatal error reported by a thread, if any
    fault: Arc<Mutex<Option<NovoxError>>>,
}

impl PipelineHandle {
    /// Stops the context and returns the first fatal error, if one occurred.
    ///
    /// Waits up to 2s for threads to finish, joining completed ones to
    /// detect panics. After the deadline, remaining threads are detached —
    /// they die with the process (an in-flight separation call has no
    /// cancellation protocol).
    pub fn stop(mut self) -> Option<NovoxError> {
        self.running.store(false, Ordering::SeqCst);

        let deadline = Instant::now() + Duration::from_secs(2);
        let poll_interval = Duration::from_millis(50);

        loop {
            let mut remaining = Vec::new();
            for handle in self.threads.drain(..) {
                if handle.is_finished() {
                    if let Err(panic_info) = handle.join() {
                        let msg = panic_info
                            .downcast_ref::<&str>()
                            .copied()
                            .or_else(|| panic_info.downcast_ref::<String>().map(|s| s.as_str()))
                            .unwrap_or("unknown panic");
                        eprintln!("novox: pipeline thread panicked: {msg}");
                    }
                } else {
                    remaining.push(handle);
                }
            }
            self.threads = remaining;

            if self.threads.is_empty() {
                break;
            }

            if Instant::now() >= deadline {
                eprintln!(
                    "novox: shutdown timeout — {} thread(s) still running, detaching",
                    self.threads.len()
                );
                break;
            }

            thread::sleep(poll_interval);
        }

        self.fault.lock().ok().and_then(|mut fault| fault.take())
    }

    /// Returns true if the context has not been stopped or faulted.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Start the capture+separation context: window builder thread feeding a
/// separation stage thread over the unbounded chunk channel.
pub fn start_capture(
    config: &Config,
    source: Box<dyn CaptureSource>,
    separator: Arc<dyn Separator>,
    store: Arc<dyn ResultStore>,
) -> PipelineHandle {
    let running = Arc::new(AtomicBool::new(true));
    let fault = Arc::new(Mutex::new(None));
    let (chunk_tx, chunk_rx) = unbounded();

    let builder = WindowBuilder::new(
        &config.window,
        config.audio.sample_rate,
        config.audio.channels,
    );

    let capture_running = running.clone();
    let capture_fault = fault.clone();
    let capture_flag = running.clone();
    let capture_thread = thread::spawn(move || {
        if let Err(e) = builder.run(source, chunk_tx, capture_running) {
            eprintln!("novox: capture failed: {}", e);
            if let Ok(mut fault) = capture_fault.lock() {
                fault.get_or_insert(e);
            }
            // A dead capture device halts the whole producing side
            capture_flag.store(false, Ordering::SeqCst);
        }
    });

    let stage = SeparationStage::new(separator, store);
    let stage_running = running.clone();
    let stage_thread = thread::spawn(move || {
        stage.run(chunk_rx, stage_running);
    });

    PipelineHandle {
        running,
        threads: vec![capture_thread, stage_thread],
        fault,
    }
}

/// Start the playback context: watcher thread feeding the playback engine
/// thread over the playback channel.
pub fn start_playback(
    config: &Config,
    store: Arc<dyn ResultStore>,
    sink: Box<dyn OutputSink>,
) -> PipelineHandle {
    let running = Arc::new(AtomicBool::new(true));
    let fault = Arc::new(Mutex::new(None));
    let (playback_tx, playback_rx) = unbounded();

    let watcher = ResultWatcher::new(store.clone());
    let watcher_running = running.clone();
    let poll_interval = Duration::from_millis(config.store.poll_interval_ms);
    let watcher_thread = thread::spawn(move || {
        watcher.run(playback_tx, watcher_running, poll_interval);
    });

    let engine = PlaybackEngine::new(
        store,
        config.window.trim_frames(config.audio.sample_rate),
    );
    let engine_running = running.clone();
    let engine_fault = fault.clone();
    let engine_flag = running.clone();
    let engine_thread = thread::spawn(move || {
        if let Err(e) = engine.run(playback_rx, sink, engine_running) {
            eprintln!("novox: playback failed: {}", e);
            if let Ok(mut fault) = engine_fault.lock() {
                fault.get_or_insert(e);
            }
            engine_flag.store(false, Ordering::SeqCst);
        }
    });

    PipelineHandle {
        running,
        threads: vec![watcher_thread, engine_thread],
        fault,
    }
}

/// Run both contexts in one process until Ctrl+C.
pub async fn run_command(config: Config, quiet: bool) -> Result<()> {
    suppress_audio_warnings();
    config.validate()?;

    let store: Arc<dyn ResultStore> = Arc::new(DirStore::new(&config.store.dir)?);
    sweep_leftovers(&config);

    let source = Box::new(CpalCaptureSource::new(
        config.audio.input_device.as_deref(),
        config.audio.sample_rate,
        config.audio.channels,
    )?);
    let separator: Arc<dyn Separator> =
        Arc::new(DemucsSeparator::new(&config.separation)?.with_quiet(quiet));
    let sink = Box::new(CpalOutputSink::new(
        config.audio.output_device.as_deref(),
        config.audio.sample_rate,
        config.audio.channels,
    )?);

    if !quiet {
        eprintln!(
            "novox: capturing {}s windows ({}s overlap), playing with {}s edge trim. Ctrl+C to stop.",
            config.window.window_secs, config.window.overlap_secs, config.window.trim_secs
        );
    }

    let capture = start_capture(&config, source, separator, store.clone());
    let playback = start_playback(&config, store, sink);

    wait_for_interrupt(&[&capture, &playback]).await?;
    if !quiet {
        eprintln!("\nnovox: shutting down...");
    }

    let capture_fault = capture.stop();
    let playback_fault = playback.stop();
    match capture_fault.or(playback_fault) {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Run only the capture+separation context (producer process).
pub async fn run_capture_command(config: Config, quiet: bool) -> Result<()> {
    suppress_audio_warnings();
    config.validate()?;

    let store: Arc<dyn ResultStore> = Arc::new(DirStore::new(&config.store.dir)?);
    sweep_leftovers(&config);

    let source = Box::new(CpalCaptureSource::new(
        config.audio.input_device.as_deref(),
        config.audio.sample_rate,
        config.audio.channels,
    )?);
    let separator: Arc<dyn Separator> =
        Arc::new(DemucsSeparator::new(&config.separation)?.with_quiet(quiet));

    if !quiet {
        eprintln!(
            "novox: recording live input in {}s windows. Ctrl+C to stop.",
            config.window.window_secs
        );
    }

    let capture = start_capture(&config, source, separator, store);
    wait_for_interrupt(&[&capture]).await?;
    if !quiet {
        eprintln!("\nnovox: recording stopped.");
    }

    match capture.stop() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Run only the playback context (consumer process).
pub async fn run_play_command(config: Config, quiet: bool) -> Result<()> {
    suppress_audio_warnings();
    config.validate()?;

    let store: Arc<dyn ResultStore> = Arc::new(DirStore::new(&config.store.dir)?);
    let sink = Box::new(CpalOutputSink::new(
        config.audio.output_device.as_deref(),
        config.audio.sample_rate,
        config.audio.channels,
    )?);

    if !quiet {
        eprintln!(
            "novox: watching {} every {}ms. Ctrl+C to stop.",
            config.store.dir.display(),
            config.store.poll_interval_ms
        );
    }

    let playback = start_playback(&config, store, sink);
    wait_for_interrupt(&[&playback]).await?;
    if !quiet {
        eprintln!("\nnovox: playback stopped.");
    }

    match playback.stop() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Remove `.part` residue a crashed producer may have left in the store.
fn sweep_leftovers(config: &Config) {
    match sweep_partial_writes(&config.store.dir) {
        Ok(0) => {}
        Ok(n) => eprintln!("novox: swept {} partial result(s) from a previous run", n),
        Err(e) => eprintln!("novox: {}", e),
    }
}

/// Wait until Ctrl+C or until any of the given contexts faults.
async fn wait_for_interrupt(handles: &[&PipelineHandle]) -> Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                return result.map_err(|e| {
                    NovoxError::Other(format!("Failed to wait for Ctrl+C: {}", e))
                });
            }
            _ = tokio::time::sleep(Duration::from_millis(200)) => {
                if handles.iter().any(|handle| !handle.is_running()) {
                    return Ok(());
                }
            }
        }
    }
}
