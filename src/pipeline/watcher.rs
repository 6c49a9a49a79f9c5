//! Result watcher: polls the store and feeds the playback channel.
//!
//! Discovery latency is bounded by the poll interval — an accepted
//! trade-off for keeping the two processes decoupled by nothing but the
//! store itself.

use crate::error::Result;
use crate::store::ResultStore;
use crossbeam_channel::Sender;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

pub struct ResultWatcher {
    store: Arc<dyn ResultStore>,
    /// Indices already handed to the playback channel. A taken result never
    /// reappears in the store, so this set alone is enough for de-dup — no
    /// need to inspect channel contents or rely on listing races.
    queued: HashSet<u64>,
}

impl ResultWatcher {
    pub fn new(store: Arc<dyn ResultStore>) -> Self {
        Self {
            store,
            queued: HashSet::new(),
        }
    }

    /// Scan the store once and return newly available indices, ascending.
    ///
    /// Returned indices are marked as queued; the caller owns delivering
    /// them to the playback channel.
    pub fn poll_once(&mut self) -> Result<Vec<u64>> {
        let mut fresh: Vec<u64> = self
            .store
            .list()?
            .into_iter()
            .filter(|index| !self.queued.contains(index))
            .collect();
        fresh.sort_unstable();

        for &index in &fresh {
            self.queued.insert(index);
        }
        Ok(fresh)
    }

    /// Poll at a fixed interval until the stop flag clears or the playback
    /// side hangs up. Store listing errors are logged and retried on the
    /// next tick.
    pub fn run(
        mut self,
        playback_tx: Sender<u64>,
        running: Arc<AtomicBool>,
        poll_interval: Duration,
    ) {
        while running.load(Ordering::SeqCst) {
            match self.poll_once() {
                Ok(fresh) => {
                    for index in fresh {
                        if playback_tx.send(index).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    eprintln!("novox: result store scan failed: {}", e);
                }
            }

            // Sleep in short steps so shutdown stays responsive
            let deadline = Instant::now() + poll_interval;
            while running.load(Ordering::SeqCst) && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(50).min(poll_interval));
            }
        }
    }
}
