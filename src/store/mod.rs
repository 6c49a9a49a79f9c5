//! Key-addressable store for completed instrumental results.
//!
//! The store is the only channel between the capture/separation context and
//! the playback context; either side can be restarted independently as long
//! as a listing never observes a partially written result.

pub mod dir;
pub mod mem;

use crate::error::Result;
use crate::pipeline::types::SeparatedResult;

pub use dir::DirStore;
pub use mem::MemStore;

/// A durable, eventually-observable store of separated results keyed by
/// chunk index.
///
/// `put` is write-once; `take` is destructive, so a second take on the same
/// index fails with `ResultNotFound`. Keys sort as plain integers, which is
/// what keeps the watcher's ascending scan correct.
pub trait ResultStore: Send + Sync {
    /// Store a result under its chunk index. Write-once: storing an index
    /// that already exists is a relay error.
    fn put(&self, result: &SeparatedResult) -> Result<()>;

    /// Snapshot of currently available indices, ascending.
    fn list(&self) -> Result<Vec<u64>>;

    /// Remove and return the result for `index`.
    fn take(&self, index: u64) -> Result<SeparatedResult>;
}
