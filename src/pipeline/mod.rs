//! Streaming separation pipeline.
//!
//! Two execution contexts, each a pair of threads joined by an unbounded
//! crossbeam channel: capture (`WindowBuilder` → `SeparationStage`) and
//! playback (`ResultWatcher` → `PlaybackEngine`). The contexts communicate
//! only through the result store.

pub mod player;
pub mod separation;
pub mod types;
pub mod watcher;
pub mod window;

pub use player::{PlaybackEngine, trim_edges};
pub use separation::SeparationStage;
pub use types::{AudioChunk, SeparatedResult};
pub use watcher::ResultWatcher;
pub use window::WindowBuilder;
