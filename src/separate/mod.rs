//! The opaque vocal-separation capability and its backends.

pub mod demucs;
pub mod separator;

pub use demucs::DemucsSeparator;
pub use separator::{MockSeparator, Separator};
