//! Audio device boundaries and file codecs.

pub mod capture;
pub mod playback;
pub mod source;
pub mod wav;

pub use capture::{CpalCaptureSource, list_input_devices, list_output_devices};
pub use playback::{CollectorSink, CpalOutputSink, OutputSink};
pub use source::{CaptureSource, MockCaptureSource};
