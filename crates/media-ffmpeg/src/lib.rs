//! Thin wrappers over the `ffprobe` / `ffmpeg` command line tools.
//!
//! Inputs may be local paths or any URL FFmpeg understands.

mod capture;
mod error;
mod probe;
mod time;

pub use capture::{CapturedFrame, capture_frame_at_seconds};
pub use error::{MediaFfmpegError, Result};
pub use probe::{MediaInfo, StreamInfo, StreamKind, probe_media};
pub use time::Rational;
