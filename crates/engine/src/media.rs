use std::ffi::OsString;

use image::RgbaImage;
use tracing::debug;

use crate::error::{Result, TimelineError};
use crate::frame::scaled_width;
use crate::source::MediaLocation;

/// Metadata read when a resource is opened.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub duration: Option<f64>,
    pub width: u32,
    pub height: u32,
    pub frame_rate: Option<f64>,
    pub codec: Option<String>,
}

/// Opens seek-capable handles to video resources.
pub trait MediaBackend: Send + Sync + 'static {
    type Handle: MediaHandle + Send + 'static;

    /// Opens `location` and reads its metadata.
    fn open(&self, location: &MediaLocation) -> Result<Self::Handle>;
}

/// A single decode position over one opened resource.
pub trait MediaHandle {
    fn info(&self) -> &MediaInfo;

    /// Moves the decode position to `at_seconds`.
    fn seek(&mut self, at_seconds: f64) -> Result<()>;

    /// Captures the picture at the current position, `frame_height` pixels tall.
    fn capture(&mut self, frame_height: u32) -> Result<RgbaImage>;
}

/// FFmpeg CLI-backed backend used by production wiring.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegMediaBackend;

impl MediaBackend for FfmpegMediaBackend {
    type Handle = FfmpegHandle;

    fn open(&self, location: &MediaLocation) -> Result<FfmpegHandle> {
        let probed = media_ffmpeg::probe_media(location.as_os_str())?;
        let video = probed
            .first_video()
            .ok_or_else(|| media_ffmpeg::MediaFfmpegError::MissingVideoStream(probed.input.clone()))?;

        let info = MediaInfo {
            duration: probed.duration_seconds,
            width: video.width.unwrap_or(0),
            height: video.height.unwrap_or(0),
            frame_rate: video.r_frame_rate.map(|rate| rate.as_f64()),
            codec: video.codec_name.clone(),
        };
        debug!(input = %probed.input, ?info, "probed video resource");

        Ok(FfmpegHandle {
            input: location.as_os_str().to_os_string(),
            info,
            position: 0.0,
        })
    }
}

/// Decode position over one input; every capture runs one `ffmpeg` process.
#[derive(Debug)]
pub struct FfmpegHandle {
    input: OsString,
    info: MediaInfo,
    position: f64,
}

impl MediaHandle for FfmpegHandle {
    fn info(&self) -> &MediaInfo {
        &self.info
    }

    fn seek(&mut self, at_seconds: f64) -> Result<()> {
        if !at_seconds.is_finite() || at_seconds < 0.0 {
            return Err(TimelineError::frame_capture(
                at_seconds,
                "seek target outside the clip",
            ));
        }
        self.position = at_seconds;
        Ok(())
    }

    fn capture(&mut self, frame_height: u32) -> Result<RgbaImage> {
        let width = scaled_width(self.info.width, self.info.height, frame_height);
        let captured =
            media_ffmpeg::capture_frame_at_seconds(&self.input, self.position, width, frame_height)?;
        RgbaImage::from_raw(captured.width, captured.height, captured.rgba).ok_or_else(|| {
            TimelineError::frame_capture(self.position, "captured buffer does not match frame size")
        })
    }
}
