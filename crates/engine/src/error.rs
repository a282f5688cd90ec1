use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use crate::frame::ContentKey;

/// Result type used by the engine crate.
pub type Result<T> = std::result::Result<T, TimelineError>;

/// Errors produced while loading, sampling and drawing a timeline.
#[derive(Debug)]
pub enum TimelineError {
    /// The video resource could not be opened or its metadata was unusable.
    ResourceLoad {
        resource: String,
        reason: String,
    },
    /// Seeking or capturing the frame at `at_seconds` failed.
    FrameCapture {
        at_seconds: f64,
        reason: String,
    },
    SurfaceInit {
        width: u32,
        height: u32,
        pixel_ratio: f32,
        reason: &'static str,
    },
    ThumbnailResolve {
        key: ContentKey,
        reason: String,
    },
    InvalidConfig {
        reason: String,
    },
    ConfigIo {
        path: PathBuf,
        source: std::io::Error,
    },
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },
    Media(media_ffmpeg::MediaFfmpegError),
}

impl TimelineError {
    pub(crate) fn resource_load(resource: impl Into<String>, reason: impl Display) -> Self {
        Self::ResourceLoad {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn frame_capture(at_seconds: f64, reason: impl Display) -> Self {
        Self::FrameCapture {
            at_seconds,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

impl Display for TimelineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ResourceLoad { resource, reason } => {
                write!(f, "failed to load video resource {resource}: {reason}")
            }
            Self::FrameCapture { at_seconds, reason } => {
                write!(f, "failed to capture frame at {at_seconds:.2}s: {reason}")
            }
            Self::SurfaceInit {
                width,
                height,
                pixel_ratio,
                reason,
            } => write!(
                f,
                "cannot create {width}x{height} drawing surface at ratio {pixel_ratio}: {reason}"
            ),
            Self::ThumbnailResolve { key, reason } => {
                write!(f, "failed to resolve thumbnail {key}: {reason}")
            }
            Self::InvalidConfig { reason } => write!(f, "invalid timeline config: {reason}"),
            Self::ConfigIo { path, source } => {
                write!(f, "read timeline config: {} ({source})", path.display())
            }
            Self::ConfigParse { path, source } => {
                write!(f, "parse timeline config: {} ({source})", path.display())
            }
            Self::Media(err) => write!(f, "media backend error: {err}"),
        }
    }
}

impl std::error::Error for TimelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ConfigIo { source, .. } => Some(source),
            Self::ConfigParse { source, .. } => Some(source),
            Self::Media(err) => Some(err),
            _ => None,
        }
    }
}

impl From<media_ffmpeg::MediaFfmpegError> for TimelineError {
    fn from(value: media_ffmpeg::MediaFfmpegError) -> Self {
        Self::Media(value)
    }
}
