//! UI-agnostic core of the clip-range timeline widget.

pub mod cache;
pub mod config;
pub mod controller;
pub mod drag;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod media;
pub mod render;
pub mod sampler;
pub mod source;
pub mod theme;

#[cfg(test)]
mod testing;

pub use cache::ThumbnailCache;
pub use config::{LayoutConstants, TimelineConfig};
pub use controller::{
    Event, ExtractionStatus, TimelineController, TimelineErrorEvent, TimelineErrorKind,
};
pub use drag::{
    CursorStyle, DragController, DragKind, NoCapture, PointerCapture, PointerDevice, PointerEvent,
    PointerPhase, hit_test,
};
pub use error::{Result, TimelineError};
pub use frame::{ContentKey, FrameImage, VideoFrame};
pub use geometry::{TimeGeometry, TimeRange, TimelineLayout, round_time};
pub use media::{FfmpegMediaBackend, MediaBackend, MediaHandle, MediaInfo};
pub use render::{RasterSurface, RenderFrameState, TimelineRenderer};
pub use sampler::{FrameSampler, SamplerEvent, SamplingPlan, generate_timestamps};
pub use source::{FileBlob, SourceIdentity, VideoSource};
pub use theme::{Color, Theme, ThemeOverrides};
