//! Caller-facing widget object tying the sampler, drag machine and renderer
//! together.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::TimelineConfig;
use crate::drag::{
    CursorStyle, DragContext, DragController, DragKind, DragOutput, NoCapture, PointerCapture,
    PointerEvent,
};
use crate::error::{Result, TimelineError};
use crate::frame::VideoFrame;
use crate::geometry::{TimeRange, TimelineLayout};
use crate::media::{FfmpegMediaBackend, MediaBackend};
use crate::render::{RasterSurface, RenderFrameState, TimelineRenderer};
use crate::sampler::{FrameSampler, SamplerEvent, SamplingPlan};
use crate::source::VideoSource;
use crate::theme::{Theme, ThemeOverrides};

/// Notifications for the host, in the order they happened.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    DurationChanged(f64),
    TimeChanged(f64),
    RangeChanged(TimeRange),
    DragStarted(DragKind),
    DragEnded(DragKind),
    FramesExtracted(Vec<VideoFrame>),
    /// Percent of the current extraction, 0 to 100.
    ExtractionProgress(u8),
    Error(TimelineErrorEvent),
}

/// User-facing error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineErrorKind {
    ResourceLoad,
    FrameCapture,
    SurfaceInit,
    ThumbnailResolve,
    InvalidConfig,
    Other,
}

impl From<&TimelineError> for TimelineErrorKind {
    fn from(value: &TimelineError) -> Self {
        match value {
            TimelineError::ResourceLoad { .. } => Self::ResourceLoad,
            TimelineError::FrameCapture { .. } => Self::FrameCapture,
            TimelineError::SurfaceInit { .. } => Self::SurfaceInit,
            TimelineError::ThumbnailResolve { .. } => Self::ThumbnailResolve,
            TimelineError::InvalidConfig { .. }
            | TimelineError::ConfigIo { .. }
            | TimelineError::ConfigParse { .. } => Self::InvalidConfig,
            TimelineError::Media(_) => Self::Other,
        }
    }
}

/// User-facing error payload emitted as an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineErrorEvent {
    pub kind: TimelineErrorKind,
    pub message: String,
}

impl TimelineErrorEvent {
    pub fn from_error(error: &TimelineError) -> Self {
        Self {
            kind: TimelineErrorKind::from(error),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionStatus {
    /// No resource loaded yet, or disposed.
    Idle,
    /// Waiting for resource metadata.
    Loading,
    Extracting,
    Ready,
    /// Load or capture failed; [`TimelineController::reextract`] retries.
    Failed(TimelineErrorEvent),
}

/// The widget: owns one sampler, one renderer and one drag machine.
///
/// A time or range given in the config is controlled: drags report the
/// new value but only [`Self::set_current_time`] and
/// [`Self::set_selected_range`] change it.
pub struct TimelineController<M: MediaBackend, P: PointerCapture = NoCapture> {
    config: TimelineConfig,
    theme: Theme,
    source: Option<VideoSource>,
    duration: f64,
    current_time: f64,
    selected_range: Option<TimeRange>,
    time_controlled: bool,
    range_controlled: bool,
    frames: Vec<VideoFrame>,
    progress: u8,
    status: ExtractionStatus,
    sampler: FrameSampler<M>,
    renderer: TimelineRenderer,
    drag: DragController<P>,
    disposed: bool,
}

impl TimelineController<FfmpegMediaBackend> {
    /// Controller backed by the FFmpeg command-line tools.
    ///
    /// # Example
    /// ```no_run
    /// use engine::{TimelineConfig, TimelineController, VideoSource};
    ///
    /// let mut timeline = TimelineController::with_ffmpeg(TimelineConfig::default())?;
    /// let _events = timeline.load(VideoSource::Path("clip.mp4".into()));
    /// # Ok::<(), engine::TimelineError>(())
    /// ```
    pub fn with_ffmpeg(config: TimelineConfig) -> Result<Self> {
        Self::new(FfmpegMediaBackend, NoCapture, config)
    }
}

impl<M, P> TimelineController<M, P>
where
    M: MediaBackend,
    P: PointerCapture,
{
    /// Validates `config` and allocates the drawing surface.
    pub fn new(media: M, capture: P, config: TimelineConfig) -> Result<Self> {
        config.validate()?;
        let renderer = TimelineRenderer::new(
            config.width,
            config.height,
            config.pixel_ratio,
            config.thumbnail_cache_capacity,
        )?;
        Ok(Self {
            theme: Theme::with_overrides(&config.theme),
            source: None,
            duration: 0.0,
            current_time: config.current_time.unwrap_or(0.0),
            selected_range: config.selected_range,
            time_controlled: config.current_time.is_some(),
            range_controlled: config.selected_range.is_some(),
            frames: Vec::new(),
            progress: 0,
            status: ExtractionStatus::Idle,
            sampler: FrameSampler::new(media, config.load_timeout()),
            renderer,
            drag: DragController::new(capture),
            disposed: false,
            config,
        })
    }

    /// Loads `source` and starts sampling its frames.
    pub fn load(&mut self, source: VideoSource) -> Vec<Event> {
        self.reset(source)
    }

    /// Replaces the source only when its identity differs from the current one.
    pub fn set_source(&mut self, source: VideoSource) -> Vec<Event> {
        let unchanged = self
            .source
            .as_ref()
            .is_some_and(|current| current.identity() == source.identity());
        if unchanged {
            return Vec::new();
        }
        self.reset(source)
    }

    /// Tears down all state derived from the previous source and rebuilds it.
    pub fn reset(&mut self, source: VideoSource) -> Vec<Event> {
        if self.disposed {
            return Vec::new();
        }
        info!(resource = %source.display_name(), "timeline reset");

        self.sampler.reset();
        self.renderer.clear_cache();
        if let Some(kind) = self.drag.cancel() {
            debug!(?kind, "drag dropped by reset");
        }
        self.frames.clear();
        self.progress = 0;
        self.duration = 0.0;
        if !self.time_controlled {
            self.current_time = 0.0;
        }
        if !self.range_controlled {
            self.selected_range = None;
        }
        self.source = Some(source);
        self.start_extraction()
    }

    /// Retries sampling the current source from a clean progress and error state.
    pub fn reextract(&mut self) -> Vec<Event> {
        if self.disposed || self.source.is_none() {
            return Vec::new();
        }
        self.progress = 0;
        self.status = ExtractionStatus::Loading;
        self.start_extraction()
    }

    /// Applies finished sampler work without blocking.
    pub fn poll(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        for event in self.sampler.poll() {
            events.extend(self.apply_sampler_event(event));
        }
        events
    }

    /// Blocks up to `timeout` for the next sampler update.
    pub fn wait(&mut self, timeout: Duration) -> Vec<Event> {
        match self.sampler.wait(timeout) {
            Some(event) => self.apply_sampler_event(event),
            None => Vec::new(),
        }
    }

    /// Feeds one pointer sample through the drag machine.
    pub fn pointer(&mut self, event: &PointerEvent) -> Vec<Event> {
        if self.disposed {
            return Vec::new();
        }
        let ctx = self.drag_context();
        let outputs = self.drag.handle(event, &ctx);

        outputs
            .into_iter()
            .map(|output| match output {
                DragOutput::Started(kind) => Event::DragStarted(kind),
                DragOutput::Ended(kind) => Event::DragEnded(kind),
                DragOutput::TimeChanged(time) => {
                    if !self.time_controlled {
                        self.current_time = time;
                    }
                    Event::TimeChanged(time)
                }
                DragOutput::RangeChanged(range) => {
                    if !self.range_controlled {
                        self.selected_range = Some(range);
                    }
                    Event::RangeChanged(range)
                }
            })
            .collect()
    }

    pub fn cursor_style(&self, x: f64, y: f64) -> CursorStyle {
        self.drag.cursor_style(x, y, &self.drag_context())
    }

    pub fn set_current_time(&mut self, seconds: f64) {
        self.current_time = if self.duration > 0.0 {
            seconds.clamp(0.0, self.duration)
        } else {
            seconds.max(0.0)
        };
    }

    pub fn set_selected_range(&mut self, range: TimeRange) {
        let range = if self.duration > 0.0 {
            range.clamped(self.duration)
        } else {
            range
        };
        self.selected_range = Some(range);
    }

    /// New logical size; the surface is rebuilt on the next render.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.config.width = width;
        self.config.height = height;
    }

    pub fn set_pixel_ratio(&mut self, pixel_ratio: f32) {
        self.config.pixel_ratio = pixel_ratio;
    }

    pub fn set_theme(&mut self, overrides: ThemeOverrides) {
        self.theme = Theme::with_overrides(&overrides);
        self.config.theme = overrides;
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.config.disabled = disabled;
    }

    /// Redraws the surface from the current state.
    pub fn render(&mut self) -> Result<()> {
        if self.disposed {
            return Ok(());
        }
        let state = RenderFrameState {
            frames: &self.frames,
            duration: self.duration,
            current_time: self.current_time,
            selected_range: self.selected_range(),
            width: self.config.width,
            height: self.config.height,
            pixel_ratio: self.config.pixel_ratio,
            frame_height: self.config.frame_height,
            show_scale: self.config.show_scale,
            layout: &self.config.layout,
            theme: &self.theme,
        };
        self.renderer.render(&state)
    }

    /// Frames of the last completed extraction.
    pub fn frames(&self) -> &[VideoFrame] {
        &self.frames
    }

    pub fn surface(&self) -> Option<&RasterSurface> {
        self.renderer.surface()
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// The selection; the whole clip until one is set.
    pub fn selected_range(&self) -> TimeRange {
        self.selected_range
            .unwrap_or_else(|| TimeRange::full(self.duration))
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn status(&self) -> &ExtractionStatus {
        &self.status
    }

    pub fn error(&self) -> Option<&TimelineErrorEvent> {
        match &self.status {
            ExtractionStatus::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn source(&self) -> Option<&VideoSource> {
        self.source.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// Terminal: stops sampling silently and releases every resource.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.sampler.dispose();
        self.renderer.dispose();
        self.drag.cancel();
        self.frames.clear();
        self.status = ExtractionStatus::Idle;
        info!("timeline disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn start_extraction(&mut self) -> Vec<Event> {
        let Some(source) = self.source.clone() else {
            return Vec::new();
        };
        self.status = ExtractionStatus::Loading;
        let events = match self.config.duration {
            Some(duration) => self.apply_duration(duration),
            None => Vec::new(),
        };

        let plan = SamplingPlan {
            duration: self.config.duration,
            frame_interval: self.config.frame_interval,
            frame_height: self.config.frame_height,
        };
        match self.sampler.load(&source, plan) {
            Ok(generation) => {
                debug!(generation, "timeline load scheduled");
                events
            }
            Err(error) => self.fail(error, events),
        }
    }

    fn apply_duration(&mut self, duration: f64) -> Vec<Event> {
        let mut events = Vec::new();
        if duration != self.duration {
            self.duration = duration;
            events.push(Event::DurationChanged(duration));
        }
        if self.selected_range.is_none() {
            self.selected_range = Some(TimeRange::full(duration));
        }
        if !self.time_controlled {
            self.current_time = self.current_time.clamp(0.0, duration);
        }
        events
    }

    fn apply_sampler_event(&mut self, event: SamplerEvent) -> Vec<Event> {
        match event {
            SamplerEvent::Opened { duration, .. } => {
                self.status = ExtractionStatus::Extracting;
                self.apply_duration(duration)
            }
            SamplerEvent::Progress { percent, .. } => {
                self.progress = percent;
                vec![Event::ExtractionProgress(percent)]
            }
            SamplerEvent::Completed { frames, .. } => {
                info!(frames = frames.len(), "timeline frames ready");
                self.frames = frames.clone();
                self.progress = 100;
                self.status = ExtractionStatus::Ready;
                vec![Event::FramesExtracted(frames)]
            }
            SamplerEvent::Failed { error, .. } => self.fail(error, Vec::new()),
        }
    }

    fn fail(&mut self, error: TimelineError, mut events: Vec<Event>) -> Vec<Event> {
        warn!(%error, "timeline error");
        let event = TimelineErrorEvent::from_error(&error);
        self.status = ExtractionStatus::Failed(event.clone());
        events.push(Event::Error(event));
        events
    }

    fn drag_context(&self) -> DragContext {
        DragContext {
            layout: TimelineLayout::new(
                self.config.width,
                self.config.height,
                self.config.frame_height,
                self.config.show_scale,
                &self.config.layout,
            ),
            duration: self.duration,
            current_time: self.current_time,
            range: self.selected_range(),
            min_duration: self.config.min_duration,
            disabled: self.config.disabled || self.duration <= 0.0,
        }
    }
}
