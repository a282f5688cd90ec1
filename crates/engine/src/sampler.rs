//! Sequential frame extraction on a background worker.
//!
//! Every [`FrameSampler::load`] and [`FrameSampler::extract`] call takes a new
//! generation number; events from older generations are dropped both by the
//! worker and by the receiver.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{Result, TimelineError};
use crate::frame::{FrameImage, VideoFrame};
use crate::geometry::round_time;
use crate::media::{MediaBackend, MediaHandle, MediaInfo};
use crate::source::{MediaLocation, SourceIdentity, TempResource, VideoSource, materialize};

/// Offset of the closing sample from the clip end.
pub const END_EPSILON: f64 = 0.01;
/// The clip end counts as covered when a sample lies this close to it.
pub const END_COVERAGE: f64 = 0.1;

/// Sample times from 0 every `interval` seconds, plus one near the clip end.
///
/// # Example
/// ```
/// use engine::generate_timestamps;
///
/// assert_eq!(generate_timestamps(10.0, 2.0), vec![0.0, 2.0, 4.0, 6.0, 8.0, 9.99]);
/// assert_eq!(generate_timestamps(1.0, 0.5), vec![0.0, 0.5, 0.99]);
/// ```
pub fn generate_timestamps(duration: f64, interval: f64) -> Vec<f64> {
    if !(duration.is_finite() && duration > 0.0 && interval.is_finite() && interval > 0.0) {
        return Vec::new();
    }

    let mut timestamps = Vec::new();
    let mut index = 0u64;
    loop {
        // Multiply instead of accumulating so 0.2-second steps do not drift.
        let t = (index as f64 * interval * 1e6).round() / 1e6;
        if t >= duration {
            break;
        }
        timestamps.push(t);
        index += 1;
    }

    let last = timestamps.last().copied().unwrap_or(0.0);
    if duration - last > END_COVERAGE {
        timestamps.push(round_time(duration - END_EPSILON));
    }
    timestamps
}

/// Upper bound on frames sampled from one clip.
pub const MAX_FRAMES: usize = 20_000;

/// What a background [`FrameSampler::load`] samples once the clip is open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingPlan {
    /// Overrides the duration read from the resource metadata.
    pub duration: Option<f64>,
    pub frame_interval: f64,
    pub frame_height: u32,
}

/// Output of a running load or extraction, tagged with its generation.
#[derive(Debug)]
pub enum SamplerEvent {
    /// The resource is open; `duration` drives the sample times.
    Opened {
        generation: u64,
        duration: f64,
    },
    Progress {
        generation: u64,
        percent: u8,
    },
    Completed {
        generation: u64,
        frames: Vec<VideoFrame>,
    },
    Failed {
        generation: u64,
        error: TimelineError,
    },
}

impl SamplerEvent {
    pub fn generation(&self) -> u64 {
        match self {
            Self::Opened { generation, .. }
            | Self::Progress { generation, .. }
            | Self::Completed { generation, .. }
            | Self::Failed { generation, .. } => *generation,
        }
    }

    /// True for the last event of a generation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

struct OpenedSource<H> {
    identity: SourceIdentity,
    info: MediaInfo,
    handle: Arc<Mutex<H>>,
    _temp: Option<TempResource>,
}

type OpenSlot<H> = Arc<Mutex<Option<OpenedSource<H>>>>;

fn lock_slot<H>(slot: &OpenSlot<H>) -> MutexGuard<'_, Option<OpenedSource<H>>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle and metadata of `identity` when it is the open resource.
fn reuse<H>(slot: &OpenSlot<H>, identity: &SourceIdentity) -> Option<(Arc<Mutex<H>>, MediaInfo)> {
    lock_slot(slot)
        .as_ref()
        .filter(|opened| opened.identity == *identity)
        .map(|opened| (Arc::clone(&opened.handle), opened.info.clone()))
}

/// Owns the decode handle of one resource and runs extractions against it.
pub struct FrameSampler<M: MediaBackend> {
    media: Arc<M>,
    load_timeout: Duration,
    opened: OpenSlot<M::Handle>,
    generation: Arc<AtomicU64>,
    disposed: Arc<AtomicBool>,
    events_tx: Sender<SamplerEvent>,
    events_rx: Receiver<SamplerEvent>,
}

impl<M> FrameSampler<M>
where
    M: MediaBackend,
{
    pub fn new(media: M, load_timeout: Duration) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            media: Arc::new(media),
            load_timeout,
            opened: Arc::new(Mutex::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
            disposed: Arc::new(AtomicBool::new(false)),
            events_tx,
            events_rx,
        }
    }

    /// Opens `source` on the calling thread, reusing the current handle when
    /// the identity matches.
    pub fn open(&mut self, source: &VideoSource) -> Result<MediaInfo> {
        let resource = source.display_name();
        if self.is_disposed() {
            return Err(TimelineError::resource_load(resource, "sampler is disposed"));
        }

        let identity = source.identity();
        if let Some((_, info)) = reuse(&self.opened, &identity) {
            debug!(resource = %resource, "video resource already open");
            return Ok(info);
        }

        self.release();
        let opened = open_source(&self.media, source, identity, self.load_timeout)?;
        let info = opened.info.clone();
        *lock_slot(&self.opened) = Some(opened);
        Ok(info)
    }

    /// Clip duration in seconds; opens the source on first use.
    pub fn duration(&mut self, source: &VideoSource) -> Result<f64> {
        let info = self.open(source)?;
        info.duration.ok_or_else(|| {
            TimelineError::resource_load(source.display_name(), "duration is unavailable")
        })
    }

    /// Opens `source` and samples it per `plan`, all on a worker thread.
    ///
    /// Returns the new generation at once; [`SamplerEvent::Opened`] follows
    /// when the metadata is in, then progress and completion. Any load or
    /// extraction still running is superseded.
    pub fn load(&mut self, source: &VideoSource, plan: SamplingPlan) -> Result<u64> {
        let generation = self.next_generation();
        if self.is_disposed() {
            return Err(TimelineError::resource_load(
                source.display_name(),
                "sampler is disposed",
            ));
        }
        if plan.frame_height == 0 {
            return Err(TimelineError::invalid_config("frame_height must be positive"));
        }

        let job = LoadJob {
            token: self.token(generation),
            media: Arc::clone(&self.media),
            load_timeout: self.load_timeout,
            slot: Arc::clone(&self.opened),
            source: source.clone(),
            plan,
        };
        thread::Builder::new()
            .name(format!("frame-loader-{generation}"))
            .spawn(move || job.run())
            .map_err(|err| TimelineError::resource_load(source.display_name(), err))?;

        debug!(generation, resource = %source.display_name(), "load started");
        Ok(generation)
    }

    /// Starts extracting `timestamps` and returns the new generation.
    ///
    /// Any extraction still running is superseded.
    pub fn extract(
        &mut self,
        source: &VideoSource,
        timestamps: &[f64],
        frame_height: u32,
    ) -> Result<u64> {
        let generation = self.next_generation();
        if frame_height == 0 {
            return Err(TimelineError::invalid_config("frame_height must be positive"));
        }
        self.open(source)?;
        let (handle, _) = reuse(&self.opened, &source.identity())
            .ok_or_else(|| TimelineError::resource_load(source.display_name(), "not open"))?;

        let mut timestamps: Vec<f64> = timestamps
            .iter()
            .copied()
            .filter(|t| t.is_finite() && *t >= 0.0)
            .collect();
        timestamps.sort_by(f64::total_cmp);
        let count = timestamps.len();

        let job = ExtractionJob {
            token: self.token(generation),
            handle,
            timestamps,
            frame_height,
        };
        thread::Builder::new()
            .name(format!("frame-sampler-{generation}"))
            .spawn(move || job.run())
            .map_err(|err| TimelineError::resource_load(source.display_name(), err))?;

        debug!(generation, count, frame_height, "extraction started");
        Ok(generation)
    }

    /// Drains pending events of the current generation without blocking.
    pub fn poll(&self) -> Vec<SamplerEvent> {
        let current = self.current_generation();
        let events: Vec<_> = self
            .events_rx
            .try_iter()
            .filter(|event| {
                let fresh = event.generation() == current;
                if !fresh {
                    debug!(generation = event.generation(), current, "dropping stale sampler event");
                }
                fresh
            })
            .collect();
        if self.is_disposed() {
            return Vec::new();
        }
        events
    }

    /// Blocks up to `timeout` for the next event of the current generation.
    pub fn wait(&self, timeout: Duration) -> Option<SamplerEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_disposed() {
                return None;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.events_rx.recv_timeout(remaining) {
                Ok(event) if event.generation() == self.current_generation() => {
                    return Some(event);
                }
                Ok(event) => {
                    debug!(generation = event.generation(), "dropping stale sampler event");
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    /// Cancels running work and closes the resource; the sampler stays usable.
    pub fn reset(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.release();
        let dropped = self.events_rx.try_iter().count();
        if dropped > 0 {
            debug!(dropped, "discarded pending sampler events on reset");
        }
    }

    /// Terminal: stops running work silently and releases every resource.
    pub fn dispose(&mut self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.reset();
        debug!("frame sampler disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Metadata of the open resource, if any.
    pub fn info(&self) -> Option<MediaInfo> {
        lock_slot(&self.opened)
            .as_ref()
            .map(|opened| opened.info.clone())
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn token(&self, generation: u64) -> JobToken {
        JobToken {
            generation,
            current: Arc::clone(&self.generation),
            disposed: Arc::clone(&self.disposed),
            events: self.events_tx.clone(),
        }
    }

    fn release(&mut self) {
        if let Some(opened) = lock_slot(&self.opened).take() {
            debug!(identity = ?opened.identity, "closing video resource");
        }
    }
}

impl<M: MediaBackend> Drop for FrameSampler<M> {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn open_source<M: MediaBackend>(
    media: &Arc<M>,
    source: &VideoSource,
    identity: SourceIdentity,
    timeout: Duration,
) -> Result<OpenedSource<M::Handle>> {
    let resource = source.display_name();
    let (location, temp) = materialize(source)?;
    let handle = open_with_timeout(Arc::clone(media), location, timeout).map_err(|error| {
        match error {
            TimelineError::ResourceLoad { .. } => error,
            other => TimelineError::resource_load(&resource, other),
        }
    })?;
    let info = handle.info().clone();
    validate_info(&resource, &info)?;

    info!(
        resource = %resource,
        duration = ?info.duration,
        width = info.width,
        height = info.height,
        "video resource opened"
    );
    Ok(OpenedSource {
        identity,
        info,
        handle: Arc::new(Mutex::new(handle)),
        _temp: temp,
    })
}

fn open_with_timeout<M: MediaBackend>(
    media: Arc<M>,
    location: MediaLocation,
    timeout: Duration,
) -> Result<M::Handle> {
    let resource = location.as_os_str().to_string_lossy().into_owned();
    let (tx, rx) = mpsc::sync_channel(1);
    thread::Builder::new()
        .name("media-open".to_string())
        .spawn(move || {
            let _ = tx.send(media.open(&location));
        })
        .map_err(|err| TimelineError::resource_load(&resource, err))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(TimelineError::resource_load(
            resource,
            format!("metadata not available within {} ms", timeout.as_millis()),
        )),
        Err(RecvTimeoutError::Disconnected) => Err(TimelineError::resource_load(
            resource,
            "media open worker exited",
        )),
    }
}

fn validate_info(resource: &str, info: &MediaInfo) -> Result<()> {
    if info.width == 0 || info.height == 0 {
        return Err(TimelineError::resource_load(
            resource,
            format!(
                "intrinsic dimensions unavailable ({}x{})",
                info.width, info.height
            ),
        ));
    }
    match info.duration {
        Some(duration) if duration.is_finite() && duration > 0.0 => Ok(()),
        other => Err(TimelineError::resource_load(
            resource,
            format!("duration unavailable ({other:?})"),
        )),
    }
}

/// Generation of one job plus the shared state deciding whether it still counts.
struct JobToken {
    generation: u64,
    current: Arc<AtomicU64>,
    disposed: Arc<AtomicBool>,
    events: Sender<SamplerEvent>,
}

impl JobToken {
    fn is_current(&self) -> bool {
        !self.disposed.load(Ordering::SeqCst)
            && self.current.load(Ordering::SeqCst) == self.generation
    }

    fn send(&self, event: SamplerEvent) -> bool {
        self.is_current() && self.events.send(event).is_ok()
    }

    fn fail(&self, error: TimelineError) {
        if self.is_current() {
            warn!(generation = self.generation, %error, "sampler job failed");
            self.send(SamplerEvent::Failed {
                generation: self.generation,
                error,
            });
        } else {
            debug!(generation = self.generation, %error, "error after cancellation suppressed");
        }
    }
}

struct LoadJob<M: MediaBackend> {
    token: JobToken,
    media: Arc<M>,
    load_timeout: Duration,
    slot: OpenSlot<M::Handle>,
    source: VideoSource,
    plan: SamplingPlan,
}

impl<M: MediaBackend> LoadJob<M> {
    fn run(self) {
        let generation = self.token.generation;
        let (handle, info) = match self.acquire() {
            Ok(Some(opened)) => opened,
            Ok(None) => {
                debug!(generation, "load superseded while opening");
                return;
            }
            Err(error) => return self.token.fail(error),
        };

        let Some(duration) = self.plan.duration.or(info.duration) else {
            return self.token.fail(TimelineError::resource_load(
                self.source.display_name(),
                "duration is unavailable",
            ));
        };
        let expected = (duration / self.plan.frame_interval).ceil();
        if !(expected.is_finite() && expected <= MAX_FRAMES as f64) {
            return self.token.fail(TimelineError::invalid_config(format!(
                "sampling {duration}s every {}s exceeds {MAX_FRAMES} frames",
                self.plan.frame_interval
            )));
        }
        if !self.token.send(SamplerEvent::Opened {
            generation,
            duration,
        }) {
            return;
        }

        ExtractionJob {
            token: self.token,
            handle,
            timestamps: generate_timestamps(duration, self.plan.frame_interval),
            frame_height: self.plan.frame_height,
        }
        .run();
    }

    /// The open handle for the source; `None` once the job is superseded.
    fn acquire(&self) -> Result<Option<(Arc<Mutex<M::Handle>>, MediaInfo)>> {
        let identity = self.source.identity();
        if let Some(opened) = reuse(&self.slot, &identity) {
            return Ok(Some(opened));
        }

        let opened = open_source(&self.media, &self.source, identity, self.load_timeout)?;
        let mut slot = lock_slot(&self.slot);
        if !self.token.is_current() {
            return Ok(None);
        }
        let acquired = (Arc::clone(&opened.handle), opened.info.clone());
        *slot = Some(opened);
        Ok(Some(acquired))
    }
}

struct ExtractionJob<H> {
    token: JobToken,
    handle: Arc<Mutex<H>>,
    timestamps: Vec<f64>,
    frame_height: u32,
}

impl<H: MediaHandle> ExtractionJob<H> {
    fn run(self) {
        let generation = self.token.generation;
        let total = self.timestamps.len();
        let mut frames = Vec::with_capacity(total);

        for (index, &at_seconds) in self.timestamps.iter().enumerate() {
            if !self.token.is_current() {
                debug!(generation, at_seconds, "extraction superseded");
                return;
            }
            match self.capture(at_seconds) {
                Ok(image) => frames.push(VideoFrame {
                    time: at_seconds,
                    image,
                }),
                Err(error) => return self.token.fail(error),
            }

            let percent = ((index + 1) * 100 / total) as u8;
            if !self.token.send(SamplerEvent::Progress {
                generation,
                percent,
            }) {
                return;
            }
        }

        if self.token.send(SamplerEvent::Completed { generation, frames }) {
            info!(generation, frames = total, "extraction completed");
        }
    }

    fn capture(&self, at_seconds: f64) -> Result<FrameImage> {
        let pixels = {
            let mut handle = self
                .handle
                .lock()
                .map_err(|_| TimelineError::frame_capture(at_seconds, "decode handle poisoned"))?;
            handle
                .seek(at_seconds)
                .map_err(|error| capture_error(at_seconds, error))?;
            handle
                .capture(self.frame_height)
                .map_err(|error| capture_error(at_seconds, error))?
        };
        FrameImage::encode(&pixels).map_err(|error| TimelineError::frame_capture(at_seconds, error))
    }
}

fn capture_error(at_seconds: f64, error: TimelineError) -> TimelineError {
    match error {
        TimelineError::FrameCapture { .. } => error,
        other => TimelineError::frame_capture(at_seconds, other),
    }
}
