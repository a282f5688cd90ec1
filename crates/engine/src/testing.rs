//! In-memory media backend shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use image::{Rgba, RgbaImage};

use crate::error::{Result, TimelineError};
use crate::frame::scaled_width;
use crate::media::{MediaBackend, MediaHandle, MediaInfo};
use crate::source::MediaLocation;

const GATE_LIMIT: Duration = Duration::from_secs(10);

pub(crate) fn mock_info(duration: f64, width: u32, height: u32) -> MediaInfo {
    MediaInfo {
        duration: Some(duration),
        width,
        height,
        frame_rate: Some(30.0),
        codec: Some("mock".to_string()),
    }
}

#[derive(Default)]
struct MockState {
    per_location: Mutex<Vec<(String, MediaInfo)>>,
    opens: Mutex<Vec<MediaLocation>>,
    captures: Mutex<Vec<(String, f64)>>,
    open_count: AtomicUsize,
    fail_capture_at: Mutex<Option<f64>>,
    fail_open: Mutex<bool>,
    open_delay: Mutex<Option<Duration>>,
    gate_open: Mutex<bool>,
    gate_changed: Condvar,
}

/// Records opens and captures; paints frames with a per-location color.
#[derive(Clone)]
pub(crate) struct MockBackend {
    default_info: MediaInfo,
    state: Arc<MockState>,
}

impl MockBackend {
    pub(crate) fn new(default_info: MediaInfo) -> Self {
        let state = MockState::default();
        *state.gate_open.lock().expect("gate lock") = true;
        Self {
            default_info,
            state: Arc::new(state),
        }
    }

    pub(crate) fn with_source(self, location: &str, info: MediaInfo) -> Self {
        self.state
            .per_location
            .lock()
            .expect("info lock")
            .push((location.to_string(), info));
        self
    }

    /// Captures block until [`Self::open_gate`] is called.
    pub(crate) fn gated(self) -> Self {
        *self.state.gate_open.lock().expect("gate lock") = false;
        self
    }

    pub(crate) fn failing_capture_at(self, at_seconds: f64) -> Self {
        *self.state.fail_capture_at.lock().expect("fail lock") = Some(at_seconds);
        self
    }

    pub(crate) fn failing_open(self) -> Self {
        *self.state.fail_open.lock().expect("fail lock") = true;
        self
    }

    pub(crate) fn with_open_delay(self, delay: Duration) -> Self {
        *self.state.open_delay.lock().expect("delay lock") = Some(delay);
        self
    }

    pub(crate) fn open_gate(&self) {
        *self.state.gate_open.lock().expect("gate lock") = true;
        self.state.gate_changed.notify_all();
    }

    pub(crate) fn open_count(&self) -> usize {
        self.state.open_count.load(Ordering::SeqCst)
    }

    pub(crate) fn last_opened(&self) -> Option<MediaLocation> {
        self.state.opens.lock().expect("opens lock").last().cloned()
    }

    pub(crate) fn captured_times(&self) -> Vec<f64> {
        self.captures().into_iter().map(|(_, at)| at).collect()
    }

    pub(crate) fn captures(&self) -> Vec<(String, f64)> {
        self.state.captures.lock().expect("captures lock").clone()
    }
}

impl MediaBackend for MockBackend {
    type Handle = MockHandle;

    fn open(&self, location: &MediaLocation) -> Result<MockHandle> {
        let delay = *self.state.open_delay.lock().expect("delay lock");
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        self.state.open_count.fetch_add(1, Ordering::SeqCst);
        self.state
            .opens
            .lock()
            .expect("opens lock")
            .push(location.clone());

        let name = location.as_os_str().to_string_lossy().into_owned();
        if *self.state.fail_open.lock().expect("fail lock") {
            return Err(TimelineError::Media(
                media_ffmpeg::MediaFfmpegError::MissingVideoStream(name),
            ));
        }
        let info = self
            .state
            .per_location
            .lock()
            .expect("info lock")
            .iter()
            .find(|(location, _)| *location == name)
            .map(|(_, info)| info.clone())
            .unwrap_or_else(|| self.default_info.clone());

        Ok(MockHandle {
            tint: name.bytes().fold(0u8, |acc, byte| acc.wrapping_add(byte)),
            name,
            info,
            position: 0.0,
            state: Arc::clone(&self.state),
        })
    }
}

pub(crate) struct MockHandle {
    name: String,
    tint: u8,
    info: MediaInfo,
    position: f64,
    state: Arc<MockState>,
}

impl MediaHandle for MockHandle {
    fn info(&self) -> &MediaInfo {
        &self.info
    }

    fn seek(&mut self, at_seconds: f64) -> Result<()> {
        self.position = at_seconds;
        Ok(())
    }

    fn capture(&mut self, frame_height: u32) -> Result<RgbaImage> {
        {
            let open = self.state.gate_open.lock().expect("gate lock");
            let (_open, _timeout) = self
                .state
                .gate_changed
                .wait_timeout_while(open, GATE_LIMIT, |open| !*open)
                .expect("gate wait");
        }
        self.state
            .captures
            .lock()
            .expect("captures lock")
            .push((self.name.clone(), self.position));

        if *self.state.fail_capture_at.lock().expect("fail lock") == Some(self.position) {
            return Err(TimelineError::frame_capture(
                self.position,
                "surface is tainted",
            ));
        }

        let width = scaled_width(self.info.width, self.info.height, frame_height);
        let shade = (self.position * 10.0).clamp(0.0, 255.0) as u8;
        Ok(RgbaImage::from_pixel(
            width,
            frame_height,
            Rgba([self.tint, shade, 128, 255]),
        ))
    }
}

/// Counts acquisitions and currently held pointer captures.
#[derive(Debug, Clone, Default)]
pub(crate) struct CountingCapture {
    held: std::rc::Rc<std::cell::Cell<i32>>,
    acquired: std::rc::Rc<std::cell::Cell<u32>>,
}

impl CountingCapture {
    pub(crate) fn held(&self) -> i32 {
        self.held.get()
    }

    pub(crate) fn acquired(&self) -> u32 {
        self.acquired.get()
    }
}

pub(crate) struct CountingGuard {
    held: std::rc::Rc<std::cell::Cell<i32>>,
}

impl Drop for CountingGuard {
    fn drop(&mut self) {
        self.held.set(self.held.get() - 1);
    }
}

impl crate::drag::PointerCapture for CountingCapture {
    type Guard = CountingGuard;

    fn acquire(&mut self) -> CountingGuard {
        self.held.set(self.held.get() + 1);
        self.acquired.set(self.acquired.get() + 1);
        CountingGuard {
            held: std::rc::Rc::clone(&self.held),
        }
    }
}
