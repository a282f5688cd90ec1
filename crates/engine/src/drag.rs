//! Pointer state machine for the cursor and the two range handles.

use serde::Serialize;
use tracing::debug;

use crate::geometry::{TimeGeometry, TimeRange, TimelineLayout};

/// What a drag moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DragKind {
    Cursor,
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
    /// The pointer left the widget surface.
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerDevice {
    Mouse,
    Touch,
}

/// One raw pointer sample in widget-local logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub x: f64,
    pub y: f64,
    pub device: PointerDevice,
    /// Active touch points; always 1 for mouse input.
    pub touches: u8,
    /// Whether the primary button or touch is still pressed.
    pub buttons_down: bool,
}

impl PointerEvent {
    pub fn mouse(phase: PointerPhase, x: f64, y: f64) -> Self {
        Self {
            phase,
            x,
            y,
            device: PointerDevice::Mouse,
            touches: 1,
            buttons_down: matches!(phase, PointerPhase::Down | PointerPhase::Move),
        }
    }

    pub fn touch(phase: PointerPhase, x: f64, y: f64, touches: u8) -> Self {
        Self {
            phase,
            x,
            y,
            device: PointerDevice::Touch,
            touches,
            buttons_down: matches!(phase, PointerPhase::Down | PointerPhase::Move),
        }
    }

    pub fn with_buttons(mut self, buttons_down: bool) -> Self {
        self.buttons_down = buttons_down;
        self
    }

    fn is_multi_touch(&self) -> bool {
        self.device == PointerDevice::Touch && self.touches > 1
    }
}

/// Hover cursor feedback for the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStyle {
    Default,
    Pointer,
    ColumnResize,
    Grabbing,
}

/// Values the drag machine reads but never owns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragContext {
    pub layout: TimelineLayout,
    pub duration: f64,
    pub current_time: f64,
    pub range: TimeRange,
    pub min_duration: f64,
    pub disabled: bool,
}

impl DragContext {
    pub fn geometry(&self) -> TimeGeometry {
        self.layout.geometry(self.duration)
    }
}

/// State of the drag in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pub kind: DragKind,
    pub origin_pointer_x: f64,
    pub origin_range: TimeRange,
    pub origin_time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragOutput {
    Started(DragKind),
    TimeChanged(f64),
    RangeChanged(TimeRange),
    Ended(DragKind),
}

/// Routes move/up events to the widget while a drag is active, even
/// outside its bounds.
///
/// The returned guard stops the routing when dropped.
pub trait PointerCapture {
    type Guard;

    fn acquire(&mut self) -> Self::Guard;
}

/// Capture for hosts that already deliver every pointer event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCapture;

impl PointerCapture for NoCapture {
    type Guard = ();

    fn acquire(&mut self) {}
}

/// Resolves a pointer position to the element it would grab.
///
/// The scale strip always grabs the cursor. Inside the frame strip the handle
/// gutters left of the start edge and right of the end edge win over the
/// cursor.
pub fn hit_test(
    layout: &TimelineLayout,
    geometry: &TimeGeometry,
    range: TimeRange,
    x: f64,
    y: f64,
) -> Option<DragKind> {
    if !(0.0..=layout.width).contains(&x) {
        return None;
    }
    if layout.in_scale_strip(y) {
        return Some(DragKind::Cursor);
    }
    if !layout.in_frame_strip(y) {
        return None;
    }

    let start_x = geometry.time_to_pixel(range.start);
    let end_x = geometry.time_to_pixel(range.end);
    if (start_x - layout.handle_width..=start_x).contains(&x) {
        Some(DragKind::Start)
    } else if (end_x..=end_x + layout.handle_width).contains(&x) {
        Some(DragKind::End)
    } else {
        Some(DragKind::Cursor)
    }
}

struct ActiveDrag<G> {
    session: DragSession,
    _guard: G,
}

/// `idle` / `dragging(kind)` machine turning pointer events into updates.
pub struct DragController<C: PointerCapture> {
    capture: C,
    active: Option<ActiveDrag<C::Guard>>,
}

impl<C: PointerCapture> DragController<C> {
    pub fn new(capture: C) -> Self {
        Self {
            capture,
            active: None,
        }
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.active.as_ref().map(|active| &active.session)
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    pub fn capture(&self) -> &C {
        &self.capture
    }

    /// Applies one pointer event and returns the resulting updates in order.
    pub fn handle(&mut self, event: &PointerEvent, ctx: &DragContext) -> Vec<DragOutput> {
        if event.is_multi_touch() {
            return Vec::new();
        }
        match event.phase {
            PointerPhase::Down if self.active.is_none() => self.begin(event, ctx),
            PointerPhase::Down => Vec::new(),
            PointerPhase::Move => self.drag_to(event.x, ctx),
            PointerPhase::Up | PointerPhase::Cancel => self.finish(),
            PointerPhase::Leave if event.buttons_down => Vec::new(),
            PointerPhase::Leave => self.finish(),
        }
    }

    /// Hover feedback; computed even when the widget is disabled.
    pub fn cursor_style(&self, x: f64, y: f64, ctx: &DragContext) -> CursorStyle {
        if let Some(session) = self.session() {
            return match session.kind {
                DragKind::Cursor => CursorStyle::Grabbing,
                DragKind::Start | DragKind::End => CursorStyle::ColumnResize,
            };
        }
        match hit_test(&ctx.layout, &ctx.geometry(), ctx.range, x, y) {
            Some(DragKind::Start | DragKind::End) => CursorStyle::ColumnResize,
            Some(DragKind::Cursor) => CursorStyle::Pointer,
            None => CursorStyle::Default,
        }
    }

    /// Drops any active drag without reporting it; releases the capture.
    pub fn cancel(&mut self) -> Option<DragKind> {
        self.active.take().map(|active| active.session.kind)
    }

    fn begin(&mut self, event: &PointerEvent, ctx: &DragContext) -> Vec<DragOutput> {
        if ctx.disabled {
            return Vec::new();
        }
        let geometry = ctx.geometry();
        let Some(kind) = hit_test(&ctx.layout, &geometry, ctx.range, event.x, event.y) else {
            return Vec::new();
        };

        let time = match kind {
            DragKind::Cursor => geometry.pixel_to_time(event.x),
            DragKind::Start => ctx.range.start,
            DragKind::End => ctx.range.end,
        };
        self.active = Some(ActiveDrag {
            session: DragSession {
                kind,
                origin_pointer_x: event.x,
                origin_range: ctx.range,
                origin_time: ctx.current_time,
            },
            _guard: self.capture.acquire(),
        });
        debug!(?kind, x = event.x, time, "drag started");

        vec![DragOutput::Started(kind), DragOutput::TimeChanged(time)]
    }

    fn drag_to(&mut self, x: f64, ctx: &DragContext) -> Vec<DragOutput> {
        let Some(session) = self.session() else {
            return Vec::new();
        };
        let time = ctx.geometry().pixel_to_time(x);
        let range = ctx.range;

        match session.kind {
            DragKind::Cursor => vec![DragOutput::TimeChanged(time)],
            DragKind::Start => {
                let start = time.min(range.end - ctx.min_duration).max(0.0);
                if start == range.start {
                    return Vec::new();
                }
                vec![
                    DragOutput::RangeChanged(TimeRange::new(start, range.end)),
                    DragOutput::TimeChanged(start),
                ]
            }
            DragKind::End => {
                let end = time.max(range.start + ctx.min_duration).min(ctx.duration);
                if end == range.end {
                    return Vec::new();
                }
                vec![
                    DragOutput::RangeChanged(TimeRange::new(range.start, end)),
                    DragOutput::TimeChanged(end),
                ]
            }
        }
    }

    fn finish(&mut self) -> Vec<DragOutput> {
        match self.active.take() {
            Some(active) => {
                debug!(kind = ?active.session.kind, "drag ended");
                vec![DragOutput::Ended(active.session.kind)]
            }
            None => Vec::new(),
        }
    }
}
