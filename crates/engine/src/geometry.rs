//! Conversions between clip seconds and horizontal widget pixels.

use serde::{Deserialize, Serialize};

use crate::config::LayoutConstants;

/// Rounds seconds to the two decimal places used for pointer-derived times.
///
/// # Example
/// ```
/// use engine::geometry::round_time;
///
/// assert_eq!(round_time(3.14159), 3.14);
/// ```
pub fn round_time(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}

/// A selected `[start, end]` span in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn full(duration: f64) -> Self {
        Self {
            start: 0.0,
            end: duration.max(0.0),
        }
    }

    pub fn len(&self) -> f64 {
        self.end - self.start
    }

    /// Clamps both edges into `[0, duration]` and orders them.
    pub fn clamped(self, duration: f64) -> Self {
        let duration = duration.max(0.0);
        let start = self.start.clamp(0.0, duration);
        let end = self.end.clamp(0.0, duration);
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }
}

/// Maps seconds to pixels across a track framed by two handles.
///
/// # Example
/// ```
/// use engine::TimeGeometry;
///
/// let geometry = TimeGeometry::new(220.0, 10.0, 20.0);
/// assert_eq!(geometry.time_to_pixel(10.0), 110.0);
/// assert_eq!(geometry.pixel_to_time(110.0), 10.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeGeometry {
    track_width: f64,
    handle_width: f64,
    duration: f64,
}

impl TimeGeometry {
    pub fn new(track_width: f64, handle_width: f64, duration: f64) -> Self {
        Self {
            track_width,
            handle_width,
            duration,
        }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn handle_width(&self) -> f64 {
        self.handle_width
    }

    /// Width between the two handle gutters.
    pub fn usable_width(&self) -> f64 {
        (self.track_width - 2.0 * self.handle_width).max(0.0)
    }

    pub fn time_to_pixel(&self, seconds: f64) -> f64 {
        if !self.is_valid() {
            return 0.0;
        }
        let seconds = if seconds.is_nan() { 0.0 } else { seconds };
        let t = seconds.clamp(0.0, self.duration);
        self.handle_width + (t / self.duration) * self.usable_width()
    }

    /// Inverse of [`Self::time_to_pixel`], clamped to the clip and rounded.
    pub fn pixel_to_time(&self, x: f64) -> f64 {
        let usable = self.usable_width();
        if !self.is_valid() || usable <= 0.0 || x.is_nan() {
            return 0.0;
        }
        let t = (x - self.handle_width) / usable * self.duration;
        round_time(t).clamp(0.0, self.duration)
    }

    fn is_valid(&self) -> bool {
        self.duration.is_finite() && self.duration > 0.0
    }
}

/// Vertical bands and horizontal gutters of the widget, in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineLayout {
    pub width: f64,
    pub height: f64,
    pub scale_height: f64,
    pub strip_top: f64,
    pub strip_height: f64,
    pub handle_width: f64,
    pub cursor_width: f64,
    pub cursor_overflow: f64,
}

impl TimelineLayout {
    pub fn new(
        width: u32,
        height: u32,
        frame_height: u32,
        show_scale: bool,
        constants: &LayoutConstants,
    ) -> Self {
        let scale_height = if show_scale {
            f64::from(constants.scale_height)
        } else {
            0.0
        };
        let cursor_overflow = f64::from(constants.cursor_overflow);
        Self {
            width: f64::from(width),
            height: f64::from(height),
            scale_height,
            strip_top: scale_height + cursor_overflow,
            strip_height: f64::from(frame_height),
            handle_width: f64::from(constants.handle_width),
            cursor_width: f64::from(constants.cursor_width),
            cursor_overflow,
        }
    }

    pub fn strip_bottom(&self) -> f64 {
        self.strip_top + self.strip_height
    }

    pub fn in_scale_strip(&self, y: f64) -> bool {
        self.scale_height > 0.0 && (0.0..self.scale_height).contains(&y)
    }

    pub fn in_frame_strip(&self, y: f64) -> bool {
        y >= self.strip_top && y <= self.strip_bottom()
    }

    pub fn geometry(&self, duration: f64) -> TimeGeometry {
        TimeGeometry::new(self.width, self.handle_width, duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_to_time_round_trips_within_one_hundredth() {
        for (width, duration) in [(600.0, 10.0), (333.0, 7.31), (1920.0, 3600.0), (80.0, 0.4)] {
            let geometry = TimeGeometry::new(width, 12.0, duration);
            let steps = 500;
            for step in 0..=steps {
                let t = duration * f64::from(step) / f64::from(steps);
                let back = geometry.pixel_to_time(geometry.time_to_pixel(t));
                assert!(
                    (back - t).abs() <= 0.01 + 1e-9,
                    "width {width}, duration {duration}: {t} came back as {back}"
                );
            }
        }
    }

    #[test]
    fn rounding_never_leaves_an_off_grid_clip() {
        let duration = 10.026667;
        let geometry = TimeGeometry::new(600.0, 12.0, duration);

        assert_eq!(geometry.pixel_to_time(600.0), duration);
        assert_eq!(geometry.pixel_to_time(588.0), duration);
        for x in 0..=600 {
            let t = geometry.pixel_to_time(f64::from(x));
            assert!((0.0..=duration).contains(&t), "x {x} mapped to {t}");
        }
    }

    #[test]
    fn time_to_pixel_clamps_out_of_range_times() {
        let geometry = TimeGeometry::new(220.0, 10.0, 20.0);

        assert_eq!(geometry.time_to_pixel(-5.0), 10.0);
        assert_eq!(geometry.time_to_pixel(50.0), 210.0);
        assert_eq!(geometry.time_to_pixel(f64::NAN), 10.0);
    }

    #[test]
    fn pixel_to_time_clamps_into_gutters() {
        let geometry = TimeGeometry::new(220.0, 10.0, 20.0);

        assert_eq!(geometry.pixel_to_time(0.0), 0.0);
        assert_eq!(geometry.pixel_to_time(219.0), 20.0);
        assert_eq!(geometry.pixel_to_time(15.0), 0.5);
    }

    #[test]
    fn zero_duration_degenerates_to_zero() {
        let geometry = TimeGeometry::new(220.0, 10.0, 0.0);

        assert_eq!(geometry.time_to_pixel(3.0), 0.0);
        assert_eq!(geometry.pixel_to_time(100.0), 0.0);
    }

    #[test]
    fn track_narrower_than_handles_maps_everything_to_zero() {
        let geometry = TimeGeometry::new(16.0, 10.0, 5.0);

        assert_eq!(geometry.pixel_to_time(8.0), 0.0);
    }

    #[test]
    fn clamped_range_is_ordered_and_bounded() {
        let range = TimeRange::new(12.0, -1.0).clamped(10.0);

        assert_eq!(range, TimeRange::new(0.0, 10.0));
    }

    #[test]
    fn layout_without_scale_starts_strip_below_cursor_overflow() {
        let constants = LayoutConstants::default();
        let with_scale = TimelineLayout::new(600, 80, 50, true, &constants);
        let without_scale = TimelineLayout::new(600, 80, 50, false, &constants);

        assert!(with_scale.in_scale_strip(1.0));
        assert!(!without_scale.in_scale_strip(1.0));
        assert_eq!(
            without_scale.strip_top,
            f64::from(constants.cursor_overflow)
        );
        assert_eq!(
            with_scale.strip_top,
            f64::from(constants.scale_height + constants.cursor_overflow)
        );
    }
}
