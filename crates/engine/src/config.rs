use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TimelineError};
use crate::geometry::TimeRange;
use crate::theme::ThemeOverrides;

/// Smallest sampling step; pointer-derived times use the same grid.
pub const MIN_FRAME_INTERVAL: f64 = 0.01;

/// Fixed sizes of the widget chrome, in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConstants {
    pub handle_width: f32,
    pub scale_height: f32,
    pub cursor_width: f32,
    /// How far the cursor capsule extends above and below the frame strip.
    pub cursor_overflow: f32,
    pub handle_radius: f32,
    pub border_width: f32,
    pub label_size: f32,
    pub tick_length: f32,
}

impl Default for LayoutConstants {
    fn default() -> Self {
        Self {
            handle_width: 12.0,
            scale_height: 18.0,
            cursor_width: 4.0,
            cursor_overflow: 6.0,
            handle_radius: 4.0,
            border_width: 2.0,
            label_size: 7.0,
            tick_length: 5.0,
        }
    }
}

/// Construction-time configuration of a timeline widget.
///
/// `current_time` and `selected_range` switch the respective value into
/// controlled mode: drags report changes but never apply them.
///
/// # Example
/// ```
/// use engine::TimelineConfig;
///
/// let config = TimelineConfig::from_json_str(r#"{ "width": 320, "frame_interval": 1.0 }"#)
///     .expect("config should parse");
/// assert_eq!(config.width, 320);
/// assert_eq!(config.frame_height, 50);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub width: u32,
    pub height: u32,
    pub frame_interval: f64,
    pub frame_height: u32,
    pub show_scale: bool,
    pub disabled: bool,
    pub min_duration: f64,
    /// Known clip duration; skips waiting for metadata when set.
    pub duration: Option<f64>,
    pub current_time: Option<f64>,
    pub selected_range: Option<TimeRange>,
    pub pixel_ratio: f32,
    pub load_timeout_ms: u64,
    pub thumbnail_cache_capacity: Option<usize>,
    pub layout: LayoutConstants,
    pub theme: ThemeOverrides,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            width: 600,
            height: 80,
            frame_interval: 0.2,
            frame_height: 50,
            show_scale: true,
            disabled: false,
            min_duration: 0.1,
            duration: None,
            current_time: None,
            selected_range: None,
            pixel_ratio: 1.0,
            load_timeout_ms: 10_000,
            thumbnail_cache_capacity: None,
            layout: LayoutConstants::default(),
            theme: ThemeOverrides::default(),
        }
    }
}

impl TimelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|source| TimelineError::ConfigParse {
            path: "<inline>".into(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| TimelineError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&raw).map_err(|source| TimelineError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.frame_interval.is_finite() && self.frame_interval >= MIN_FRAME_INTERVAL) {
            return Err(TimelineError::invalid_config(format!(
                "frame_interval must be at least {MIN_FRAME_INTERVAL}s, got {}",
                self.frame_interval
            )));
        }
        if self.frame_height == 0 {
            return Err(TimelineError::invalid_config("frame_height must be positive"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(TimelineError::invalid_config(format!(
                "widget size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if !(self.min_duration.is_finite() && self.min_duration >= 0.0) {
            return Err(TimelineError::invalid_config(format!(
                "min_duration must be non-negative, got {}",
                self.min_duration
            )));
        }
        if let Some(duration) = self.duration {
            if !(duration.is_finite() && duration > 0.0) {
                return Err(TimelineError::invalid_config(format!(
                    "known duration must be positive, got {duration}"
                )));
            }
        }
        if self.load_timeout_ms == 0 {
            return Err(TimelineError::invalid_config("load_timeout_ms must be positive"));
        }
        if self.thumbnail_cache_capacity == Some(0) {
            return Err(TimelineError::invalid_config(
                "thumbnail_cache_capacity must be positive when set",
            ));
        }
        Ok(())
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = TimelineConfig::from_json_str("{}").expect("empty config should parse");

        assert_eq!(config, TimelineConfig::default());
        assert_eq!(config.frame_interval, 0.2);
        assert_eq!(config.min_duration, 0.1);
        assert!(config.show_scale);
    }

    #[test]
    fn nested_layout_and_range_are_read() {
        let config = TimelineConfig::from_json_str(
            r##"{
                "selected_range": { "start": 1.5, "end": 4.0 },
                "layout": { "handle_width": 16 },
                "theme": { "cursor": "#ff0000" }
            }"##,
        )
        .expect("config should parse");

        assert_eq!(config.selected_range, Some(TimeRange::new(1.5, 4.0)));
        assert_eq!(config.layout.handle_width, 16.0);
        assert_eq!(config.layout.scale_height, 18.0);
        assert!(config.theme.cursor.is_some());
    }

    #[test]
    fn non_positive_interval_is_rejected() {
        let error = TimelineConfig::from_json_str(r#"{ "frame_interval": 0 }"#)
            .expect_err("zero interval must fail");

        assert!(matches!(error, TimelineError::InvalidConfig { .. }));
    }

    #[test]
    fn interval_below_the_time_grid_is_rejected() {
        let error = TimelineConfig::from_json_str(r#"{ "frame_interval": 1e-9 }"#)
            .expect_err("sub-grid interval must fail");

        assert!(matches!(error, TimelineError::InvalidConfig { .. }));
        assert!(error.to_string().contains("at least 0.01"));

        let config = TimelineConfig {
            frame_interval: MIN_FRAME_INTERVAL,
            ..TimelineConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn malformed_json_reports_parse_error() {
        let error = TimelineConfig::from_json_str("{ width: }").expect_err("must fail");

        assert!(matches!(error, TimelineError::ConfigParse { .. }));
    }

    #[test]
    fn missing_file_reports_io_error() {
        let error = TimelineConfig::from_json_file("/no/such/timeline.json")
            .expect_err("missing file must fail");

        assert!(matches!(error, TimelineError::ConfigIo { .. }));
    }
}
