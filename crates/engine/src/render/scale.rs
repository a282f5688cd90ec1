//! Tick placement for the time-scale strip.

/// Tick spacings to choose from, in seconds.
pub const TICK_INTERVALS: [f64; 11] = [
    0.5, 1.0, 2.0, 5.0, 10.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0,
];
/// Upper bound on regular ticks across the clip.
pub const TARGET_TICKS: f64 = 7.0;
/// The end-of-clip label is drawn only past this fraction of an interval.
pub const END_LABEL_GAP: f64 = 0.3;

#[derive(Debug, Clone, PartialEq)]
pub struct ScaleTick {
    pub time: f64,
    pub label: Option<String>,
    /// The extra tick marking the clip end.
    pub is_end: bool,
}

/// Smallest interval that keeps the tick count at or under [`TARGET_TICKS`].
///
/// # Example
/// ```
/// use engine::render::scale::tick_interval;
///
/// assert_eq!(tick_interval(10.0), 2.0);
/// assert_eq!(tick_interval(3.0), 0.5);
/// ```
pub fn tick_interval(duration: f64) -> f64 {
    TICK_INTERVALS
        .iter()
        .copied()
        .find(|interval| duration / interval <= TARGET_TICKS)
        .unwrap_or(TICK_INTERVALS[TICK_INTERVALS.len() - 1])
}

pub fn scale_ticks(duration: f64) -> Vec<ScaleTick> {
    if !(duration.is_finite() && duration > 0.0) {
        return Vec::new();
    }
    let interval = tick_interval(duration);

    let mut ticks = Vec::new();
    let mut index = 0u32;
    loop {
        let time = f64::from(index) * interval;
        if time > duration + 1e-9 {
            break;
        }
        ticks.push(ScaleTick {
            time,
            label: Some(format_label(time)),
            is_end: false,
        });
        index += 1;
    }

    let last = ticks.last().map_or(0.0, |tick| tick.time);
    let gap = duration - last;
    if gap > 1e-9 {
        ticks.push(ScaleTick {
            time: duration,
            label: (gap > END_LABEL_GAP * interval).then(|| format_label(duration)),
            is_end: true,
        });
    }
    ticks
}

/// `0.5s`, `12s`, or `m:ss` from one minute on.
pub fn format_label(seconds: f64) -> String {
    if seconds >= 60.0 {
        let total = seconds.round() as u64;
        return format!("{}:{:02}", total / 60, total % 60);
    }
    if (seconds - seconds.round()).abs() < 1e-6 {
        format!("{}s", seconds.round() as u64)
    } else {
        format!("{seconds:.1}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_grows_with_duration() {
        assert_eq!(tick_interval(1.0), 0.5);
        assert_eq!(tick_interval(7.0), 1.0);
        assert_eq!(tick_interval(30.0), 5.0);
        assert_eq!(tick_interval(400.0), 60.0);
        assert_eq!(tick_interval(100_000.0), 600.0);
    }

    #[test]
    fn exact_multiple_has_no_extra_end_tick() {
        let ticks = scale_ticks(10.0);

        let times: Vec<f64> = ticks.iter().map(|tick| tick.time).collect();
        assert_eq!(times, vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        assert!(ticks.iter().all(|tick| !tick.is_end));
    }

    #[test]
    fn distant_end_tick_is_labelled() {
        let ticks = scale_ticks(9.5);
        let end = ticks.last().expect("end tick");

        assert!(end.is_end);
        assert_eq!(end.time, 9.5);
        assert_eq!(end.label.as_deref(), Some("9.5s"));
    }

    #[test]
    fn close_end_tick_has_no_label() {
        let ticks = scale_ticks(8.4);
        let end = ticks.last().expect("end tick");

        assert!(end.is_end);
        assert_eq!(end.label, None);
        assert_eq!(ticks.len(), 6);
    }

    #[test]
    fn labels_switch_to_minutes() {
        assert_eq!(format_label(0.0), "0s");
        assert_eq!(format_label(2.5), "2.5s");
        assert_eq!(format_label(45.0), "45s");
        assert_eq!(format_label(90.0), "1:30");
        assert_eq!(format_label(600.0), "10:00");
    }
}
