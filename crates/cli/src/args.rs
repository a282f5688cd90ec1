use std::path::PathBuf;

use clap::Parser;
use engine::TimeRange;

/// Samples a video into a timeline strip and renders it to PNG.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Video file to sample
    #[arg(value_name = "VIDEO")]
    pub input: PathBuf,

    /// JSON timeline config; flags below override it
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Widget width in logical pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Widget height in logical pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Seconds between sampled frames
    #[arg(short = 'i', long = "interval", value_name = "SECONDS")]
    pub frame_interval: Option<f64>,

    /// Thumbnail height in pixels
    #[arg(long, value_name = "PIXELS")]
    pub frame_height: Option<u32>,

    /// Device pixel ratio of the output image
    #[arg(long, value_name = "RATIO")]
    pub pixel_ratio: Option<f32>,

    /// Selected range, e.g. 2:8 or 1.5:4.25
    #[arg(long, value_name = "START:END", value_parser = parse_range)]
    pub range: Option<TimeRange>,

    /// Playback cursor position in seconds
    #[arg(short = 't', long = "time", value_name = "SECONDS")]
    pub current_time: Option<f64>,

    /// Hide the time scale
    #[arg(long)]
    pub no_scale: bool,

    /// Read the file into memory and sample it through a temporary copy
    #[arg(long)]
    pub as_blob: bool,

    /// Where to write the rendered strip
    #[arg(short = 'o', long = "output", value_name = "PNG", default_value = "timeline.png")]
    pub output: PathBuf,

    /// Also write every sampled frame as JPEG into this directory
    #[arg(long, value_name = "DIR")]
    pub frames_dir: Option<PathBuf>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

fn parse_range(raw: &str) -> Result<TimeRange, String> {
    let (start, end) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got {raw:?}"))?;
    let parse = |value: &str| {
        value
            .trim()
            .parse::<f64>()
            .map_err(|err| format!("invalid seconds {value:?}: {err}"))
    };
    let (start, end) = (parse(start)?, parse(end)?);
    if !(start.is_finite() && end.is_finite()) || start < 0.0 || end < start {
        return Err(format!("range must satisfy 0 <= START <= END, got {raw:?}"));
    }
    Ok(TimeRange::new(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_range_accepts_fractional_seconds() {
        assert_eq!(parse_range("1.5:4.25"), Ok(TimeRange::new(1.5, 4.25)));
    }

    #[test]
    fn parse_range_rejects_reversed_or_malformed_input() {
        assert!(parse_range("8:2").is_err());
        assert!(parse_range("3").is_err());
        assert!(parse_range("a:b").is_err());
    }

    #[test]
    fn flags_parse_into_overrides() {
        let args = Args::try_parse_from([
            "cliprange",
            "clip.mp4",
            "--interval",
            "0.5",
            "--range",
            "2:8",
            "-vv",
            "--no-scale",
        ])
        .expect("arguments should parse");

        assert_eq!(args.input, PathBuf::from("clip.mp4"));
        assert_eq!(args.frame_interval, Some(0.5));
        assert_eq!(args.range, Some(TimeRange::new(2.0, 8.0)));
        assert_eq!(args.verbosity, 2);
        assert!(args.no_scale);
        assert_eq!(args.output, PathBuf::from("timeline.png"));
    }
}
