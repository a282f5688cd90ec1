use std::collections::{BTreeMap, HashMap};
use std::ffi::OsStr;
use std::process::Command;

use crate::error::{MediaFfmpegError, Result};
use crate::time::Rational;

/// Stream kind discovered by probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
    Other,
}

/// Stream metadata read from `ffprobe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub index: u32,
    pub kind: StreamKind,
    pub codec_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub r_frame_rate: Option<Rational>,
}

/// Media probe result.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub input: String,
    pub streams: Vec<StreamInfo>,
    pub duration_seconds: Option<f64>,
}

impl MediaInfo {
    /// Returns the first video stream.
    ///
    /// # Example
    /// ```no_run
    /// use media_ffmpeg::probe_media;
    ///
    /// let info = probe_media("sample.mp4").expect("probe should succeed");
    /// let _video = info.first_video().expect("video stream exists");
    /// ```
    pub fn first_video(&self) -> Option<&StreamInfo> {
        self.streams
            .iter()
            .find(|stream| stream.kind == StreamKind::Video)
    }

    /// Intrinsic `(width, height)` of the first video stream, if both are known.
    pub fn video_dimensions(&self) -> Option<(u32, u32)> {
        let video = self.first_video()?;
        Some((video.width?, video.height?))
    }
}

/// Probes a local file or URL with a single `ffprobe` run.
///
/// # Example
/// ```no_run
/// use media_ffmpeg::probe_media;
///
/// let info = probe_media("https://example.com/clip.mp4").expect("probe should succeed");
/// assert!(info.duration_seconds.is_some());
/// ```
pub fn probe_media(input: impl AsRef<OsStr>) -> Result<MediaInfo> {
    let input = input.as_ref();
    let output = Command::new("ffprobe")
        .args(["-v", "error", "-show_entries", PROBE_ENTRIES, "-of", "flat"])
        .arg(input)
        .output()
        .map_err(|source| MediaFfmpegError::Io {
            context: "spawn ffprobe",
            source,
        })?;
    if !output.status.success() {
        return Err(MediaFfmpegError::CommandFailed {
            command: command_for_display("ffprobe", input),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    let (streams, duration_seconds) = parse_flat(&String::from_utf8(output.stdout)?)?;
    if streams.is_empty() {
        return Err(MediaFfmpegError::MissingVideoStream(
            input.to_string_lossy().into_owned(),
        ));
    }
    Ok(MediaInfo {
        input: input.to_string_lossy().into_owned(),
        streams,
        duration_seconds,
    })
}

const PROBE_ENTRIES: &str =
    "stream=index,codec_type,codec_name,width,height,r_frame_rate:format=duration";

/// Splits `ffprobe -of flat` output into per-stream records and the
/// container duration.
fn parse_flat(stdout: &str) -> Result<(Vec<StreamInfo>, Option<f64>)> {
    let mut fields: BTreeMap<u32, HashMap<&str, &str>> = BTreeMap::new();
    let mut duration = None;

    for line in stdout.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let Some((key, value)) = line.split_once('=') else {
            return Err(MediaFfmpegError::Parse {
                context: "ffprobe line",
                value: line.to_string(),
            });
        };
        let value = value.trim_matches('"');
        if key == "format.duration" {
            duration = parse_seconds(value)?;
            continue;
        }
        let Some((slot, field)) = key
            .strip_prefix("streams.stream.")
            .and_then(|rest| rest.split_once('.'))
        else {
            continue;
        };
        let slot = slot.parse::<u32>().map_err(|_| MediaFfmpegError::Parse {
            context: "stream slot",
            value: key.to_string(),
        })?;
        fields.entry(slot).or_default().insert(field, value);
    }

    let streams = fields
        .into_iter()
        .map(|(slot, fields)| stream_from_fields(slot, &fields))
        .collect::<Result<Vec<_>>>()?;
    Ok((streams, duration))
}

fn stream_from_fields(slot: u32, fields: &HashMap<&str, &str>) -> Result<StreamInfo> {
    let field = |name: &str| {
        fields
            .get(name)
            .copied()
            .filter(|value| !value.is_empty() && *value != "N/A")
    };
    let kind = match field("codec_type") {
        Some("video") => StreamKind::Video,
        Some("audio") => StreamKind::Audio,
        _ => StreamKind::Other,
    };
    let number = |name: &'static str| {
        field(name)
            .map(|raw| {
                raw.parse::<u32>().map_err(|_| MediaFfmpegError::Parse {
                    context: name,
                    value: raw.to_string(),
                })
            })
            .transpose()
    };
    let r_frame_rate = match field("r_frame_rate") {
        None | Some("0/0") => None,
        Some(raw) => Some(Rational::parse(raw)?),
    };

    Ok(StreamInfo {
        index: number("index")?.unwrap_or(slot),
        kind,
        codec_name: field("codec_name").map(str::to_string),
        width: number("width")?,
        height: number("height")?,
        r_frame_rate,
    })
}

fn parse_seconds(value: &str) -> Result<Option<f64>> {
    if value.is_empty() || value == "N/A" {
        return Ok(None);
    }
    value
        .parse::<f64>()
        .map(Some)
        .map_err(|_| MediaFfmpegError::Parse {
            context: "format duration",
            value: value.to_string(),
        })
}

pub(crate) fn command_for_display(tool: &str, input: &OsStr) -> String {
    format!("{tool} {}", input.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLIP_WITH_AUDIO: &str = r#"streams.stream.0.index=0
streams.stream.0.codec_name="h264"
streams.stream.0.codec_type="video"
streams.stream.0.width=1920
streams.stream.0.height=1080
streams.stream.0.r_frame_rate="30000/1001"
streams.stream.1.index=1
streams.stream.1.codec_name="aac"
streams.stream.1.codec_type="audio"
streams.stream.1.r_frame_rate="0/0"
format.duration="12.480000"
"#;

    #[test]
    fn flat_output_yields_streams_in_order_and_duration() {
        let (streams, duration) = parse_flat(CLIP_WITH_AUDIO).expect("flat output should parse");

        assert_eq!(duration, Some(12.48));
        assert_eq!(streams.len(), 2);
        let video = &streams[0];
        assert_eq!(video.kind, StreamKind::Video);
        assert_eq!(video.codec_name.as_deref(), Some("h264"));
        assert_eq!((video.width, video.height), (Some(1920), Some(1080)));
        assert_eq!(
            video.r_frame_rate,
            Some(Rational::new(30_000, 1_001).expect("valid rational"))
        );
        let audio = &streams[1];
        assert_eq!(audio.kind, StreamKind::Audio);
        assert_eq!(audio.width, None);
        assert_eq!(audio.r_frame_rate, None);
    }

    #[test]
    fn unknown_duration_is_none() {
        let flat = "streams.stream.0.codec_type=\"video\"\nformat.duration=\"N/A\"\n";

        let (_, duration) = parse_flat(flat).expect("N/A is accepted");

        assert_eq!(duration, None);
    }

    #[test]
    fn malformed_numbers_are_reported_with_their_field() {
        let error =
            parse_flat("streams.stream.0.width=wide\n").expect_err("width must be numeric");

        assert!(matches!(error, MediaFfmpegError::Parse { context: "width", .. }));
    }

    #[test]
    fn lines_without_a_value_are_rejected() {
        assert!(parse_flat("streams.stream.0.index\n").is_err());
    }

    #[test]
    fn video_dimensions_come_from_first_video_stream() {
        let info = MediaInfo {
            input: "clip.mp4".to_string(),
            streams: vec![
                StreamInfo {
                    index: 0,
                    kind: StreamKind::Audio,
                    codec_name: None,
                    width: None,
                    height: None,
                    r_frame_rate: None,
                },
                StreamInfo {
                    index: 1,
                    kind: StreamKind::Video,
                    codec_name: None,
                    width: Some(640),
                    height: Some(360),
                    r_frame_rate: None,
                },
            ],
            duration_seconds: Some(3.0),
        };

        assert_eq!(info.video_dimensions(), Some((640, 360)));
    }
}
